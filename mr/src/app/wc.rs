use std::path::Path;

/// Emits `(word, "1")` for every word in `contents`.
pub fn map(_filename: &Path, contents: &str) -> Vec<(String, String)> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| (w.to_owned(), "1".to_owned()))
        .collect()
}

/// Counts the occurrences of a word.
pub fn reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_non_letters() {
        let kvs = map(Path::new("in.txt"), "a cat, a-dog\n42 cat");
        let words: Vec<&str> = kvs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(words, vec!["a", "cat", "a", "dog", "cat"]);
        assert!(kvs.iter().all(|(_, v)| v == "1"));
    }

    #[test]
    fn reduce_counts_values() {
        let ones = vec!["1".to_string(); 3];
        assert_eq!(reduce("cat", &ones), "3");
    }
}
