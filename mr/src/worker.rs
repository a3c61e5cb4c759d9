use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use atomicwrites::{AllowOverwrite, AtomicFile};
use log::{debug, info, trace};
use rand::Rng;
use tarpc::{client, context, tokio_serde::formats::Json};

use crate::{ServiceClient, TaskReply, TaskType};

pub type MapFn = fn(&Path, &str) -> Vec<(String, String)>;
pub type ReduceFn = fn(&str, &[String]) -> String;

/// Polls a coordinator for tasks and runs them until told to shut down.
///
/// Intermediate files are written to `dir` as `mr-<map id>-<partition>`,
/// one JSON-encoded pair per line; reduce output goes to `mr-out-<id>`.
pub struct Worker {
    pub dir: PathBuf,
    pub server: String,
    /// Longest pause before asking again after a `Wait` reply.
    pub max_wait: Duration,
    pub map: MapFn,
    pub reduce: ReduceFn,
}

impl Worker {
    pub async fn launch(&self) -> Result<()> {
        let transport = tarpc::serde_transport::tcp::connect(self.server.as_str(), Json::default)
            .await
            .with_context(|| format!("connecting to coordinator at {}", self.server))?;
        let client = ServiceClient::new(client::Config::default(), transport).spawn();

        loop {
            let reply = client.request_task(context::current()).await??;
            trace!("got {:?}", reply);
            let task_type = reply.task_type;
            match task_type {
                TaskType::Map => {
                    let (dir, map) = (self.dir.clone(), self.map);
                    let TaskReply {
                        task_id,
                        filename,
                        n_reduce,
                        ..
                    } = reply;
                    // File I/O stays off the async executor.
                    tokio::task::spawn_blocking(move || {
                        run_map(&dir, map, task_id, &filename, n_reduce)
                    })
                    .await??;
                    self.report(&client, TaskType::Map, task_id).await?;
                }
                TaskType::Reduce => {
                    let (dir, reduce, task_id) = (self.dir.clone(), self.reduce, reply.task_id);
                    tokio::task::spawn_blocking(move || run_reduce(&dir, reduce, task_id)).await??;
                    self.report(&client, TaskType::Reduce, task_id).await?;
                }
                TaskType::Wait => {
                    let max = self.max_wait.as_millis().max(2) as u64;
                    let pause = Duration::from_millis(rand::thread_rng().gen_range(1..max));
                    tokio::time::sleep(pause).await;
                }
                TaskType::Shutdown => {
                    info!("coordinator asked to shut down");
                    return Ok(());
                }
            }
        }
    }

    async fn report(&self, client: &ServiceClient, task_type: TaskType, id: usize) -> Result<()> {
        let reply = client
            .report_task(context::current(), task_type, id)
            .await??;
        debug!("reported {:?} task {}: accepted = {}", task_type, id, reply.accepted);
        Ok(())
    }
}

fn run_map(dir: &Path, map: MapFn, id: usize, filename: &str, n_reduce: usize) -> Result<()> {
    if n_reduce == 0 {
        bail!("map task {} carries no reduce partitions", id);
    }
    let path = Path::new(filename);
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading input {}", filename))?;

    let mut partitions = vec![Vec::new(); n_reduce];
    for kv in map(path, &contents) {
        partitions[partition(&kv.0, n_reduce)].push(kv);
    }

    for (r, kvs) in partitions.iter().enumerate() {
        let mut s = String::new();
        for kv in kvs {
            s.push_str(&serde_json::to_string(kv)?);
            s.push('\n');
        }
        write_atomic(&dir.join(intermediate_name(id, r)), &s)?;
    }
    debug!("map task {} wrote {} partitions", id, n_reduce);
    Ok(())
}

fn run_reduce(dir: &Path, reduce: ReduceFn, id: usize) -> Result<()> {
    let mut groups = BTreeMap::<String, Vec<String>>::new();
    for ent in fs::read_dir(dir)? {
        let p = ent?.path();
        let name = match p.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if intermediate_partition(name) != Some(id) {
            continue;
        }
        for line in fs::read_to_string(&p)?.lines() {
            let (k, v): (String, String) = serde_json::from_str(line)
                .with_context(|| format!("decoding {:?}", p))?;
            groups.entry(k).or_default().push(v);
        }
    }

    let mut s = String::new();
    for (k, vs) in groups.iter() {
        s.push_str(&format!("{} {}\n", k, reduce(k, vs)));
    }
    write_atomic(&dir.join(format!("mr-out-{}", id)), &s)?;
    debug!("reduce task {} wrote {} keys", id, groups.len());
    Ok(())
}

fn partition(key: &str, n_reduce: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % n_reduce as u64) as usize
}

fn intermediate_name(map_id: usize, partition: usize) -> String {
    format!("mr-{}-{}", map_id, partition)
}

// Partition of an `mr-<map id>-<partition>` file name.
fn intermediate_partition(name: &str) -> Option<usize> {
    let (map_id, partition) = name.strip_prefix("mr-")?.split_once('-')?;
    map_id.parse::<usize>().ok()?;
    partition.parse().ok()
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    AtomicFile::new(path, AllowOverwrite)
        .write(|f| f.write_all(contents.as_bytes()))
        .with_context(|| format!("writing {:?}", path))?;
    trace!("output {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::wc;

    #[test]
    fn intermediate_names_parse_back() {
        assert_eq!(intermediate_partition(&intermediate_name(3, 7)), Some(7));
        assert_eq!(intermediate_partition("mr-out-7"), None);
        assert_eq!(intermediate_partition("mr-3"), None);
        assert_eq!(intermediate_partition(".atomicwrite123"), None);
    }

    #[test]
    fn map_output_feeds_reduce() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("pg-0.txt");
        fs::write(&input, "b a b").unwrap();

        run_map(dir.path(), wc::map, 0, input.to_str().unwrap(), 2).unwrap();
        for r in 0..2 {
            run_reduce(dir.path(), wc::reduce, r).unwrap();
        }

        let mut lines: Vec<String> = (0..2)
            .flat_map(|r| {
                fs::read_to_string(dir.path().join(format!("mr-out-{}", r)))
                    .unwrap()
                    .lines()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .collect();
        lines.sort();
        assert_eq!(lines, vec!["a 1", "b 2"]);
    }

    #[test]
    fn map_without_partitions_is_refused() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(run_map(dir.path(), wc::map, 0, "missing.txt", 0).is_err());
    }

    #[test]
    fn partition_is_stable_and_in_range() {
        for key in ["a", "cat", "mapreduce"] {
            let p = partition(key, 10);
            assert!(p < 10);
            assert_eq!(p, partition(key, 10));
        }
    }
}
