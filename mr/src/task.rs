use serde::{Deserialize, Serialize};

/// Progress of a single task. Only ever moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapTask {
    pub id: usize,
    pub status: TaskStatus,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReduceTask {
    pub id: usize,
    pub status: TaskStatus,
    // Not read by assignment.
    pub key: String,
}

/// One not-started map task per input file, ids following input order.
pub fn create_map_tasks<S: AsRef<str>>(files: &[S]) -> Vec<MapTask> {
    files
        .iter()
        .enumerate()
        .map(|(id, file)| MapTask {
            id,
            status: TaskStatus::NotStarted,
            filename: file.as_ref().to_owned(),
        })
        .collect()
}

/// One not-started reduce task per partition, ids `0..n_reduce`.
pub fn create_reduce_tasks(n_reduce: usize) -> Vec<ReduceTask> {
    (0..n_reduce)
        .map(|id| ReduceTask {
            id,
            status: TaskStatus::NotStarted,
            key: String::new(),
        })
        .collect()
}
