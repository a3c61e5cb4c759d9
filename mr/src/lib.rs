use serde::{Deserialize, Serialize};

pub mod app;
mod coordinator;
mod error;
mod master;
mod task;
mod worker;
pub use coordinator::{Coordinator, Phase};
pub use error::CoordinatorError;
pub use master::Master;
pub use task::{create_map_tasks, create_reduce_tasks, MapTask, ReduceTask, TaskStatus};
pub use worker::Worker;

#[tarpc::service]
pub trait Service {
    /// Hands out the next task, or tells the caller to wait or shut down.
    async fn request_task() -> Result<TaskReply, CoordinatorError>;
    /// Marks an in-progress task of the current phase as completed.
    async fn report_task(task_type: TaskType, id: usize) -> Result<ReportReply, CoordinatorError>;
    /// Whether the whole job has finished.
    async fn done() -> bool;
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskType {
    Map,
    Reduce,
    #[default]
    Wait,
    Shutdown,
}

/// Reply to a task request.
///
/// Fields a task type does not call for hold their zero value and must be
/// ignored: `filename` and `n_reduce` only mean something for map tasks,
/// `task_id` is always 0 for `Wait` and `Shutdown`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskReply {
    pub task_type: TaskType,
    pub task_id: usize,
    pub filename: String,
    pub n_reduce: usize,
}

impl TaskReply {
    pub fn map(task_id: usize, filename: String, n_reduce: usize) -> Self {
        Self {
            task_type: TaskType::Map,
            task_id,
            filename,
            n_reduce,
        }
    }

    pub fn reduce(task_id: usize) -> Self {
        Self {
            task_type: TaskType::Reduce,
            task_id,
            ..Default::default()
        }
    }

    pub fn wait() -> Self {
        Self::default()
    }

    pub fn shutdown() -> Self {
        Self {
            task_type: TaskType::Shutdown,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportReply {
    pub accepted: bool,
}
