use std::collections::HashSet;
use std::sync::Mutex;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::task::{create_map_tasks, MapTask, ReduceTask, TaskStatus};
use crate::{CoordinatorError, ReportReply, TaskReply, TaskType};

/// Stage of the job. Advances `Map -> Reduce -> Completed`, never back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Map,
    Reduce,
    Completed,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    map_tasks: Vec<MapTask>,
    reduce_tasks: Vec<ReduceTask>,
}

impl State {
    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "phase must only move forward");
        info!("phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

/// Owns every task of one job and decides which task a worker gets next.
///
/// All task state sits behind a single lock, so a scan, the status change it
/// leads to and any phase transition happen as one step per request.
#[derive(Debug)]
pub struct Coordinator {
    n_reduce: usize,
    state: Mutex<State>,
}

impl Coordinator {
    /// Creates a coordinator in the map phase with one map task per file.
    ///
    /// No reduce tasks are created; use [`Coordinator::from_parts`] together
    /// with [`create_reduce_tasks`](crate::create_reduce_tasks) to supply them.
    pub fn new<S: AsRef<str>>(files: &[S], n_reduce: usize) -> Self {
        Self {
            n_reduce,
            state: Mutex::new(State {
                phase: Phase::Map,
                map_tasks: create_map_tasks(files),
                reduce_tasks: Vec::new(),
            }),
        }
    }

    /// Assembles a coordinator from existing tasks.
    ///
    /// Fails if either task list repeats an id, or if `phase` is already past
    /// a stage that still has unfinished tasks.
    pub fn from_parts(
        map_tasks: Vec<MapTask>,
        reduce_tasks: Vec<ReduceTask>,
        n_reduce: usize,
        phase: Phase,
    ) -> Result<Self, CoordinatorError> {
        if let Some(id) = first_duplicate(map_tasks.iter().map(|t| t.id)) {
            return Err(CoordinatorError::InvariantViolation(format!(
                "map task id {} appears more than once",
                id
            )));
        }
        if let Some(id) = first_duplicate(reduce_tasks.iter().map(|t| t.id)) {
            return Err(CoordinatorError::InvariantViolation(format!(
                "reduce task id {} appears more than once",
                id
            )));
        }
        if phase > Phase::Map && !all_completed(map_tasks.iter().map(|t| t.status)) {
            return Err(CoordinatorError::InvariantViolation(format!(
                "phase {:?} with unfinished map tasks",
                phase
            )));
        }
        if phase > Phase::Reduce && !all_completed(reduce_tasks.iter().map(|t| t.status)) {
            return Err(CoordinatorError::InvariantViolation(format!(
                "phase {:?} with unfinished reduce tasks",
                phase
            )));
        }
        Ok(Self {
            n_reduce,
            state: Mutex::new(State {
                phase,
                map_tasks,
                reduce_tasks,
            }),
        })
    }

    pub fn n_reduce(&self) -> usize {
        self.n_reduce
    }

    /// Picks the next task for a worker.
    ///
    /// Not-started tasks are handed out in id order and marked in progress.
    /// When every map task is completed the job moves on to the reduce phase
    /// and a reduce task is handed out in the same call; likewise the job
    /// completes once every reduce task is done, after which every request
    /// gets `Shutdown`.
    pub fn request_task(&self) -> Result<TaskReply, CoordinatorError> {
        let mut state = self.state.lock()?;

        if state.phase == Phase::Map {
            if let Some(task) = state
                .map_tasks
                .iter_mut()
                .find(|t| t.status == TaskStatus::NotStarted)
            {
                task.status = TaskStatus::InProgress;
                debug!("assigned map task {} ({})", task.id, task.filename);
                return Ok(TaskReply::map(task.id, task.filename.clone(), self.n_reduce));
            }
            if !all_completed(state.map_tasks.iter().map(|t| t.status)) {
                return Ok(TaskReply::wait());
            }
            state.advance(Phase::Reduce);
        }

        if state.phase == Phase::Reduce {
            if let Some(task) = state
                .reduce_tasks
                .iter_mut()
                .find(|t| t.status == TaskStatus::NotStarted)
            {
                task.status = TaskStatus::InProgress;
                debug!("assigned reduce task {}", task.id);
                return Ok(TaskReply::reduce(task.id));
            }
            if !all_completed(state.reduce_tasks.iter().map(|t| t.status)) {
                return Ok(TaskReply::wait());
            }
            state.advance(Phase::Completed);
        }

        match state.phase {
            Phase::Completed => Ok(TaskReply::shutdown()),
            phase => Err(CoordinatorError::InvariantViolation(format!(
                "unexpected phase {:?} after assignment",
                phase
            ))),
        }
    }

    /// Records that a worker finished a task.
    ///
    /// Only an in-progress task of the current phase can be completed;
    /// anything else is ignored and reported back as not accepted.
    pub fn report_task(&self, task_type: TaskType, id: usize) -> Result<ReportReply, CoordinatorError> {
        let mut state = self.state.lock()?;
        let phase = state.phase;

        let status = match (phase, task_type) {
            (Phase::Map, TaskType::Map) => state
                .map_tasks
                .iter_mut()
                .find(|t| t.id == id)
                .map(|t| &mut t.status),
            (Phase::Reduce, TaskType::Reduce) => state
                .reduce_tasks
                .iter_mut()
                .find(|t| t.id == id)
                .map(|t| &mut t.status),
            _ => None,
        };

        match status {
            Some(status) if *status == TaskStatus::InProgress => {
                *status = TaskStatus::Completed;
                debug!("{:?} task {} completed", task_type, id);
                Ok(ReportReply { accepted: true })
            }
            _ => {
                warn!(
                    "ignored completion of {:?} task {} during {:?} phase",
                    task_type, id, phase
                );
                Ok(ReportReply { accepted: false })
            }
        }
    }

    /// Whether the job has finished. Always `false`: completion is not
    /// detected.
    pub fn done(&self) -> bool {
        false
    }

    pub fn phase(&self) -> Result<Phase, CoordinatorError> {
        Ok(self.state.lock()?.phase)
    }

    pub fn map_tasks(&self) -> Result<Vec<MapTask>, CoordinatorError> {
        Ok(self.state.lock()?.map_tasks.clone())
    }

    pub fn reduce_tasks(&self) -> Result<Vec<ReduceTask>, CoordinatorError> {
        Ok(self.state.lock()?.reduce_tasks.clone())
    }
}

fn first_duplicate(mut ids: impl Iterator<Item = usize>) -> Option<usize> {
    let mut seen = HashSet::new();
    ids.find(|id| !seen.insert(*id))
}

fn all_completed(mut statuses: impl Iterator<Item = TaskStatus>) -> bool {
    statuses.all(|s| s == TaskStatus::Completed)
}
