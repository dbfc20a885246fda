//! Core task-graph machinery: the task model, the dependency graph,
//! and the executor that drives a run.

pub mod dag;
pub mod executor;
pub mod task;

pub use dag::TaskDag;
pub use executor::{Executor, ExecutorEvent, TaskGraph};
pub use task::{Task, TaskId, TaskStatus};
