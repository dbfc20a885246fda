//! Graph execution engine.
//!
//! `TaskGraph` pairs the dependency graph with an action registry;
//! `Executor` drives a single run: dispatch every ready task onto the
//! tokio runtime, await completions, and repeat until the target's
//! transitive closure is done. Independent tasks run concurrently; the
//! first failure cancels the run (not-yet-started tasks are never
//! dispatched, in-flight tasks are cancelled at their next await
//! point). There is no retry logic and no completion cache: each
//! invocation constructs a fresh graph and `run` consumes it.

use crate::core::dag::TaskDag;
use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result};
use crate::{dlog_debug, dlog_error};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A task's unit of work: an async closure producing success or failure.
pub type TaskAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Events emitted by the executor for task lifecycle changes.
///
/// Timestamps allow callers (and tests) to verify the ordering
/// contract: a task's start never precedes a prerequisite's completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorEvent {
    /// A task's action has been dispatched.
    TaskStarted {
        task: TaskId,
        at: DateTime<Utc>,
    },
    /// A task's action returned success.
    TaskCompleted {
        task: TaskId,
        at: DateTime<Utc>,
    },
    /// A task's action returned an error; the run is being aborted.
    TaskFailed {
        task: TaskId,
        error: String,
        at: DateTime<Utc>,
    },
    /// Every task in the run's scope completed.
    RunComplete,
}

/// A constructed task graph: dependency edges plus one action per task.
///
/// Built once per command invocation and consumed by [`Executor::run`].
/// There is deliberately no process-wide registry; the graph is an
/// explicit value passed to the executor.
pub struct TaskGraph {
    dag: TaskDag,
    actions: HashMap<TaskId, TaskAction>,
}

impl TaskGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            dag: TaskDag::new(),
            actions: HashMap::new(),
        }
    }

    /// Declare a named task with its prerequisites and action.
    ///
    /// Prerequisites must already be declared (graphs are built leaves
    /// first), and a name may be declared only once per graph.
    pub fn declare<F, Fut>(&mut self, name: &str, prerequisites: &[&str], action: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let id = TaskId::new(name);
        if self.dag.contains_task(&id) {
            return Err(Error::Validation(format!(
                "Task {} declared twice",
                name
            )));
        }

        self.dag.add_task(Task::new(name));
        for prerequisite in prerequisites {
            self.dag
                .add_dependency(&TaskId::new(prerequisite), &id)?;
        }
        self.actions
            .insert(id, Box::new(move || Box::pin(action())));
        Ok(())
    }

    /// The underlying dependency graph.
    pub fn dag(&self) -> &TaskDag {
        &self.dag
    }

    /// Number of declared tasks.
    pub fn task_count(&self) -> usize {
        self.dag.task_count()
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes a task graph with fail-fast semantics.
pub struct Executor {
    event_tx: Option<mpsc::UnboundedSender<ExecutorEvent>>,
    cancel: CancellationToken,
}

impl Executor {
    /// Create an executor without event reporting.
    pub fn new() -> Self {
        Self {
            event_tx: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Create an executor that reports lifecycle events on a channel.
    pub fn with_events(event_tx: mpsc::UnboundedSender<ExecutorEvent>) -> Self {
        Self {
            event_tx: Some(event_tx),
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled when the run aborts. Long-running actions may
    /// clone it to shut down cooperatively.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn emit(&self, event: ExecutorEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Run the named task and, transitively, every prerequisite.
    ///
    /// Each task in the target's closure executes exactly once, never
    /// before all of its prerequisites completed. Tasks with no
    /// ordering relation run concurrently. The first failing action
    /// cancels everything else and the error names the failing task.
    pub async fn run(self, graph: TaskGraph, target: &str) -> Result<()> {
        let TaskGraph {
            mut dag,
            mut actions,
        } = graph;

        let target_id = TaskId::new(target);
        let scope = dag.required_for(&target_id)?;
        dlog_debug!(
            "Executor::run target={} scope={} tasks",
            target,
            scope.len()
        );

        let mut completed: HashSet<TaskId> = HashSet::new();
        let mut running: HashSet<TaskId> = HashSet::new();
        let mut join_set: JoinSet<(TaskId, Result<()>)> = JoinSet::new();

        loop {
            if dag.all_complete(&scope, &completed) {
                break;
            }

            // Dispatch every ready task that is not already in flight.
            let ready: Vec<TaskId> = dag
                .ready_tasks(&scope, &completed)
                .into_iter()
                .filter(|task| !running.contains(&task.id))
                .map(|task| task.id.clone())
                .collect();

            for task_id in ready {
                let action = actions.remove(&task_id).ok_or_else(|| {
                    Error::Validation(format!("No action registered for task {}", task_id))
                })?;

                if let Some(task) = dag.get_task_mut(&task_id) {
                    task.start();
                }
                self.emit(ExecutorEvent::TaskStarted {
                    task: task_id.clone(),
                    at: Utc::now(),
                });
                dlog_debug!("Task started: {}", task_id);

                let token = self.cancel.clone();
                let name = task_id.clone();
                join_set.spawn(async move {
                    let result = tokio::select! {
                        _ = token.cancelled() => Err(Error::Aborted(name.to_string())),
                        result = action() => result,
                    };
                    (name, result)
                });
                running.insert(task_id);
            }

            if join_set.is_empty() {
                // Nothing running and nothing ready, yet the scope is
                // incomplete. Cannot happen with a well-formed acyclic
                // graph; surface it instead of spinning.
                return Err(Error::Validation(
                    "No runnable tasks remain but the run is incomplete".to_string(),
                ));
            }

            match join_set.join_next().await {
                Some(Ok((task_id, Ok(())))) => {
                    running.remove(&task_id);
                    if let Some(task) = dag.get_task_mut(&task_id) {
                        task.complete();
                    }
                    completed.insert(task_id.clone());
                    self.emit(ExecutorEvent::TaskCompleted {
                        task: task_id.clone(),
                        at: Utc::now(),
                    });
                    dlog_debug!("Task completed: {}", task_id);
                }
                Some(Ok((task_id, Err(error)))) => {
                    running.remove(&task_id);
                    let detail = error.to_string();
                    if let Some(task) = dag.get_task_mut(&task_id) {
                        task.fail(&detail);
                    }
                    self.emit(ExecutorEvent::TaskFailed {
                        task: task_id.clone(),
                        error: detail.clone(),
                        at: Utc::now(),
                    });
                    dlog_error!("Task failed: {}: {}", task_id, detail);

                    self.abort_remaining(&mut dag, &scope, &completed, &mut join_set)
                        .await;
                    return Err(Error::TaskFailed {
                        task: task_id.to_string(),
                        detail,
                    });
                }
                Some(Err(join_error)) => {
                    self.abort_remaining(&mut dag, &scope, &completed, &mut join_set)
                        .await;
                    return Err(Error::TaskJoin(join_error.to_string()));
                }
                None => {}
            }
        }

        self.emit(ExecutorEvent::RunComplete);
        Ok(())
    }

    /// Cancel in-flight tasks and mark everything unfinished as aborted.
    async fn abort_remaining(
        &self,
        dag: &mut TaskDag,
        scope: &HashSet<TaskId>,
        completed: &HashSet<TaskId>,
        join_set: &mut JoinSet<(TaskId, Result<()>)>,
    ) {
        self.cancel.cancel();
        while let Some(joined) = join_set.join_next().await {
            if let Ok((task_id, _)) = joined {
                if let Some(task) = dag.get_task_mut(&task_id) {
                    if !task.is_finished() {
                        task.abort();
                    }
                }
            }
        }
        for task_id in scope {
            if completed.contains(task_id) {
                continue;
            }
            if let Some(task) = dag.get_task_mut(task_id) {
                if !task.is_finished() {
                    task.abort();
                }
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
