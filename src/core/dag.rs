//! Task dependency graph.
//!
//! The graph represents "must complete before" edges between named
//! tasks, enabling parallel execution of independent tasks while the
//! executor honors every ordering edge. Cycles are rejected at edge
//! insertion so the graph is acyclic by construction.

use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// The task dependency graph.
///
/// Nodes are tasks; an edge from A to B means A must complete before
/// B's action may start. Edges carry no payload: the only relationship
/// the orchestrator needs is ordering.
pub struct TaskDag {
    /// The underlying directed graph.
    graph: DiGraph<Task, ()>,
    /// Index mapping from TaskId to NodeIndex for fast lookups.
    task_index: HashMap<TaskId, NodeIndex>,
}

impl TaskDag {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    /// Add a task to the graph.
    ///
    /// If a task with the same id already exists, returns the existing
    /// NodeIndex.
    pub fn add_task(&mut self, task: Task) -> NodeIndex {
        if let Some(&index) = self.task_index.get(&task.id) {
            return index;
        }

        let id = task.id.clone();
        let index = self.graph.add_node(task);
        self.task_index.insert(id, index);
        index
    }

    /// Add an ordering edge: `from` must complete before `to` starts.
    ///
    /// # Errors
    /// Returns an error if either task is unknown or if the edge would
    /// create a cycle.
    pub fn add_dependency(&mut self, from: &TaskId, to: &TaskId) -> Result<()> {
        let from_index = self
            .task_index
            .get(from)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in graph", from)))?;

        let to_index = self
            .task_index
            .get(to)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in graph", to)))?;

        // Temporarily add the edge to check for cycles
        let edge = self.graph.add_edge(*from_index, *to_index, ());

        if is_cyclic_directed(&self.graph) {
            self.graph.remove_edge(edge);
            return Err(Error::Validation(format!(
                "Adding dependency from {} to {} would create a cycle",
                from, to
            )));
        }

        Ok(())
    }

    /// Get a reference to a task by its id.
    pub fn get_task(&self, id: &TaskId) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get a mutable reference to a task by its id.
    pub fn get_task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph.node_weight_mut(index)
        } else {
            None
        }
    }

    /// Number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of ordering edges in the graph.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if an ordering edge exists between two tasks.
    pub fn has_dependency(&self, from: &TaskId, to: &TaskId) -> bool {
        if let (Some(&from_idx), Some(&to_idx)) =
            (self.task_index.get(from), self.task_index.get(to))
        {
            self.graph.find_edge(from_idx, to_idx).is_some()
        } else {
            false
        }
    }

    /// All tasks the given task directly depends on (prerequisites).
    pub fn prerequisites(&self, id: &TaskId) -> Vec<&Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .neighbors_directed(index, petgraph::Direction::Incoming)
                .filter_map(|neighbor| self.graph.node_weight(neighbor))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// All tasks that directly depend on the given task.
    pub fn dependents(&self, id: &TaskId) -> Vec<&Task> {
        if let Some(&index) = self.task_index.get(id) {
            self.graph
                .neighbors_directed(index, petgraph::Direction::Outgoing)
                .filter_map(|neighbor| self.graph.node_weight(neighbor))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// All tasks in the graph.
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.graph.node_weights().collect()
    }

    /// Check if the graph contains a task.
    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.task_index.contains_key(id)
    }

    /// The transitive prerequisite closure of a target, including the
    /// target itself.
    ///
    /// `run(name)` executes exactly this set: the named task and every
    /// task it transitively depends on, and nothing else.
    pub fn required_for(&self, target: &TaskId) -> Result<HashSet<TaskId>> {
        let start = self
            .task_index
            .get(target)
            .ok_or_else(|| Error::Validation(format!("Task {} not found in graph", target)))?;

        let mut required = HashSet::new();
        let mut stack = vec![*start];
        while let Some(index) = stack.pop() {
            let task = match self.graph.node_weight(index) {
                Some(t) => t,
                None => continue,
            };
            if !required.insert(task.id.clone()) {
                continue;
            }
            stack.extend(
                self.graph
                    .neighbors_directed(index, petgraph::Direction::Incoming),
            );
        }
        Ok(required)
    }

    /// Tasks from `scope` whose prerequisites are all completed.
    ///
    /// A task is ready if it is in scope, not yet completed, and every
    /// incoming edge originates from a completed task.
    pub fn ready_tasks<'a>(
        &'a self,
        scope: &HashSet<TaskId>,
        completed: &HashSet<TaskId>,
    ) -> Vec<&'a Task> {
        self.graph
            .node_indices()
            .filter_map(|index| {
                let task = self.graph.node_weight(index)?;

                if !scope.contains(&task.id) || completed.contains(&task.id) {
                    return None;
                }

                let deps_satisfied = self
                    .graph
                    .neighbors_directed(index, petgraph::Direction::Incoming)
                    .all(|dep_index| {
                        self.graph
                            .node_weight(dep_index)
                            .map(|dep_task| {
                                // Prerequisites outside the scope do not gate
                                // execution; they are never scheduled.
                                !scope.contains(&dep_task.id) || completed.contains(&dep_task.id)
                            })
                            .unwrap_or(false)
                    });

                if deps_satisfied {
                    Some(task)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Check if every task in `scope` is in the completed set.
    pub fn all_complete(&self, scope: &HashSet<TaskId>, completed: &HashSet<TaskId>) -> bool {
        scope.iter().all(|id| completed.contains(id))
    }

    /// Tasks in topological order (every task after its prerequisites).
    pub fn topological_order(&self) -> Result<Vec<&Task>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let task_name = self
                .graph
                .node_weight(cycle.node_id())
                .map(|t| t.id.as_str())
                .unwrap_or("unknown");
            Error::Validation(format!("Cycle detected at task: {}", task_name))
        })?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index))
            .collect())
    }
}

impl Default for TaskDag {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskDag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDag")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
