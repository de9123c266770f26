//! Canonical per-project task collections.
//!
//! [`TaskStore`] holds the ordered task list for each project the client
//! has fetched. The board renders from it and nothing else. All external
//! mutations (command results and push events alike) reach it through the
//! reconciler's single apply path; the store itself only offers the three
//! primitives — wholesale replace, idempotent upsert, tolerant remove —
//! plus pure read views.
//!
//! Ordering: a fresh fetch preserves server order; tasks created by this
//! client (or learned about via push) are prepended. Column grouping is a
//! pure filter over that sequence, never a reorder.

use std::collections::HashMap;

use boardsync_proto::task::{Task, TaskId, TaskStatus};

use crate::session::Identity;

/// The three status-column partitions of a project's task list.
///
/// For any project the partition is total and disjoint: every task
/// appears in exactly one column, and the columns together contain the
/// whole project list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedTasks {
    /// Tasks in the "todo" column, in list order.
    pub todo: Vec<Task>,
    /// Tasks in the "in-progress" column, in list order.
    pub in_progress: Vec<Task>,
    /// Tasks in the "done" column, in list order.
    pub done: Vec<Task>,
}

impl GroupedTasks {
    /// Total number of tasks across all three columns.
    #[must_use]
    pub fn total(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }

    /// The column for the given status.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Done => &self.done,
        }
    }

    /// Partitions an already-ordered sequence of tasks into columns,
    /// preserving the given order within each.
    #[must_use]
    pub fn from_tasks<I: IntoIterator<Item = Task>>(tasks: I) -> Self {
        let mut groups = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Todo => groups.todo.push(task),
                TaskStatus::InProgress => groups.in_progress.push(task),
                TaskStatus::Done => groups.done.push(task),
            }
        }
        groups
    }
}

/// Per-project ordered task collections, keyed by project id.
#[derive(Debug, Default)]
pub struct TaskStore {
    /// Project id -> ordered task list.
    by_project: HashMap<String, Vec<Task>>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a project's entire list, preserving the given order.
    ///
    /// Used after a full fetch; the previous list is discarded wholesale.
    pub fn replace_all(&mut self, project_id: &str, tasks: Vec<Task>) {
        self.by_project.insert(project_id.to_string(), tasks);
    }

    /// Inserts or replaces a task, keyed by id within its project list.
    ///
    /// Absent ids are inserted at the head; present ids have their entry
    /// replaced wholesale (no field-level merge). Idempotent: applying
    /// the same payload twice leaves the store identical to applying it
    /// once, so duplicate delivery and response/push races converge.
    pub fn upsert(&mut self, task: Task) {
        let list = self.by_project.entry(task.project_id.clone()).or_default();
        match list.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => list.insert(0, task),
        }
    }

    /// Removes a task from a project's list.
    ///
    /// Removing an id that is not present is a no-op, not an error.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, project_id: &str, task_id: &TaskId) -> bool {
        let Some(list) = self.by_project.get_mut(project_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|t| t.id != *task_id);
        list.len() != before
    }

    /// The ordered task list for a project. Empty if never fetched.
    #[must_use]
    pub fn tasks(&self, project_id: &str) -> &[Task] {
        self.by_project.get(project_id).map_or(&[], Vec::as_slice)
    }

    /// Number of tasks held for a project.
    #[must_use]
    pub fn len(&self, project_id: &str) -> usize {
        self.tasks(project_id).len()
    }

    /// Whether a project's list is empty (or never fetched).
    #[must_use]
    pub fn is_empty(&self, project_id: &str) -> bool {
        self.tasks(project_id).is_empty()
    }

    /// Partitions a project's tasks into the three status columns.
    #[must_use]
    pub fn group_by_status(&self, project_id: &str) -> GroupedTasks {
        GroupedTasks::from_tasks(self.tasks(project_id).iter().cloned())
    }

    /// A project's tasks with those assigned to `who` first.
    ///
    /// Stable: relative order within the assigned and unassigned groups
    /// is preserved. Used by the board view so the user's own work leads
    /// each column.
    #[must_use]
    pub fn assigned_first(&self, project_id: &str, who: &Identity) -> Vec<Task> {
        let mut ordered: Vec<Task> = self.tasks(project_id).to_vec();
        ordered.sort_by_key(|t| match &t.assigned_to {
            Some(a) if who.matches(a) => 0u8,
            _ => 1,
        });
        ordered
    }
}
