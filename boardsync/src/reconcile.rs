//! The single merge point for external task mutations.
//!
//! Both the resolved value of a command and each push event delivered by
//! the channel reduce to a [`Mutation`], and every mutation is applied
//! through [`Reconciler::apply`] into the owned [`TaskStore`]. No other
//! code path mutates the store, which is what makes conflict handling
//! tractable: there is no ordering guarantee between a command's own
//! response and the server's rebroadcast push of the same change, and
//! either may be delivered twice, so the only requirement is that the
//! underlying upsert/remove primitives are idempotent and
//! order-insensitive for identical payloads.
//!
//! Mutations are applied only after server acknowledgment — confirmed
//! only, never speculative — so failed create/move/delete commands leave
//! the store untouched. A failed update is the one exception: the client
//! cannot tell how much of the edit the server applied, so it repairs by
//! re-fetching the whole project list.

use boardsync_proto::task::{Task, TaskId};

use crate::api::{ApiError, CommandApi};
use crate::store::TaskStore;

/// A store mutation distilled from a command result or push event.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert-if-absent-else-replace-wholesale, keyed by task id.
    Upsert(Task),
    /// Drop the task if present; absent ids are a no-op.
    Remove {
        /// Project whose list is addressed.
        project_id: String,
        /// Task to drop.
        task_id: TaskId,
    },
}

/// Owns the canonical [`TaskStore`] and applies all mutations to it.
#[derive(Debug, Default)]
pub struct Reconciler {
    store: TaskStore,
}

impl Reconciler {
    /// Creates a reconciler with an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the canonical store.
    #[must_use]
    pub const fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Applies one mutation.
    ///
    /// Idempotent under duplicate delivery and insensitive to the
    /// response/rebroadcast arrival order for identical payloads.
    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Upsert(task) => {
                tracing::debug!(task_id = %task.id, project_id = %task.project_id, "upsert");
                self.store.upsert(task);
            }
            Mutation::Remove {
                project_id,
                task_id,
            } => {
                let removed = self.store.remove(&project_id, &task_id);
                tracing::debug!(%task_id, %project_id, removed, "remove");
            }
        }
    }

    /// Replaces a project's list wholesale after a fresh fetch.
    pub fn replace_project(&mut self, project_id: &str, tasks: Vec<Task>) {
        tracing::debug!(%project_id, count = tasks.len(), "replace project list");
        self.store.replace_all(project_id, tasks);
    }

    /// Compensating full re-fetch after a failed update command.
    ///
    /// Repairs any client/server divergence by replacing the project's
    /// list with the authoritative one. If the re-fetch itself fails the
    /// list fails closed to empty and the error is returned for
    /// user-visible reporting.
    ///
    /// # Errors
    ///
    /// Propagates the [`ApiError`] from the re-fetch.
    pub async fn repair<A: CommandApi>(
        &mut self,
        api: &A,
        team_id: &str,
        project_id: &str,
    ) -> Result<(), ApiError> {
        tracing::warn!(%project_id, "update failed, re-fetching project to repair divergence");
        match api.list_tasks(team_id, project_id).await {
            Ok(tasks) => {
                self.replace_project(project_id, tasks);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "repair fetch failed, failing closed");
                self.replace_project(project_id, Vec::new());
                Err(e)
            }
        }
    }
}
