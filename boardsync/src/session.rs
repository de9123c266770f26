//! Session identity and role capabilities.
//!
//! The authenticated identity is established elsewhere (session issuance
//! is out of scope); this module models what the engine needs from it:
//! who the user is for assignment matching, and what their role lets them
//! see and do. Role gating is an explicit table keyed by [`Role`],
//! evaluated per render — never threaded through ambient context.

use serde::{Deserialize, Serialize};

use boardsync_proto::task::Assignee;

/// The authenticated user, as the engine sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user identifier.
    pub id: String,
    /// Email, used as an assignment-matching fallback when the server's
    /// assignee snapshot predates an id migration.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl Identity {
    /// Whether `assignee` refers to this user, by id or by email fallback.
    #[must_use]
    pub fn matches(&self, assignee: &Assignee) -> bool {
        if assignee.id == self.id {
            return true;
        }
        match (&assignee.email, &self.email) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Role of the authenticated user within the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Manages teams and their projects.
    Manager,
    /// Works tasks assigned to them.
    Member,
}

impl Role {
    /// Capability entry for this role.
    #[must_use]
    pub const fn capabilities(self) -> &'static RoleCapabilities {
        match self {
            Self::Admin => &ADMIN_CAPS,
            Self::Manager => &MANAGER_CAPS,
            Self::Member => &MEMBER_CAPS,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Manager => write!(f, "MANAGER"),
            Self::Member => write!(f, "MEMBER"),
        }
    }
}

/// A role name that is none of `ADMIN`, `MANAGER`, `MEMBER`.
#[derive(Debug, thiserror::Error)]
#[error("unknown role {0:?} (expected ADMIN, MANAGER, or MEMBER)")]
pub struct ParseRoleError(String);

impl std::str::FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "MANAGER" => Ok(Self::Manager),
            "MEMBER" => Ok(Self::Member),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Dashboard tabs a role may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardTab {
    /// Landing overview with role-specific stat cards.
    Dashboard,
    /// Project list and boards.
    Projects,
    /// Team membership and overview.
    Teams,
    /// The user's own task list.
    Tasks,
}

/// What a role may see and do on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCapabilities {
    /// Tabs shown in the dashboard navigation, in display order.
    pub tabs: &'static [DashboardTab],
    /// May create tasks on a project board.
    pub can_create_task: bool,
    /// May set or change a task's assignee.
    pub can_assign_task: bool,
    /// May delete tasks.
    pub can_delete_task: bool,
    /// Sees only tasks assigned to them on the board.
    pub only_assigned_tasks: bool,
}

static ADMIN_CAPS: RoleCapabilities = RoleCapabilities {
    tabs: &[
        DashboardTab::Dashboard,
        DashboardTab::Projects,
        DashboardTab::Teams,
    ],
    can_create_task: true,
    can_assign_task: true,
    can_delete_task: true,
    only_assigned_tasks: false,
};

static MANAGER_CAPS: RoleCapabilities = RoleCapabilities {
    tabs: &[
        DashboardTab::Dashboard,
        DashboardTab::Projects,
        DashboardTab::Teams,
        DashboardTab::Tasks,
    ],
    can_create_task: true,
    can_assign_task: false,
    can_delete_task: false,
    only_assigned_tasks: false,
};

static MEMBER_CAPS: RoleCapabilities = RoleCapabilities {
    tabs: &[
        DashboardTab::Dashboard,
        DashboardTab::Teams,
        DashboardTab::Tasks,
    ],
    can_create_task: false,
    can_assign_task: true,
    can_delete_task: false,
    only_assigned_tasks: true,
};
