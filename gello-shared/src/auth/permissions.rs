/// Role predicates and resource-level permission checks
///
/// # Permission Model
///
/// 1. **Role predicates**: pure functions of a [`UserRole`]. Total over the
///    closed role set; `Unrecognized` roles are denied everything.
/// 2. **Team scoping**: boards (and their lists and tasks) belong to one team.
///    Admins reach every team, everyone else only their own.
/// 3. **Task completion**: only the assignee may complete a task, whatever
///    their role.
///
/// | predicate            | admin | manager | member |
/// |----------------------|-------|---------|--------|
/// | `can_manage_boards`  | yes   | yes     | no     |
/// | `can_manage_lists`   | yes   | yes     | no     |
/// | `can_manage_tasks`   | yes   | yes     | no     |
/// | `can_manage_team`    | yes   | yes     | no     |
/// | `can_award_points`   | yes   | yes     | no     |
/// | `can_manage_users`   | yes   | no      | no     |
/// | `can_view_all_teams` | yes   | no      | no     |
///
/// # Example
///
/// ```
/// use gello_shared::auth::permissions::{require_capability, can_manage_boards, AuthContext};
/// use gello_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let auth = AuthContext {
///     user_id: Uuid::new_v4(),
///     email: "m@example.com".to_string(),
///     role: UserRole::Manager,
///     team_id: Some(Uuid::new_v4()),
/// };
/// assert!(require_capability(&auth, can_manage_boards, "manage boards").is_ok());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::task::Task;
use crate::models::user::{User, UserRole};

/// Authenticated caller, built from a verified access token and the
/// caller's profile row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Email of the identity
    pub email: String,

    /// Role from the profile row
    pub role: UserRole,

    /// Team from the profile row
    pub team_id: Option<Uuid>,
}

impl AuthContext {
    /// Builds the context from a profile row
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            team_id: user.team_id,
        }
    }

    /// Whether the caller is an admin
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Role doesn't allow the action
    #[error("Insufficient permissions: role '{role}' cannot {action}")]
    InsufficientRole { role: UserRole, action: &'static str },

    /// Resource belongs to a team the caller isn't part of
    #[error("Not a member of team {0}")]
    NotTeamMember(Uuid),

    /// Task has no assignee, so there is nobody to complete it
    #[error("Task is not assigned to anyone")]
    Unassigned,

    /// Caller isn't the task's assignee
    #[error("Only the assigned user can complete this task")]
    NotAssignee,

    /// Caller may not touch this resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

fn is_manager_or_admin(role: &UserRole) -> bool {
    matches!(role, UserRole::Admin | UserRole::Manager)
}

/// Create, edit and delete boards
pub fn can_manage_boards(role: &UserRole) -> bool {
    is_manager_or_admin(role)
}

/// Create, edit, reorder and delete lists
pub fn can_manage_lists(role: &UserRole) -> bool {
    is_manager_or_admin(role)
}

/// Create, edit, assign, move and delete tasks
pub fn can_manage_tasks(role: &UserRole) -> bool {
    is_manager_or_admin(role)
}

/// Create, rename and delete teams, add and remove members
pub fn can_manage_team(role: &UserRole) -> bool {
    is_manager_or_admin(role)
}

/// Manually award or deduct points, read anyone's ledger
pub fn can_award_points(role: &UserRole) -> bool {
    is_manager_or_admin(role)
}

/// List users, change roles, delete accounts
pub fn can_manage_users(role: &UserRole) -> bool {
    matches!(role, UserRole::Admin)
}

/// See boards of every team
pub fn can_view_all_teams(role: &UserRole) -> bool {
    matches!(role, UserRole::Admin)
}

/// Checks a role predicate against the caller
///
/// `action` only feeds the error message.
pub fn require_capability(
    auth: &AuthContext,
    predicate: fn(&UserRole) -> bool,
    action: &'static str,
) -> Result<(), AuthzError> {
    if !predicate(&auth.role) {
        return Err(AuthzError::InsufficientRole {
            role: auth.role.clone(),
            action,
        });
    }

    Ok(())
}

/// Checks that the caller may see resources of `team_id`
pub fn require_team_access(auth: &AuthContext, team_id: Uuid) -> Result<(), AuthzError> {
    if can_view_all_teams(&auth.role) || auth.team_id == Some(team_id) {
        return Ok(());
    }

    Err(AuthzError::NotTeamMember(team_id))
}

/// Checks that the caller may manage the team itself
///
/// Admins manage any team; managers only their own.
pub fn require_team_management(auth: &AuthContext, team_id: Uuid) -> Result<(), AuthzError> {
    require_capability(auth, can_manage_team, "manage teams")?;

    if auth.is_admin() || auth.team_id == Some(team_id) {
        return Ok(());
    }

    Err(AuthzError::NotAuthorized)
}

/// Checks that the caller is the assignee of `task`
///
/// Managers and admins get no exemption: completion credit only ever goes to
/// the person who did the work.
pub fn require_assignee(auth: &AuthContext, task: &Task) -> Result<Uuid, AuthzError> {
    let assignee = task.assigned_to.ok_or(AuthzError::Unassigned)?;

    if assignee != auth.user_id {
        return Err(AuthzError::NotAssignee);
    }

    Ok(assignee)
}

/// Allows the caller on their own resource, otherwise requires `predicate`
pub fn require_self_or(
    auth: &AuthContext,
    owner_id: Uuid,
    predicate: fn(&UserRole) -> bool,
    action: &'static str,
) -> Result<(), AuthzError> {
    if auth.user_id == owner_id {
        return Ok(());
    }

    require_capability(auth, predicate, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx(role: &str, team_id: Option<Uuid>) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            role: UserRole::parse(role),
            team_id,
        }
    }

    fn task_assigned_to(assigned_to: Option<Uuid>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            story_points: 1,
            assigned_to,
            position: 0,
            due_date: None,
            completed_at: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_manage_team_examples() {
        assert!(can_manage_team(&UserRole::parse("admin")));
        assert!(can_manage_team(&UserRole::parse("manager")));
        assert!(!can_manage_team(&UserRole::parse("member")));
        assert!(!can_manage_team(&UserRole::parse("")));
        assert!(!can_manage_team(&UserRole::parse("bogus-role")));
    }

    #[test]
    fn test_predicates_are_total() {
        let predicates: [fn(&UserRole) -> bool; 7] = [
            can_manage_boards,
            can_manage_lists,
            can_manage_tasks,
            can_manage_team,
            can_award_points,
            can_manage_users,
            can_view_all_teams,
        ];

        for predicate in predicates {
            assert!(predicate(&UserRole::Admin));
            assert!(!predicate(&UserRole::Member));
            assert!(!predicate(&UserRole::Unrecognized("owner".to_string())));
            // deterministic
            assert_eq!(predicate(&UserRole::Manager), predicate(&UserRole::Manager));
        }
    }

    #[test]
    fn test_user_administration_is_admin_only() {
        assert!(can_manage_users(&UserRole::Admin));
        assert!(!can_manage_users(&UserRole::Manager));
        assert!(!can_view_all_teams(&UserRole::Manager));
    }

    #[test]
    fn test_require_capability() {
        let member = ctx("member", None);
        let err = require_capability(&member, can_manage_boards, "manage boards").unwrap_err();
        assert!(err.to_string().contains("member"));
        assert!(err.to_string().contains("manage boards"));

        let manager = ctx("manager", None);
        assert!(require_capability(&manager, can_manage_boards, "manage boards").is_ok());
    }

    #[test]
    fn test_require_team_access() {
        let team = Uuid::new_v4();

        assert!(require_team_access(&ctx("member", Some(team)), team).is_ok());
        assert!(require_team_access(&ctx("manager", Some(Uuid::new_v4())), team).is_err());
        assert!(require_team_access(&ctx("member", None), team).is_err());
        assert!(require_team_access(&ctx("admin", None), team).is_ok());
    }

    #[test]
    fn test_require_team_management() {
        let team = Uuid::new_v4();

        assert!(require_team_management(&ctx("manager", Some(team)), team).is_ok());
        assert!(matches!(
            require_team_management(&ctx("manager", Some(Uuid::new_v4())), team),
            Err(AuthzError::NotAuthorized)
        ));
        assert!(matches!(
            require_team_management(&ctx("member", Some(team)), team),
            Err(AuthzError::InsufficientRole { .. })
        ));
        assert!(require_team_management(&ctx("admin", None), team).is_ok());
    }

    #[test]
    fn test_require_assignee() {
        let member = ctx("member", None);
        let manager = ctx("manager", None);

        let unassigned = task_assigned_to(None);
        assert!(matches!(
            require_assignee(&member, &unassigned),
            Err(AuthzError::Unassigned)
        ));

        let mine = task_assigned_to(Some(member.user_id));
        assert_eq!(require_assignee(&member, &mine).unwrap(), member.user_id);

        // managers cannot complete someone else's task
        assert!(matches!(
            require_assignee(&manager, &mine),
            Err(AuthzError::NotAssignee)
        ));
    }

    #[test]
    fn test_require_self_or() {
        let member = ctx("member", None);
        assert!(require_self_or(&member, member.user_id, can_award_points, "read ledgers").is_ok());
        assert!(require_self_or(&member, Uuid::new_v4(), can_award_points, "read ledgers").is_err());

        let manager = ctx("manager", None);
        assert!(require_self_or(&manager, Uuid::new_v4(), can_award_points, "read ledgers").is_ok());
    }
}
