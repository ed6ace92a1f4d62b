/// Entity models for Gello
///
/// Every entity is persisted by the hosted Postgres database; this module only
/// describes their shapes, the inputs used to create or change them, and the
/// small amount of pure logic that belongs to them.
///
/// # Models
///
/// - `user`: Profiles with role, team membership and running point total
/// - `team`: Teams that scope boards and users
/// - `board`: Kanban boards, one team each
/// - `list`: Ordered columns of a board
/// - `task`: Cards with story points, assignee and completion timestamp
/// - `points`: Append-only points ledger
///
/// # Example
///
/// ```
/// use gello_shared::models::user::UserRole;
///
/// let role = UserRole::parse("manager");
/// assert_eq!(role, UserRole::Manager);
/// ```

pub mod board;
pub mod list;
pub mod points;
pub mod task;
pub mod team;
pub mod user;

/// Largest list or task position; appends past it stay at it
pub const MAX_POSITION: i32 = 1_000_000;

/// SQL for "one past the last position", capped at [`MAX_POSITION`]
pub(crate) fn next_position_sql(table: &str, scope: &str) -> String {
    format!(
        "(SELECT COALESCE(LEAST(MAX(position), {max} - 1) + 1, 0) FROM {table} WHERE {scope})",
        max = MAX_POSITION
    )
}
