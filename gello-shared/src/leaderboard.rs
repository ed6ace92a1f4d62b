/// Leaderboard ranking
///
/// Ranks are positional: the store hands users over already ordered by
/// `total_points DESC, created_at ASC, id ASC`, and the n-th user gets rank n.
/// Equal totals therefore get different ranks, the earlier registration
/// ranking higher, and ranks never skip a number.
///
/// # Example
///
/// ```
/// use gello_shared::leaderboard::rank_leaderboard;
///
/// let entries = rank_leaderboard(Vec::new());
/// assert!(entries.is_empty());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub total_points: i64,

    /// 1-based position
    pub rank: u32,
}

/// Assigns ranks to users in leaderboard order
pub fn rank_leaderboard(users: Vec<User>) -> Vec<LeaderboardEntry> {
    users
        .into_iter()
        .zip(1u32..)
        .map(|(user, rank)| LeaderboardEntry {
            user_id: user.id,
            display_name: user.display_name,
            email: user.email,
            avatar_url: user.avatar_url,
            total_points: user.total_points,
            rank,
        })
        .collect()
}
