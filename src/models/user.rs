use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

/// Shown until the user uploads something of their own.
pub const PLACEHOLDER_AVATAR: &str = "https://assets.stashdrive.dev/avatar-placeholder.png";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
    /// Identity of the login principal at the account service.
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}
