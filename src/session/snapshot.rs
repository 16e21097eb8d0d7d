use chrono::{DateTime, Utc};
use serde::Serialize;

use super::coordinator::SessionState;
use crate::connection::ConnectionState;

/// Point-in-time view of the session, for status surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub connection: ConnectionState,
    pub started_at: DateTime<Utc>,
    /// Text of the reply currently streaming in, empty otherwise.
    pub reply_text: String,
}
