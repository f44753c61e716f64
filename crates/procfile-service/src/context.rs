//! Request context carrying the actor identity supplied by the auth
//! collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is acting, in which role, and from where.
///
/// Built by the API layer and passed into every service method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The acting user's ID.
    pub actor_id: Uuid,
    /// The acting user's role, compared against the approval mapping.
    pub role: String,
    /// IP address of the request origin.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a context without client metadata.
    pub fn new(actor_id: Uuid, role: impl Into<String>) -> Self {
        Self {
            actor_id,
            role: role.into(),
            ip_address: None,
            user_agent: None,
            request_time: Utc::now(),
        }
    }

    /// Attach client IP and device information.
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// Whether the actor holds `role` (case-insensitive).
    pub fn has_role(&self, role: &str) -> bool {
        self.role.trim().eq_ignore_ascii_case(role.trim())
    }
}
