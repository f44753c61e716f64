//! Equipment entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An injection-molding machine. Maintained by the catalog collaborator;
/// this service only reads it and seeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    /// Unique equipment identifier.
    pub id: Uuid,
    /// Asset number.
    pub equipment_no: String,
    /// Machine number on the shop floor.
    pub machine_no: Option<String>,
    /// Display name.
    pub name: String,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}
