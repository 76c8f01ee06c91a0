//! Database row types. These map directly to SQLite rows and stay
//! independent of the API models in contactbook-types.

use chrono::{DateTime, NaiveDateTime, Utc};
use contactbook_types::models::Contact;
use tracing::warn;

pub struct ContactRow {
    pub id: i64,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub created_at: String,
}

impl ContactRow {
    pub fn into_contact(self) -> Contact {
        let created_at = parse_timestamp(&self.created_at).unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on contact {}: {}", self.created_at, self.id, e);
            DateTime::default()
        });

        Contact {
            id: self.id,
            full_name: self.full_name,
            address: self.address,
            phone: self.phone,
            photo_url: self.photo_url,
            created_at,
        }
    }
}

/// Timestamps are written as RFC 3339. Rows touched by hand through the
/// sqlite shell may carry `datetime('now')` output instead, which has no
/// offset and is UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}
