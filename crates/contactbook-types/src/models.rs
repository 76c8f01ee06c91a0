use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored address-book entry, as returned over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a contact. `id` and `created_at` are
/// assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub photo_url: Option<String>,
}

/// Partial update: `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.photo_url.is_none()
    }

    /// Apply the patch to an existing record in place.
    pub fn apply_to(&self, contact: &mut Contact) {
        if let Some(full_name) = &self.full_name {
            contact.full_name = full_name.clone();
        }
        if let Some(address) = &self.address {
            contact.address = address.clone();
        }
        if let Some(phone) = &self.phone {
            contact.phone = phone.clone();
        }
        if let Some(photo_url) = &self.photo_url {
            contact.photo_url = Some(photo_url.clone());
        }
    }
}
