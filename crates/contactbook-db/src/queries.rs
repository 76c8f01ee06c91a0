use crate::Database;
use crate::models::ContactRow;
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use contactbook_types::models::{ContactPatch, NewContact};
use rusqlite::{Connection, Row};

const CONTACT_COLUMNS: &str = "id, full_name, address, phone, photo_url, created_at";

impl Database {
    // -- Contacts --

    pub fn insert_contact(&self, new: &NewContact, created_at: DateTime<Utc>) -> Result<ContactRow> {
        let created_at = created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true);

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO contacts (full_name, address, phone, photo_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    &new.full_name,
                    &new.address,
                    &new.phone,
                    new.photo_url.as_deref(),
                    &created_at,
                ],
            )?;

            Ok(ContactRow {
                id: conn.last_insert_rowid(),
                full_name: new.full_name.clone(),
                address: new.address.clone(),
                phone: new.phone.clone(),
                photo_url: new.photo_url.clone(),
                created_at,
            })
        })
    }

    pub fn get_contact(&self, id: i64) -> Result<Option<ContactRow>> {
        self.with_conn(|conn| query_contact(conn, id))
    }

    /// Page through contacts ordered by name. Equal names keep insertion order.
    pub fn list_contacts(&self, skip: i64, take: i64) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 ORDER BY full_name ASC, id ASC
                 LIMIT ?1 OFFSET ?2"
            ))?;

            let rows = stmt
                .query_map(rusqlite::params![take, skip], map_contact)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Apply a partial update. Returns the row before and after the change,
    /// or `None` if no contact has this id.
    pub fn update_contact(
        &self,
        id: i64,
        patch: &ContactPatch,
    ) -> Result<Option<(ContactRow, ContactRow)>> {
        self.with_conn_mut(|conn| {
            let Some(previous) = query_contact(conn, id)? else {
                return Ok(None);
            };

            conn.execute(
                "UPDATE contacts SET
                    full_name = COALESCE(?2, full_name),
                    address   = COALESCE(?3, address),
                    phone     = COALESCE(?4, phone),
                    photo_url = COALESCE(?5, photo_url)
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.full_name.as_deref(),
                    patch.address.as_deref(),
                    patch.phone.as_deref(),
                    patch.photo_url.as_deref(),
                ],
            )?;

            let current = query_contact(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Contact {} vanished during update", id))?;

            Ok(Some((previous, current)))
        })
    }

    /// Delete a contact, returning the removed row.
    pub fn delete_contact(&self, id: i64) -> Result<Option<ContactRow>> {
        self.with_conn_mut(|conn| {
            let Some(existing) = query_contact(conn, id)? else {
                return Ok(None);
            };

            conn.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
            Ok(Some(existing))
        })
    }
}

fn query_contact(conn: &Connection, id: i64) -> Result<Option<ContactRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"
    ))?;

    let row = stmt.query_row([id], map_contact).optional()?;

    Ok(row)
}

fn map_contact(row: &Row<'_>) -> rusqlite::Result<ContactRow> {
    Ok(ContactRow {
        id: row.get(0)?,
        full_name: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        photo_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_contact(name: &str) -> NewContact {
        NewContact {
            full_name: name.to_string(),
            address: "1 Main St".to_string(),
            phone: "555-1000".to_string(),
            photo_url: None,
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let db = Database::open_in_memory().unwrap();
        let before = Utc::now();
        let row = db.insert_contact(&new_contact("Jane Doe"), Utc::now()).unwrap();
        assert!(row.id > 0);

        let fetched = db.get_contact(row.id).unwrap().unwrap().into_contact();
        assert_eq!(fetched.full_name, "Jane Doe");
        assert_eq!(fetched.address, "1 Main St");
        assert_eq!(fetched.phone, "555-1000");
        assert_eq!(fetched.photo_url, None);
        assert!(fetched.created_at >= before);
    }

    #[test]
    fn created_at_keeps_full_precision() {
        let db = Database::open_in_memory().unwrap();
        for _ in 0..200 {
            let before = Utc::now();
            let row = db.insert_contact(&new_contact("Jane Doe"), Utc::now()).unwrap();
            let id = row.id;
            let returned = row.into_contact().created_at;
            assert!(returned >= before, "{returned:?} earlier than {before:?}");

            let stored = db.get_contact(id).unwrap().unwrap().into_contact();
            assert_eq!(stored.created_at, returned);
        }
    }

    #[test]
    fn list_orders_by_name_and_pages() {
        let db = Database::open_in_memory().unwrap();
        for name in ["Carol", "Alice", "Bob"] {
            db.insert_contact(&new_contact(name), Utc::now()).unwrap();
        }

        let names: Vec<String> = db
            .list_contacts(0, 2)
            .unwrap()
            .into_iter()
            .map(|r| r.full_name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);

        let rest: Vec<String> = db
            .list_contacts(2, 10)
            .unwrap()
            .into_iter()
            .map(|r| r.full_name)
            .collect();
        assert_eq!(rest, vec!["Carol"]);
    }

    #[test]
    fn update_coalesces_missing_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut new = new_contact("Jane Doe");
        new.photo_url = Some("/photos/old.png".into());
        let row = db.insert_contact(&new, Utc::now()).unwrap();

        let patch = ContactPatch {
            full_name: Some("Janet Doe".into()),
            ..Default::default()
        };
        let (previous, current) = db.update_contact(row.id, &patch).unwrap().unwrap();

        assert_eq!(previous.full_name, "Jane Doe");
        assert_eq!(current.full_name, "Janet Doe");
        assert_eq!(current.address, "1 Main St");
        assert_eq!(current.phone, "555-1000");
        assert_eq!(current.photo_url.as_deref(), Some("/photos/old.png"));
        assert_eq!(current.created_at, previous.created_at);
    }

    #[test]
    fn update_and_delete_missing_return_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.update_contact(42, &ContactPatch::default()).unwrap().is_none());
        assert!(db.delete_contact(42).unwrap().is_none());
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let db = Database::open_in_memory().unwrap();
        let first = db.insert_contact(&new_contact("Alice"), Utc::now()).unwrap();
        let removed = db.delete_contact(first.id).unwrap().unwrap();
        assert_eq!(removed.id, first.id);
        assert!(db.get_contact(first.id).unwrap().is_none());

        let second = db.insert_contact(&new_contact("Bob"), Utc::now()).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn failed_update_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let row = db.insert_contact(&new_contact("Jane Doe"), Utc::now()).unwrap();

        // Violates the length CHECK, so the whole transaction is discarded.
        let patch = ContactPatch {
            full_name: Some(String::new()),
            ..Default::default()
        };
        assert!(db.update_contact(row.id, &patch).is_err());

        let still = db.get_contact(row.id).unwrap().unwrap();
        assert_eq!(still.full_name, "Jane Doe");
    }
}
