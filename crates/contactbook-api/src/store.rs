use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use contactbook_db::Database;
use contactbook_types::models::{Contact, ContactPatch, NewContact};

use crate::error::{ContactError, Result};

/// Hard ceiling on a single page of results.
pub const MAX_TAKE: i64 = 200;

/// A contact as it was before and after a partial update.
#[derive(Debug, Clone)]
pub struct Revision {
    pub previous: Contact,
    pub current: Contact,
}

/// Persistence capability behind [`ContactStore`]. Every mutating call
/// must be committed by the time it returns.
pub trait ContactRepository: Send + Sync {
    fn insert(&self, new: &NewContact, created_at: DateTime<Utc>) -> anyhow::Result<Contact>;
    fn find(&self, id: i64) -> anyhow::Result<Option<Contact>>;
    fn list(&self, skip: i64, take: i64) -> anyhow::Result<Vec<Contact>>;
    fn update(&self, id: i64, patch: &ContactPatch) -> anyhow::Result<Option<Revision>>;
    fn delete(&self, id: i64) -> anyhow::Result<Option<Contact>>;
}

impl ContactRepository for Database {
    fn insert(&self, new: &NewContact, created_at: DateTime<Utc>) -> anyhow::Result<Contact> {
        Ok(self.insert_contact(new, created_at)?.into_contact())
    }

    fn find(&self, id: i64) -> anyhow::Result<Option<Contact>> {
        Ok(self.get_contact(id)?.map(|row| row.into_contact()))
    }

    fn list(&self, skip: i64, take: i64) -> anyhow::Result<Vec<Contact>> {
        Ok(self
            .list_contacts(skip, take)?
            .into_iter()
            .map(|row| row.into_contact())
            .collect())
    }

    fn update(&self, id: i64, patch: &ContactPatch) -> anyhow::Result<Option<Revision>> {
        Ok(self
            .update_contact(id, patch)?
            .map(|(previous, current)| Revision {
                previous: previous.into_contact(),
                current: current.into_contact(),
            }))
    }

    fn delete(&self, id: i64) -> anyhow::Result<Option<Contact>> {
        Ok(self.delete_contact(id)?.map(|row| row.into_contact()))
    }
}

/// In-memory repository for tests and throwaway instances.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    contacts: BTreeMap<i64, Contact>,
    last_id: i64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory store lock poisoned: {}", e))
    }
}

impl ContactRepository for MemoryRepository {
    fn insert(&self, new: &NewContact, created_at: DateTime<Utc>) -> anyhow::Result<Contact> {
        let mut inner = self.lock()?;
        inner.last_id += 1;
        let contact = Contact {
            id: inner.last_id,
            full_name: new.full_name.clone(),
            address: new.address.clone(),
            phone: new.phone.clone(),
            photo_url: new.photo_url.clone(),
            created_at,
        };
        inner.contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }

    fn find(&self, id: i64) -> anyhow::Result<Option<Contact>> {
        Ok(self.lock()?.contacts.get(&id).cloned())
    }

    fn list(&self, skip: i64, take: i64) -> anyhow::Result<Vec<Contact>> {
        let inner = self.lock()?;
        let mut all: Vec<&Contact> = inner.contacts.values().collect();
        all.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));

        Ok(all
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(take.max(0) as usize)
            .cloned()
            .collect())
    }

    fn update(&self, id: i64, patch: &ContactPatch) -> anyhow::Result<Option<Revision>> {
        let mut inner = self.lock()?;
        let Some(stored) = inner.contacts.get_mut(&id) else {
            return Ok(None);
        };

        let previous = stored.clone();
        patch.apply_to(stored);
        Ok(Some(Revision {
            previous,
            current: stored.clone(),
        }))
    }

    fn delete(&self, id: i64) -> anyhow::Result<Option<Contact>> {
        Ok(self.lock()?.contacts.remove(&id))
    }
}

/// Validating front for a [`ContactRepository`]. Argument checks happen
/// here, before the repository is touched.
#[derive(Clone)]
pub struct ContactStore {
    repo: Arc<dyn ContactRepository>,
}

impl ContactStore {
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    /// Contacts ordered by name. `take` above [`MAX_TAKE`] is clamped.
    pub fn list(&self, skip: i64, take: i64) -> Result<Vec<Contact>> {
        if take <= 0 {
            return Err(ContactError::invalid("Take must be > 0"));
        }
        if skip < 0 {
            return Err(ContactError::invalid("Skip must be >= 0"));
        }

        let take = take.min(MAX_TAKE);
        Ok(self.repo.list(skip, take)?)
    }

    pub fn get(&self, id: i64) -> Result<Contact> {
        check_id(id)?;
        self.repo.find(id)?.ok_or(ContactError::NotFound(id))
    }

    pub fn create(&self, new: NewContact) -> Result<Contact> {
        let contact = self.repo.insert(&new, Utc::now())?;
        debug!("Inserted contact {}", contact.id);
        Ok(contact)
    }

    pub fn update(&self, id: i64, patch: &ContactPatch) -> Result<Revision> {
        check_id(id)?;
        self.repo.update(id, patch)?.ok_or(ContactError::NotFound(id))
    }

    /// Remove a contact permanently, returning the removed record.
    pub fn delete(&self, id: i64) -> Result<Contact> {
        check_id(id)?;
        self.repo.delete(id)?.ok_or(ContactError::NotFound(id))
    }
}

pub fn check_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(ContactError::invalid("Id must be > 0"));
    }
    Ok(())
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

    /// Fails the test if any call reaches the repository.
    struct UnreachableRepository;

    impl ContactRepository for UnreachableRepository {
        fn insert(&self, _: &NewContact, _: DateTime<Utc>) -> anyhow::Result<Contact> {
            panic!("repository touched")
        }
        fn find(&self, _: i64) -> anyhow::Result<Option<Contact>> {
            panic!("repository touched")
        }
        fn list(&self, _: i64, _: i64) -> anyhow::Result<Vec<Contact>> {
            panic!("repository touched")
        }
        fn update(&self, _: i64, _: &ContactPatch) -> anyhow::Result<Option<Revision>> {
            panic!("repository touched")
        }
        fn delete(&self, _: i64) -> anyhow::Result<Option<Contact>> {
            panic!("repository touched")
        }
    }

    fn stores() -> Vec<ContactStore> {
        vec![
            ContactStore::new(Arc::new(MemoryRepository::new())),
            ContactStore::new(Arc::new(Database::open_in_memory().unwrap())),
        ]
    }

    #[test]
    fn invalid_bounds_are_rejected_without_touching_storage() {
        let store = ContactStore::new(Arc::new(UnreachableRepository));

        for take in [0, -1, i64::MIN] {
            assert!(matches!(store.list(0, take), Err(ContactError::InvalidArgument(_))));
        }
        for skip in [-1, -50] {
            assert!(matches!(store.list(skip, 10), Err(ContactError::InvalidArgument(_))));
        }
        for id in [0, -1, i64::MIN] {
            assert!(matches!(store.get(id), Err(ContactError::InvalidArgument(_))));
            assert!(matches!(
                store.update(id, &ContactPatch::default()),
                Err(ContactError::InvalidArgument(_))
            ));
            assert!(matches!(store.delete(id), Err(ContactError::InvalidArgument(_))));
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        for store in stores() {
            let before = Utc::now();
            let created = store.create(new_contact("Jane Doe")).unwrap();
            assert!(created.id > 0);

            let fetched = store.get(created.id).unwrap();
            assert_eq!(fetched.full_name, "Jane Doe");
            assert_eq!(fetched.address, "1 Main St");
            assert_eq!(fetched.phone, "555-1000");
            assert_eq!(fetched.photo_url, None);
            assert!(fetched.created_at >= before);
        }
    }

    #[test]
    fn created_at_is_never_before_the_call() {
        for store in stores() {
            for _ in 0..200 {
                let before = Utc::now();
                let created = store.create(new_contact("Jane Doe")).unwrap();
                assert!(created.created_at >= before);
                assert_eq!(store.get(created.id).unwrap().created_at, created.created_at);
            }
        }
    }

    #[test]
    fn missing_ids_are_not_found() {
        for store in stores() {
            assert!(matches!(store.get(99), Err(ContactError::NotFound(99))));
            assert!(matches!(
                store.update(99, &ContactPatch::default()),
                Err(ContactError::NotFound(99))
            ));
            assert!(matches!(store.delete(99), Err(ContactError::NotFound(99))));
        }
    }

    #[test]
    fn partial_update_changes_only_supplied_fields() {
        for store in stores() {
            let mut new = new_contact("Jane Doe");
            new.photo_url = Some("/photos/jane.png".into());
            let created = store.create(new).unwrap();

            let patch = ContactPatch {
                full_name: Some("Janet Doe".into()),
                ..Default::default()
            };
            let revision = store.update(created.id, &patch).unwrap();
            assert_eq!(revision.previous.full_name, "Jane Doe");

            let fetched = store.get(created.id).unwrap();
            assert_eq!(fetched.full_name, "Janet Doe");
            assert_eq!(fetched.address, "1 Main St");
            assert_eq!(fetched.phone, "555-1000");
            assert_eq!(fetched.photo_url.as_deref(), Some("/photos/jane.png"));
            assert_eq!(fetched.created_at, created.created_at);
        }
    }

    #[test]
    fn list_is_sorted_by_name() {
        for store in stores() {
            for name in ["Bob", "Carol", "Alice"] {
                store.create(new_contact(name)).unwrap();
            }

            let names: Vec<String> = store
                .list(0, 2)
                .unwrap()
                .into_iter()
                .map(|c| c.full_name)
                .collect();
            assert_eq!(names, vec!["Alice", "Bob"]);
        }
    }

    #[test]
    fn take_is_clamped() {
        let store = ContactStore::new(Arc::new(MemoryRepository::new()));
        for i in 0..(MAX_TAKE + 5) {
            store.create(new_contact(&format!("Person {i:03}"))).unwrap();
        }

        assert_eq!(store.list(0, 10_000).unwrap().len(), MAX_TAKE as usize);
        assert_eq!(store.list(MAX_TAKE, 10_000).unwrap().len(), 5);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        for store in stores() {
            let created = store.create(new_contact("Jane Doe")).unwrap();
            let removed = store.delete(created.id).unwrap();
            assert_eq!(removed.id, created.id);
            assert!(matches!(store.get(created.id), Err(ContactError::NotFound(_))));

            let next = store.create(new_contact("John Doe")).unwrap();
            assert_ne!(next.id, created.id);
        }
    }
}
