/// In-memory `ListStore` with one lock per row.
///
/// Each list occupies its own row guarded by its own mutex, so mutations on
/// different lists never contend. Lock acquisition uses a bounded wait
/// (`try_lock_for`); a timeout surfaces as `Conflict`, mirroring a
/// relational store's lock-wait timeout under read-committed isolation.

use crate::ListStore;
use chrono::Utc;
use ldeck_core::config::StoreConfig;
use ldeck_core::{Error, LinkList, Result, UrlItem};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct MemoryListStore {
    rows: RwLock<HashMap<String, Arc<Mutex<LinkList>>>>,
    config: StoreConfig,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn row(&self, list_id: &str) -> Result<Arc<Mutex<LinkList>>> {
        self.rows
            .read()
            .get(list_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("list {}", list_id)))
    }
}

impl Default for MemoryListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListStore for MemoryListStore {
    fn get(&self, list_id: &str) -> Result<LinkList> {
        let row = self.row(list_id)?;
        let list = row.lock().clone();
        Ok(list)
    }

    fn create(&self, list: LinkList) -> Result<()> {
        let mut rows = self.rows.write();
        if rows.contains_key(&list.id) {
            return Err(Error::InvalidArgument(format!(
                "list {} already exists",
                list.id
            )));
        }
        debug!(list_id = %list.id, slug = %list.slug, "created list");
        rows.insert(list.id.clone(), Arc::new(Mutex::new(list)));
        Ok(())
    }

    fn delete(&self, list_id: &str) -> Result<()> {
        self.rows
            .write()
            .remove(list_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("list {}", list_id)))
    }

    fn update_locked(
        &self,
        list_id: &str,
        mutate: &mut dyn FnMut(&mut LinkList) -> Result<()>,
    ) -> Result<LinkList> {
        let row = self.row(list_id)?;
        let mut guard = row.try_lock_for(self.config.lock_wait).ok_or_else(|| {
            Error::Conflict(format!(
                "lock wait on list {} exceeded {:?}",
                list_id, self.config.lock_wait
            ))
        })?;

        // Mutate a working copy so a failed mutation leaves the row as read.
        let mut working = guard.clone();
        mutate(&mut working)?;
        working.updated_at = Utc::now();
        *guard = working.clone();
        Ok(working)
    }

    fn replace_urls(&self, list_id: &str, urls: Vec<UrlItem>) -> Result<LinkList> {
        let row = self.row(list_id)?;
        let mut guard = row.try_lock_for(self.config.lock_wait).ok_or_else(|| {
            Error::Conflict(format!(
                "write to list {} blocked longer than {:?}",
                list_id, self.config.lock_wait
            ))
        })?;
        guard.urls = urls;
        guard.updated_at = Utc::now();
        Ok(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldeck_core::UrlItem;
    use std::time::Duration;

    fn seeded_store() -> (MemoryListStore, String, String) {
        let store = MemoryListStore::new();
        let mut list = LinkList::new("reading", "user-1");
        let item = UrlItem::new("https://example.com", "Example");
        let item_id = item.id.clone();
        list.urls.push(item);
        let list_id = list.id.clone();
        store.create(list).unwrap();
        (store, list_id, item_id)
    }

    #[test]
    fn test_get_missing_list_is_not_found() {
        let store = MemoryListStore::new();
        assert!(matches!(store.get("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_create_duplicate_rejected() {
        let store = MemoryListStore::new();
        let list = LinkList::new("reading", "user-1");
        let dup = list.clone();
        store.create(list).unwrap();
        assert!(matches!(store.create(dup), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_update_locked_persists() {
        let (store, list_id, item_id) = seeded_store();
        let updated = store
            .update_locked(&list_id, &mut |list| {
                let pos = list.position_of(&item_id).unwrap();
                list.urls[pos].clicks += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.find_url(&item_id).unwrap().clicks, 1);
        assert_eq!(store.get(&list_id).unwrap().find_url(&item_id).unwrap().clicks, 1);
    }

    #[test]
    fn test_failed_mutation_rolls_back() {
        let (store, list_id, _) = seeded_store();
        let before = store.get(&list_id).unwrap();

        let result = store.update_locked(&list_id, &mut |list| {
            list.urls.clear();
            Err(Error::NotFound("item missing".into()))
        });

        assert!(result.is_err());
        let after = store.get(&list_id).unwrap();
        assert_eq!(after.urls.len(), before.urls.len());
    }

    #[test]
    fn test_lock_wait_timeout_is_conflict() {
        let config = StoreConfig::new().with_lock_wait(Duration::from_millis(50));
        let store = Arc::new(MemoryListStore::with_config(config));
        let list = LinkList::new("reading", "user-1");
        let list_id = list.id.clone();
        store.create(list).unwrap();

        let holder = store.clone();
        let held_id = list_id.clone();
        let handle = std::thread::spawn(move || {
            holder
                .update_locked(&held_id, &mut |_| {
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(())
                })
                .unwrap();
        });

        // Give the holder time to acquire the row lock
        std::thread::sleep(Duration::from_millis(50));
        let contender = store.update_locked(&list_id, &mut |_| Ok(()));
        assert!(matches!(contender, Err(Error::Conflict(_))));

        handle.join().unwrap();
    }

    #[test]
    fn test_different_lists_do_not_contend() {
        let config = StoreConfig::new().with_lock_wait(Duration::from_millis(50));
        let store = Arc::new(MemoryListStore::with_config(config));
        let a = LinkList::new("a", "user-1");
        let b = LinkList::new("b", "user-1");
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        store.create(a).unwrap();
        store.create(b).unwrap();

        let holder = store.clone();
        let held_id = a_id.clone();
        let handle = std::thread::spawn(move || {
            holder
                .update_locked(&held_id, &mut |_| {
                    std::thread::sleep(Duration::from_millis(200));
                    Ok(())
                })
                .unwrap();
        });

        std::thread::sleep(Duration::from_millis(50));
        // The other row's lock is free
        assert!(store.update_locked(&b_id, &mut |_| Ok(())).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_replace_urls_overwrites_collection() {
        let (store, list_id, _) = seeded_store();
        let fresh = vec![
            UrlItem::new("https://a.example", "A"),
            UrlItem::new("https://b.example", "B"),
        ];
        let updated = store.replace_urls(&list_id, fresh.clone()).unwrap();
        assert_eq!(updated.urls, fresh);
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let (store, list_id, _) = seeded_store();
        store.delete(&list_id).unwrap();
        assert!(matches!(store.get(&list_id), Err(Error::NotFound(_))));
    }
}
