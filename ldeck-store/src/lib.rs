/// List storage seam and the mutation coordinator.
///
/// The backing relational store is specified at its interface boundary: it
/// must offer per-row locking with a bounded wait, a read of a list's
/// serialized item collection, and two write paths — a locked
/// read-modify-write for counter mutations and an unlocked whole-collection
/// replace for sweep write-backs.

pub mod memory;
pub mod coordinator;

pub use coordinator::MutationCoordinator;
pub use memory::MemoryListStore;

use ldeck_core::{LinkList, Result, UrlItem};

pub trait ListStore: Send + Sync {
    /// Read a list by id. `NotFound` if absent.
    fn get(&self, list_id: &str) -> Result<LinkList>;

    /// Insert a new list. `InvalidArgument` if the id is already taken.
    fn create(&self, list: LinkList) -> Result<()>;

    /// Remove a list and all its items. `NotFound` if absent.
    fn delete(&self, list_id: &str) -> Result<()>;

    /// Run `mutate` against the list under its row lock and persist the
    /// result, returning the updated list.
    ///
    /// The lock wait is bounded; on timeout the call fails with `Conflict`
    /// and nothing is written. If `mutate` fails, the row is left exactly as
    /// it was read (transaction rollback semantics).
    fn update_locked(
        &self,
        list_id: &str,
        mutate: &mut dyn FnMut(&mut LinkList) -> Result<()>,
    ) -> Result<LinkList>;

    /// Replace the whole item collection in a single write, without holding
    /// the row lock across any read. Last-writer-wins by design; used by
    /// sweep write-backs whose effect is idempotent.
    fn replace_urls(&self, list_id: &str, urls: Vec<UrlItem>) -> Result<LinkList>;
}
