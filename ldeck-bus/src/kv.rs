/// Key-value store seam for the event bus and cache client.
///
/// The backing store only needs simple commands: set-with-expiry, delete,
/// list push/trim/range, and expire. List semantics follow the usual
/// key-value store convention: pushes go to the head, so index 0 is the most
/// recent entry, and negative range indices count from the tail (-1 is the
/// last element).

use ldeck_core::Result;
use std::time::Duration;

pub trait KvStore: Send + Sync {
    /// Read a plain value. Returns None if the key is absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a plain value with a TTL.
    fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a key (value or list). Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Push a value onto the head of a list, creating it if absent.
    /// Returns the list length after the push.
    fn list_push(&self, key: &str, value: &str) -> Result<usize>;

    /// Trim a list to the inclusive index range `[start, stop]`.
    fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<()>;

    /// Read the inclusive index range `[start, stop]` of a list, head first.
    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;

    /// Set or refresh the TTL on an existing key.
    fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}
