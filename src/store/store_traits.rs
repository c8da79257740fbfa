use super::store_errors::StoreError;

/// Narrow contract over the persistent key-value collaborator.
///
/// The engine only ever needs point reads/writes plus a prefix scan; callers
/// filter scanned keys further (e.g. by currency suffix) before deleting.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Deletes every listed key inside one write scope.
    fn delete_many(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Returns all keys starting with `prefix`, in unspecified order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
