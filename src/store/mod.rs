mod memory_store;
mod sqlite_store;
mod store_errors;
mod store_traits;

pub use memory_store::MemoryKeyValueStore;
pub use sqlite_store::SqliteKeyValueStore;
pub use store_errors::StoreError;
pub use store_traits::KeyValueStore;
