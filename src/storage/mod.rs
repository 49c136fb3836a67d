//! 存储层模块
//!
//! 提供记录存储（托管 REST 接口或进程内实现）和对象存储。

pub mod blob;
pub mod factory;
pub mod memory;
pub mod postgrest;
pub mod store;

pub use blob::{BlobStore, MemoryBlobStore, SupabaseBlobStore};
pub use factory::{StorageFactory, StorageInstance};
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use store::{Direction, Filter, Query, RecordStore, either_pair};
