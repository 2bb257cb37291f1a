pub mod allocator;
pub mod catalog;
pub mod config;
pub mod core_api;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod reverse_index;
pub mod save_file;
pub mod store;
pub mod type_tag;

pub use allocator::{AllocationEntry, GuidAllocator};
pub use config::{CoreConfig, CounterScope};
pub use store::{ModdedSaveData, SaveStore, StoreScope, StoreValue};
pub use type_tag::TypeTag;
