pub mod repository;
pub mod schema;
pub mod store;

pub use repository::{write_atomic, MemoryRepository, TreeRepository, YamlFileRepository};
pub use schema::{
    ArrayObjects, Colors, Configuration, Defaults, Entry, Group, Hotkey, Link, Message,
    NestedObjects, Origin, ParamMap, Provenance, Proxy, FOOTER_DISABLED, FOUNDATION_SOURCE,
};
pub use store::ConfigStore;
