//! Core types shared by every wadkeeper crate.
//!
//! Holds the library data model, the engine family tag, and the
//! [`MetadataStore`] collaborator trait that the launcher reads and writes
//! through. Nothing in here touches the filesystem.

pub mod error;
pub mod family;
pub mod memory;
pub mod store;
pub mod types;
pub mod util;

pub use error::StoreError;
pub use family::PortFamily;
pub use memory::MemoryStore;
pub use store::MetadataStore;
pub use types::{
    ConfigEntry, FileData, FileType, GameFile, IwadData, LaunchSettings, SourcePortData,
    StatRecord, Tag, TagMapping,
};
