pub mod conformance;
mod error;
mod file;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{RecordContent, RecordId, RecordRef, Stage, StageRecord, VersionSnapshot};
pub use traits::RecordStore;
