pub mod file_store;
pub mod memory_store;
pub mod trick_file;
pub mod upstream;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use trick_file::JsonTrickStore;
pub use upstream::{HttpTransport, RouterTransport};
