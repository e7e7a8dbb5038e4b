pub mod http;
pub mod memory;

pub use http::{HttpIndex, HttpIndexProvider};
pub use memory::MemoryIndex;
