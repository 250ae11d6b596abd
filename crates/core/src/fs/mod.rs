//! FileSystem abstraction for descriptor reads

mod mock;
mod real;
mod r#trait;

pub use mock::MockFileSystem;
pub use r#trait::{FileMetadata, FileSystem, FileType};
pub use real::RealFileSystem;
