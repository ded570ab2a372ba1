mod error;
mod key;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use filesystem::FilesystemObjectStore;
pub use key::{Bucket, ObjectKey};
pub use traits::{BoxReader, ObjectStore};
