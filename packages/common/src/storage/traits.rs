use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::key::{Bucket, ObjectKey};

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressed object storage, partitioned into buckets.
///
/// Implementations do no authorization; callers apply the storage policy
/// before touching a key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `key`, replacing any previous object.
    async fn put(&self, bucket: Bucket, key: &ObjectKey, data: &[u8]) -> Result<u64, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(bucket, key, reader, u64::MAX).await
    }

    /// Store data from an async reader, failing once more than `max_size`
    /// bytes have been read. Returns the number of bytes written.
    async fn put_stream(
        &self,
        bucket: Bucket,
        key: &ObjectKey,
        reader: BoxReader,
        max_size: u64,
    ) -> Result<u64, StorageError>;

    /// Retrieve all bytes of an object.
    async fn get(&self, bucket: Bucket, key: &ObjectKey) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(bucket, key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, bucket: Bucket, key: &ObjectKey) -> Result<BoxReader, StorageError>;

    async fn exists(&self, bucket: Bucket, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, bucket: Bucket, key: &ObjectKey) -> Result<bool, StorageError>;

    /// Size of an object in bytes.
    async fn size(&self, bucket: Bucket, key: &ObjectKey) -> Result<u64, StorageError>;
}
