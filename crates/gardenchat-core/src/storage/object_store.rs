//! Object store trait.

use gardenchat_types::attachment::ObjectRef;
use gardenchat_types::error::StorageError;

/// Trait for blob storage that returns a URI a model provider can read.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs (e.g. "gcs").
    fn name(&self) -> &str;

    /// Upload `data` under `name` and return a reference to the stored object.
    ///
    /// Uploading the same name twice overwrites the object.
    fn upload(
        &self,
        name: &str,
        media_type: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<ObjectRef, StorageError>> + Send;
}
