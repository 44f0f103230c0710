//! BoxObjectStore -- object-safe dynamic dispatch wrapper for ObjectStore.

use std::future::Future;
use std::pin::Pin;

use gardenchat_types::attachment::ObjectRef;
use gardenchat_types::error::StorageError;

use super::object_store::ObjectStore;

/// Object-safe version of [`ObjectStore`] with boxed futures.
pub trait ObjectStoreDyn: Send + Sync {
    fn name(&self) -> &str;

    fn upload_boxed<'a>(
        &'a self,
        name: &'a str,
        media_type: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ObjectRef, StorageError>> + Send + 'a>>;
}

impl<T: ObjectStore> ObjectStoreDyn for T {
    fn name(&self) -> &str {
        ObjectStore::name(self)
    }

    fn upload_boxed<'a>(
        &'a self,
        name: &'a str,
        media_type: &'a str,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<ObjectRef, StorageError>> + Send + 'a>> {
        Box::pin(self.upload(name, media_type, data))
    }
}

/// Type-erased object store.
pub struct BoxObjectStore {
    inner: Box<dyn ObjectStoreDyn + Send + Sync>,
}

impl BoxObjectStore {
    pub fn new<T: ObjectStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn upload(
        &self,
        name: &str,
        media_type: &str,
        data: &[u8],
    ) -> Result<ObjectRef, StorageError> {
        self.inner.upload_boxed(name, media_type, data).await
    }
}
