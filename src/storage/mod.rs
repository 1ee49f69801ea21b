// Media host abstraction for thumbnail image assets

pub mod cloudinary;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};

use crate::error::AppResult;
use crate::models::Thumbnail;

/// Remote media host interface. Uploads return the stable reference that is
/// embedded in an item; deletes take the opaque handle back.
///
/// Neither operation retries; callers decide retry policy. Deleting a handle
/// the host no longer knows is success (the host's own semantics), but a
/// transport failure is never masked as success.
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload one image and return its `{url, public_id}` reference.
    async fn upload(&self, data: &[u8], content_type: &str) -> AppResult<Thumbnail>;

    /// Delete the asset behind `public_id`.
    async fn delete(&self, public_id: &str) -> AppResult<()>;
}
