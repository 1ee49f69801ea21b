use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Remote image reference: `url` dereferences the stored image,
/// `public_id` is the handle used to delete or replace it at the media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub public_id: String,
}

/// Flat row shape as persisted. The thumbnail pair is either fully
/// populated or fully null (enforced by a table CHECK).
#[derive(Debug, Clone, FromRow)]
pub struct ItemModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub quantity: i32,
    pub thumbnail_url: Option<String>,
    pub thumbnail_public_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// API shape of an item, with the thumbnail columns folded back into a
/// nested object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    pub quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    pub created_at: String,
    pub updated_at: String,
}

impl ItemModel {
    pub fn into_item(self) -> Item {
        let thumbnail = match (self.thumbnail_url, self.thumbnail_public_id) {
            (Some(url), Some(public_id)) => Some(Thumbnail { url, public_id }),
            _ => None,
        };
        Item {
            id: self.id,
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            thumbnail,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
