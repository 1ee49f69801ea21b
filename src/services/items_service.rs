use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Item, ItemModel, Thumbnail};
use crate::storage::MediaStore;
use crate::web::payload::ItemPayload;
use crate::web::validate::{validate_create, validate_update};

const ITEM_COLUMNS: &str = "id::text, name, description, quantity, \
     thumbnail_url, thumbnail_public_id, created_at::text, updated_at::text";

/// Response body of a PATCH: which text fields were applied and whether the
/// image was replaced.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub msg: String,
    #[serde(rename = "bodyUpdates")]
    pub body_updates: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "fileUpdates")]
    pub file_updates: bool,
}

pub struct ItemsService {
    pool: PgPool,
    media: Arc<dyn MediaStore>,
}

impl ItemsService {
    pub fn new(pool: PgPool, media: Arc<dyn MediaStore>) -> Self {
        Self { pool, media }
    }

    /// Malformed ids cannot match any document, so they are reported the
    /// same way as an unknown id.
    fn parse_id(id: &str) -> AppResult<Uuid> {
        Uuid::parse_str(id).map_err(|_| AppError::NotFound("Item not found".to_string()))
    }

    fn parse_quantity(raw: &str) -> AppResult<i32> {
        raw.trim()
            .parse::<i32>()
            .map_err(|e| AppError::Internal(format!("validated quantity failed to parse: {}", e)))
    }

    async fn fetch(&self, id: Uuid) -> AppResult<ItemModel> {
        let sql = format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS);
        sqlx::query_as::<_, ItemModel>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    pub async fn create(&self, payload: ItemPayload) -> AppResult<Item> {
        let errors = validate_create(&payload);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        // Validation guarantees presence of every create field.
        let missing = || AppError::Internal("validated create payload incomplete".to_string());
        let name = payload.name.ok_or_else(missing)?;
        let description = payload.description.ok_or_else(missing)?;
        let quantity = Self::parse_quantity(&payload.quantity.ok_or_else(missing)?)?;
        let image = payload.image.ok_or_else(missing)?;
        let content_type = image.content_type.ok_or_else(missing)?;

        let thumbnail = self.media.upload(&image.bytes, &content_type).await?;

        let sql = format!(
            "INSERT INTO items (name, description, quantity, thumbnail_url, thumbnail_public_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ITEM_COLUMNS
        );
        let model: ItemModel = sqlx::query_as(&sql)
            .bind(&name)
            .bind(&description)
            .bind(quantity)
            .bind(&thumbnail.url)
            .bind(&thumbnail.public_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(model.into_item())
    }

    pub async fn get(&self, id: &str) -> AppResult<Item> {
        let id = Self::parse_id(id)?;
        Ok(self.fetch(id).await?.into_item())
    }

    pub async fn list(&self) -> AppResult<Vec<Item>> {
        let sql = format!("SELECT {} FROM items", ITEM_COLUMNS);
        let models: Vec<ItemModel> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(models.into_iter().map(ItemModel::into_item).collect())
    }

    /// Partial update: only supplied fields are validated and applied. An
    /// image replacement deletes the old remote asset, then uploads the new
    /// one, then commits the row; a failure in either remote step aborts the
    /// update and the row keeps its old reference.
    pub async fn update(&self, id: &str, payload: ItemPayload) -> AppResult<UpdateOutcome> {
        let id = Self::parse_id(id)?;

        let errors = validate_update(&payload);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let current = self.fetch(id).await?;

        let new_thumbnail: Option<Thumbnail> = match &payload.image {
            Some(image) => {
                if let Some(old_public_id) = &current.thumbnail_public_id {
                    self.media.delete(old_public_id).await?;
                }
                let content_type = image.content_type.as_deref().ok_or_else(|| {
                    AppError::Internal("validated image payload incomplete".to_string())
                })?;
                Some(self.media.upload(&image.bytes, content_type).await?)
            }
            None => None,
        };
        let file_updates = new_thumbnail.is_some();

        // Dynamic SET list over just the supplied fields.
        let mut sets: Vec<String> = Vec::new();
        let mut param_idx = 1u32;
        let mut body_updates = serde_json::Map::new();

        if let Some(name) = &payload.name {
            sets.push(format!("name = ${}", param_idx));
            param_idx += 1;
            body_updates.insert("name".to_string(), serde_json::Value::from(name.clone()));
        }
        if let Some(description) = &payload.description {
            sets.push(format!("description = ${}", param_idx));
            param_idx += 1;
            body_updates.insert(
                "description".to_string(),
                serde_json::Value::from(description.clone()),
            );
        }
        let quantity: Option<i32> = match &payload.quantity {
            Some(raw) => {
                let parsed = Self::parse_quantity(raw)?;
                sets.push(format!("quantity = ${}", param_idx));
                param_idx += 1;
                body_updates.insert("quantity".to_string(), serde_json::Value::from(parsed));
                Some(parsed)
            }
            None => None,
        };
        if new_thumbnail.is_some() {
            sets.push(format!("thumbnail_url = ${}", param_idx));
            param_idx += 1;
            sets.push(format!("thumbnail_public_id = ${}", param_idx));
            param_idx += 1;
        }

        if sets.is_empty() {
            // Nothing recognized in the payload: a no-op success.
            return Ok(UpdateOutcome {
                msg: "Updated document".to_string(),
                body_updates,
                file_updates,
            });
        }

        sets.push("updated_at = NOW()".to_string());
        let sql = format!(
            "UPDATE items SET {} WHERE id = ${}",
            sets.join(", "),
            param_idx
        );

        let mut query = sqlx::query(&sql);
        if let Some(name) = &payload.name {
            query = query.bind(name);
        }
        if let Some(description) = &payload.description {
            query = query.bind(description);
        }
        if let Some(quantity) = quantity {
            query = query.bind(quantity);
        }
        if let Some(thumbnail) = &new_thumbnail {
            query = query.bind(&thumbnail.url).bind(&thumbnail.public_id);
        }

        let rows_affected = query.bind(id).execute(&self.pool).await?.rows_affected();
        if rows_affected == 0 {
            // Lost a race against a concurrent delete; last writer wins.
            return Err(AppError::NotFound("Item not found".to_string()));
        }

        Ok(UpdateOutcome {
            msg: "Updated document".to_string(),
            body_updates,
            file_updates,
        })
    }

    /// The remote asset goes first; if the media host reports a real failure
    /// the row is kept so the reference is never silently lost.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let id = Self::parse_id(id)?;
        let current = self.fetch(id).await?;

        if let Some(public_id) = &current.thumbnail_public_id {
            self.media.delete(public_id).await?;
        }

        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
