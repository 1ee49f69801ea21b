use axum::extract::multipart::Multipart;
use bytes::Bytes;

use crate::error::{AppError, AppResult, FieldError};

/// One uploaded file part, captured verbatim from the request.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// The recognized fields of a create/update request. Fields the client did
/// not send stay `None`; unknown extra fields are dropped during parsing.
/// `quantity` is kept as raw text so the validator can complain about
/// non-integer input instead of the parser.
#[derive(Debug, Clone, Default)]
pub struct ItemPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<String>,
    pub image: Option<ImagePart>,
}

fn malformed_body() -> AppError {
    AppError::Validation(vec![FieldError::new("Malformed request body", "body")])
}

pub async fn from_multipart(mut multipart: Multipart) -> AppResult<ItemPayload> {
    let mut payload = ItemPayload::default();

    while let Some(field) = multipart.next_field().await.map_err(|_| malformed_body())? {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("name") => payload.name = Some(field.text().await.map_err(|_| malformed_body())?),
            Some("description") => {
                payload.description = Some(field.text().await.map_err(|_| malformed_body())?)
            }
            Some("quantity") => {
                payload.quantity = Some(field.text().await.map_err(|_| malformed_body())?)
            }
            Some("image") => {
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await.map_err(|_| malformed_body())?;
                payload.image = Some(ImagePart {
                    content_type,
                    bytes,
                });
            }
            _ => {
                // Unknown fields are ignored, not rejected.
                let _ = field.bytes().await;
            }
        }
    }

    Ok(payload)
}

/// JSON bodies carry the same text fields; `quantity` may arrive as a JSON
/// number or a string. An empty body is an empty payload (a no-op update).
pub fn from_json(body: &[u8]) -> AppResult<ItemPayload> {
    if body.is_empty() {
        return Ok(ItemPayload::default());
    }

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|_| malformed_body())?;
    let map = value.as_object().ok_or_else(malformed_body)?;

    let text_of = |v: &serde_json::Value| -> Option<String> {
        match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    let mut payload = ItemPayload::default();
    for (key, raw) in map {
        match key.as_str() {
            "name" => payload.name = text_of(raw),
            "description" => payload.description = text_of(raw),
            "quantity" => payload.quantity = text_of(raw),
            _ => {}
        }
    }
    Ok(payload)
}
