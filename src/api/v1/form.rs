use super::error::*;
use crate::domain_port::ImageUpload;
use bytes::Buf;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use warp::multipart::{FormData, Part};

/// Multipart field carrying an uploaded image.
pub const IMAGE_FIELD: &str = "image";

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// A fully buffered multipart form: text fields plus at most one image.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl MultipartForm {
    pub async fn read(mut form: FormData, max_file_size: u64) -> Result<Self, ApiFailure> {
        let mut parsed = MultipartForm::default();

        while let Some(part) = form
            .try_next()
            .await
            .map_err(|e| ApiFailure::validation(format!("Invalid multipart body: {e}")))?
        {
            let name = part.name().to_string();
            if name == IMAGE_FIELD {
                parsed.image = read_image(part, max_file_size).await?;
            } else {
                let data = read_part(part).await?;
                let text = String::from_utf8(data)
                    .map_err(|_| ApiFailure::validation(format!("Field {name} is not UTF-8")))?;
                parsed.fields.insert(name, text);
            }
        }

        Ok(parsed)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    /// Like `text`, but a missing field reads as empty.
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub fn take_image(&mut self) -> Option<ImageUpload> {
        self.image.take()
    }
}

async fn read_image(part: Part, max_file_size: u64) -> Result<Option<ImageUpload>, ApiFailure> {
    let file_name = part.filename().map(str::to_string);
    let content_type = part.content_type().map(str::to_string);
    let data = read_part(part).await?;

    // browsers send an empty part when no file was picked
    if data.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
        return Ok(None);
    }
    let content_type = content_type
        .filter(|ct| ALLOWED_IMAGE_TYPES.contains(&ct.as_str()))
        .ok_or_else(|| ApiFailure::validation("Invalid file type"))?;
    if data.len() as u64 > max_file_size {
        return Err(ApiFailure::new(
            ApiErrorCode::PayloadTooLarge,
            "File too large",
        ));
    }

    Ok(Some(ImageUpload {
        file_name,
        content_type,
        data,
    }))
}

async fn read_part(part: Part) -> Result<Vec<u8>, ApiFailure> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, buf| async move {
            acc.extend_from_slice(buf.chunk());
            Ok::<_, warp::Error>(acc)
        })
        .await
        .map_err(|e| ApiFailure::validation(format!("Invalid multipart body: {e}")))
}
