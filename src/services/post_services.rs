// src/services/post_services.rs - post submission with best-effort tag linking

use std::sync::{Arc, LazyLock};

use base64::{Engine as _, engine::general_purpose};
use log::{error, info, warn};
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::backend::Backend;
use crate::dtos::post_dtos::CreatePostDTO;
use crate::models::post::{NewPost, Post};
use crate::repositories::post_repository::PostRepository;
use crate::repositories::tag_repository::TagRepository;
use crate::services::tag_services::{TagService, normalize_tag_names};
use crate::services::{ServiceError, require_user};

static DATA_URL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(?P<mime>[\w.+-]+/[\w.+-]+);base64,").expect("static data url pattern")
});

/// What happened to the tags of a submitted post. Never turns a created post
/// into a failed submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TagLinkOutcome {
    NotRequested,
    Linked { tag_ids: Vec<Uuid> },
    /// Some names could not be created; the ones that existed are linked.
    Partial { tag_ids: Vec<Uuid>, error: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PostSubmission {
    pub post: Post,
    pub tag_link: TagLinkOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct PostService {
    backend: Arc<dyn Backend>,
    bucket: String,
}

impl PostService {
    pub fn new(backend: Arc<dyn Backend>, bucket: &str) -> Self {
        Self {
            backend,
            bucket: bucket.to_string(),
        }
    }

    /// Inserts the post, then links tags. The post insert strictly precedes
    /// tag work because the junction rows need its id.
    pub async fn create_post(
        &self,
        user_id: Option<Uuid>,
        dto: CreatePostDTO,
    ) -> Result<PostSubmission, ServiceError> {
        let user_id = require_user(user_id)?;
        let new_post = build_new_post(user_id, &dto)?;

        let post = PostRepository::new(self.backend.as_ref())
            .insert(&new_post)
            .await
            .map_err(|e| {
                error!("creating post for {} failed: {}", user_id, e);
                ServiceError::from(e)
            })?;
        info!("post {} created by {}", post.id, user_id);

        let names = normalize_tag_names(&dto.tags);
        let tag_link = if names.is_empty() {
            TagLinkOutcome::NotRequested
        } else {
            self.link_tags(post.id, &names).await
        };

        Ok(PostSubmission { post, tag_link })
    }

    async fn link_tags(&self, post_id: Uuid, names: &[String]) -> TagLinkOutcome {
        let resolution = match TagService::new(self.backend.clone()).resolve(names).await {
            Ok(r) => r,
            Err(e) => {
                warn!("looking up tags for post {} failed: {}", post_id, e);
                return TagLinkOutcome::Failed { error: e.message };
            }
        };

        let create_error = resolution.create_error.map(|e| e.message);
        if resolution.tag_ids.is_empty() {
            return TagLinkOutcome::Failed {
                error: create_error.unwrap_or_else(|| "no tags resolved".to_string()),
            };
        }

        match TagRepository::new(self.backend.as_ref())
            .link_post(post_id, &resolution.tag_ids)
            .await
        {
            Ok(_) => match create_error {
                Some(error) => TagLinkOutcome::Partial {
                    tag_ids: resolution.tag_ids,
                    error,
                },
                None => TagLinkOutcome::Linked {
                    tag_ids: resolution.tag_ids,
                },
            },
            Err(e) => {
                warn!("linking tags to post {} failed: {}", post_id, e);
                TagLinkOutcome::Failed { error: e.message }
            }
        }
    }

    /// Stores an image under `public/{user}/{millis}.{ext}` and returns its
    /// public URL, to be sent back as the post's `image_url`.
    pub async fn upload_image(
        &self,
        user_id: Option<Uuid>,
        image: ImagePayload,
    ) -> Result<String, ServiceError> {
        let user_id = require_user(user_id)?;
        let ext = image_extension(&image.content_type)?;
        if image.bytes.is_empty() {
            return Err(ServiceError::Validation("Image is empty.".to_string()));
        }

        let path = format!(
            "public/{}/{}.{}",
            user_id,
            chrono::Utc::now().timestamp_millis(),
            ext
        );
        let url = self
            .backend
            .upload_object(&self.bucket, &path, image.bytes, &image.content_type)
            .await
            .map_err(|e| {
                error!("uploading {} failed: {}", path, e);
                ServiceError::from(e)
            })?;
        info!("image uploaded to {}", url);
        Ok(url)
    }
}

/// Validates the payload before anything touches the network.
pub fn build_new_post(user_id: Uuid, dto: &CreatePostDTO) -> Result<NewPost, ServiceError> {
    let title = dto.title.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("Title is required.".to_string()));
    }

    let (lat, lng) = match (dto.lat, dto.lng) {
        (Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(ServiceError::Validation(
                    "Location is out of range.".to_string(),
                ));
            }
            (Some(lat), Some(lng))
        }
        (None, None) => (None, None),
        _ => {
            return Err(ServiceError::Validation(
                "Latitude and longitude must be given together.".to_string(),
            ));
        }
    };

    // Whitespace-only means absent; anything else is stored as written.
    let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

    Ok(NewPost {
        user_id,
        title: title.to_string(),
        description: non_blank(&dto.description),
        image_url: non_blank(&dto.image_url),
        lat,
        lng,
    })
}

fn image_extension(content_type: &str) -> Result<&'static str, ServiceError> {
    let invalid = || {
        ServiceError::Validation(
            "Invalid file type. Only JPEG, PNG, GIF, and WEBP are allowed.".to_string(),
        )
    };
    let parsed: mime::Mime = content_type.parse().map_err(|_| invalid())?;
    if parsed.type_() != mime::IMAGE {
        return Err(invalid());
    }
    match parsed.subtype().as_str() {
        "jpeg" | "jpg" => Ok("jpg"),
        "png" => Ok("png"),
        "gif" => Ok("gif"),
        "webp" => Ok("webp"),
        _ => Err(invalid()),
    }
}

/// Decodes a base64 image, with or without a `data:<mime>;base64,` prefix.
/// The prefix's mime wins over `declared_type`.
pub fn decode_image_payload(data: &str, declared_type: &str) -> Result<ImagePayload, ServiceError> {
    let data = data.trim();
    let (content_type, encoded) = match DATA_URL_PREFIX.captures(data) {
        Some(caps) => {
            let prefix_len = caps.get(0).map(|m| m.end()).unwrap_or(0);
            let mime = caps
                .name("mime")
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| declared_type.to_string());
            (mime, &data[prefix_len..])
        }
        None => (declared_type.trim().to_string(), data),
    };

    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| ServiceError::Validation("Invalid base64 image data".to_string()))?;
    Ok(ImagePayload {
        bytes,
        content_type,
    })
}
