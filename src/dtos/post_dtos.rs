use serde::{Deserialize, Serialize};

use crate::models::post::FeedPost;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostDTO {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>, // public URL from /api/posts/image
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Tag names; unknown names are created.
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadImageRequest {
    pub image_data: String, // base64, optionally with a data: URL prefix
    pub content_type: String, // "image/jpeg", "image/png", etc.
}

#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct FeedOut {
    pub posts: Vec<FeedPost>,
    pub total: usize,
}

impl From<Vec<FeedPost>> for FeedOut {
    fn from(posts: Vec<FeedPost>) -> Self {
        let total = posts.len();
        FeedOut { posts, total }
    }
}
