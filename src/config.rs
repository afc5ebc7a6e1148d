use std::env;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// HS256 secret of the project. Without it bearer tokens are decoded
    /// unverified; Supabase still checks them on every forwarded call.
    pub jwt_secret: Option<String>,
    pub oauth_provider: String,
    pub storage_bucket: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let supabase_url = env::var("SUPABASE_URL").context("SUPABASE_URL not set")?;
        let supabase_anon_key =
            env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY not set")?;
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());

        Ok(Self {
            supabase_url: supabase_url.trim().trim_end_matches('/').to_string(),
            supabase_anon_key: supabase_anon_key.trim().to_string(),
            jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            oauth_provider: env::var("OAUTH_PROVIDER").unwrap_or_else(|_| "google".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "posts".to_string()),
            port: port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {}", port))?,
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:8081,http://127.0.0.1:8081".into()),
            ),
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
