use serde::{Deserialize, Serialize};

/// Public profile columns of the `users` table that the feed joins in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Claims of a Supabase access token that the API relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// subject / user id
    pub sub: String,
    pub aud: Option<String>,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub role: Option<String>,
    pub email: Option<String>,
}
