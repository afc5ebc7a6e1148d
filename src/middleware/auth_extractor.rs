// src/middleware/auth_extractor.rs - bearer token -> AuthenticatedUser
use actix_web::error::{ErrorInternalServerError, ErrorUnauthorized};
use actix_web::{Error, FromRequest, HttpRequest, dev::Payload, web};
use futures::future::{Ready, ready};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::debug;
use uuid::Uuid;

use crate::AppState;
use crate::models::user::JwtClaims;

const AUDIENCE: &str = "authenticated";

/// Caller identified by a Supabase access token. The token is kept so the
/// backend calls made for this request run under the caller's RLS policies.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<AuthenticatedUser, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(ErrorInternalServerError("app state missing")));
        };

        let auth_header = match req.headers().get("Authorization") {
            Some(header) => match header.to_str() {
                Ok(h) => h,
                Err(_) => return ready(Err(ErrorUnauthorized("Invalid header format"))),
            },
            None => return ready(Err(ErrorUnauthorized("Missing Authorization header"))),
        };

        let Some(token) = auth_header.strip_prefix("Bearer ").map(str::trim) else {
            return ready(Err(ErrorUnauthorized("Invalid auth header format")));
        };

        match verify_token(token, state.config.jwt_secret.as_deref()) {
            Ok(user) => ready(Ok(user)),
            Err(e) => {
                debug!("rejected bearer token: {}", e);
                ready(Err(ErrorUnauthorized("Invalid token")))
            }
        }
    }
}

/// Decodes the access token. With a secret the HS256 signature is checked;
/// without one only structure, audience and expiry are.
pub fn verify_token(token: &str, secret: Option<&str>) -> Result<AuthenticatedUser, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);

    let key = match secret {
        Some(s) => DecodingKey::from_secret(s.as_bytes()),
        None => {
            validation.insecure_disable_signature_validation();
            DecodingKey::from_secret(&[])
        }
    };

    let data = decode::<JwtClaims>(token, &key, &validation).map_err(|e| e.to_string())?;
    let user_id =
        Uuid::parse_str(&data.claims.sub).map_err(|e| format!("Invalid UUID in sub: {}", e))?;

    Ok(AuthenticatedUser {
        user_id,
        email: data.claims.email,
        access_token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(sub: &str, exp_offset: i64, secret: &str) -> String {
        let claims = JwtClaims {
            sub: sub.to_string(),
            aud: Some(AUDIENCE.to_string()),
            exp: Some((chrono::Utc::now().timestamp() + exp_offset) as u64),
            iat: None,
            role: Some("authenticated".to_string()),
            email: Some("ada@example.com".to_string()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_signature_yields_user() {
        let id = Uuid::new_v4();
        let t = token(&id.to_string(), 3600, "s3cret");

        let user = verify_token(&t, Some("s3cret")).unwrap();

        assert_eq!(user.user_id, id);
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.access_token, t);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let t = token(&Uuid::new_v4().to_string(), 3600, "s3cret");
        assert!(verify_token(&t, Some("other")).is_err());
    }

    #[test]
    fn without_secret_claims_are_still_read() {
        let id = Uuid::new_v4();
        let t = token(&id.to_string(), 3600, "whatever");
        assert_eq!(verify_token(&t, None).unwrap().user_id, id);
    }

    #[test]
    fn expired_token_is_rejected_even_without_secret() {
        let t = token(&Uuid::new_v4().to_string(), -3600, "whatever");
        assert!(verify_token(&t, None).is_err());
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let t = token("not-a-uuid", 3600, "s3cret");
        assert!(verify_token(&t, Some("s3cret")).is_err());
    }
}
