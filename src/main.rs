use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use log::{error, info};
use reqwest::Client;

use tagfeed_be::AppState;
use tagfeed_be::backend::SupabaseClient;
use tagfeed_be::config::AppConfig;
use tagfeed_be::handlers::auth_handlers::{logout, me, oauth_callback, oauth_start};
use tagfeed_be::handlers::engagement_handlers::{save_post, upvote_post};
use tagfeed_be::handlers::feed_handlers::{global_feed, personalized_feed};
use tagfeed_be::handlers::post_handlers::{create_post, upload_post_image};
use tagfeed_be::handlers::tag_handlers::{followed_tags, follow_tag, list_tags, unfollow_tag};

fn mask_key(k: &str) -> String {
    let count = k.chars().count();
    if count <= 8 {
        return "[REDACTED]".to_string();
    }
    let head: String = k.chars().take(4).collect();
    let tail: String = k.chars().skip(count - 4).collect();
    format!("{}***{}", head, tail)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Supabase URL: {}", config.supabase_url);
    info!("Supabase anon key: {}", mask_key(&config.supabase_anon_key));
    if config.jwt_secret.is_none() {
        info!("SUPABASE_JWT_SECRET not set; bearer tokens are decoded without signature check");
    }

    let http_client = match Client::builder()
        .user_agent("tagfeed-be/0.1")
        .build()
        .context("failed to build http client")
    {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    let supabase = SupabaseClient::new(http_client, &config.supabase_url, &config.supabase_anon_key);
    let bind_address = format!("0.0.0.0:{}", config.port);
    let allowed_origins = config.allowed_origins.clone();
    let state = web::Data::new(AppState::new(config, supabase));

    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["authorization", "content-type", "accept"])
            .supports_credentials()
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024))
            .service(
                web::scope("/auth")
                    .service(oauth_start) // GET /auth/oauth/start
                    .service(oauth_callback) // POST /auth/oauth/callback
                    .service(logout) // POST /auth/logout
                    .service(me), // GET /auth/me
            )
            .service(
                web::scope("/api")
                    .service(upload_post_image) // POST /api/posts/image
                    .service(create_post) // POST /api/posts
                    .service(upvote_post) // POST /api/posts/{id}/upvote
                    .service(save_post) // POST /api/posts/{id}/save
                    .service(global_feed) // GET /api/feed/global
                    .service(personalized_feed) // GET /api/feed/personalized
                    .service(followed_tags) // GET /api/tags/following
                    .service(list_tags) // GET /api/tags
                    .service(follow_tag) // POST /api/tags/{id}/follow
                    .service(unfollow_tag), // DELETE /api/tags/{id}/follow
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::mask_key;

    #[test]
    fn short_keys_are_fully_redacted() {
        assert_eq!(mask_key("abcd1234"), "[REDACTED]");
    }

    #[test]
    fn long_keys_keep_four_chars_each_side() {
        assert_eq!(mask_key("eyJhbGciOiJIUzI1NiJ9"), "eyJh***NiJ9");
    }

    #[test]
    fn multibyte_keys_do_not_split_characters() {
        assert_eq!(mask_key("ключ-анон-значение"), "ключ***ение");
    }
}
