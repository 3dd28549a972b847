//! Environment-driven configuration.
//!
//! Everything is read once at startup. Missing values fall back to local
//! development defaults with a warning; nothing here panics so the service
//! can always come up in a dev shell with no .env file.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for the sled database.
    pub data_dir: String,
    /// Root directory of the local object store.
    pub objects_dir: String,
    /// Origin this service is reachable at, used for proxied panorama URLs
    /// and checkout redirect URLs.
    pub public_url: String,
    /// Public domain of the object-storage provider; image references that
    /// contain it are rewritten onto the same-origin /api/image proxy.
    pub storage_domain: String,
    pub jwt_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub clerk_webhook_secret: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: load_or("PORT", "8080"),
            data_dir: load_or("DATA_DIR", "pano_studio_data"),
            objects_dir: load_or("OBJECTS_DIR", "pano_studio_objects"),
            public_url: load_or("PUBLIC_URL", "http://localhost:8080"),
            storage_domain: load_or("STORAGE_DOMAIN", "pub.r2.dev"),
            jwt_secret: load_or("JWT_SECRET", "dev_jwt_secret"),
            stripe_secret_key: load_or("STRIPE_SECRET_KEY", "sk_test_dev"),
            stripe_webhook_secret: load_or("STRIPE_WEBHOOK_SECRET", "whsec_dev"),
            clerk_webhook_secret: load_or("CLERK_WEBHOOK_SECRET", "whsec_dev"),
            max_upload_bytes: load_or("MAX_UPLOAD_BYTES", "20971520"),
        }
    }
}

fn load_or<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        warn!("{key} not set, using default: {default}");
        default.to_string()
    });
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("invalid {key} value ({e}), using default: {default}");
            default
                .parse()
                .unwrap_or_else(|e| panic!("bad builtin default for {key}: {e}"))
        }
    }
}
