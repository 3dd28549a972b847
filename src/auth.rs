//! Identity collaborator: bearer-token validation and the provider webhook
//! signature scheme (svix-style HMAC-SHA256 over `{id}.{timestamp}.{body}`).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::AuthClaims;

type HmacSha256 = Hmac<Sha256>;

pub fn create_jwt(subject: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0) as usize
        + 3600; // 1 hour

    let claims = AuthClaims {
        sub: subject.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<AuthClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<AuthClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(token_data.claims)
}

/// Compute the webhook signature for `{id}.{timestamp}.{payload}` with a
/// `whsec_`-prefixed, base64-encoded secret.
pub fn webhook_signature(secret: &str, msg_id: &str, timestamp: &str, payload: &str) -> String {
    let raw_secret = secret.strip_prefix("whsec_").unwrap_or(secret);
    let key = BASE64
        .decode(raw_secret)
        .unwrap_or_else(|_| raw_secret.as_bytes().to_vec());
    let mut mac = HmacSha256::new_from_slice(&key).expect("hmac accepts any key length");
    mac.update(format!("{msg_id}.{timestamp}.{payload}").as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify an identity-provider webhook request. The signature header holds
/// space-separated `v1,<base64>` entries; any matching entry accepts.
pub fn verify_webhook(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    signature_header: &str,
    payload: &str,
) -> bool {
    let expected = webhook_signature(secret, msg_id, timestamp, payload);
    signature_header
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .any(|(version, sig)| version == "v1" && sig == expected)
}
