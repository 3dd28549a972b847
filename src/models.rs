use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One virtual-tour project: a floor plan plus its hotspots, owned by
/// exactly one user. `version` is bumped on every hotspot replace so a
/// stale concurrent save can be rejected instead of silently winning.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub floor_map_url: String,
    pub top_view_url: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user-placed marker on the floor plan. Position is a percentage of the
/// floor-plan image's rendered box (nominally 0-100, not clamped) and is
/// meaningless outside its project. `url` is the attached panorama image
/// reference; empty string means no image yet.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Hotspot {
    pub id: String,
    pub project_id: String,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalized 2D position on the floor plan.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Account record mirrored from the identity provider via its webhook.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// JWT claims carried by the Authorization bearer token.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthClaims {
    pub sub: String,
    pub exp: usize,
}

/// Client-generated hotspot identifier, derived from a nanosecond timestamp
/// so collisions within one session are negligible.
pub fn generate_hotspot_id() -> String {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros())
        .to_string()
}
