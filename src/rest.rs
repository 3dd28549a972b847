//! REST API layer (axum).
//!
//! JSON in, JSON out: every response carries a `success` boolean plus a
//! payload or an error message, with REST-conventional status codes (401
//! unauthenticated, 404 not found/not owned, 400 bad input, 409 stale save,
//! 500 unhandled). Project and upload routes sit behind the bearer-token
//! middleware; tour playback, the image proxy, and the provider webhooks
//! are public.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{validate_jwt, verify_webhook};
use crate::billing::{
    classify_event, verify_payment_signature, CheckoutClient, Interval, PaymentEvent, Plan,
};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{AuthClaims, Hotspot, User};
use crate::objects::{upload_key, validate_upload, ObjectError, ObjectStore};
use crate::storage::{NewProject, Storage};
use crate::tour::build_nodes;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub objects: Arc<dyn ObjectStore>,
    pub checkout: Arc<CheckoutClient>,
    pub config: Arc<Config>,
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;
    let claims =
        validate_jwt(token, &state.config.jwt_secret).map_err(|_| AppError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/project/get", get(list_projects_handler))
        .route("/api/project/get/:id", get(get_project_handler))
        .route("/api/project/:id/get", get(get_hotspots_handler))
        .route("/api/project/create", post(create_project_handler))
        .route("/api/project/:id/delete", delete(delete_project_handler))
        .route("/api/project/:id/save", post(save_hotspots_handler))
        // The framework's default body cap is far below panorama sizes;
        // lift it past the configured limit (plus multipart framing) so
        // validate_upload stays the authoritative size check.
        .route(
            "/api/upload",
            post(upload_handler)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes + 64 * 1024)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/tour/:id", get(tour_handler))
        .route("/api/image/*path", get(image_proxy_handler))
        .route("/api/create-checkout-session", post(checkout_handler))
        .route("/api/webhook/stripe", post(stripe_webhook_handler))
        .route("/api/webhook/clerk", post(clerk_webhook_handler))
        .merge(protected)
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "success": true, "message": "ok" }))
}

// --- Projects ---

async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Value>, AppError> {
    let projects = state.storage.list_projects(&claims.sub)?;
    Ok(Json(json!({
        "success": true,
        "projects": projects,
        "message": "Projects fetched successfully",
    })))
}

async fn get_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let project = state.storage.get_project(&id, &claims.sub)?;
    let hotspots = state.storage.hotspots_for(&project.id)?;
    Ok(Json(json!({
        "success": true,
        "project": project,
        "hotspots": hotspots,
        "message": "Project fetched successfully",
    })))
}

/// Hotspot list only; this is what the editor loads into its session.
async fn get_hotspots_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Hotspot>>, AppError> {
    let project = state.storage.get_project(&id, &claims.sub)?;
    Ok(Json(state.storage.hotspots_for(&project.id)?))
}

#[derive(Deserialize)]
struct CreateProjectRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    floor_map_url: Option<String>,
    #[serde(default)]
    top_view_url: Option<String>,
}

async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<Value>, AppError> {
    let name = payload.name.unwrap_or_default();
    let floor_map_url = payload.floor_map_url.unwrap_or_default();
    if name.is_empty() || floor_map_url.is_empty() {
        return Err(AppError::Validation("Please fill all the fields".into()));
    }

    let project = state.storage.create_project(
        &claims.sub,
        NewProject {
            name,
            description: payload.description,
            floor_map_url,
            top_view_url: payload.top_view_url,
        },
    )?;
    tracing::info!(project_id = %project.id, owner = %claims.sub, "project created");
    Ok(Json(json!({
        "success": true,
        "message": "Project created successfully",
        "project": project,
    })))
}

async fn delete_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.storage.delete_project(&id, &claims.sub)?;
    tracing::info!(project_id = %id, owner = %claims.sub, "project deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Project deleted successfully",
    })))
}

#[derive(Deserialize)]
struct HotspotInput {
    id: String,
    x: f64,
    y: f64,
    label: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SaveHotspotsRequest {
    hotspots: Vec<HotspotInput>,
    /// Optimistic token; omit for legacy last-save-wins behavior.
    #[serde(default)]
    version: Option<u64>,
}

async fn save_hotspots_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    Path(id): Path<String>,
    Json(payload): Json<SaveHotspotsRequest>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let hotspots: Vec<Hotspot> = payload
        .hotspots
        .into_iter()
        .map(|input| Hotspot {
            id: input.id,
            project_id: id.clone(),
            x: input.x,
            y: input.y,
            label: input.label,
            url: input.url,
            created_at: input.created_at.unwrap_or(now),
            updated_at: now,
        })
        .collect();

    let version = state
        .storage
        .replace_hotspots(&id, &claims.sub, payload.version, &hotspots)?;
    tracing::info!(project_id = %id, count = hotspots.len(), "hotspots saved");
    Ok(Json(json!({
        "success": true,
        "message": "Hotspots saved successfully",
        "version": version,
    })))
}

// --- Tour playback (public) ---

async fn tour_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let project = state.storage.get_project_public(&id)?;
    let hotspots = state.storage.hotspots_for(&project.id)?;
    let nodes = build_nodes(
        &hotspots,
        &state.config.public_url,
        &state.config.storage_domain,
    );
    Ok(Json(json!({
        "success": true,
        "project": project,
        "hotspots": hotspots,
        "nodes": nodes,
    })))
}

// --- Uploads and the image proxy ---

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AuthClaims>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;

        validate_upload(
            &file_name,
            &content_type,
            bytes.len(),
            state.config.max_upload_bytes,
        )
        .map_err(AppError::Validation)?;

        let key = upload_key(&claims.sub, &file_name);
        let url = state
            .objects
            .put(&key, bytes.to_vec())
            .await
            .map_err(|e| AppError::Upstream(format!("object store put failed: {e}")))?;
        tracing::info!(owner = %claims.sub, %key, "file uploaded");

        return Ok(Json(json!({
            "success": true,
            "url": url,
            "key": key,
            "message": "File uploaded successfully",
        })));
    }
    Err(AppError::Validation("No file provided".into()))
}

/// Same-origin rewrite onto the object store, so panorama sources built by
/// the tour graph resolve without touching the storage provider's domain.
async fn image_proxy_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (bytes, content_type) = state.objects.get(&path).await.map_err(|e| match e {
        ObjectError::NotFound | ObjectError::InvalidKey => AppError::NotFound,
        other => AppError::Internal(Box::new(other)),
    })?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

// --- Billing ---

#[derive(Deserialize)]
struct CheckoutRequest {
    plan: Plan,
    interval: Interval,
}

async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    let session_id = state
        .checkout
        .create_session(payload.plan, payload.interval)
        .await?;
    Ok(Json(json!({ "success": true, "session_id": session_id })))
}

async fn stripe_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("Missing Stripe signature".into()))?;

    if !verify_payment_signature(&state.config.stripe_webhook_secret, signature, &body) {
        return Err(AppError::Validation("Webhook error".into()));
    }

    match classify_event(&body)? {
        PaymentEvent::CheckoutCompleted => tracing::info!("payment checkout completed"),
        PaymentEvent::SubscriptionChanged => tracing::info!("subscription updated"),
        PaymentEvent::Ignored => tracing::debug!("ignored payment event"),
    }
    Ok(Json(json!({ "success": true, "received": true })))
}

// --- Identity webhook ---

#[derive(Deserialize)]
struct IdentityEvent {
    #[serde(rename = "type")]
    kind: String,
    data: IdentityUser,
}

#[derive(Deserialize)]
struct IdentityUser {
    id: String,
    #[serde(default)]
    email_addresses: Vec<IdentityEmail>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Deserialize)]
struct IdentityEmail {
    email_address: String,
}

async fn clerk_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Validation("Missing Svix headers".into()))
    };
    let msg_id = header_value("svix-id")?;
    let timestamp = header_value("svix-timestamp")?;
    let signature = header_value("svix-signature")?;

    if !verify_webhook(
        &state.config.clerk_webhook_secret,
        msg_id,
        timestamp,
        signature,
        &body,
    ) {
        return Err(AppError::Validation("Invalid webhook request".into()));
    }

    let event: IdentityEvent = serde_json::from_str(&body)
        .map_err(|_| AppError::Validation("Invalid webhook request".into()))?;

    match event.kind.as_str() {
        "user.created" | "user.updated" => {
            let name = format!(
                "{} {}",
                event.data.first_name.unwrap_or_default(),
                event.data.last_name.unwrap_or_default()
            )
            .trim()
            .to_string();
            let email = event
                .data
                .email_addresses
                .first()
                .map(|e| e.email_address.clone())
                .unwrap_or_default();
            state.storage.upsert_user(User {
                id: event.data.id.clone(),
                email,
                name,
            })?;
            tracing::info!(user_id = %event.data.id, "identity user upserted");
        }
        "user.deleted" => {
            state.storage.delete_user(&event.data.id)?;
            tracing::info!(user_id = %event.data.id, "identity user deleted");
        }
        other => tracing::warn!(kind = other, "unhandled identity event"),
    }

    Ok(Json(json!({
        "success": true,
        "message": "Webhook processed successfully",
    })))
}
