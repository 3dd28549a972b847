//! pano_studio: virtual-tour studio backend.
//!
//! Projects, hotspots, and published tours over a sled store, exposed as a
//! JSON/HTTP API (axum). Uploaded panoramas live behind an object-store
//! abstraction and are served same-origin through an image proxy; identity
//! and payment providers integrate via signed webhooks.

pub mod auth;
pub mod billing;
pub mod config;
pub mod editor;
pub mod error;
pub mod models;
pub mod objects;
pub mod rest;
pub mod storage;
pub mod tour;
pub mod workspace;
