//! Sled-backed persistence for projects, hotspots, and mirrored users.
//!
//! Trees:
//! - `projects`: project id -> Project JSON
//! - `hotspots`: `{project_id}/{hotspot_id}` -> Hotspot JSON (prefix scans
//!   give a project's full set)
//! - `users`: identity-provider subject -> User JSON
//!
//! Ownership checks happen here: a missing project and a project owned by
//! someone else both surface as `NotFound` so callers cannot tell them
//! apart. The hotspot set is only ever mutated by a full transactional
//! replace, never by incremental upsert.

use chrono::Utc;
use sled::transaction::TransactionError;
use sled::{Db, Transactional};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Hotspot, Project, User};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found")]
    NotFound,

    #[error("version conflict")]
    Conflict,
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Clone)]
pub struct Storage {
    _db: Db,
    project_tree: sled::Tree,
    hotspot_tree: sled::Tree,
    user_tree: sled::Tree,
    // Serializes replace/delete so the version check, the old-key snapshot,
    // and the commit act on the same state. Sled's transactional trees
    // cannot prefix-scan, so the snapshot has to happen outside the
    // transaction.
    write_lock: Arc<Mutex<()>>,
}

/// Fields required to create a project; name and floor plan are mandatory.
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub floor_map_url: String,
    pub top_view_url: Option<String>,
}

impl Storage {
    /// Open or create the sled database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)?;
        let project_tree = db.open_tree("projects")?;
        let hotspot_tree = db.open_tree("hotspots")?;
        let user_tree = db.open_tree("users")?;
        Ok(Self {
            _db: db,
            project_tree,
            hotspot_tree,
            user_tree,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn create_project(&self, owner_id: &str, new: NewProject) -> Result<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: new.name,
            description: new.description,
            floor_map_url: new.floor_map_url,
            top_view_url: new.top_view_url,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.project_tree
            .insert(project.id.as_bytes(), serde_json::to_vec(&project)?)?;
        Ok(project)
    }

    /// Fetch a project by id, scoped to its owner. Absent and not-owned are
    /// indistinguishable by design.
    pub fn get_project(&self, id: &str, owner_id: &str) -> Result<Project> {
        let bytes = self
            .project_tree
            .get(id.as_bytes())?
            .ok_or(StorageError::NotFound)?;
        let project: Project = serde_json::from_slice(&bytes)?;
        if project.owner_id != owner_id {
            return Err(StorageError::NotFound);
        }
        Ok(project)
    }

    /// Fetch a project without an ownership check; tour playback is public.
    pub fn get_project_public(&self, id: &str) -> Result<Project> {
        let bytes = self
            .project_tree
            .get(id.as_bytes())?
            .ok_or(StorageError::NotFound)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All projects for an owner, newest first.
    pub fn list_projects(&self, owner_id: &str) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        for item in self.project_tree.iter() {
            let (_, value) = item?;
            let project: Project = serde_json::from_slice(&value)?;
            if project.owner_id == owner_id {
                projects.push(project);
            }
        }
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    /// Delete a project and cascade its hotspots.
    pub fn delete_project(&self, id: &str, owner_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let project = self.get_project(id, owner_id)?;
        for key in self.hotspot_keys(&project.id)? {
            self.hotspot_tree.remove(key)?;
        }
        self.project_tree.remove(project.id.as_bytes())?;
        Ok(())
    }

    /// All hotspots of a project, in placement order.
    pub fn hotspots_for(&self, project_id: &str) -> Result<Vec<Hotspot>> {
        let prefix = format!("{project_id}/");
        let mut hotspots = Vec::new();
        for item in self.hotspot_tree.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            hotspots.push(serde_json::from_slice::<Hotspot>(&value)?);
        }
        hotspots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(hotspots)
    }

    /// Replace the full hotspot set of a project: transactional delete-all
    /// plus insert-all, scoped to the authenticated owner.
    ///
    /// When `expected_version` is supplied and does not match the stored
    /// project version the save is rejected with `Conflict`; omitting it
    /// keeps the historical last-save-wins behavior. Concurrent replaces
    /// are serialized, so exactly one save carrying a given token can
    /// commit. Returns the new project version.
    pub fn replace_hotspots(
        &self,
        project_id: &str,
        owner_id: &str,
        expected_version: Option<u64>,
        hotspots: &[Hotspot],
    ) -> Result<u64> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut project = self.get_project(project_id, owner_id)?;
        if let Some(expected) = expected_version {
            if expected != project.version {
                return Err(StorageError::Conflict);
            }
        }

        let now = Utc::now();
        project.version += 1;
        project.updated_at = now;

        let old_keys = self.hotspot_keys(project_id)?;
        let mut new_entries = Vec::with_capacity(hotspots.len());
        for spot in hotspots {
            let mut spot = spot.clone();
            spot.project_id = project_id.to_string();
            spot.updated_at = now;
            let key = format!("{project_id}/{}", spot.id).into_bytes();
            new_entries.push((key, serde_json::to_vec(&spot)?));
        }
        let project_bytes = serde_json::to_vec(&project)?;

        (&self.hotspot_tree, &self.project_tree)
            .transaction(|(hotspot_tx, project_tx)| {
                for key in &old_keys {
                    hotspot_tx.remove(key.as_slice())?;
                }
                for (key, bytes) in &new_entries {
                    hotspot_tx.insert(key.as_slice(), bytes.as_slice())?;
                }
                project_tx.insert(project_id.as_bytes(), project_bytes.as_slice())?;
                Ok(())
            })
            .map_err(|e: TransactionError<()>| match e {
                TransactionError::Storage(e) => StorageError::Sled(e),
                TransactionError::Abort(()) => StorageError::Conflict,
            })?;

        Ok(project.version)
    }

    fn hotspot_keys(&self, project_id: &str) -> Result<Vec<Vec<u8>>> {
        let prefix = format!("{project_id}/");
        let mut keys = Vec::new();
        for item in self.hotspot_tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    // --- User mirror for the identity-provider webhook ---

    pub fn upsert_user(&self, user: User) -> Result<()> {
        self.user_tree
            .insert(user.id.as_bytes(), serde_json::to_vec(&user)?)?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        match self.user_tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.user_tree.remove(id.as_bytes())?;
        Ok(())
    }
}
