//! Hotspot Store: the working set of hotspots for one project during an
//! editing session.
//!
//! The in-memory list is the source of truth until an explicit save, which
//! replaces the persisted set wholesale. Selection is single-valued and
//! nullable; "adding" is a single mode flag, so one activation places one
//! hotspot. Mutations apply in call order; nothing here touches storage
//! except `load` and `save`.

use chrono::Utc;

use crate::models::{generate_hotspot_id, Hotspot, Position};
use crate::storage::{Storage, StorageError};

pub struct EditorSession {
    project_id: String,
    hotspots: Vec<Hotspot>,
    selected: Option<String>,
    adding: bool,
}

impl EditorSession {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            hotspots: Vec::new(),
            selected: None,
            adding: false,
        }
    }

    /// Load the persisted hotspot list for a project. A fetch failure opens
    /// an editable-but-empty session; the error is logged, not surfaced.
    pub fn load(storage: &Storage, project_id: &str, owner_id: &str) -> Self {
        let mut session = Self::new(project_id);
        match storage
            .get_project(project_id, owner_id)
            .and_then(|_| storage.hotspots_for(project_id))
        {
            Ok(hotspots) => session.hotspots = hotspots,
            Err(e) => {
                tracing::error!(project_id, error = %e, "failed to fetch hotspots");
            }
        }
        session
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_adding(&self) -> bool {
        self.adding
    }

    /// Arm placement mode; the next `add_hotspot` disarms it.
    pub fn begin_adding(&mut self) {
        self.adding = true;
    }

    pub fn cancel_adding(&mut self) {
        self.adding = false;
    }

    /// Place a new hotspot at `position` with an auto-numbered label
    /// (`Room <n+1>` for a current count of n) and no image.
    pub fn add_hotspot(&mut self, position: Position) -> &Hotspot {
        let now = Utc::now();
        let hotspot = Hotspot {
            id: generate_hotspot_id(),
            project_id: self.project_id.clone(),
            x: position.x,
            y: position.y,
            label: format!("Room {}", self.hotspots.len() + 1),
            url: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.hotspots.push(hotspot);
        self.adding = false;
        self.hotspots.last().expect("just pushed")
    }

    /// Replace a hotspot's label; no-op when the id does not match.
    pub fn rename_hotspot(&mut self, id: &str, new_label: &str) {
        if let Some(spot) = self.hotspots.iter_mut().find(|s| s.id == id) {
            spot.label = new_label.to_string();
            spot.updated_at = Utc::now();
        }
    }

    /// Remove a hotspot, clearing the selection if it pointed at it.
    /// Deleting an absent id is a no-op.
    pub fn delete_hotspot(&mut self, id: &str) {
        self.hotspots.retain(|s| s.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
    }

    /// Toggle selection: selecting the already-selected hotspot deselects.
    pub fn select_hotspot(&mut self, id: &str) {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        } else {
            self.selected = Some(id.to_string());
        }
    }

    /// Set or clear the attached panorama image. `None` is explicit removal;
    /// the persisted shape stores both "never attached" and "removed" as an
    /// empty reference.
    pub fn attach_image(&mut self, id: &str, image_ref: Option<&str>) {
        if let Some(spot) = self.hotspots.iter_mut().find(|s| s.id == id) {
            spot.url = image_ref.unwrap_or("").to_string();
            spot.updated_at = Utc::now();
        }
    }

    /// Persist the full in-memory list as a transactional replace. On
    /// failure the in-memory list is untouched; the caller surfaces the
    /// error as a notification. Returns the new project version.
    pub fn save(
        &self,
        storage: &Storage,
        owner_id: &str,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        storage.replace_hotspots(&self.project_id, owner_id, expected_version, &self.hotspots)
    }
}
