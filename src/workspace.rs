//! Project-list state container for a signed-in user.
//!
//! An explicit container with an initialize/reset lifecycle rather than a
//! process-wide singleton: callers own an instance and pass it by reference.

use crate::models::Project;
use crate::storage::Storage;

#[derive(Default)]
pub struct Workspace {
    projects: Vec<Project>,
    current: Option<Project>,
    loading: bool,
    error: Option<String>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate from storage. A fetch failure leaves an empty list and
    /// records the error for the UI.
    pub fn initialize(&mut self, storage: &Storage, owner_id: &str) {
        self.loading = true;
        match storage.list_projects(owner_id) {
            Ok(projects) => {
                self.projects = projects;
                self.error = None;
            }
            Err(e) => {
                tracing::error!(owner_id, error = %e, "failed to fetch projects");
                self.projects.clear();
                self.error = Some(e.to_string());
            }
        }
        self.loading = false;
    }

    /// Drop all cached state, e.g. on sign-out.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn current(&self) -> Option<&Project> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_current(&mut self, project: Option<Project>) {
        self.current = project;
    }

    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    pub fn add_project(&mut self, project: Project) {
        self.projects.push(project);
    }

    pub fn remove_project(&mut self, id: &str) {
        self.projects.retain(|p| p.id != id);
        if self.current.as_ref().is_some_and(|p| p.id == id) {
            self.current = None;
        }
    }

    pub fn update_project(&mut self, id: &str, update: impl FnOnce(&mut Project)) {
        if let Some(project) = self.projects.iter_mut().find(|p| p.id == id) {
            update(project);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewProject;
    use std::fs;

    #[test]
    fn initialize_and_reset_lifecycle() {
        let dir = std::env::temp_dir().join("pano_test_workspace");
        let _ = fs::remove_dir_all(&dir);
        let storage = Storage::open(dir.to_str().unwrap()).unwrap();
        storage
            .create_project(
                "user_a",
                NewProject {
                    name: "Office".into(),
                    description: None,
                    floor_map_url: "https://pub.r2.dev/u/plan.png".into(),
                    top_view_url: None,
                },
            )
            .unwrap();

        let mut workspace = Workspace::new();
        workspace.initialize(&storage, "user_a");
        assert_eq!(workspace.projects().len(), 1);
        assert!(workspace.error().is_none());

        workspace.reset();
        assert!(workspace.projects().is_empty());
        assert!(workspace.current().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn removing_the_current_project_clears_it() {
        let dir = std::env::temp_dir().join("pano_test_workspace_rm");
        let _ = fs::remove_dir_all(&dir);
        let storage = Storage::open(dir.to_str().unwrap()).unwrap();
        let project = storage
            .create_project(
                "user_a",
                NewProject {
                    name: "Office".into(),
                    description: None,
                    floor_map_url: "u".into(),
                    top_view_url: None,
                },
            )
            .unwrap();

        let mut workspace = Workspace::new();
        workspace.initialize(&storage, "user_a");
        workspace.set_current(Some(project.clone()));

        workspace.remove_project(&project.id);
        assert!(workspace.projects().is_empty());
        assert!(workspace.current().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn update_project_edits_in_place() {
        let mut workspace = Workspace::new();
        let project = Project {
            id: "p1".into(),
            owner_id: "user_a".into(),
            name: "Office".into(),
            description: None,
            floor_map_url: "u".into(),
            top_view_url: None,
            version: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        workspace.set_projects(vec![project]);

        workspace.update_project("p1", |p| p.name = "Office v2".into());
        assert_eq!(workspace.projects()[0].name, "Office v2");

        workspace.update_project("nope", |p| p.name = "Ghost".into());
        assert_eq!(workspace.projects()[0].name, "Office v2");
    }
}
