//! Content locations and recently opened files

use crate::{DomainService, SettingsScope};
use serde::Serialize;
use shell_settings::{SettingsError, SettingsService};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const RECENT_LIMIT_RANGE: RangeInclusive<u32> = 1..=50;
const DEFAULT_RECENT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSettings {
    pub root: Option<PathBuf>,
    pub last_scene: Option<PathBuf>,
    pub auto_load_last_scene: bool,
    pub recent_limit: u32,
    pub recent_files: Vec<PathBuf>,
}

pub struct ContentSettingsService {
    scope: SettingsScope,
}

impl ContentSettingsService {
    pub const PREFIX: &'static str = "content";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
        }
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.path("root")
    }

    pub fn set_root(&self, root: Option<&Path>) -> Result<bool, SettingsError> {
        self.set_path("root", root)
    }

    pub fn last_scene(&self) -> Option<PathBuf> {
        self.path("last_scene")
    }

    /// Record the scene that was just opened; it also joins the recent list.
    pub fn set_last_scene(&self, scene: Option<&Path>) -> Result<bool, SettingsError> {
        let mut changed = self.set_path("last_scene", scene)?;
        if let Some(scene) = scene {
            changed |= self.add_recent(scene)?;
        }
        Ok(changed)
    }

    pub fn auto_load_last_scene(&self) -> bool {
        self.scope.bool_or("auto_load_last_scene", false)
    }

    pub fn set_auto_load_last_scene(&self, enabled: bool) -> Result<bool, SettingsError> {
        self.scope.set_bool("auto_load_last_scene", enabled)
    }

    /// Scene to open on startup, if auto-loading is on.
    pub fn startup_scene(&self) -> Option<PathBuf> {
        if self.auto_load_last_scene() {
            self.last_scene()
        } else {
            None
        }
    }

    pub fn recent_limit(&self) -> u32 {
        self.scope
            .get_or("recent_limit", DEFAULT_RECENT_LIMIT)
            .clamp(*RECENT_LIMIT_RANGE.start(), *RECENT_LIMIT_RANGE.end())
    }

    /// Shrinking the limit drops the oldest entries.
    pub fn set_recent_limit(&self, limit: u32) -> Result<bool, SettingsError> {
        let limit = limit.clamp(*RECENT_LIMIT_RANGE.start(), *RECENT_LIMIT_RANGE.end());
        let mut changed = self.scope.set("recent_limit", &limit)?;
        let mut recent = self.stored_recent();
        if recent.len() > limit as usize {
            recent.truncate(limit as usize);
            changed |= self.store_recent(&recent)?;
        }
        Ok(changed)
    }

    /// Most recent first, never longer than [`Self::recent_limit`].
    pub fn recent_files(&self) -> Vec<PathBuf> {
        let mut recent = self.stored_recent();
        recent.truncate(self.recent_limit() as usize);
        recent
    }

    /// Move `path` to the front of the list, trimming it to the limit.
    pub fn add_recent(&self, path: &Path) -> Result<bool, SettingsError> {
        let mut recent = self.recent_files();
        recent.retain(|existing| existing != path);
        recent.insert(0, path.to_path_buf());
        recent.truncate(self.recent_limit() as usize);
        self.store_recent(&recent)
    }

    pub fn remove_recent(&self, path: &Path) -> Result<bool, SettingsError> {
        let mut recent = self.recent_files();
        let before = recent.len();
        recent.retain(|existing| existing != path);
        if recent.len() == before {
            return Ok(false);
        }
        self.store_recent(&recent)
    }

    pub fn clear_recent(&self) -> Result<bool, SettingsError> {
        self.scope.remove("recent_files")
    }

    /// Resolve `path` against the content root when it is relative.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match self.root() {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn snapshot(&self) -> ContentSettings {
        ContentSettings {
            root: self.root(),
            last_scene: self.last_scene(),
            auto_load_last_scene: self.auto_load_last_scene(),
            recent_limit: self.recent_limit(),
            recent_files: self.recent_files(),
        }
    }

    fn stored_recent(&self) -> Vec<PathBuf> {
        self.scope
            .get::<Vec<String>>("recent_files")
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    fn store_recent(&self, recent: &[PathBuf]) -> Result<bool, SettingsError> {
        let entries: Vec<String> = recent
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        self.scope.set("recent_files", &entries)
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        self.scope
            .string(name)
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
    }

    fn set_path(&self, name: &str, path: Option<&Path>) -> Result<bool, SettingsError> {
        match path {
            Some(path) => self
                .scope
                .set_string(name, path.to_string_lossy().into_owned()),
            None => self.scope.remove(name),
        }
    }
}

impl DomainService for ContentSettingsService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ContentSettingsService {
        ContentSettingsService::new(Arc::new(SettingsService::new()))
    }

    fn paths(raw: &[&str]) -> Vec<PathBuf> {
        raw.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn recent_list_is_most_recent_first() {
        let content = service();
        content.add_recent(Path::new("a.scene")).unwrap();
        content.add_recent(Path::new("b.scene")).unwrap();
        content.add_recent(Path::new("a.scene")).unwrap();
        assert_eq!(content.recent_files(), paths(&["a.scene", "b.scene"]));

        // Re-adding the head is not a change
        assert!(!content.add_recent(Path::new("a.scene")).unwrap());
    }

    #[test]
    fn recent_list_is_capped() {
        let content = service();
        content.set_recent_limit(3).unwrap();
        for name in ["1", "2", "3", "4", "5"] {
            content.add_recent(Path::new(name)).unwrap();
        }
        assert_eq!(content.recent_files(), paths(&["5", "4", "3"]));

        content.set_recent_limit(2).unwrap();
        assert_eq!(content.recent_files(), paths(&["5", "4"]));

        content.set_recent_limit(0).unwrap();
        assert_eq!(content.recent_limit(), 1);
    }

    #[test]
    fn last_scene_joins_recent_files() {
        let content = service();
        content.set_last_scene(Some(Path::new("scenes/sponza.json"))).unwrap();
        assert_eq!(content.last_scene(), Some(PathBuf::from("scenes/sponza.json")));
        assert_eq!(content.recent_files(), paths(&["scenes/sponza.json"]));

        assert_eq!(content.startup_scene(), None);
        content.set_auto_load_last_scene(true).unwrap();
        assert_eq!(content.startup_scene(), Some(PathBuf::from("scenes/sponza.json")));

        content.set_last_scene(None).unwrap();
        assert_eq!(content.last_scene(), None);
    }

    #[test]
    fn remove_and_clear() {
        let content = service();
        content.add_recent(Path::new("a")).unwrap();
        content.add_recent(Path::new("b")).unwrap();
        assert!(content.remove_recent(Path::new("a")).unwrap());
        assert!(!content.remove_recent(Path::new("a")).unwrap());
        assert!(content.clear_recent().unwrap());
        assert!(content.recent_files().is_empty());
    }

    #[test]
    fn resolves_relative_paths_against_root() {
        let content = service();
        assert_eq!(content.resolve(Path::new("a.json")), PathBuf::from("a.json"));
        content.set_root(Some(Path::new("/data/content"))).unwrap();
        assert_eq!(
            content.resolve(Path::new("scenes/a.json")),
            PathBuf::from("/data/content/scenes/a.json")
        );
    }

    #[test]
    fn hand_edited_recent_list_is_capped_on_read() {
        let content = service();
        content.set_recent_limit(2).unwrap();
        content
            .scope()
            .settings()
            .set_value("content.recent_files", serde_json::json!(["a", "b", "c", "d"]))
            .unwrap();
        assert_eq!(content.recent_files(), paths(&["a", "b"]));

        content.set_recent_limit(3).unwrap();
        assert_eq!(content.recent_files(), paths(&["a", "b", "c"]));
        content.set_recent_limit(1).unwrap();
        assert_eq!(
            content.scope().settings().get::<Vec<String>>("content.recent_files"),
            Some(vec!["a".to_string()])
        );
    }
}
