//! File dialog requests and remembered directories
//!
//! The dialog widget itself belongs to the UI layer. This service tracks
//! which dialog is open, validates what the user picked, and remembers the
//! last directory per purpose (`file_browser.last_dirs.<purpose>`).

use crate::{DomainService, SettingsScope};
use serde::{Deserialize, Serialize};
use shell_settings::{SettingsError, SettingsKey, SettingsService};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    OpenFile,
    SaveFile,
    PickFolder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFilter {
    pub name: String,
    /// Extensions without the leading dot.
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(name: impl Into<String>, extensions: &[&str]) -> Self {
        Self {
            name: name.into(),
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDialogRequest {
    /// What the dialog is for, e.g. `skybox` or `scene`. One key segment.
    pub purpose: String,
    pub kind: DialogKind,
    pub title: String,
    pub filters: Vec<FileFilter>,
    /// Starting directory when nothing is remembered for the purpose.
    pub fallback_dir: Option<PathBuf>,
}

impl FileDialogRequest {
    pub fn new(kind: DialogKind, purpose: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
            kind,
            title: title.into(),
            filters: Vec::new(),
            fallback_dir: None,
        }
    }

    pub fn open_file(purpose: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(DialogKind::OpenFile, purpose, title)
    }

    pub fn save_file(purpose: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(DialogKind::SaveFile, purpose, title)
    }

    pub fn pick_folder(purpose: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(DialogKind::PickFolder, purpose, title)
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }
}

/// Identifies one opened dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DialogTicket(u64);

impl fmt::Display for DialogTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dialog#{}", self.0)
    }
}

/// The dialog the UI should currently draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveDialog {
    pub ticket: DialogTicket,
    pub request: FileDialogRequest,
    pub initial_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Selected(PathBuf),
    Cancelled,
}

#[derive(Debug, Error)]
pub enum FileBrowserError {
    #[error("{0} is still open")]
    Busy(DialogTicket),

    #[error("{0} is not the open dialog")]
    UnknownTicket(DialogTicket),

    #[error("{0} does not match any of the dialog's filters")]
    FilteredOut(PathBuf),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileBrowserSettings {
    pub last_dirs: BTreeMap<String, PathBuf>,
    pub active: Option<ActiveDialog>,
}

#[derive(Default)]
struct BrowserState {
    next_ticket: u64,
    active: Option<ActiveDialog>,
    outcomes: HashMap<DialogTicket, DialogOutcome>,
}

pub struct FileBrowserService {
    scope: SettingsScope,
    state: Mutex<BrowserState>,
}

impl FileBrowserService {
    pub const PREFIX: &'static str = "file_browser";

    pub fn new(settings: Arc<SettingsService>) -> Self {
        Self {
            scope: SettingsScope::new(settings, Self::PREFIX),
            state: Mutex::new(BrowserState::default()),
        }
    }

    /// Directory last used for `purpose`.
    pub fn last_dir(&self, purpose: &str) -> Option<PathBuf> {
        let name = last_dir_key(purpose).ok()?;
        self.scope
            .string(&name)
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
    }

    pub fn set_last_dir(&self, purpose: &str, dir: &Path) -> Result<bool, SettingsError> {
        let name = last_dir_key(purpose)?;
        self.scope.set_string(&name, dir.to_string_lossy().into_owned())
    }

    pub fn last_dirs(&self) -> BTreeMap<String, PathBuf> {
        let purposes = self.scope.settings().keys(&self.scope.key("last_dirs"));
        purposes
            .into_iter()
            .filter_map(|purpose| {
                let dir = self.last_dir(&purpose)?;
                Some((purpose, dir))
            })
            .collect()
    }

    /// Open a dialog. Only one may be open at a time.
    pub fn open(&self, request: FileDialogRequest) -> Result<DialogTicket, FileBrowserError> {
        last_dir_key(&request.purpose)?;
        let initial_dir = self
            .last_dir(&request.purpose)
            .or_else(|| request.fallback_dir.clone());

        let mut state = self.state();
        if let Some(active) = &state.active {
            return Err(FileBrowserError::Busy(active.ticket));
        }

        state.next_ticket += 1;
        let ticket = DialogTicket(state.next_ticket);
        tracing::debug!(%ticket, purpose = %request.purpose, kind = ?request.kind, "file dialog opened");
        state.active = Some(ActiveDialog {
            ticket,
            request,
            initial_dir,
        });
        Ok(ticket)
    }

    pub fn active(&self) -> Option<ActiveDialog> {
        self.state().active.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state().active.is_some()
    }

    /// Accept the user's selection and return the final path.
    ///
    /// Save dialogs append the first filter's extension when the name has
    /// none. A rejected selection leaves the dialog open.
    pub fn complete(&self, ticket: DialogTicket, selection: &Path) -> Result<PathBuf, FileBrowserError> {
        // Held throughout so a concurrent cancel or open cannot slip in
        let mut state = self.state();
        let request = match &state.active {
            Some(active) if active.ticket == ticket => &active.request,
            _ => return Err(FileBrowserError::UnknownTicket(ticket)),
        };
        let path = accept_selection(request, selection)?;

        let dir = match request.kind {
            DialogKind::PickFolder => Some(path.clone()),
            DialogKind::OpenFile | DialogKind::SaveFile => path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf),
        };
        if let Some(dir) = dir {
            self.set_last_dir(&request.purpose, &dir)?;
        }

        state.active = None;
        state
            .outcomes
            .insert(ticket, DialogOutcome::Selected(path.clone()));
        tracing::debug!(%ticket, path = %path.display(), "file dialog completed");
        Ok(path)
    }

    pub fn cancel(&self, ticket: DialogTicket) -> Result<(), FileBrowserError> {
        let mut state = self.state();
        match &state.active {
            Some(active) if active.ticket == ticket => {}
            _ => return Err(FileBrowserError::UnknownTicket(ticket)),
        }
        state.active = None;
        state.outcomes.insert(ticket, DialogOutcome::Cancelled);
        tracing::debug!(%ticket, "file dialog cancelled");
        Ok(())
    }

    /// Collect the outcome for `ticket`. Each outcome is handed out once.
    pub fn take_outcome(&self, ticket: DialogTicket) -> Option<DialogOutcome> {
        self.state().outcomes.remove(&ticket)
    }

    pub fn snapshot(&self) -> FileBrowserSettings {
        FileBrowserSettings {
            last_dirs: self.last_dirs(),
            active: self.active(),
        }
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DomainService for FileBrowserService {
    fn scope(&self) -> &SettingsScope {
        &self.scope
    }

    fn snapshot_value(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

fn accept_selection(request: &FileDialogRequest, selection: &Path) -> Result<PathBuf, FileBrowserError> {
    let matches_filter = |path: &Path| {
        request.filters.is_empty() || request.filters.iter().any(|filter| filter.matches(path))
    };

    match request.kind {
        DialogKind::PickFolder => Ok(selection.to_path_buf()),
        DialogKind::OpenFile => {
            if matches_filter(selection) {
                Ok(selection.to_path_buf())
            } else {
                Err(FileBrowserError::FilteredOut(selection.to_path_buf()))
            }
        }
        DialogKind::SaveFile => {
            let default_ext = request
                .filters
                .first()
                .and_then(|filter| filter.extensions.first())
                .filter(|ext| ext.as_str() != "*");
            let path = match (selection.extension(), default_ext) {
                (None, Some(ext)) => selection.with_extension(ext),
                _ => selection.to_path_buf(),
            };
            if matches_filter(&path) {
                Ok(path)
            } else {
                Err(FileBrowserError::FilteredOut(path))
            }
        }
    }
}

fn last_dir_key(purpose: &str) -> Result<String, SettingsError> {
    let key = SettingsKey::parse(purpose)?;
    if key.segments().len() != 1 {
        return Err(SettingsError::InvalidKey {
            key: purpose.to_string(),
            reason: "dialog purposes cannot contain '.'",
        });
    }
    Ok(format!("last_dirs.{purpose}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> FileBrowserService {
        FileBrowserService::new(Arc::new(SettingsService::new()))
    }

    fn skybox_request() -> FileDialogRequest {
        FileDialogRequest::open_file("skybox", "Choose skybox")
            .with_filter(FileFilter::new("HDR images", &["hdr", ".EXR"]))
            .with_fallback_dir("/assets")
    }

    #[test]
    fn filters_match_case_insensitively() {
        let filter = FileFilter::new("Images", &["png", "JPG"]);
        assert!(filter.matches(Path::new("a.PNG")));
        assert!(filter.matches(Path::new("b.jpg")));
        assert!(!filter.matches(Path::new("c.exr")));
        assert!(!filter.matches(Path::new("no_extension")));
        assert!(FileFilter::new("All", &["*"]).matches(Path::new("x.bin")));
    }

    #[test]
    fn one_dialog_at_a_time() {
        let browser = service();
        let ticket = browser.open(skybox_request()).unwrap();
        assert!(browser.is_open());
        assert!(matches!(
            browser.open(skybox_request()),
            Err(FileBrowserError::Busy(t)) if t == ticket
        ));

        browser.cancel(ticket).unwrap();
        assert!(!browser.is_open());
        assert_eq!(browser.take_outcome(ticket), Some(DialogOutcome::Cancelled));
        assert_eq!(browser.take_outcome(ticket), None);
    }

    #[test]
    fn remembers_directory_per_purpose() {
        let browser = service();
        let ticket = browser.open(skybox_request()).unwrap();
        assert_eq!(browser.active().unwrap().initial_dir, Some(PathBuf::from("/assets")));

        let picked = browser.complete(ticket, Path::new("/sky/studio.hdr")).unwrap();
        assert_eq!(picked, PathBuf::from("/sky/studio.hdr"));
        assert_eq!(browser.last_dir("skybox"), Some(PathBuf::from("/sky")));
        assert_eq!(
            browser.take_outcome(ticket),
            Some(DialogOutcome::Selected(PathBuf::from("/sky/studio.hdr")))
        );

        let next = browser.open(skybox_request()).unwrap();
        assert_eq!(browser.active().unwrap().initial_dir, Some(PathBuf::from("/sky")));
        browser.cancel(next).unwrap();
        assert_eq!(browser.epoch(), 1);
    }

    #[test]
    fn rejected_selection_keeps_dialog_open() {
        let browser = service();
        let ticket = browser.open(skybox_request()).unwrap();
        assert!(matches!(
            browser.complete(ticket, Path::new("/sky/readme.txt")),
            Err(FileBrowserError::FilteredOut(_))
        ));
        assert!(browser.is_open());
        assert_eq!(browser.take_outcome(ticket), None);
        browser.complete(ticket, Path::new("/sky/dusk.exr")).unwrap();
    }

    #[test]
    fn stale_tickets_are_rejected() {
        let browser = service();
        let first = browser.open(skybox_request()).unwrap();
        browser.cancel(first).unwrap();
        let second = browser.open(skybox_request()).unwrap();

        assert!(matches!(
            browser.complete(first, Path::new("/a.hdr")),
            Err(FileBrowserError::UnknownTicket(_))
        ));
        assert!(matches!(browser.cancel(first), Err(FileBrowserError::UnknownTicket(_))));
        browser.cancel(second).unwrap();
    }

    #[test]
    fn save_dialog_appends_default_extension() {
        let browser = service();
        let request = FileDialogRequest::save_file("scene", "Save scene")
            .with_filter(FileFilter::new("Scenes", &["scene"]));

        let ticket = browser.open(request.clone()).unwrap();
        let saved = browser.complete(ticket, Path::new("/work/level1")).unwrap();
        assert_eq!(saved, PathBuf::from("/work/level1.scene"));

        let ticket = browser.open(request).unwrap();
        assert!(matches!(
            browser.complete(ticket, Path::new("/work/level1.png")),
            Err(FileBrowserError::FilteredOut(_))
        ));
    }

    #[test]
    fn folder_dialog_remembers_the_folder() {
        let browser = service();
        let ticket = browser
            .open(FileDialogRequest::pick_folder("content_root", "Content root"))
            .unwrap();
        browser.complete(ticket, Path::new("/data/content")).unwrap();
        assert_eq!(browser.last_dir("content_root"), Some(PathBuf::from("/data/content")));
        assert_eq!(browser.last_dirs().len(), 1);
    }

    #[test]
    fn purposes_must_be_one_segment() {
        let browser = service();
        let request = FileDialogRequest::open_file("a.b", "Bad");
        assert!(matches!(browser.open(request), Err(FileBrowserError::Settings(_))));
        assert!(!browser.is_open());
    }

    #[test]
    fn complete_never_closes_a_newer_dialog() {
        for _ in 0..200 {
            let browser = service();
            let first = browser.open(skybox_request()).unwrap();

            let (completed, reopened) = std::thread::scope(|s| {
                let completer = s.spawn(|| browser.complete(first, Path::new("/sky/a.hdr")));
                let canceller = s.spawn(|| {
                    browser
                        .cancel(first)
                        .ok()
                        .map(|_| browser.open(skybox_request()).unwrap())
                });
                (completer.join().unwrap(), canceller.join().unwrap())
            });

            match (completed, reopened) {
                (Ok(_), None) => {
                    assert!(!browser.is_open());
                    assert!(matches!(browser.take_outcome(first), Some(DialogOutcome::Selected(_))));
                }
                (Err(FileBrowserError::UnknownTicket(_)), Some(second)) => {
                    assert_eq!(browser.active().map(|a| a.ticket), Some(second));
                    assert_eq!(browser.take_outcome(first), Some(DialogOutcome::Cancelled));
                }
                (completed, reopened) => panic!("inconsistent race: {completed:?} / {reopened:?}"),
            }
        }
    }
}
