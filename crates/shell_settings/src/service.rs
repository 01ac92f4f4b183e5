//! Shared JSON settings document

use crate::{tree, SettingsError, SettingsKey};
use glam::{IVec2, Vec3};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use shell_core::Epoch;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe key-value store addressed by dotted keys.
///
/// Readers share the document lock; writers take it exclusively. The root
/// of the document is always a JSON object.
#[derive(Debug)]
pub struct SettingsService {
    document: RwLock<Value>,
    path: Option<PathBuf>,
    dirty: AtomicBool,
    epoch: Epoch,
    /// Serialises saves so the last document serialised is the last one written.
    save_lock: Mutex<()>,
}

impl SettingsService {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::from_parts(empty_document(), None)
    }

    /// Create an empty store that saves to `path`. The file is not read.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self::from_parts(empty_document(), Some(path.into()))
    }

    /// Load the document stored at `path`.
    ///
    /// A missing file yields an empty document bound to `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let document = read_document(&path)?;
        tracing::info!(
            path = %path.display(),
            values = tree::count_leaves(&document),
            "loaded settings"
        );
        Ok(Self::from_parts(document, Some(path)))
    }

    /// Like [`SettingsService::load`], but a corrupt file starts an empty
    /// document instead of failing. The file is only overwritten on save.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        match Self::load(path.clone()) {
            Ok(service) => Ok(service),
            Err(err @ (SettingsError::Parse { .. } | SettingsError::NotAnObject { .. })) => {
                tracing::warn!(error = %err, "ignoring unreadable settings file");
                Ok(Self::with_path(path))
            }
            Err(err) => Err(err),
        }
    }

    fn from_parts(document: Value, path: Option<PathBuf>) -> Self {
        Self {
            document: RwLock::new(document),
            path,
            dirty: AtomicBool::new(false),
            epoch: Epoch::new(),
            save_lock: Mutex::new(()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True when the document has changes that were not saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Counter bumped on every effective change to the document.
    pub fn epoch(&self) -> u64 {
        self.epoch.current()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Re-read the backing file, discarding unsaved changes.
    pub fn reload(&self) -> Result<(), SettingsError> {
        let path = self.path.as_deref().ok_or(SettingsError::NoBackingFile)?;
        let document = read_document(path)?;
        let mut doc = self.write();
        *doc = document;
        self.dirty.store(false, Ordering::Release);
        self.epoch.bump();
        tracing::info!(path = %path.display(), "reloaded settings");
        Ok(())
    }

    /// Write the document to the backing file.
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = self.path.as_deref().ok_or(SettingsError::NoBackingFile)?;
        self.write_to(path, true)
    }

    /// Write the document to `path` without rebinding the store.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        self.write_to(path.as_ref(), false)
    }

    /// Save only when there are unsaved changes. Returns whether a write happened.
    pub fn save_if_dirty(&self) -> Result<bool, SettingsError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    fn write_to(&self, path: &Path, clear_dirty: bool) -> Result<(), SettingsError> {
        // Held until the rename so saves never share the temp file
        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let text = {
            let doc = self.read();
            let text = serde_json::to_string_pretty(&*doc).map_err(|source| {
                SettingsError::Serialize {
                    key: String::from("<document>"),
                    source,
                }
            })?;
            // Writers set the flag under the exclusive lock, so clearing it
            // while the shared lock is held cannot drop a newer change.
            if clear_dirty {
                self.dirty.store(false, Ordering::Release);
            }
            text
        };

        if let Err(err) = write_atomically(path, &text) {
            if clear_dirty {
                self.dirty.store(true, Ordering::Release);
            }
            return Err(err);
        }

        tracing::info!(path = %path.display(), "saved settings");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Clone of the value stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let key = SettingsKey::parse(key).ok()?;
        tree::lookup(&self.read(), &key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read_with(key, |_| Some(())).is_some()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.read_with(key, Value::as_bool)
    }

    /// Read a number as `f32`. Integers are accepted.
    pub fn get_float(&self, key: &str) -> Option<f32> {
        self.read_with(key, |value| value.as_f64().map(|v| v as f32))
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.read_with(key, |value| value.as_str().map(str::to_string))
    }

    /// Read a `[x, y]` integer pair.
    pub fn get_vec2i(&self, key: &str) -> Option<IVec2> {
        self.read_with(key, |value| {
            let [x, y] = value.as_array()?.as_slice() else {
                return None;
            };
            let x = i32::try_from(x.as_i64()?).ok()?;
            let y = i32::try_from(y.as_i64()?).ok()?;
            Some(IVec2::new(x, y))
        })
    }

    /// Read a `[x, y, z]` number triple.
    pub fn get_vec3(&self, key: &str) -> Option<Vec3> {
        self.read_with(key, |value| {
            let [x, y, z] = value.as_array()?.as_slice() else {
                return None;
            };
            Some(Vec3::new(
                x.as_f64()? as f32,
                y.as_f64()? as f32,
                z.as_f64()? as f32,
            ))
        })
    }

    /// Deserialize the value under `key` into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                tracing::debug!(key, error = %err, "settings value has an unexpected shape");
                None
            }
        }
    }

    /// Names of the direct children of the object at `prefix`.
    ///
    /// An empty prefix lists the top-level keys.
    pub fn keys(&self, prefix: &str) -> Vec<String> {
        let doc = self.read();
        let node = if prefix.is_empty() {
            tree::lookup_object(&doc, &[])
        } else {
            match SettingsKey::parse(prefix) {
                Ok(key) => tree::lookup_object(&doc, key.segments()),
                Err(_) => None,
            }
        };
        node.map(|map| map.keys().cloned().collect()).unwrap_or_default()
    }

    /// Deep copy of the whole document.
    pub fn snapshot(&self) -> Value {
        self.read().clone()
    }

    fn read_with<T>(&self, key: &str, f: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        let key = SettingsKey::parse(key).ok()?;
        let doc = self.read();
        tree::lookup(&doc, &key).and_then(f)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store `value` under `key`, creating intermediate objects.
    ///
    /// Returns `true` when the stored value changed.
    pub fn set_value(&self, key: &str, value: Value) -> Result<bool, SettingsError> {
        let key = SettingsKey::parse(key)?;
        self.store(&key, value, |_| false)
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<bool, SettingsError> {
        self.set_value(key, Value::Bool(value))
    }

    pub fn set_float(&self, key: &str, value: f32) -> Result<bool, SettingsError> {
        let key = SettingsKey::parse(key)?;
        let number = float_value(&key, value)?;
        self.store(&key, number, |old| {
            old.as_f64().map(|old| old as f32) == Some(value)
        })
    }

    pub fn set_string(&self, key: &str, value: impl Into<String>) -> Result<bool, SettingsError> {
        self.set_value(key, Value::String(value.into()))
    }

    pub fn set_vec2i(&self, key: &str, value: IVec2) -> Result<bool, SettingsError> {
        self.set_value(key, Value::Array(vec![value.x.into(), value.y.into()]))
    }

    pub fn set_vec3(&self, key: &str, value: Vec3) -> Result<bool, SettingsError> {
        let key = SettingsKey::parse(key)?;
        let array = value
            .to_array()
            .into_iter()
            .map(|component| float_value(&key, component))
            .collect::<Result<Vec<_>, _>>()?;
        self.store(&key, Value::Array(array), |old| {
            let current = old.as_array().and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_f64().map(|v| v as f32))
                    .collect::<Option<Vec<_>>>()
            });
            current.as_deref() == Some(&value.to_array()[..])
        })
    }

    /// Serialize `value` and store it under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, SettingsError> {
        let value = serde_json::to_value(value).map_err(|source| SettingsError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.set_value(key, value)
    }

    /// Remove the value or subtree under `key`.
    pub fn remove(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        let key = SettingsKey::parse(key)?;
        let mut doc = self.write();
        let removed = tree::remove(&mut doc, &key);
        if removed.is_some() {
            self.mark_changed();
            tracing::debug!(key = %key, "settings value removed");
        }
        Ok(removed)
    }

    /// Swap in a whole new document. The root must be an object.
    pub fn replace_document(&self, document: Value) -> Result<(), SettingsError> {
        if !document.is_object() {
            return Err(SettingsError::NotAnObject {
                path: self.path.clone().unwrap_or_default(),
            });
        }
        let mut doc = self.write();
        if *doc != document {
            *doc = document;
            self.mark_changed();
        }
        Ok(())
    }

    /// `same` lets callers treat a stored value as equal with a looser test
    /// than JSON equality, e.g. comparing floats at `f32` precision.
    fn store(
        &self,
        key: &SettingsKey,
        value: Value,
        same: impl FnOnce(&Value) -> bool,
    ) -> Result<bool, SettingsError> {
        let mut doc = self.write();
        if let Some(current) = tree::lookup(&doc, key) {
            if *current == value || same(current) {
                return Ok(false);
            }
        }

        let (_, leaf) = key.split_leaf();
        tree::parent_mut(&mut doc, key).insert(leaf.to_string(), value);
        self.mark_changed();
        tracing::debug!(key = %key, "settings value updated");
        Ok(true)
    }

    /// Must be called with the write lock held.
    fn mark_changed(&self) {
        self.dirty.store(true, Ordering::Release);
        self.epoch.bump();
    }

    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.document.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.document.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SettingsService {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_document() -> Value {
    Value::Object(Map::new())
}

/// Store floats with their shortest `f32` spelling so files stay readable.
fn float_value(key: &SettingsKey, value: f32) -> Result<Value, SettingsError> {
    if !value.is_finite() {
        return Err(SettingsError::NonFiniteFloat {
            key: key.to_string(),
        });
    }
    let widened = value.to_string().parse::<f64>().unwrap_or(f64::from(value));
    Ok(Value::from(widened))
}

fn read_document(path: &Path) -> Result<Value, SettingsError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "settings file not found, starting empty");
            return Ok(empty_document());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if text.trim().is_empty() {
        return Ok(empty_document());
    }

    let document: Value = serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if !document.is_object() {
        return Err(SettingsError::NotAnObject {
            path: path.to_path_buf(),
        });
    }
    Ok(document)
}

/// Write to a sibling temp file, then rename it over `path`.
fn write_atomically(path: &Path, text: &str) -> Result<(), SettingsError> {
    let io_err = |source: io::Error| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut contents = String::with_capacity(text.len() + 1);
    contents.push_str(text);
    contents.push('\n');

    fs::write(&tmp, contents).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        io_err(source)
    })
}
