//! Demo Shell Asset Contracts
//!
//! Resource keys for cooked assets and the texture import interface the
//! engine's cooking pipeline implements.

pub mod texture;

pub use texture::{
    mip_count, CookedTexture, CubeLayout, ImportError, TextureFormat, TextureImportRequest,
    TextureImporter, TextureShape,
};

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Resource key (opaque ID)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(u64);

impl ResourceKey {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Serialized as its hex spelling.
impl serde::Serialize for ResourceKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Maps source paths to stable resource keys
pub struct ResourceRegistry {
    inner: Mutex<RegistryState>,
}

struct RegistryState {
    next_id: u64,
    by_path: HashMap<PathBuf, ResourceKey>,
    by_key: HashMap<ResourceKey, PathBuf>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryState {
                next_id: 1,
                by_path: HashMap::new(),
                by_key: HashMap::new(),
            }),
        }
    }

    /// Key for `path`; the same path always maps to the same key.
    pub fn key_for(&self, path: &Path) -> ResourceKey {
        let path = normalize(path);
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&key) = state.by_path.get(&path) {
            return key;
        }

        let key = ResourceKey(state.next_id);
        state.next_id += 1;
        tracing::debug!(%key, path = %path.display(), "registered resource");
        state.by_key.insert(key, path.clone());
        state.by_path.insert(path, key);
        key
    }

    pub fn lookup(&self, key: ResourceKey) -> Option<PathBuf> {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.by_key.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Lexical cleanup: drops `.` segments and folds `..` where possible.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
