//! Demo Shell Settings
//!
//! A thread-safe JSON document addressed by dotted keys such as
//! `camera.fly_move_speed`. Writes create intermediate nodes on demand, and
//! the document can be loaded from and saved to disk.
//!
//! ```ignore
//! use shell_settings::SettingsService;
//!
//! let settings = SettingsService::load("settings.json")?;
//! let speed = settings.get_float("camera.fly_move_speed").unwrap_or(5.0);
//! settings.set_float("camera.fly_move_speed", speed * 2.0)?;
//! settings.save()?;
//! ```

mod error;
mod global;
mod key;
mod service;
mod tree;

pub use error::SettingsError;
pub use global::{global, install_global};
pub use key::SettingsKey;
pub use service::SettingsService;
