//! Command line interface

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shell_services::ShellServices;
use shell_settings::SettingsService;

#[derive(Parser, Debug)]
#[command(name = "demo-shell", about = "Inspect and edit demo shell settings", version)]
pub struct Args {
    /// Settings file (default: <config dir>/demo-shell/settings.json)
    #[arg(long, env = "DEMO_SHELL_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value stored at a dotted key
    Get { key: String },
    /// Store a value; it is parsed as JSON, otherwise kept as a string
    Set { key: String, value: String },
    /// Remove a key and everything below it
    Remove { key: String },
    /// Print the whole document
    Dump,
    /// Print a service's current values, defaults included
    Show {
        /// Service name, or `all`
        #[arg(default_value = "all")]
        service: String,
    },
    /// Forget a service's stored values
    Reset { service: String },
}

impl Args {
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings {
            Some(path) => Ok(path.clone()),
            None => default_settings_path()
                .context("no config directory on this platform; pass --settings"),
        }
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("demo-shell").join("settings.json"))
}

/// `true`, `2.5`, `[1, 2]` and `{"a": 1}` keep their JSON types; anything
/// else is taken as a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn run(args: &Args, out: &mut impl Write) -> Result<()> {
    let path = args.settings_path()?;
    let settings = Arc::new(
        SettingsService::load(&path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
    );

    match &args.command {
        Commands::Get { key } => {
            let value = settings
                .get_value(key)
                .with_context(|| format!("nothing stored at `{key}`"))?;
            print_json(out, &value)?;
        }
        Commands::Set { key, value } => {
            let value = parse_value(value);
            if settings.set_value(key, value)? {
                tracing::info!(%key, "value updated");
            } else {
                tracing::info!(%key, "value unchanged");
            }
        }
        Commands::Remove { key } => {
            if settings.remove(key)?.is_none() {
                tracing::warn!(%key, "nothing to remove");
            }
        }
        Commands::Dump => print_json(out, &settings.snapshot())?,
        Commands::Show { service } => {
            let shell = ShellServices::new(settings.clone());
            let value = if service == "all" {
                let all = shell
                    .services()
                    .into_iter()
                    .map(|service| (service.name().to_string(), service.snapshot_value()))
                    .collect::<serde_json::Map<_, _>>();
                Value::Object(all)
            } else {
                match shell.find(service) {
                    Some(service) => service.snapshot_value(),
                    None => bail!("unknown service `{service}` (known: {})", known_services(&shell)),
                }
            };
            print_json(out, &value)?;
        }
        Commands::Reset { service } => {
            let shell = ShellServices::new(settings.clone());
            let Some(found) = shell.find(service) else {
                bail!("unknown service `{service}` (known: {})", known_services(&shell));
            };
            if found.reset()? {
                tracing::info!(%service, "service reset to defaults");
            }
        }
    }

    if settings.save_if_dirty()? {
        tracing::info!(path = %path.display(), "settings saved");
    }
    Ok(())
}

fn known_services(shell: &ShellServices) -> String {
    shell
        .services()
        .iter()
        .map(|service| service.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_json(out: &mut impl Write, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    writeln!(out, "{text}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &TempDir, rest: &[&str]) -> Args {
        let path = dir.path().join("settings.json");
        let mut argv = vec!["demo-shell", "--settings", path.to_str().unwrap()];
        argv.extend_from_slice(rest);
        Args::parse_from(argv)
    }

    fn output(dir: &TempDir, rest: &[&str]) -> String {
        let mut out = Vec::new();
        run(&args(dir, rest), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn values_keep_their_json_type() {
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("2.5"), serde_json::json!(2.5));
        assert_eq!(parse_value("[1, 2]"), serde_json::json!([1, 2]));
        assert_eq!(parse_value("fly"), Value::String("fly".into()));
        assert_eq!(parse_value("\"42\""), Value::String("42".into()));
    }

    #[test]
    fn set_then_get() {
        let dir = TempDir::new().unwrap();
        output(&dir, &["set", "camera.fly_move_speed", "12.5"]);
        assert!(dir.path().join("settings.json").exists());
        assert_eq!(output(&dir, &["get", "camera.fly_move_speed"]).trim(), "12.5");

        output(&dir, &["remove", "camera"]);
        let mut out = Vec::new();
        assert!(run(&args(&dir, &["get", "camera.fly_move_speed"]), &mut out).is_err());
    }

    #[test]
    fn show_prints_defaults() {
        let dir = TempDir::new().unwrap();
        let shown: Value = serde_json::from_str(&output(&dir, &["show", "rendering"])).unwrap();
        assert_eq!(shown["msaa_samples"], 4);
        assert_eq!(shown["view_mode"], "lit");

        let all: Value = serde_json::from_str(&output(&dir, &["show"])).unwrap();
        assert!(all["camera"].is_object());
        assert!(all["file_browser"].is_object());

        // Read-only commands do not create the file
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn unknown_service_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut out = Vec::new();
        let err = run(&args(&dir, &["show", "audio"]), &mut out).unwrap_err();
        assert!(err.to_string().contains("unknown service"));
    }

    #[test]
    fn reset_drops_a_service() {
        let dir = TempDir::new().unwrap();
        output(&dir, &["set", "grid.enabled", "false"]);
        output(&dir, &["set", "ui.scale", "2"]);
        output(&dir, &["reset", "grid"]);

        let dump: Value = serde_json::from_str(&output(&dir, &["dump"])).unwrap();
        assert!(dump.get("grid").is_none());
        assert_eq!(dump["ui"]["scale"], 2);
    }
}
