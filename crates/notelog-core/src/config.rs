use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Tuning for one history rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildConfig {
    /// Events further apart than this never share an update.
    #[serde(default = "default_max_window_ms")]
    pub max_window_ms: u64,
    /// Consecutive events further apart than this never share an update.
    #[serde(default = "default_max_delta_ms")]
    pub max_delta_ms: u64,
    /// Give an event its predecessor's timestamp when sorting moved it
    /// behind a later event.
    #[serde(default = "default_true")]
    pub clamp_timestamps: bool,
    /// Make post-submit votes depend on the last submit event.
    #[serde(default = "default_true")]
    pub link_post_submit: bool,
    /// Close the rebuild with a final-updates event in its own update.
    #[serde(default = "default_true")]
    pub final_updates: bool,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self {
            max_window_ms: default_max_window_ms(),
            max_delta_ms: default_max_delta_ms(),
            clamp_timestamps: default_true(),
            link_post_submit: default_true(),
            final_updates: default_true(),
        }
    }
}

/// Partial config as found on disk; unset keys fall through to the layer
/// below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    max_window_ms: Option<u64>,
    #[serde(default)]
    max_delta_ms: Option<u64>,
    #[serde(default)]
    clamp_timestamps: Option<bool>,
    #[serde(default)]
    link_post_submit: Option<bool>,
    #[serde(default)]
    final_updates: Option<bool>,
}

impl ConfigLayer {
    fn apply(self, config: &mut RebuildConfig) {
        if let Some(value) = self.max_window_ms {
            config.max_window_ms = value;
        }
        if let Some(value) = self.max_delta_ms {
            config.max_delta_ms = value;
        }
        if let Some(value) = self.clamp_timestamps {
            config.clamp_timestamps = value;
        }
        if let Some(value) = self.link_post_submit {
            config.link_post_submit = value;
        }
        if let Some(value) = self.final_updates {
            config.final_updates = value;
        }
    }
}

fn read_layer(path: &Path) -> Result<Option<ConfigLayer>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ConfigLayer>(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load a config file, filling unset keys with defaults.
///
/// # Errors
///
/// Fails if the file cannot be read or is not valid TOML.
pub fn load_config(path: &Path) -> Result<RebuildConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<RebuildConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the effective config for a project directory.
///
/// Precedence (highest wins):
/// 1. `NOTELOG_MAX_WINDOW_MS` env var (window only)
/// 2. `<project_root>/.notelog/config.toml`
/// 3. `<config dir>/notelog/config.toml`
/// 4. Built-in defaults
///
/// # Errors
///
/// Fails if a config file exists but cannot be read or parsed, or if the
/// env override is not an integer.
pub fn resolve_config(project_root: &Path) -> Result<RebuildConfig> {
    let user_path = dirs::config_dir().map(|dir| dir.join("notelog/config.toml"));
    let project_path = project_root.join(".notelog/config.toml");
    let env_window = env::var("NOTELOG_MAX_WINDOW_MS").ok();
    resolve_config_inner(user_path.as_deref(), &project_path, env_window.as_deref())
}

fn resolve_config_inner(
    user_path: Option<&Path>,
    project_path: &Path,
    env_window: Option<&str>,
) -> Result<RebuildConfig> {
    let mut config = RebuildConfig::default();

    if let Some(path) = user_path {
        if let Some(layer) = read_layer(path)? {
            layer.apply(&mut config);
        }
    }

    if let Some(layer) = read_layer(project_path)? {
        layer.apply(&mut config);
    }

    if let Some(raw) = env_window {
        config.max_window_ms = raw
            .trim()
            .parse()
            .with_context(|| format!("NOTELOG_MAX_WINDOW_MS must be an integer, got '{raw}'"))?;
    }

    Ok(config)
}

const fn default_true() -> bool {
    true
}

/// Events within three seconds of each other may share an update.
const fn default_max_window_ms() -> u64 {
    3_000
}

const fn default_max_delta_ms() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("parent dir must be created");
        }
        std::fs::write(&path, body).expect("config must be written");
        path
    }

    #[test]
    fn defaults() {
        let config = RebuildConfig::default();
        assert_eq!(config.max_window_ms, 3_000);
        assert_eq!(config.max_delta_ms, 1_000);
        assert!(config.clamp_timestamps);
        assert!(config.link_post_submit);
        assert!(config.final_updates);
    }

    #[test]
    fn load_config_fills_missing_keys() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(dir.path(), "config.toml", "max_window_ms = 500\n");
        let config = load_config(&path).expect("config must load");
        assert_eq!(config.max_window_ms, 500);
        assert_eq!(config.max_delta_ms, 1_000);
        assert!(config.clamp_timestamps);
    }

    #[test]
    fn load_config_reports_path_on_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = write(dir.path(), "config.toml", "max_window_ms = \"soon\"\n");
        let err = load_config(&path).expect_err("bad value must fail");
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let config = resolve_config_inner(
            Some(&dir.path().join("user.toml")),
            &dir.path().join(".notelog/config.toml"),
            None,
        )
        .expect("defaults must resolve");
        assert_eq!(config, RebuildConfig::default());
    }

    #[test]
    fn project_layer_overrides_user_layer() {
        let dir = TempDir::new().expect("tempdir");
        let user = write(
            dir.path(),
            "user/config.toml",
            "max_window_ms = 1000\nclamp_timestamps = false\n",
        );
        let project = write(
            dir.path(),
            ".notelog/config.toml",
            "max_window_ms = 2000\nmax_delta_ms = 250\n",
        );
        let config = resolve_config_inner(Some(&user), &project, None).expect("must resolve");
        assert_eq!(config.max_window_ms, 2000);
        assert_eq!(config.max_delta_ms, 250);
        assert!(!config.clamp_timestamps);
    }

    #[test]
    fn env_window_wins() {
        let dir = TempDir::new().expect("tempdir");
        let project = write(dir.path(), ".notelog/config.toml", "max_window_ms = 2000\n");
        let config =
            resolve_config_inner(None, &project, Some(" 250 ")).expect("must resolve");
        assert_eq!(config.max_window_ms, 250);
    }

    #[test]
    fn env_window_must_be_numeric() {
        let dir = TempDir::new().expect("tempdir");
        let err = resolve_config_inner(None, &dir.path().join("none.toml"), Some("fast"))
            .expect_err("non-numeric must fail");
        assert!(err.to_string().contains("NOTELOG_MAX_WINDOW_MS"));
    }
}
