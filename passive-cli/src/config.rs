//! Activation config lookup

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use passive_core::ActivationConfig;
use tracing::debug;

/// Worker path used when only an endpoint is given on the command line
pub const DEFAULT_WORKER_PATH: &str = "passive-agent";

/// Project-local config file
pub fn project_config_path() -> PathBuf {
    PathBuf::from("passive.toml")
}

/// User config file (platform-specific)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("passive").join("config.toml"))
}

/// Find the config file: explicit path, then project, then user
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let project = project_config_path();
    if project.exists() {
        return Some(project);
    }
    user_config_path().filter(|p| p.exists())
}

/// Resolve the activation config
///
/// Precedence is `--api-url` flag, then `PASSIVE_*` environment variables,
/// then the config file. Returns `None` when no file exists and no endpoint
/// was given, which leaves the pipeline inert.
pub fn resolve(explicit: Option<&Path>, api_url: Option<&str>) -> Result<Option<ActivationConfig>> {
    resolve_with(explicit, api_url, |key| std::env::var(key).ok())
}

/// [`resolve`] with overrides read through `lookup` instead of the process environment
pub fn resolve_with<F>(
    explicit: Option<&Path>,
    api_url: Option<&str>,
    lookup: F,
) -> Result<Option<ActivationConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match locate(explicit) {
        Some(path) => {
            debug!(path = %path.display(), "Loading activation config");
            let config = ActivationConfig::load(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            Some(config.with_overrides_from(&lookup))
        }
        None => None,
    };

    Ok(match (config, api_url) {
        (Some(config), Some(url)) => Some(config.with_api_url(url)),
        (None, Some(url)) => Some(
            ActivationConfig::new(DEFAULT_WORKER_PATH)
                .with_overrides_from(&lookup)
                .with_api_url(url),
        ),
        (config, None) => config,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/somewhere/passive.toml");
        assert_eq!(locate(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn resolve_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_path = \"/w.js\"\napi_url = \"https://x\"").unwrap();
        let config = resolve_with(Some(file.path()), None, |_| None).unwrap().unwrap();
        assert_eq!(config.worker_path, "/w.js");
    }

    #[test]
    fn api_url_flag_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_path = \"/w.js\"\napi_url = \"https://x\"").unwrap();
        let config = resolve_with(Some(file.path()), Some("https://y"), |_| None)
            .unwrap()
            .unwrap();
        assert_eq!(config.worker_path, "/w.js");
        assert_eq!(config.api_url.as_deref(), Some("https://y"));
    }

    fn env(key: &str) -> Option<String> {
        match key {
            "PASSIVE_API_URL" => Some("https://from-env".to_string()),
            "PASSIVE_METHOD" => Some("PUT".to_string()),
            _ => None,
        }
    }

    #[test]
    fn api_url_flag_beats_environment() {
        let config = resolve_with(None, Some("https://from-flag"), env)
            .unwrap()
            .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://from-flag"));
        assert_eq!(config.method.as_deref(), Some("PUT"));
        assert_eq!(config.worker_path, DEFAULT_WORKER_PATH);
    }

    #[test]
    fn environment_beats_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_path = \"/w.js\"\napi_url = \"https://x\"").unwrap();
        let config = resolve_with(Some(file.path()), None, env).unwrap().unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://from-env"));
    }

    #[test]
    fn flag_beats_environment_and_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_path = \"/w.js\"\napi_url = \"https://x\"").unwrap();
        let config = resolve_with(Some(file.path()), Some("https://from-flag"), env)
            .unwrap()
            .unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://from-flag"));
    }

    #[test]
    fn broken_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "worker_path = ").unwrap();
        assert!(resolve(Some(file.path()), None).is_err());
    }
}
