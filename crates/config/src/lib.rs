//! Layered configuration for reel.
//!
//! Values are resolved in order, later layers winning:
//! 1. built-in defaults,
//! 2. an optional config file (`.toml`, `.yaml`/`.yml` or `.json`),
//! 3. environment variables prefixed `REEL_`, nested with `__`
//!    (e.g. `REEL_STORE__KIND=memory`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::OptionExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Media types and extensions the upload surface accepts out of the box.
pub const DEFAULT_ACCEPT: &[&str] = &[
    "video/*", ".h264", ".avi", ".mp4", ".mov", ".mkv", ".flv", ".wmv", ".webm", ".mpeg", ".mpg", ".m4v", ".3gp",
    ".3g2", ".f4v", ".f4p", ".f4a", ".f4b",
];
/// 1000 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1000 * 1024 * 1024;
const ENV_PREFIX: &str = "REEL_";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Nothing outlives the process.
    Memory,
    /// One file per cached upload inside a directory.
    #[default]
    Local,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Used for logging only.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}
impl Default for StoreConfig {
    fn default() -> Self {
        Self { kind: StoreKind::default(), name: "reel-cache".to_string(), root: None }
    }
}
impl StoreConfig {
    /// The configured root, or the platform data directory if none was set.
    pub fn root_or_default(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let dirs = ProjectDirs::from("", "", "reel")
            .ok_or_raise(|| ErrorKind::Invalid("no home directory to place the cache in".to_string()))?;
        Ok(dirs.data_dir().join("cache"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Entries are either MIME types (`video/*`, `video/mp4`) or extensions
    /// with a leading dot (`.mkv`).
    pub accept: Vec<String>,
    /// Bytes.
    pub max_file_size: u64,
}
impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}
impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Self::figment(path)?;
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Same as [`load`](Self::load) but ignores the environment.
    pub fn load_file(path: &Path) -> Result<Self> {
        Self::extract(Self::figment(Some(path))?)
    }

    fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let Some(path) = path else {
            return Ok(figment);
        };
        if !path.is_file() {
            exn::bail!(ErrorKind::Load(format!("config file `{}` not found", path.display())));
        }
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        let figment = match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::Load(format!("unrecognised config format `{}`", path.display()))),
        };
        tracing::debug!(path = %path.display(), "Merged configuration file");
        Ok(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.name.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("store.name must not be empty".to_string()));
        }
        if let Some(root) = &self.store.root
            && !root.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid(format!("store.root `{}` must be absolute", root.display())));
        }
        if self.uploads.max_file_size == 0 {
            exn::bail!(ErrorKind::Invalid("uploads.max_file_size must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(extension).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.kind, StoreKind::Local);
        assert_eq!(config.store.name, "reel-cache");
        assert!(config.uploads.accept.contains(&"video/*".to_string()));
        assert!(config.uploads.accept.contains(&".mkv".to_string()));
        assert_eq!(config.uploads.max_file_size, 1_048_576_000);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(".toml", "[store]\nkind = \"memory\"\nname = \"scratch\"\n")]
    #[case(".yaml", "store:\n  kind: memory\n  name: scratch\n")]
    #[case(".yml", "store:\n  kind: memory\n  name: scratch\n")]
    #[case(".json", r#"{"store": {"kind": "memory", "name": "scratch"}}"#)]
    fn test_load_formats(#[case] extension: &str, #[case] contents: &str) {
        let file = write_config(extension, contents);
        let config = Config::load_file(file.path()).unwrap();
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.store.name, "scratch");
        // Untouched sections keep their defaults.
        assert_eq!(config.uploads, UploadConfig::default());
    }

    #[test]
    fn test_partial_section_merges_with_defaults() {
        let file = write_config(".toml", "[uploads]\nmax_file_size = 42\n");
        let config = Config::load_file(file.path()).unwrap();
        assert_eq!(config.uploads.max_file_size, 42);
        assert_eq!(config.uploads.accept, UploadConfig::default().accept);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
    }

    #[test]
    fn test_unknown_format() {
        let file = write_config(".ini", "kind=memory");
        let err = Config::load_file(file.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
    }

    #[test]
    fn test_bad_value() {
        let file = write_config(".toml", "[store]\nkind = \"floppy\"\n");
        let err = Config::load_file(file.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
    }

    #[rstest]
    #[case("[store]\nname = \"  \"\n")]
    #[case("[store]\nroot = \"relative/cache\"\n")]
    #[case("[uploads]\nmax_file_size = 0\n")]
    fn test_validation(#[case] contents: &str) {
        let file = write_config(".toml", contents);
        let err = Config::load_file(file.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_root_or_default_prefers_configured() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreConfig { root: Some(dir.path().to_path_buf()), ..StoreConfig::default() };
        assert_eq!(store.root_or_default().unwrap(), dir.path());
    }
}
