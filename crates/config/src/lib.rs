//! Layered configuration for tidyshelf.
//!
//! Layers, lowest to highest precedence:
//! 1. Built-in defaults.
//! 2. A configuration file: either the one given explicitly, or any of
//!    `config.toml`, `config.yaml` and `config.json` in the platform
//!    configuration directory.
//! 3. Environment variables prefixed with `TIDYSHELF_` (`TIDYSHELF_LIBRARY`,
//!    `TIDYSHELF_READ_ORDER_COLUMN`, ...).
//! 4. Command-line [`Overrides`].

pub mod error;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_PREFIX: &str = "TIDYSHELF_";
pub const DEFAULT_READ_ORDER_COLUMN: &str = "readorder";

/// Which catalog backend talks to the library.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The `calibredb` command-line tool.
    #[default]
    #[display("calibredb")]
    Calibredb,
    /// Direct access to `metadata.db`.
    #[display("sqlite")]
    Sqlite,
}
impl FromStr for BackendKind {
    type Err = ErrorKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "calibredb" => Ok(Self::Calibredb),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ErrorKind::UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Root directory of the Calibre library (the one holding `metadata.db`).
    pub library: PathBuf,
    #[serde(default)]
    pub backend: BackendKind,
    /// Path to the `calibredb` executable; looked up in `PATH` when unset.
    #[serde(default)]
    pub calibredb: Option<PathBuf>,
    /// Label of the custom column holding the read order.
    #[serde(default = "default_read_order_column")]
    pub read_order_column: String,
}

fn default_read_order_column() -> String {
    DEFAULT_READ_ORDER_COLUMN.to_string()
}

/// Values given on the command line; unset values leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
}

impl Config {
    /// Load configuration from every layer.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let figment = Self::figment(file)?.merge(Serialized::defaults(overrides));
        Self::from_figment(&figment)
    }

    /// Every layer below the command line.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let figment = match file {
            Some(path) => Figment::new().merge(file_provider(path)?),
            None => match default_directory() {
                Some(dir) => {
                    tracing::debug!(dir = %dir.display(), "Looking for configuration files");
                    Figment::new()
                        .merge(Toml::file(dir.join("config.toml")))
                        .merge(Yaml::file(dir.join("config.yaml")))
                        .merge(Json::file(dir.join("config.json")))
                },
                None => Figment::new(),
            },
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a configuration.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        if !figment.contains("library") {
            exn::bail!(ErrorKind::MissingLibrary);
        }
        let mut config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        if config.library.as_os_str().is_empty() {
            exn::bail!(ErrorKind::MissingLibrary);
        }
        config.read_order_column = config.read_order_column.trim().to_string();
        if config.read_order_column.is_empty() {
            exn::bail!(ErrorKind::InvalidValue("read_order_column"));
        }
        Ok(config)
    }
}

fn default_directory() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tidyshelf").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Provider for an explicitly requested file, picked by extension.
fn file_provider(path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::FileNotFound(path.display().to_string()));
    }
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
    let figment = match extension.as_str() {
        "toml" => Figment::from(Toml::file_exact(path)),
        "yaml" | "yml" => Figment::from(Yaml::file_exact(path)),
        "json" => Figment::from(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
    };
    tracing::debug!(path = %path.display(), "Using configuration file");
    Ok(figment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[rstest]
    #[case("calibredb", BackendKind::Calibredb)]
    #[case("sqlite", BackendKind::Sqlite)]
    #[case(" SQLite ", BackendKind::Sqlite)]
    fn test_backend_from_str(#[case] raw: &str, #[case] expected: BackendKind) {
        assert_eq!(raw.parse::<BackendKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_backend() {
        assert_eq!("jdbc".parse::<BackendKind>(), Err(ErrorKind::UnknownBackend("jdbc".to_string())));
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("tidyshelf.toml", r#"library = "/books""#)?;
            let config = Config::load(Some(Path::new("tidyshelf.toml")), &Overrides::default()).unwrap();
            assert_eq!(
                config,
                Config {
                    library: PathBuf::from("/books"),
                    backend: BackendKind::Calibredb,
                    calibredb: None,
                    read_order_column: "readorder".to_string(),
                }
            );
            Ok(())
        });
    }

    #[test]
    fn test_layers_override_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tidyshelf.yaml",
                "library: /from/file\nbackend: sqlite\nread_order_column: series_order\n",
            )?;
            jail.set_env("TIDYSHELF_LIBRARY", "/from/env");
            jail.set_env("TIDYSHELF_CALIBREDB", "/opt/calibre/calibredb");

            let file = Path::new("tidyshelf.yaml");
            let config = Config::load(Some(file), &Overrides::default()).unwrap();
            assert_eq!(config.library, PathBuf::from("/from/env"));
            assert_eq!(config.backend, BackendKind::Sqlite);
            assert_eq!(config.calibredb, Some(PathBuf::from("/opt/calibre/calibredb")));
            assert_eq!(config.read_order_column, "series_order");

            let overrides = Overrides { library: Some(PathBuf::from("/from/cli")), backend: Some(BackendKind::Calibredb) };
            let config = Config::load(Some(file), &overrides).unwrap();
            assert_eq!(config.library, PathBuf::from("/from/cli"));
            assert_eq!(config.backend, BackendKind::Calibredb);
            Ok(())
        });
    }

    #[test]
    fn test_json_file() {
        Jail::expect_with(|jail| {
            jail.create_file("tidyshelf.json", r#"{"library": "/books", "backend": "sqlite"}"#)?;
            let config = Config::load(Some(Path::new("tidyshelf.json")), &Overrides::default()).unwrap();
            assert_eq!(config.backend, BackendKind::Sqlite);
            Ok(())
        });
    }

    #[test]
    fn test_missing_library() {
        Jail::expect_with(|jail| {
            jail.create_file("tidyshelf.toml", r#"backend = "sqlite""#)?;
            let err = Config::load(Some(Path::new("tidyshelf.toml")), &Overrides::default()).unwrap_err();
            assert_eq!(*err, ErrorKind::MissingLibrary);
            Ok(())
        });
    }

    #[test]
    fn test_blank_column_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("tidyshelf.toml", "library = \"/books\"\nread_order_column = \"  \"\n")?;
            let err = Config::load(Some(Path::new("tidyshelf.toml")), &Overrides::default()).unwrap_err();
            assert_eq!(*err, ErrorKind::InvalidValue("read_order_column"));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_backend_in_file() {
        Jail::expect_with(|jail| {
            jail.create_file("tidyshelf.toml", "library = \"/books\"\nbackend = \"jdbc\"\n")?;
            let err = Config::load(Some(Path::new("tidyshelf.toml")), &Overrides::default()).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = Config::figment(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::FileNotFound(path.display().to_string()));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.properties");
        std::fs::write(&path, "library=/books\n").unwrap();
        let err = Config::figment(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(path.display().to_string()));
    }
}
