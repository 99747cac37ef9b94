//! Configuration.
//!
//! Read from `plbridge.toml`. Every section is optional:
//!
//! ```toml
//! [database]
//! url = "postgres://postgres@localhost/app"
//! language = "plpython3u"
//!
//! [declarations]
//! paths = ["plpy"]
//! strict = false
//!
//! [runtime]
//! env_paths = ["/usr/lib/python3/dist-packages"]
//! project_path = "/srv/app"
//! python = "python3"
//!
//! [orm]
//! enabled = true
//! settings_module = "app.settings"
//! embed_env = ["SECRET_KEY"]
//!
//! [models.Book]
//! table = "books_book"
//! app_label = "books"
//! ```
//!
//! `PLBRIDGE_DATABASE_URL` takes precedence over `[database] url`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::codegen::{CompileContext, OrmRuntime};
use crate::diagnostic::BridgeError;
use crate::ir::DEFAULT_LANGUAGE;
use crate::model::ModelTable;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "plbridge.toml";

/// Environment variable overriding `[database] url`.
pub const DATABASE_URL_ENV: &str = "PLBRIDGE_DATABASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub database: DatabaseSection,
    pub declarations: DeclarationsSection,
    pub runtime: RuntimeSection,
    pub orm: OrmSection,
    pub models: ModelTable,

    /// Directory relative declaration paths are resolved against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub url: Option<String>,
    /// Procedural language of generated procedures.
    pub language: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeclarationsSection {
    /// Files or directories holding decorated Python functions.
    pub paths: Vec<PathBuf>,
    /// Fail on re-declaration instead of replacing.
    pub strict: bool,
}

impl Default for DeclarationsSection {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("plpy")],
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSection {
    /// Interpreter search paths provisioned inside the database.
    pub env_paths: Vec<String>,
    /// Application root loaded before object-relational trigger bodies run.
    pub project_path: Option<String>,
    /// Local interpreter used by the version probe.
    pub python: String,
    /// Pins the local version instead of asking `python`.
    pub local_version: Option<String>,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            env_paths: Vec::new(),
            project_path: None,
            python: "python3".to_string(),
            local_version: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrmSection {
    pub enabled: bool,
    pub settings_module: Option<String>,
    /// Environment variables copied into trigger bodies.
    pub embed_env: Vec<String>,
    /// Copy the whole environment. Requires explicit opt-in.
    pub embed_all_env: bool,
}

impl OrmSection {
    pub fn embedding(&self) -> EnvEmbedding {
        if self.embed_all_env {
            EnvEmbedding::All
        } else if self.embed_env.is_empty() {
            EnvEmbedding::Disabled
        } else {
            EnvEmbedding::Keys(self.embed_env.clone())
        }
    }
}

/// Which host environment variables are written into generated trigger
/// bodies. Embedded values are stored in plain text in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EnvEmbedding {
    #[default]
    Disabled,
    Keys(Vec<String>),
    All,
}

impl EnvEmbedding {
    /// Filters `vars` down to what the policy allows.
    ///
    /// An allowed key whose value is not valid UTF-8 is an error. Under
    /// `All`, variables that are not valid UTF-8 are skipped.
    pub fn snapshot<I, K, V>(&self, vars: I) -> Result<BTreeMap<String, String>, BridgeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let vars = vars
            .into_iter()
            .map(|(key, value)| -> (OsString, OsString) { (key.into(), value.into()) });
        match self {
            Self::Disabled => Ok(BTreeMap::new()),
            Self::Keys(keys) => vars
                .filter(|(key, _)| keys.iter().any(|k| key.as_os_str() == k.as_str()))
                .map(|(key, value)| {
                    let key = key.to_string_lossy().into_owned();
                    match value.into_string() {
                        Ok(value) => Ok((key, value)),
                        Err(_) => Err(BridgeError::ConfigInvalid {
                            path: PathBuf::from(CONFIG_FILE),
                            message: format!("environment variable {key} listed in [orm] embed_env is not valid UTF-8"),
                        }),
                    }
                })
                .collect(),
            Self::All => Ok(vars
                .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                    (Ok(key), Ok(value)) => Some((key, value)),
                    (key, _) => {
                        let key = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
                        tracing::warn!(key = %key, "skipping environment variable that is not valid UTF-8");
                        None
                    }
                })
                .collect()),
        }
    }
}

impl BridgeConfig {
    /// Loads a configuration file and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::io(path, e.to_string()))?;
        let mut config = Self::from_toml_str(&content, path)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        config.apply_overrides(|key| std::env::var(key).ok());
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, BridgeError> {
        if path.exists() {
            return Self::load(path);
        }
        tracing::debug!(path = %path.display(), "no configuration file, using defaults");
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parses TOML text. `path` is only used in error messages.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, BridgeError> {
        toml::from_str(content).map_err(|e| BridgeError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Applies overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|url| !url.is_empty()) {
            self.database.url = Some(url);
        }
    }

    pub fn database_url(&self) -> Result<&str, BridgeError> {
        self.database.url.as_deref().ok_or_else(|| BridgeError::ConfigInvalid {
            path: PathBuf::from(CONFIG_FILE),
            message: format!("no database url; set [database] url or {DATABASE_URL_ENV}"),
        })
    }

    /// Declaration paths, with relative entries resolved against the
    /// directory of the configuration file.
    pub fn declaration_paths(&self) -> Vec<PathBuf> {
        self.declarations
            .paths
            .iter()
            .map(|p| match &self.base_dir {
                Some(base) if p.is_relative() => base.join(p),
                _ => p.clone(),
            })
            .collect()
    }

    /// Builds the compiler's view of the configuration, snapshotting the
    /// environment variables the embedding policy allows.
    pub fn compile_context(&self) -> Result<CompileContext, BridgeError> {
        self.compile_context_with(std::env::vars_os())
    }

    pub fn compile_context_with<I, K, V>(&self, vars: I) -> Result<CompileContext, BridgeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let orm = match self.orm.enabled {
            true => Some(OrmRuntime {
                env_paths: self.runtime.env_paths.clone(),
                project_path: self.runtime.project_path.clone(),
                settings_module: self.orm.settings_module.clone(),
                extra_env: self.orm.embedding().snapshot(vars)?,
            }),
            false => None,
        };
        Ok(CompileContext {
            language: self.database.language.clone(),
            orm,
        })
    }
}
