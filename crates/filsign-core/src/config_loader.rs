//! Locating, reading and writing `config.toml`.
//!
//! [`load_config`] is what the CLI calls at startup. It walks the search
//! order below, parses the first file it finds and layers the `FILSIGN_*`
//! environment variables on top:
//!
//! 1. the `--config` path, used as-is even when it is missing
//! 2. `./configs/config.toml`
//! 3. `./config.toml`
//! 4. `~/.filsign/config.toml`
//!
//! With no file anywhere the built-in defaults apply. Nothing here validates
//! the result; callers decide when a seed or host is required.
//!
//! [`ConfigLoader`] manages the file under the per-user directory, which is
//! what `filsign config` reads and writes.
//!
//! ```no_run
//! use filsign_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("no home directory");
//! let config = loader.load().expect("unreadable config");
//! println!("lotus endpoint: {}", config.lotus.host);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;

const FILE_NAME: &str = "config.toml";
const HOME_DIR_NAME: &str = ".filsign";

/// Checked relative to the working directory before the home directory.
const WORKDIR_CANDIDATES: [&str; 2] = ["configs/config.toml", "config.toml"];

/// Handle on the configuration file inside a filsign directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// A loader rooted at `~/.filsign`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoHomeDirectory`] when `$HOME` cannot be resolved.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self::with_base_dir(default_base_dir()?))
    }

    /// A loader rooted at `base_dir`.
    #[must_use]
    pub const fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(FILE_NAME)
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().is_file()
    }

    /// Parses the file, falling back to [`Config::default`] when it is absent.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files or malformed TOML.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if self.exists() {
            Self::load_from_path(&self.config_path())
        } else {
            Ok(Config::default())
        }
    }

    /// Like [`load`](Self::load), but an absent file is an error.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileNotFound`] when there is no file, otherwise as
    /// [`load`](Self::load).
    pub fn load_required(&self) -> Result<Config, ConfigError> {
        Self::load_from_path(&self.config_path())
    }

    /// Serializes `config` over the current file.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| ConfigError::parse_failed(format!("cannot render configuration: {e}")))?;
        self.write(&rendered)
    }

    /// Writes the annotated template produced by [`Config::default_toml`].
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be written.
    pub fn write_default(&self) -> Result<(), ConfigError> {
        self.write(&Config::default_toml())
    }

    /// Creates the base directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] from the underlying `create_dir_all`.
    pub fn ensure_base_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| ConfigError::io(format!("cannot create {}", self.base_dir.display()), e))
    }

    /// Reads and parses one specific file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileNotFound`], [`ConfigError::Io`] or
    /// [`ConfigError::ParseFailed`].
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let shown = path.display();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::file_not_found(shown.to_string()));
            }
            Err(e) => return Err(ConfigError::io(format!("cannot read {shown}"), e)),
        };
        toml::from_str(&text).map_err(|e| ConfigError::parse_failed(format!("{shown}: {e}")))
    }

    fn write(&self, contents: &str) -> Result<(), ConfigError> {
        self.ensure_base_dir()?;
        let path = self.config_path();
        fs::write(&path, contents)
            .map_err(|e| ConfigError::io(format!("cannot write {}", path.display()), e))
    }
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or_else(ConfigError::no_home_directory)
}

/// Replaces a leading `~` with the home directory.
///
/// Only `~` alone or `~/...` is expanded; a tilde anywhere else is literal.
///
/// ```
/// use filsign_core::config_loader::expand_path;
///
/// let path = expand_path("/var/lib/filsign/wallet.db").unwrap();
/// assert_eq!(path.to_str(), Some("/var/lib/filsign/wallet.db"));
/// ```
///
/// # Errors
///
/// [`ConfigError::NoHomeDirectory`] when expansion is needed but `$HOME`
/// cannot be resolved.
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if path == "~" {
        return home();
    }
    match path.strip_prefix("~/") {
        Some(tail) => Ok(home()?.join(tail)),
        None => Ok(PathBuf::from(path)),
    }
}

/// `~/.filsign`.
///
/// # Errors
///
/// [`ConfigError::NoHomeDirectory`] when `$HOME` cannot be resolved.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    Ok(home()?.join(HOME_DIR_NAME))
}

/// Applies the search order and returns the file to read, if any.
///
/// An explicit path is returned unchecked so that a mistyped `--config`
/// surfaces as [`ConfigError::FileNotFound`] rather than silently using
/// another file. Candidates must be regular files.
#[must_use]
pub fn resolve_config_path(
    explicit: Option<&Path>,
    cwd: &Path,
    base_dir: &Path,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let mut candidates = WORKDIR_CANDIDATES
        .iter()
        .map(|relative| cwd.join(relative))
        .chain([base_dir.join(FILE_NAME)]);
    candidates.find(|candidate| candidate.is_file())
}

/// Resolves, parses and applies environment overrides.
///
/// # Errors
///
/// Any [`ConfigError`] from resolving the home or working directory, or from
/// reading the chosen file.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir()
        .map_err(|e| ConfigError::io("cannot determine working directory", e))?;
    let chosen = resolve_config_path(explicit, &cwd, &default_base_dir()?);

    let mut config = chosen
        .as_deref()
        .map_or_else(|| Ok(Config::default()), ConfigLoader::load_from_path)?;
    config.apply_env_overrides();
    Ok(config)
}
