//! # Config Command
//!
//! `filsign config` shows, locates or creates `~/.filsign/config.toml`.
//!
//! ```text
//! filsign config               # print the file with secrets redacted
//! filsign config path          # print where the file lives
//! filsign config init [--force]
//! ```
//!
//! Unlike the other commands this one runs without a loaded
//! [`CommandContext`](super::CommandContext), so it works before a seed
//! has been configured.

use std::io::{self, Write};

use filsign_core::config::Config;
use filsign_core::config_loader::ConfigLoader;

use super::CommandError;
use crate::cli::args::ConfigAction;

const REDACTED: &str = "[REDACTED]";

/// `filsign config`.
#[derive(Debug, Clone, Copy)]
pub struct ConfigCommand {
    action: Option<ConfigAction>,
}

impl ConfigCommand {
    /// `None` shows the file.
    #[must_use]
    pub const fn new(action: Option<ConfigAction>) -> Self {
        Self { action }
    }

    /// Runs against the per-user directory and stdout.
    ///
    /// # Errors
    ///
    /// See [`run_with`](Self::run_with).
    pub fn run(&self) -> Result<(), CommandError> {
        let loader = ConfigLoader::new()?;
        self.run_with(&loader, &mut io::stdout().lock())
    }

    /// Runs against `loader`, writing to `out`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::Config`] when showing a missing or malformed file
    /// - [`CommandError::InvalidInput`] when `init` would overwrite without `--force`
    /// - [`CommandError::Io`] on write failures
    pub fn run_with(
        &self,
        loader: &ConfigLoader,
        out: &mut impl Write,
    ) -> Result<(), CommandError> {
        match self.action {
            None => {
                let shown = redact(loader.load_required()?);
                let rendered = toml::to_string_pretty(&shown).map_err(|e| {
                    CommandError::InvalidInput(format!("cannot render config: {e}"))
                })?;
                write!(out, "{rendered}")?;
            }
            Some(ConfigAction::Path) => {
                writeln!(out, "{}", loader.config_path().display())?;
            }
            Some(ConfigAction::Init { force }) => {
                let path = loader.config_path();
                if loader.exists() && !force {
                    return Err(CommandError::InvalidInput(format!(
                        "{} already exists; pass --force to replace it",
                        path.display()
                    )));
                }
                loader.write_default()?;
                tracing::info!(path = %path.display(), "wrote default configuration");
                writeln!(out, "Wrote {}", path.display())?;
                writeln!(out, "Set security.seed (or FILSIGN_SEED) before using the vault.")?;
            }
        }
        Ok(())
    }
}

fn redact(mut config: Config) -> Config {
    for secret in [&mut config.security.seed, &mut config.lotus.token] {
        if !secret.is_empty() {
            *secret = REDACTED.to_string();
        }
    }
    config
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run(action: Option<ConfigAction>, loader: &ConfigLoader) -> Result<String, CommandError> {
        let mut out = Vec::new();
        ConfigCommand::new(action).run_with(loader, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_path_prints_config_location() {
        let loader = ConfigLoader::with_base_dir("/srv/filsign".into());
        assert_eq!(
            run(Some(ConfigAction::Path), &loader).unwrap(),
            "/srv/filsign/config.toml\n"
        );
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_dir(dir.path().join("fresh"));

        let text = run(Some(ConfigAction::Init { force: false }), &loader).unwrap();
        assert!(text.starts_with("Wrote "));
        assert_eq!(
            fs::read_to_string(loader.config_path()).unwrap(),
            Config::default_toml()
        );

        fs::write(loader.config_path(), "# edited\n").unwrap();
        let err = run(Some(ConfigAction::Init { force: false }), &loader).unwrap_err();
        assert!(matches!(err, CommandError::InvalidInput(_)));
        assert_eq!(
            fs::read_to_string(loader.config_path()).unwrap(),
            "# edited\n"
        );

        run(Some(ConfigAction::Init { force: true }), &loader).unwrap();
        assert_eq!(
            fs::read_to_string(loader.config_path()).unwrap(),
            Config::default_toml()
        );
    }

    #[test]
    fn test_show_redacts_secrets() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_dir(dir.path().to_path_buf());
        loader
            .save(
                &Config::builder()
                    .seed("correct horse battery staple")
                    .token("jwt-secret")
                    .build(),
            )
            .unwrap();

        let text = run(None, &loader).unwrap();

        assert!(!text.contains("correct horse"));
        assert!(!text.contains("jwt-secret"));
        assert!(text.contains(REDACTED));
        assert!(text.contains("[lotus]"));
    }

    #[test]
    fn test_show_without_file_fails() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_base_dir(dir.path().to_path_buf());

        let err = run(None, &loader).unwrap_err();
        assert!(matches!(err, CommandError::Config(_)));
    }
}
