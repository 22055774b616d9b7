//! Layered configuration.
//!
//! Values are merged, later sources winning:
//!
//! 1. Built-in defaults (the public `datasets/MakiAi/bookshelf-db` dataset on
//!    `https://huggingface.co`).
//! 2. A TOML file, `config.toml` in the platform config directory unless a
//!    path is given.
//! 3. `HF_TOKEN`, the Hub's usual token variable.
//! 4. `BOOKSHELF_*` environment variables (`BOOKSHELF_REPOSITORY`,
//!    `BOOKSHELF_TOKEN`, `BOOKSHELF_TIMEOUT_SECS`, ...).

pub mod error;

use crate::error::{ErrorKind, Result};
use bookshelf_storage::RepoId;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REPOSITORY: &str = "datasets/MakiAi/bookshelf-db";
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_REVISION: &str = "main";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const ENV_PREFIX: &str = "BOOKSHELF_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository holding the books, e.g. `datasets/owner/name`.
    pub repository: String,
    pub endpoint: String,
    /// Branch, tag or commit to read from and commit to.
    pub revision: String,
    /// Write token. Reading public repositories needs none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
impl Config {
    /// Where the configuration file lives when no path is given.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bookshelf").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// All configuration sources, merged but not yet extracted.
    ///
    /// A missing file is not an error; it simply contributes nothing.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(file) => {
                tracing::debug!(path = %file.display(), exists = file.exists(), "Configuration file");
                figment = figment.merge(Toml::file(file));
            },
            None => tracing::debug!("No configuration directory on this platform"),
        }
        figment
            .merge(Env::raw().only(&["HF_TOKEN"]).map(|_| "token".into()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let mut config: Config = figment.extract().or_raise(|| ErrorKind::Extract)?;
        config.token = config.token.take().map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.repo_id()?;
        if self.endpoint.trim().is_empty() {
            exn::bail!(ErrorKind::EmptyEndpoint);
        }
        if self.revision.trim().is_empty() {
            exn::bail!(ErrorKind::EmptyRevision);
        }
        if self.timeout_secs == 0 {
            exn::bail!(ErrorKind::InvalidTimeout);
        }
        Ok(())
    }

    pub fn repo_id(&self) -> Result<RepoId> {
        self.repository.parse::<RepoId>().or_raise(|| ErrorKind::InvalidRepository(self.repository.clone()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_storage::RepoKind;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("HF_TOKEN", "");
            let missing = jail.directory().join("missing.toml");
            let config = Config::load(Some(missing.as_path())).unwrap();
            assert_eq!(config, Config::default());
            let repo = config.repo_id().unwrap();
            assert_eq!(repo.kind, RepoKind::Dataset);
            assert_eq!(repo.name, "MakiAi/bookshelf-db");
            assert_eq!(config.timeout(), Duration::from_secs(30));
            Ok(())
        });
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "bookshelf.toml",
                r#"
                repository = "datasets/someone/comics"
                revision = "dev"
                timeout_secs = 5
                token = "from-file"
                "#,
            )?;
            jail.set_env("HF_TOKEN", "from-hf");
            jail.set_env("BOOKSHELF_TIMEOUT_SECS", "12");
            let config = Config::load(Some(Path::new("bookshelf.toml"))).unwrap();
            assert_eq!(config.repository, "datasets/someone/comics");
            assert_eq!(config.revision, "dev");
            assert_eq!(config.timeout_secs, 12);
            assert_eq!(config.token.as_deref(), Some("from-hf"));
            assert_eq!(config.endpoint, DEFAULT_ENDPOINT);

            jail.set_env("BOOKSHELF_TOKEN", "from-prefix");
            let config = Config::load(Some(Path::new("bookshelf.toml"))).unwrap();
            assert_eq!(config.token.as_deref(), Some("from-prefix"));
            Ok(())
        });
    }

    #[test]
    fn test_blank_token_is_none() {
        Jail::expect_with(|jail| {
            jail.set_env("HF_TOKEN", "");
            jail.set_env("BOOKSHELF_TOKEN", "   ");
            let config = Config::load(Some(Path::new("none.toml"))).unwrap();
            assert!(!config.has_token());
            Ok(())
        });
    }

    #[test]
    fn test_wrong_type_fails_extraction() {
        Jail::expect_with(|jail| {
            jail.create_file("bookshelf.toml", "timeout_secs = \"soon\"")?;
            let err = Config::load(Some(Path::new("bookshelf.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Extract);
            Ok(())
        });
    }

    #[rstest]
    #[case(Config { repository: "a/b/c".to_string(), ..Default::default() }, ErrorKind::InvalidRepository("a/b/c".to_string()))]
    #[case(Config { repository: "  ".to_string(), ..Default::default() }, ErrorKind::InvalidRepository("  ".to_string()))]
    #[case(Config { endpoint: " ".to_string(), ..Default::default() }, ErrorKind::EmptyEndpoint)]
    #[case(Config { revision: String::new(), ..Default::default() }, ErrorKind::EmptyRevision)]
    #[case(Config { timeout_secs: 0, ..Default::default() }, ErrorKind::InvalidTimeout)]
    fn test_validate(#[case] config: Config, #[case] expected: ErrorKind) {
        assert_eq!(*config.validate().unwrap_err(), expected);
    }
}
