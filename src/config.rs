//! Configuration management for lexacquire.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::repository::{DbContext, Result as RepoResult};

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "lexacquire.db";

/// Default portal base URL.
const DEFAULT_BASE_URL: &str = "https://thuvienphapluat.vn";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Portal base URL.
    pub base_url: String,
    /// Listing page URL template with a `{page}` placeholder.
    pub listing_url: String,
    /// Glossary listing URL template with a `{page}` placeholder.
    pub glossary_url: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Delay between requests in milliseconds.
    pub request_delay_ms: u64,
    /// Retry budget for failed URLs.
    pub max_retries: u32,
    /// Age in seconds after which a RUNNING session counts as stale.
    pub stale_session_secs: i64,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/.local/share (or platform equivalent) for user data.
        // Falls back gracefully: data dir -> home dir -> current dir.
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexacquire");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_url: format!("{DEFAULT_BASE_URL}/page/tim-van-ban.aspx?page={{page}}"),
            glossary_url: format!("{DEFAULT_BASE_URL}/tnpl/?field=0&page={{page}}"),
            user_agent: "lexacquire/0.4 (legal research)".to_string(),
            request_timeout: 30,
            request_delay_ms: 3000,
            max_retries: 3,
            stale_session_secs: 6 * 3600,
        }
    }
}

/// Optional overrides loaded from a TOML config file.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    data_dir: Option<String>,
    database_filename: Option<String>,
    base_url: Option<String>,
    listing_url: Option<String>,
    glossary_url: Option<String>,
    user_agent: Option<String>,
    request_timeout: Option<u64>,
    request_delay_ms: Option<u64>,
    max_retries: Option<u32>,
    stale_session_secs: Option<i64>,
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Load settings, merging an optional config file over the defaults.
    ///
    /// Search order: explicit path, `./lexacquire.toml`, then the platform
    /// config directory. A missing file is not an error.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(|| {
                let local = PathBuf::from("lexacquire.toml");
                local.exists().then_some(local)
            })
            .or_else(|| {
                dirs::config_dir()
                    .map(|d| d.join("lexacquire").join("config.toml"))
                    .filter(|p| p.exists())
            });

        let mut settings = Self::default();
        let Some(path) = path else {
            return Ok(settings);
        };

        let raw = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let file: FileSettings = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;

        if let Some(dir) = file.data_dir {
            settings.data_dir = PathBuf::from(shellexpand::tilde(&dir).into_owned());
        }
        if let Some(v) = file.database_filename {
            settings.database_filename = v;
        }
        if let Some(v) = file.base_url {
            settings.base_url = v;
        }
        if let Some(v) = file.listing_url {
            settings.listing_url = v;
        }
        if let Some(v) = file.glossary_url {
            settings.glossary_url = v;
        }
        if let Some(v) = file.user_agent {
            settings.user_agent = v;
        }
        if let Some(v) = file.request_timeout {
            settings.request_timeout = v;
        }
        if let Some(v) = file.request_delay_ms {
            settings.request_delay_ms = v;
        }
        if let Some(v) = file.max_retries {
            settings.max_retries = v;
        }
        if let Some(v) = file.stale_session_secs {
            settings.stale_session_secs = v;
        }

        Ok(settings)
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }

    /// Open all repositories on the configured database.
    pub fn create_db_context(&self) -> RepoResult<DbContext> {
        DbContext::open(&self.database_path())
    }

    /// Expand a `{page}` URL template.
    pub fn page_url(template: &str, page: u32) -> String {
        template.replace("{page}", &page.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        let settings = Settings::default();
        assert!(settings.data_dir.ends_with("lexacquire"));
        assert!(settings.database_path().ends_with("lexacquire.db"));
    }

    #[test]
    fn test_with_data_dir() {
        let settings = Settings::with_data_dir(PathBuf::from("/tmp/lexa"));
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/lexa/lexacquire.db"));
    }

    #[test]
    fn test_load_merges_file_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lexacquire.toml");
        fs::write(
            &path,
            r#"
            data_dir = "/tmp/lexa-test"
            request_delay_ms = 500
            max_retries = 5
            "#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/lexa-test"));
        assert_eq!(settings.request_delay_ms, 500);
        assert_eq!(settings.max_retries, 5);
        // Untouched fields keep defaults.
        assert_eq!(settings.request_timeout, 30);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lexacquire.toml");
        fs::write(&path, "not valid = [").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_page_url_template() {
        assert_eq!(
            Settings::page_url("https://example.vn/list?page={page}", 7),
            "https://example.vn/list?page=7"
        );
    }
}
