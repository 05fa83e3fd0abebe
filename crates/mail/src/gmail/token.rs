//! OAuth token cache on disk

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Seconds before expiry at which a cached access token is treated as stale
const EXPIRY_BUFFER_SECS: i64 = 300;

/// Token data persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) at which the access token expires
    pub expires_at: Option<i64>,
}

impl StoredToken {
    /// Build a token that expires `expires_in` seconds from now
    pub fn issued_now(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: expires_in.map(|d| chrono::Utc::now().timestamp() + d as i64),
        }
    }

    /// Whether the access token is still usable at `now`, with a 5 minute buffer
    ///
    /// Tokens without an expiry are never considered fresh.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at > now + EXPIRY_BUFFER_SECS)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(chrono::Utc::now().timestamp())
    }
}

/// File-backed token cache
///
/// The file is opened and closed inside each call.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Default token cache filename in the sift config directory
    pub const DEFAULT_FILE: &'static str = "token.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Token store at ~/.config/sift/token.json
    pub fn default_location() -> Result<Self> {
        let path = config::config_path(Self::DEFAULT_FILE)
            .context("Could not determine config directory")?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token, `None` if no cache file exists yet
    pub fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token cache: {}", self.path.display()))?;
        let token = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token cache: {}", self.path.display()))?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write token cache: {}", self.path.display()))?;
        Ok(())
    }

    /// Remove the cache file (logout). Missing files are not an error.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove token cache: {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        let token = StoredToken {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at: Some(1_700_000_000),
        };

        store.save(&token).unwrap();
        assert_eq!(store.load().unwrap(), Some(token));
    }

    #[test]
    fn test_clear_removes_file_and_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store
            .save(&StoredToken::issued_now("a".to_string(), None, Some(3600)))
            .unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "not json").unwrap();
        assert!(TokenStore::new(path).load().is_err());
    }

    #[test]
    fn test_freshness_honours_buffer() {
        let now = 1_000_000;
        let token = |expires_at| StoredToken {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at,
        };

        assert!(token(Some(now + 301)).is_fresh_at(now));
        assert!(!token(Some(now + 300)).is_fresh_at(now));
        assert!(!token(Some(now - 10)).is_fresh_at(now));
        assert!(!token(None).is_fresh_at(now));
    }

    #[test]
    fn test_issued_now_sets_expiry() {
        let token = StoredToken::issued_now("a".to_string(), None, Some(3600));
        assert!(token.is_fresh());
        assert!(StoredToken::issued_now("a".to_string(), None, None).expires_at.is_none());
    }
}
