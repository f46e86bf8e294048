// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Token persistence so restarts don't require re-authorization.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CommunicationError, ParseError, Result};

use super::Token;

/// Storage for the current token, typically the host's configuration store.
///
/// `save` is called after every successful refresh or code exchange. It runs
/// on Tokio's blocking pool, so implementations may block on file or
/// database I/O.
pub trait TokenPersistence: Send + Sync {
    /// Stores the token.
    ///
    /// # Errors
    ///
    /// Returns error if the token cannot be stored.
    fn save(&self, token: &Token) -> Result<()>;

    /// Loads a previously stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns error if stored data exists but cannot be read.
    fn load(&self) -> Result<Option<Token>>;
}

/// Persistence that keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

impl TokenPersistence for NoPersistence {
    fn save(&self, _token: &Token) -> Result<()> {
        Ok(())
    }

    fn load(&self) -> Result<Option<Token>> {
        Ok(None)
    }
}

/// Stores the token as a JSON file.
///
/// # Examples
///
/// ```no_run
/// use homeconnect_lib::auth::{JsonFileTokenPersistence, TokenPersistence};
///
/// let persistence = JsonFileTokenPersistence::new("/var/lib/homeconnect/token.json");
/// let token = persistence.load()?;
/// # Ok::<(), homeconnect_lib::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileTokenPersistence {
    path: PathBuf,
}

impl JsonFileTokenPersistence {
    /// Creates a persistence backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenPersistence for JsonFileTokenPersistence {
    fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(CommunicationError::Io)?;
        }

        let contents = serde_json::to_string_pretty(token).map_err(ParseError::Json)?;
        fs::write(&self.path, contents).map_err(CommunicationError::Io)?;

        tracing::debug!(path = %self.path.display(), "Saved token");
        Ok(())
    }

    fn load(&self) -> Result<Option<Token>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No stored token");
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(CommunicationError::Io)?;
        let token = serde_json::from_str(&contents).map_err(ParseError::Json)?;
        tracing::info!(path = %self.path.display(), "Loaded stored token");
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn no_persistence_loads_nothing() {
        let persistence = NoPersistence;
        persistence.save(&Token::refresh_only("r")).unwrap();
        assert!(persistence.load().unwrap().is_none());
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = JsonFileTokenPersistence::new(dir.path().join("nested/token.json"));

        assert!(persistence.load().unwrap().is_none());

        let token = Token::from_ttl("access", "refresh", 3600, Utc::now());
        persistence.save(&token).unwrap();

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded, token);
    }

    #[test]
    fn json_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "not json").unwrap();

        let persistence = JsonFileTokenPersistence::new(path);
        assert!(persistence.load().is_err());
    }
}
