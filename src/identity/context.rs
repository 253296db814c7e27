//! Credential profiles.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::debug;

use crate::Result;

/// Responses per page written into generated profiles.
const DEFAULT_RESPONSE_LIMIT: u32 = 100;

/// A credential profile a command can be rendered under.
///
/// An identity is created by a registration or login step outside the
/// harness and held for the length of a scenario. It owns nothing global:
/// its home directory is its own, and rendering under it only ever adds
/// variables to a fresh environment. [`Identity::cancel`] consumes it, so a
/// cancelled identity cannot be rendered again.
pub struct Identity {
    username: String,
    password: Option<String>,
    email: Option<String>,
    token: Option<String>,
    home: PathBuf,
    owned_home: Option<TempDir>,
}

/// On-disk login state, as read by the CLI under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub controller: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub ssl_verify: bool,
    #[serde(default = "default_response_limit")]
    pub response_limit: u32,
}

fn default_response_limit() -> u32 {
    DEFAULT_RESPONSE_LIMIT
}

impl Identity {
    /// Create an identity whose home directory is `home`.
    pub fn new(username: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            username: username.into(),
            password: None,
            email: None,
            token: None,
            home: home.into(),
            owned_home: None,
        }
    }

    /// Create an identity with a fresh, private home directory.
    ///
    /// The directory is deleted when the identity is cancelled or dropped.
    pub fn with_temp_home(username: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let dir = tempfile::Builder::new()
            .prefix(&format!("e2e-home-{}-", username))
            .tempdir()?;
        let mut identity = Self::new(username, dir.path());
        identity.owned_home = Some(dir);
        Ok(identity)
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the email.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the issued token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_value(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn email_value(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn token_value(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Where this identity's profile lives under `profile_dir`.
    pub fn profile_path(&self, profile_dir: &str) -> PathBuf {
        self.home
            .join(profile_dir)
            .join(format!("{}.json", self.username))
    }

    /// Write the profile the CLI reads its login state from.
    pub fn write_profile(&self, profile_dir: &str, controller: &str) -> Result<PathBuf> {
        let path = self.profile_path(profile_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let profile = Profile {
            controller: controller.to_string(),
            username: self.username.clone(),
            token: self.token.clone(),
            ssl_verify: false,
            response_limit: DEFAULT_RESPONSE_LIMIT,
        };
        let json = serde_json::to_vec_pretty(&profile)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        debug!(user = %self.username, path = %path.display(), "wrote profile");
        Ok(path)
    }

    /// Retire this identity, deleting a home directory it owns.
    pub fn cancel(self) -> Result<()> {
        debug!(user = %self.username, "cancelling identity");
        if let Some(dir) = self.owned_home {
            dir.close()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("home", &self.home)
            .finish()
    }
}
