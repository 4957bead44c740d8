use std::path::Path;

use hashbrown::HashMap;
use serde::Deserialize;

use crate::persist::{PersistError, PersistResult};

const CREDENTIALS_VERSION: u64 = 1;

/// Decides whether a user/secret pair may read or write that user's data.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, user: &str, secret: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    version: u64,
    users: Vec<CredentialEntry>,
}

#[derive(Debug, Deserialize)]
struct CredentialEntry {
    user: String,
    passwd: String,
}

/// Fixed user table. Secrets are compared as opaque strings.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.users.insert(user.into(), secret.into());
        self
    }

    /// Parses `{"version": 1, "users": [{"user": .., "passwd": ..}]}`.
    pub fn from_json(bytes: &[u8]) -> PersistResult<Self> {
        let file: CredentialsFile = serde_json::from_slice(bytes)?;
        if file.version != CREDENTIALS_VERSION {
            return Err(PersistError::Message(format!(
                "unsupported credentials version {}",
                file.version
            )));
        }
        Ok(Self {
            users: file.users.into_iter().map(|e| (e.user, e.passwd)).collect(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::from_json(&std::fs::read(path)?)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, user: &str, secret: &str) -> bool {
        self.users.get(user).is_some_and(|known| known == secret)
    }
}
