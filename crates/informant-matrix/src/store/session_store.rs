//! Encrypted file holding the logged-in device and the sync cursor
//!
//! The session is serialized to JSON, sealed with a key derived from the
//! store passphrase, and wrapped in a small envelope that records the salt.
//! Writes go to a sibling temp file that is renamed over the target, so a
//! crash mid-write never leaves a truncated store behind.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use informant_common::auth::SALT_LEN;
use informant_common::StoreCipher;
use informant_core::{SessionError, SessionResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ENVELOPE_VERSION: u32 = 1;

/// Persisted session state
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub homeserver: String,
    pub username: String,
    pub user_id: String,
    pub device_id: String,
    pub access_token: String,
    #[serde(default)]
    pub next_batch: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StoredSession {
    /// Check if the stored login belongs to the configured account
    pub fn belongs_to(&self, homeserver: &str, username: &str) -> bool {
        self.homeserver == homeserver && self.username == username
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("homeserver", &self.homeserver)
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("next_batch", &self.next_batch)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// On-disk layout
#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    salt: String,
    sealed: String,
}

/// File-backed store encrypted under a passphrase
pub struct SessionStore {
    path: PathBuf,
    passphrase: String,
    /// Cipher of the last store read or written, reused so the key is derived once
    cipher: Mutex<Option<Arc<StoreCipher>>>,
}

impl SessionStore {
    /// Create a store at `path`. Nothing is touched until the first load/save.
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
            cipher: Mutex::new(None),
        }
    }

    /// Location of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session, `None` when no store exists yet
    ///
    /// A store sealed under another passphrase is an error.
    pub async fn load(&self) -> SessionResult<Option<StoredSession>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error(&self.path, &e)),
        };

        let envelope: Envelope = serde_json::from_slice(&raw).map_err(|e| self.invalid(e))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(self.invalid(format!("unsupported store version {}", envelope.version)));
        }

        let salt: [u8; SALT_LEN] = STANDARD
            .decode(&envelope.salt)
            .map_err(|e| self.invalid(e))?
            .try_into()
            .map_err(|_| self.invalid("salt has the wrong length"))?;
        let sealed = STANDARD.decode(&envelope.sealed).map_err(|e| self.invalid(e))?;

        let cipher = StoreCipher::derive(&self.passphrase, salt).map_err(|e| self.invalid(e))?;
        let plaintext = cipher.open(&sealed).map_err(|e| self.invalid(e))?;
        let session = serde_json::from_slice(&plaintext).map_err(|e| self.invalid(e))?;

        *self.cipher.lock() = Some(Arc::new(cipher));
        Ok(Some(session))
    }

    /// Atomically replace the store contents
    pub async fn save(&self, session: &StoredSession) -> SessionResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store_error(parent, &e))?;
        }

        let cipher = self.cipher()?;
        let json = serde_json::to_vec(session).map_err(|e| SessionError::Store(e.to_string()))?;
        let sealed = cipher
            .seal(&json)
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            salt: STANDARD.encode(cipher.salt()),
            sealed: STANDARD.encode(sealed),
        };
        let bytes =
            serde_json::to_vec_pretty(&envelope).map_err(|e| SessionError::Store(e.to_string()))?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| store_error(&tmp, &e))?;
        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| store_error(&self.path, &e))?;

        Ok(())
    }

    fn cipher(&self) -> SessionResult<Arc<StoreCipher>> {
        let mut slot = self.cipher.lock();
        if let Some(cipher) = slot.as_ref() {
            return Ok(cipher.clone());
        }

        let cipher = Arc::new(
            StoreCipher::generate(&self.passphrase)
                .map_err(|e| SessionError::Store(e.to_string()))?,
        );
        *slot = Some(cipher.clone());
        Ok(cipher)
    }

    fn invalid(&self, reason: impl fmt::Display) -> SessionError {
        SessionError::Store(format!("{}: {reason}", self.path.display()))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> SessionResult<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| store_error(path, &e))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> SessionResult<()> {
    Ok(())
}

fn store_error(path: &Path, err: &std::io::Error) -> SessionError {
    SessionError::Store(format!("{}: {err}", path.display()))
}
