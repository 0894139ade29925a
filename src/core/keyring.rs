use std::error::Error;
use std::fmt;
use std::sync::Mutex;

use keyring::Entry;
use tracing::debug;

use crate::utils::url::host_label;

const KEYRING_SERVICE: &str = "monkeyking";

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was
/// temporarily unavailable (for example when the keychain service is
/// locked). Permanent errors surface the underlying cause directly.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Session token storage for one platform host.
///
/// With the keyring disabled (`monkeyking set keyring off`) the token lives
/// only in memory, as it does in tests.
pub struct TokenStore {
    account: String,
    use_keyring: bool,
    cached: Mutex<Option<String>>,
}

impl TokenStore {
    pub fn new(base_url: &str, use_keyring: bool) -> Self {
        Self {
            account: host_label(base_url),
            use_keyring,
            cached: Mutex::new(None),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn get(&self) -> Result<Option<String>, KeyringAccessError> {
        if let Some(token) = self.cached_token() {
            return Ok(Some(token));
        }
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, &self.account)?;
        match entry.get_password() {
            Ok(token) => {
                debug!(account = %self.account, "loaded session token from keyring");
                self.set_cached(Some(token.clone()));
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The token is kept in memory even when the keyring write fails, so
    /// the current process can still use it.
    pub fn store(&self, token: &str) -> Result<(), KeyringAccessError> {
        self.set_cached(Some(token.to_string()));
        if self.use_keyring {
            let entry = Entry::new(KEYRING_SERVICE, &self.account)?;
            entry.set_password(token)?;
        }
        Ok(())
    }

    pub fn remove(&self) -> Result<(), KeyringAccessError> {
        self.set_cached(None);
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, &self.account)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn cached_token(&self) -> Option<String> {
        self.cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_cached(&self, token: Option<String>) {
        *self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }
}
