//! Journal password capability.
//!
//! [`CredentialStore`] is injected into the [`Journal`](crate::Journal). Variants:
//! - [`PromptCredentials`]: asks once per process, keeps the answer in memory
//! - [`KeyringCredentials`]: OS keyring, prompting and storing on first use
//! - [`MemoryCredentials`]: fixed password, for scripting and tests

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::io::{self, Write};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Keyring service name
pub const KEYRING_SERVICE: &str = "giournal";

/// Keyring user name
pub const KEYRING_USER: &str = "giournal";

/// Source of the journal password.
pub trait CredentialStore {
    /// Return the password, prompting and caching on first use.
    fn fetch(&self) -> Result<String>;

    /// Replace the stored password.
    fn set(&self, password: &str) -> Result<()>;

    /// Forget the stored password.
    fn clear(&self) -> Result<()>;
}

/// Prompt for a password without echoing it
fn prompt_password(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let password = rpassword::read_password()
        .map_err(|e| Error::Credential(format!("cannot read password: {}", e)))?;

    if password.is_empty() {
        return Err(Error::Credential("password cannot be empty".to_string()));
    }

    Ok(password)
}

/// Prompt-only store; nothing outlives the process.
#[derive(Default)]
pub struct PromptCredentials {
    cached: RefCell<Option<Zeroizing<String>>>,
}

impl PromptCredentials {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for PromptCredentials {
    fn fetch(&self) -> Result<String> {
        if let Some(password) = self.cached.borrow().as_ref() {
            return Ok(password.as_str().to_owned());
        }
        let password = prompt_password("Journal password: ")?;
        self.set(&password)?;
        Ok(password)
    }

    fn set(&self, password: &str) -> Result<()> {
        *self.cached.borrow_mut() = Some(Zeroizing::new(password.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.cached.borrow_mut().take();
        Ok(())
    }
}

/// OS keyring store with an interactive fallback.
pub struct KeyringCredentials {
    entry: keyring::Entry,
    cached: RefCell<Option<Zeroizing<String>>>,
}

impl KeyringCredentials {
    pub fn new() -> Result<Self> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|e| Error::Credential(format!("cannot open keyring: {}", e)))?;
        Ok(Self {
            entry,
            cached: RefCell::new(None),
        })
    }

    fn remember(&self, password: &str) {
        *self.cached.borrow_mut() = Some(Zeroizing::new(password.to_string()));
    }
}

impl CredentialStore for KeyringCredentials {
    fn fetch(&self) -> Result<String> {
        if let Some(password) = self.cached.borrow().as_ref() {
            return Ok(password.as_str().to_owned());
        }

        match self.entry.get_password() {
            Ok(password) => {
                debug!("Password loaded from keyring");
                self.remember(&password);
                return Ok(password);
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No password in keyring yet");
            }
            Err(e) => {
                warn!("Keyring unavailable ({}), falling back to prompt", e);
            }
        }

        let password = prompt_password("Configure a password: ")?;
        // A keyring that cannot store still leaves the journal usable.
        if let Err(e) = self.set(&password) {
            warn!("{}", e);
            self.remember(&password);
        }
        Ok(password)
    }

    fn set(&self, password: &str) -> Result<()> {
        self.remember(password);
        self.entry
            .set_password(password)
            .map_err(|e| Error::Credential(format!("cannot store password in keyring: {}", e)))
    }

    fn clear(&self) -> Result<()> {
        self.cached.borrow_mut().take();
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Credential(format!(
                "cannot remove password from keyring: {}",
                e
            ))),
        }
    }
}

/// Store holding a password supplied up front.
pub struct MemoryCredentials {
    password: RefCell<Option<Zeroizing<String>>>,
}

impl MemoryCredentials {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: RefCell::new(Some(Zeroizing::new(password.into()))),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn fetch(&self) -> Result<String> {
        self.password
            .borrow()
            .as_ref()
            .map(|p| p.as_str().to_owned())
            .ok_or_else(|| Error::Credential("no password set".to_string()))
    }

    fn set(&self, password: &str) -> Result<()> {
        *self.password.borrow_mut() = Some(Zeroizing::new(password.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.password.borrow_mut().take();
        Ok(())
    }
}
