use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::PortfolioError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
}

/// Sign-in contract for the admin panel.
pub trait AdminAuth {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<AdminUser, PortfolioError>;

    /// Ends the session. Signing out while signed out is not an error.
    fn sign_out(&mut self) -> Result<(), PortfolioError>;

    fn current_user(&self) -> Option<&AdminUser>;
}

/// Hex SHA-256 of a password, the form stored in account files.
pub fn password_digest(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    email: String,
    password_sha256: String,
}

/// Accounts checked against SHA-256 password digests, with one session.
///
/// Emails compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct LocalAuth {
    accounts: BTreeMap<String, Account>,
    session: Option<AdminUser>,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load accounts from a JSON array of
    /// `{"email": ..., "password_sha256": ...}` objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PortfolioError> {
        let accounts: Vec<Account> = serde_json::from_reader(std::fs::File::open(path.as_ref())?)?;
        let mut auth = Self::new();
        for account in accounts {
            auth.accounts.insert(account.email.to_lowercase(), account);
        }
        tracing::debug!(accounts = auth.accounts.len(), "admin accounts loaded");
        Ok(auth)
    }

    pub fn add_account(&mut self, email: &str, password: &str) -> AdminUser {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_sha256: password_digest(password),
        };
        let user = AdminUser {
            id: account.id,
            email: account.email.clone(),
        };
        self.accounts.insert(email.to_lowercase(), account);
        user
    }
}

impl AdminAuth for LocalAuth {
    fn sign_in(&mut self, email: &str, password: &str) -> Result<AdminUser, PortfolioError> {
        let account = self
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|a| a.password_sha256.eq_ignore_ascii_case(&password_digest(password)))
            .ok_or_else(|| {
                tracing::warn!(email, "admin sign-in rejected");
                PortfolioError::InvalidCredentials
            })?;
        let user = AdminUser {
            id: account.id,
            email: account.email.clone(),
        };
        tracing::info!(email = %user.email, "admin signed in");
        self.session = Some(user.clone());
        Ok(user)
    }

    fn sign_out(&mut self) -> Result<(), PortfolioError> {
        if let Some(user) = self.session.take() {
            tracing::info!(email = %user.email, "admin signed out");
        }
        Ok(())
    }

    fn current_user(&self) -> Option<&AdminUser> {
        self.session.as_ref()
    }
}
