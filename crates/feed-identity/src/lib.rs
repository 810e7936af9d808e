//! Authentication for the event feed.
//!
//! The HTTP layer only ever talks to the [`Authenticator`] trait:
//! `authenticate` trades a username and password for a bearer token, and
//! `validate` turns a bearer token back into the [`Subject`] it was issued
//! to. [`LocalAuthenticator`] implements it over an in-memory
//! [`UserDirectory`] with Argon2id password hashes and HMAC-signed tokens.

mod error;
mod password;
mod token;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::AuthError;
pub use password::{hash_password, verify_password};
pub use token::TokenSigner;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier (UUID string).
    pub id: String,
    pub username: String,
    pub email: String,
    /// Display name.
    pub name: String,
    /// `administrator` or `user`.
    pub role: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
}

/// The identity a validated token speaks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub user_id: String,
    pub username: String,
}

/// A successful login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// In-memory user store keyed by username.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The demo accounts: `admin/admin123`, `user1/password123`, `demo/demo123`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if a password cannot be hashed.
    pub fn demo() -> Result<Self, AuthError> {
        let mut directory = Self::new();
        directory.register("admin", "admin@ioteventfeed.com", "Admin User", "administrator", "admin123")?;
        directory.register("user1", "user1@ioteventfeed.com", "John Doe", "user", "password123")?;
        directory.register("demo", "demo@ioteventfeed.com", "Demo User", "user", "demo123")?;
        Ok(directory)
    }

    /// Adds a user with a freshly generated ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateUsername`] if the username is taken.
    pub fn register(
        &mut self,
        username: &str,
        email: &str,
        name: &str,
        role: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if self.users.contains_key(username) {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            password_hash: hash_password(password)?,
        };
        self.users.insert(username.to_string(), user.clone());
        Ok(user)
    }

    pub fn by_username(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn by_id(&self, id: &str) -> Option<&User> {
        self.users.values().find(|user| user.id == id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Credential verification and bearer-token validation.
pub trait Authenticator: Send + Sync {
    /// Verifies credentials and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a
    /// wrong password.
    fn authenticate(&self, username: &str, password: &str) -> Result<Session, AuthError>;

    /// Resolves a bearer token to its subject.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] or [`AuthError::TokenExpired`].
    fn validate(&self, token: &str) -> Result<Subject, AuthError>;

    /// Looks up a user by ID.
    fn find_user(&self, user_id: &str) -> Option<User>;
}

/// [`Authenticator`] backed by a [`UserDirectory`] and a [`TokenSigner`].
#[derive(Debug, Clone)]
pub struct LocalAuthenticator {
    users: UserDirectory,
    signer: TokenSigner,
}

impl LocalAuthenticator {
    pub fn new(users: UserDirectory, signer: TokenSigner) -> Self {
        Self { users, signer }
    }
}

impl Authenticator for LocalAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let Some(user) = self.users.by_username(username) else {
            tracing::info!(username, "login failed: unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash) {
            tracing::info!(username, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer.issue(&Subject {
            user_id: user.id.clone(),
            username: user.username.clone(),
        });
        tracing::info!(username, user_id = %user.id, "login successful");
        Ok(Session {
            token,
            user: user.clone(),
        })
    }

    fn validate(&self, token: &str) -> Result<Subject, AuthError> {
        self.signer.verify(token)
    }

    fn find_user(&self, user_id: &str) -> Option<User> {
        self.users.by_id(user_id).cloned()
    }
}
