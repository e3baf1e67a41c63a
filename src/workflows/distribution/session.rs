use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::domain::{InstitutionId, UserId, UserRole};
use super::repository::{RepositoryError, UserRepository};

/// Authenticated identity passed explicitly into every workflow call.
///
/// The lifecycle runs from login to logout; there is no global current-user
/// state anywhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub institution_id: Option<InstitutionId>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Error raised by login and session resolution.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("unknown or expired session token")]
    UnknownToken,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_token() -> String {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("sess-{id:012}")
}

/// Issues and resolves opaque session tokens backed by the user store.
pub struct SessionManager<U> {
    users: Arc<U>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl<U> SessionManager<U>
where
    U: UserRepository + 'static,
{
    pub fn new(users: Arc<U>) -> Self {
        Self {
            users,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Verify credentials against the user store and open a session.
    pub fn login(&self, email: &str, password: &str) -> Result<(String, Session), AuthError> {
        let user = self
            .users
            .fetch_by_email(email)?
            .filter(|user| user.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        let session = Session {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            institution_id: user.institution_id,
        };

        let token = next_session_token();
        let mut guard = self.sessions.lock().expect("session map mutex poisoned");
        guard.insert(token.clone(), session.clone());

        Ok((token, session))
    }

    pub fn resolve(&self, token: &str) -> Result<Session, AuthError> {
        let guard = self.sessions.lock().expect("session map mutex poisoned");
        guard.get(token).cloned().ok_or(AuthError::UnknownToken)
    }

    /// Drop the session; resolving the token afterwards fails.
    pub fn logout(&self, token: &str) {
        let mut guard = self.sessions.lock().expect("session map mutex poisoned");
        guard.remove(token);
    }
}
