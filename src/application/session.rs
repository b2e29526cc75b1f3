use crate::domain::auth::{LoginRequest, RegisterRequest, Role, User};
use crate::domain::ports::AuthApiRef;
use crate::error::{Result, StorefrontError};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    Logout,
    /// The backend rejected the token (401) or the startup token check failed.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    SignedOut(Option<SignOutReason>),
    /// A stored token is being validated.
    Initializing,
    SignedIn(User),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub status: SessionStatus,
}

/// Credential holder shared by the REST client and the application layer.
///
/// This is the only process-wide lifecycle in the client: a token is checked
/// at start, and any 401 or an explicit logout tears it down.
#[derive(Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState {
            token: None,
            status: SessionStatus::SignedOut(None),
        });
        Self {
            state: Arc::new(state),
        }
    }

    /// A session holding `token` that has not been validated.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.begin(token.into());
        session
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        match &self.state.borrow().status {
            SessionStatus::SignedIn(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state.borrow().status, SessionStatus::SignedIn(_))
    }

    /// Fails with `Unauthorized` unless the signed-in user has one of `roles`.
    pub fn require_any_role(&self, roles: &[Role]) -> Result<User> {
        match self.user() {
            Some(user) if user.has_any_role(roles) => Ok(user),
            _ => Err(StorefrontError::Unauthorized),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn begin(&self, token: String) {
        self.state.send_replace(SessionState {
            token: Some(token),
            status: SessionStatus::Initializing,
        });
    }

    fn sign_in(&self, token: String, user: User) {
        self.state.send_replace(SessionState {
            token: Some(token),
            status: SessionStatus::SignedIn(user),
        });
    }

    /// Clears credentials. Called by the REST client on any 401.
    pub fn teardown(&self, reason: SignOutReason) {
        let changed = self.state.send_if_modified(|state| {
            let already = state.token.is_none()
                && state.status == SessionStatus::SignedOut(Some(reason));
            state.token = None;
            state.status = SessionStatus::SignedOut(Some(reason));
            !already
        });
        if changed {
            info!(?reason, "session torn down");
        }
    }
}

/// Login, registration and startup token validation against the auth endpoints.
pub struct Authenticator {
    api: AuthApiRef,
    session: Session,
}

impl Authenticator {
    pub fn new(api: AuthApiRef, session: Session) -> Self {
        Self { api, session }
    }

    /// Probes `stored_token` against `/auth/me`. An invalid token is cleared
    /// and reported as `Ok(None)`; only the absence of a user is surfaced.
    #[instrument(skip_all)]
    pub async fn initialize(&self, stored_token: Option<String>) -> Result<Option<User>> {
        let Some(token) = stored_token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        self.session.begin(token.clone());

        match self.api.current_user().await {
            Ok(response) => {
                let user = User::from(&response);
                info!(email = %user.email, "stored token accepted");
                self.session.sign_in(token, user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "stored token rejected");
                self.session.teardown(SignOutReason::Expired);
                Ok(None)
            }
        }
    }

    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<User> {
        let response = self.api.login(request).await?;
        let user = User::from(&response);
        self.session.sign_in(response.token, user.clone());
        Ok(user)
    }

    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let response = self.api.register(request).await?;
        let user = User::from(&response);
        self.session.sign_in(response.token, user.clone());
        Ok(user)
    }

    pub fn logout(&self) {
        self.session.teardown(SignOutReason::Logout);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake::FakeBackend;

    #[tokio::test]
    async fn test_initialize_with_valid_token() {
        let backend = Arc::new(FakeBackend::new());
        let session = Session::new();
        let auth = Authenticator::new(backend.clone(), session.clone());

        let user = auth.initialize(Some("good".into())).await.unwrap().unwrap();
        assert_eq!(user.email, backend.user_email());
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_initialize_with_rejected_token_tears_down() {
        let backend = Arc::new(FakeBackend::new());
        backend.reject_token();
        let session = Session::new();
        let auth = Authenticator::new(backend, session.clone());

        assert!(auth.initialize(Some("stale".into())).await.unwrap().is_none());
        assert!(session.token().is_none());
        assert_eq!(
            session.status(),
            SessionStatus::SignedOut(Some(SignOutReason::Expired))
        );
    }

    #[tokio::test]
    async fn test_initialize_without_token_stays_signed_out() {
        let backend = Arc::new(FakeBackend::new());
        let session = Session::new();
        let auth = Authenticator::new(backend.clone(), session.clone());

        assert!(auth.initialize(None).await.unwrap().is_none());
        assert_eq!(backend.calls("current_user"), 0);
        assert_eq!(session.status(), SessionStatus::SignedOut(None));
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let backend = Arc::new(FakeBackend::new());
        let session = Session::new();
        let auth = Authenticator::new(backend, session.clone());

        let user = auth
            .login(&LoginRequest {
                email: "chef@example.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        assert!(session.require_any_role(&[Role::Employee]).is_ok());
        assert_eq!(session.user(), Some(user));

        auth.logout();
        assert!(!session.is_authenticated());
        assert!(matches!(
            session.require_any_role(&[Role::Employee]),
            Err(StorefrontError::Unauthorized)
        ));
    }
}
