//! Authentication facade
//!
//! Authentication is a demo stub: when the backend cannot answer, the demo
//! session is handed out so the app stays usable. The session token is kept
//! in the cache and sent as a bearer token on later calls.

use super::{AuthService, Envelope, FallbackGuard};
use crate::error::ClientResult;
use crate::store::ServiceName;
use fitness_coach_shared::{AuthSession, LoginRequest, User};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

const SERVICE: ServiceName = ServiceName::Auth;

#[derive(Clone)]
pub struct AuthFacade {
    live: Arc<dyn AuthService>,
    mock: Arc<dyn AuthService>,
    guard: FallbackGuard,
}

impl AuthFacade {
    pub fn new(
        live: Arc<dyn AuthService>,
        mock: Arc<dyn AuthService>,
        guard: FallbackGuard,
    ) -> Self {
        Self { live, mock, guard }
    }

    pub async fn login(&self, request: LoginRequest) -> ClientResult<Envelope<AuthSession>> {
        request.validate()?;

        let live = self.live.login(&request);
        let envelope = match self.guard.attempt(SERVICE, "login", live).await {
            Some(session) => Envelope::live(session),
            None => Envelope::mock(self.mock.login(&request).await?),
        };

        if let Err(e) = self.guard.cache().set_token(&envelope.data.token) {
            warn!(error = %e, "Failed to store session token");
        }
        info!(user_id = envelope.data.user.id, source = %envelope.source, "Logged in");
        Ok(envelope)
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.guard.cache().clear_token()
    }

    pub fn is_logged_in(&self) -> bool {
        self.guard.cache().token().is_some()
    }

    pub async fn current_user(&self) -> Envelope<Option<User>> {
        let live = self.live.current_user();
        match self.guard.attempt(SERVICE, "current_user", live).await {
            Some(user) => Envelope::live(Some(user)),
            None => Envelope::mock(self.mock.current_user().await.ok()),
        }
    }
}
