//! Keeps the server session in step with the identity provider's sign-in state.
//!
//! The provider owns "who is signed in"; the server owns the session cookie.
//! `AuthStateBridge::attach` watches the provider and mirrors every transition:
//! signed in means fetch a fresh ID token and create a session, signed out means
//! delete it. Calls are fire-and-forget. A failed call is logged and the two
//! sides stay out of sync until the next transition or an explicit `reconcile`.

mod error;
mod http;

use secrecy::SecretString;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{Instrument, debug, info_span, instrument, warn};

use crate::session::BoxFuture;

pub use error::BridgeError;
pub use http::HttpSessionApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInState {
    SignedOut,
    SignedIn { uid: String },
}

/// The external identity provider, as seen by the bridge.
pub trait IdentityProvider: Send + Sync {
    /// Current sign-in state plus every later change.
    fn watch_state(&self) -> watch::Receiver<SignInState>;

    /// A fresh ID token for the signed-in user.
    fn id_token(&self) -> BoxFuture<'_, Result<SecretString, BridgeError>>;
}

/// The server's session endpoints.
pub trait SessionApi: Send + Sync {
    fn create_session(&self, id_token: SecretString) -> BoxFuture<'_, Result<(), BridgeError>>;

    fn delete_session(&self) -> BoxFuture<'_, Result<(), BridgeError>>;

    fn session_present(&self) -> BoxFuture<'_, Result<bool, BridgeError>>;
}

pub struct AuthStateBridge;

impl AuthStateBridge {
    /// Start mirroring provider state into the server session.
    ///
    /// The listener lives as long as the returned handle. It sees the current
    /// state right away, then each change.
    #[must_use = "dropping the handle stops the bridge"]
    pub fn attach(
        provider: Arc<dyn IdentityProvider>,
        api: Arc<dyn SessionApi>,
    ) -> BridgeHandle {
        let states = provider.watch_state();
        let task = tokio::spawn(
            listen(provider.clone(), api.clone(), states).instrument(info_span!("auth.bridge")),
        );
        BridgeHandle {
            task,
            provider,
            api,
        }
    }
}

/// Owns the running listener. Dropping it unsubscribes.
pub struct BridgeHandle {
    task: JoinHandle<()>,
    provider: Arc<dyn IdentityProvider>,
    api: Arc<dyn SessionApi>,
}

impl BridgeHandle {
    /// Stop listening. In-flight calls are abandoned.
    pub fn detach(self) {
        drop(self);
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.task.is_finished()
    }

    /// Create a server session if the provider says signed in but the server has none.
    ///
    /// Returns `true` when a session was created.
    ///
    /// # Errors
    /// Returns an error if the server or the provider could not be reached.
    #[instrument(skip_all)]
    pub async fn reconcile(&self) -> Result<bool, BridgeError> {
        let state = self.provider.watch_state().borrow().clone();
        if state == SignInState::SignedOut {
            return Ok(false);
        }
        if self.api.session_present().await? {
            return Ok(false);
        }

        debug!("provider signed in without a server session, re-creating it");
        let id_token = self.provider.id_token().await?;
        self.api.create_session(id_token).await?;
        Ok(true)
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn listen(
    provider: Arc<dyn IdentityProvider>,
    api: Arc<dyn SessionApi>,
    mut states: watch::Receiver<SignInState>,
) {
    let mut last: Option<SignInState> = None;
    loop {
        let state = states.borrow_and_update().clone();
        if last.as_ref() != Some(&state) {
            apply(provider.as_ref(), api.as_ref(), &state).await;
            last = Some(state);
        }

        if states.changed().await.is_err() {
            debug!("identity provider closed its state stream");
            break;
        }
    }
}

async fn apply(provider: &dyn IdentityProvider, api: &dyn SessionApi, state: &SignInState) {
    match state {
        SignInState::SignedIn { uid } => {
            debug!(uid = %uid, "signed in");
            let id_token = match provider.id_token().await {
                Ok(id_token) => id_token,
                Err(err) => {
                    warn!(error = %err, "failed to get ID token, server session not created");
                    return;
                }
            };
            if let Err(err) = api.create_session(id_token).await {
                warn!(error = %err, "failed to create server session");
            }
        }
        SignInState::SignedOut => {
            debug!("signed out");
            if let Err(err) = api.delete_session().await {
                warn!(error = %err, "failed to delete server session");
            }
        }
    }
}
