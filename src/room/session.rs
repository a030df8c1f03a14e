use std::sync::Arc;

use crate::common::UserIdentity;
use crate::error::{ChatError, Result};
use crate::network::IdentityProvider;

use super::listeners::{ListenerId, Listeners};

/// Client-side mirror of the identity provider's session.
pub struct SessionState {
    provider: Arc<dyn IdentityProvider>,
    identity: Option<UserIdentity>,
    listeners: Listeners<Option<UserIdentity>>,
}

impl SessionState {
    /// Reads the provider's cached session synchronously.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let identity = provider.current_identity();
        Self {
            provider,
            identity,
            listeners: Listeners::new(),
        }
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Registers a callback fired on every absent/present transition.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&Option<UserIdentity>) + Send + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// On failure the session is left as it was.
    pub async fn sign_in(&mut self) -> Result<UserIdentity> {
        let provider = self.provider.clone();
        match provider.sign_in_interactive().await {
            Ok(identity) => {
                log::info!("Signed in as {}", identity.label());
                self.set(Some(identity.clone()));
                Ok(identity)
            }
            Err(err) => {
                log::warn!("Sign-in did not complete: {err}");
                Err(match err {
                    ChatError::Auth(reason) => ChatError::Auth(reason),
                    other => ChatError::Auth(other.to_string()),
                })
            }
        }
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        let provider = self.provider.clone();
        if let Err(err) = provider.sign_out().await {
            log::warn!("Sign-out did not complete: {err}");
            return Err(err);
        }
        log::info!("Signed out");
        self.set(None);
        Ok(())
    }

    /// Picks up session changes made behind our back (expiry, another
    /// window). Returns whether the state changed.
    pub fn refresh(&mut self) -> bool {
        let current = self.provider.current_identity();
        let changed = current != self.identity;
        self.set(current);
        changed
    }

    fn set(&mut self, next: Option<UserIdentity>) {
        if next != self.identity {
            self.identity = next;
            self.listeners.notify(&self.identity);
        }
    }
}
