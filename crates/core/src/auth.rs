//! Sign-in state and access-token acquisition.
//!
//! [`SessionManager`] owns an [`IdentityProvider`] and drives the
//! `SignedOut -> Authenticating -> SignedIn -> SignedOut` lifecycle on top of
//! it. The account store is the single source of truth: after an
//! interactive login the manager ignores what the provider returned and
//! re-reads the accounts instead.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{ClipperError, Result};

/// Scopes needed to read notebooks and create pages.
pub const NOTEBOOK_SCOPES: &[&str] = &["User.Read", "Notes.ReadWrite.All", "Notes.Create"];

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable account identifier.
    pub id: String,
    /// Sign-in name, usually an email address.
    pub username: String,
    /// Display name, when the provider knows it.
    pub name: Option<String>,
}

impl Account {
    /// Name to show the user.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.username)
    }
}

/// Identity platform seam.
///
/// Implementations own the account store and token cache. Every method that
/// talks to the network is async and takes `&mut self`; callers never share
/// a provider between tasks.
pub trait IdentityProvider {
    /// All accounts known to the store.
    fn accounts(&self) -> Vec<Account>;

    /// The account marked active, if any.
    fn active_account(&self) -> Option<Account>;

    /// Marks an account active.
    fn set_active_account(&mut self, account_id: &str);

    /// Runs an interactive sign-in for the given scopes.
    fn login_interactive(&mut self, scopes: &[&str]) -> impl Future<Output = Result<()>> + Send;

    /// Returns an access token without user interaction.
    fn acquire_token_silent(&mut self, account: &Account, scopes: &[&str])
    -> impl Future<Output = Result<String>> + Send;

    /// Returns an access token, prompting the user if needed.
    fn acquire_token_interactive(
        &mut self, account: &Account, scopes: &[&str],
    ) -> impl Future<Output = Result<String>> + Send;

    /// Forgets every account and cached token.
    fn logout(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Where the session stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    Authenticating,
    SignedIn(Account),
}

/// Result of [`SessionManager::check_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// The session just became signed in. Notebook discovery should run.
    SignedIn(Account),
    /// The session just became signed out. The notebook catalog should be
    /// cleared.
    SignedOut,
    /// Nothing changed.
    Unchanged,
}

/// Tracks sign-in state on top of an [`IdentityProvider`].
pub struct SessionManager<P> {
    provider: P,
    state: AuthState,
}

impl<P: IdentityProvider> SessionManager<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, state: AuthState::SignedOut }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.state, AuthState::SignedIn(_))
    }

    /// The signed-in account.
    pub fn account(&self) -> Option<&Account> {
        match &self.state {
            AuthState::SignedIn(account) => Some(account),
            _ => None,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    fn current_account(&self) -> Option<Account> {
        self.provider.active_account().or_else(|| self.provider.accounts().into_iter().next())
    }

    /// Signs in interactively.
    ///
    /// Success is decided solely by whether the account store holds an
    /// account afterwards. A provider error is only reported when no account
    /// showed up.
    pub async fn login(&mut self) -> Result<Account> {
        self.state = AuthState::Authenticating;
        let outcome = self.provider.login_interactive(NOTEBOOK_SCOPES).await;

        match self.current_account() {
            Some(account) => {
                if let Err(e) = &outcome {
                    tracing::debug!(error = %e, "interactive login reported an error but an account is present");
                }
                self.provider.set_active_account(&account.id);
                tracing::info!(account = %account.username, "signed in");
                self.state = AuthState::SignedIn(account.clone());
                Ok(account)
            }
            None => {
                self.state = AuthState::SignedOut;
                let reason = match outcome {
                    Err(e) => e.to_string(),
                    Ok(()) => "no account was returned".to_string(),
                };
                Err(ClipperError::AuthFailed(reason))
            }
        }
    }

    /// Signs out and clears the session.
    pub async fn logout(&mut self) -> Result<()> {
        let result = self.provider.logout().await;
        self.state = AuthState::SignedOut;
        tracing::info!("signed out");
        result
    }

    /// Returns an access token for the notebook scopes.
    ///
    /// # Errors
    ///
    /// [`ClipperError::AuthRequired`] when no account exists,
    /// [`ClipperError::AuthFailed`] when neither silent nor interactive
    /// acquisition produced a token.
    pub async fn get_access_token(&mut self) -> Result<String> {
        let account = self.current_account().ok_or(ClipperError::AuthRequired)?;
        self.provider.set_active_account(&account.id);

        match self.provider.acquire_token_silent(&account, NOTEBOOK_SCOPES).await {
            Ok(token) if !token.is_empty() => {
                self.state = AuthState::SignedIn(account);
                return Ok(token);
            }
            Ok(_) => tracing::warn!("silent token acquisition returned an empty token"),
            Err(e) => tracing::debug!(error = %e, "silent token acquisition failed, trying interactive"),
        }

        match self.provider.acquire_token_interactive(&account, NOTEBOOK_SCOPES).await {
            Ok(token) if !token.is_empty() => {
                self.state = AuthState::SignedIn(account);
                Ok(token)
            }
            Ok(_) => Err(ClipperError::AuthFailed("the identity provider returned an empty token".to_string())),
            Err(e) => Err(ClipperError::AuthFailed(e.to_string())),
        }
    }

    /// Re-derives the state from the account store.
    pub fn check_status(&mut self) -> StatusChange {
        let was_signed_in = self.is_signed_in();

        match self.current_account() {
            Some(account) => {
                self.provider.set_active_account(&account.id);
                self.state = AuthState::SignedIn(account.clone());
                if was_signed_in { StatusChange::Unchanged } else { StatusChange::SignedIn(account) }
            }
            None => {
                self.state = AuthState::SignedOut;
                if was_signed_in { StatusChange::SignedOut } else { StatusChange::Unchanged }
            }
        }
    }
}
