use web2onenote_core::{Account, IdentityProvider, MicrosoftIdentity, Result, StaticTokenIdentity};

/// The identity behind a command: a token passed on the command line, or a
/// device code sign-in against the identity platform.
pub enum Provider {
    Token(StaticTokenIdentity),
    Microsoft(MicrosoftIdentity),
}

impl IdentityProvider for Provider {
    fn accounts(&self) -> Vec<Account> {
        match self {
            Provider::Token(p) => p.accounts(),
            Provider::Microsoft(p) => p.accounts(),
        }
    }

    fn active_account(&self) -> Option<Account> {
        match self {
            Provider::Token(p) => p.active_account(),
            Provider::Microsoft(p) => p.active_account(),
        }
    }

    fn set_active_account(&mut self, account_id: &str) {
        match self {
            Provider::Token(p) => p.set_active_account(account_id),
            Provider::Microsoft(p) => p.set_active_account(account_id),
        }
    }

    async fn login_interactive(&mut self, scopes: &[&str]) -> Result<()> {
        match self {
            Provider::Token(p) => p.login_interactive(scopes).await,
            Provider::Microsoft(p) => p.login_interactive(scopes).await,
        }
    }

    async fn acquire_token_silent(&mut self, account: &Account, scopes: &[&str]) -> Result<String> {
        match self {
            Provider::Token(p) => p.acquire_token_silent(account, scopes).await,
            Provider::Microsoft(p) => p.acquire_token_silent(account, scopes).await,
        }
    }

    async fn acquire_token_interactive(&mut self, account: &Account, scopes: &[&str]) -> Result<String> {
        match self {
            Provider::Token(p) => p.acquire_token_interactive(account, scopes).await,
            Provider::Microsoft(p) => p.acquire_token_interactive(account, scopes).await,
        }
    }

    async fn logout(&mut self) -> Result<()> {
        match self {
            Provider::Token(p) => p.logout().await,
            Provider::Microsoft(p) => p.logout().await,
        }
    }
}
