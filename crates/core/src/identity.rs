//! Identity providers for the Microsoft identity platform.
//!
//! [`MicrosoftIdentity`] signs in with the OAuth 2.0 device authorization
//! grant, keeps the resulting tokens in memory, refreshes them silently and
//! can mirror the session to a JSON file so that separate command-line runs
//! share it. [`StaticTokenIdentity`] wraps an access token obtained
//! elsewhere.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::auth::{Account, IdentityProvider};
use crate::{ClipperError, Result};

/// Default sign-in authority for personal and work accounts.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common";

/// Scopes added to every request so an ID token and a refresh token come back.
const IDENTITY_SCOPES: &[&str] = &["openid", "profile", "offline_access"];

/// Cached tokens are refreshed when they expire within this window.
const EXPIRY_SKEW: Duration = Duration::from_secs(5 * 60);

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Polling interval when the device code response does not carry one.
const DEFAULT_POLL_INTERVAL: u64 = 5;

/// Settings for [`MicrosoftIdentity`].
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Application (client) id of the app registration.
    pub client_id: String,
    /// Authority URL, without the `/oauth2/v2.0` suffix.
    pub authority: String,
    /// Session cache file. `None` keeps the session in memory only.
    pub cache_path: Option<PathBuf>,
    /// Timeout for each identity request.
    pub timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            authority: DEFAULT_AUTHORITY.to_string(),
            cache_path: default_cache_path(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl IdentityConfig {
    pub fn builder() -> IdentityConfigBuilder {
        IdentityConfigBuilder::default()
    }
}

/// Fluent builder for [`IdentityConfig`].
#[derive(Default)]
pub struct IdentityConfigBuilder {
    config: IdentityConfig,
}

impl IdentityConfigBuilder {
    pub fn client_id(mut self, value: impl Into<String>) -> Self {
        self.config.client_id = value.into();
        self
    }

    pub fn authority(mut self, value: impl Into<String>) -> Self {
        self.config.authority = value.into();
        self
    }

    pub fn cache_path(mut self, value: Option<PathBuf>) -> Self {
        self.config.cache_path = value;
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.config.timeout = value;
        self
    }

    pub fn build(self) -> IdentityConfig {
        self.config
    }
}

/// `<cache dir>/web2onenote/session.json`, when the platform has a cache dir.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("web2onenote").join("session.json"))
}

/// What the user needs to finish a device code sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCodePrompt {
    pub user_code: String,
    pub verification_uri: String,
    /// Ready-made instruction text from the identity platform.
    pub message: String,
    pub expires_in: Duration,
}

type PromptFn = Box<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

/// An access token and what is needed to renew it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub secret: String,
    /// Expiry as seconds since the Unix epoch.
    pub expires_at: u64,
    pub refresh_token: Option<String>,
}

impl AccessToken {
    fn is_fresh(&self, now: u64) -> bool {
        self.expires_at > now + EXPIRY_SKEW.as_secs()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredSession {
    account: Account,
    token: AccessToken,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthError {
    fn into_auth_failed(self) -> ClipperError {
        ClipperError::AuthFailed(match self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct IdClaims {
    oid: Option<String>,
    sub: Option<String>,
    name: Option<String>,
    preferred_username: Option<String>,
}

/// Reads the account out of an ID token's claims.
///
/// The signature is not verified; the token came straight from the token
/// endpoint over TLS.
fn account_from_id_token(id_token: &str) -> Result<Account> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| ClipperError::AuthFailed("malformed ID token".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClipperError::AuthFailed(format!("undecodable ID token: {e}")))?;
    let claims: IdClaims = serde_json::from_slice(&bytes)?;

    let id = claims
        .oid
        .or(claims.sub)
        .ok_or_else(|| ClipperError::AuthFailed("ID token carries no subject".to_string()))?;

    Ok(Account { id, username: claims.preferred_username.unwrap_or_default(), name: claims.name })
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Microsoft identity platform provider using the device code flow.
pub struct MicrosoftIdentity {
    client: Client,
    config: IdentityConfig,
    session: Option<StoredSession>,
    prompt: PromptFn,
}

impl MicrosoftIdentity {
    /// Creates the provider and loads a cached session, if one exists.
    ///
    /// # Errors
    ///
    /// [`ClipperError::ConfigError`] when no client id is configured.
    pub fn new(config: IdentityConfig) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(ClipperError::ConfigError(
                "a client id is required (set --client-id or WEB2ONENOTE_CLIENT_ID)".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClipperError::Network(e.to_string()))?;
        let session = config.cache_path.as_deref().and_then(load_session);

        Ok(Self { client, config, session, prompt: Box::new(default_prompt) })
    }

    /// Sets the callback that shows the device code to the user.
    pub fn with_prompt(mut self, prompt: impl Fn(&DeviceCodePrompt) + Send + Sync + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// The cached access token, if any.
    pub fn cached_token(&self) -> Option<&AccessToken> {
        self.session.as_ref().map(|s| &s.token)
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/oauth2/v2.0/{}", self.config.authority.trim_end_matches('/'), name)
    }

    fn scope_string(scopes: &[&str]) -> String {
        scopes.iter().chain(IDENTITY_SCOPES).copied().collect::<Vec<_>>().join(" ")
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self, endpoint: &str, form: &[(&str, &str)],
    ) -> Result<std::result::Result<T, OAuthError>> {
        let response = self
            .client
            .post(endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| ClipperError::AuthFailed(format!("identity request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClipperError::AuthFailed(format!("identity response unreadable: {e}")))?;

        if status.is_success() {
            Ok(Ok(serde_json::from_str(&body)?))
        } else {
            serde_json::from_str::<OAuthError>(&body)
                .map(Err)
                .map_err(|_| ClipperError::AuthFailed(format!("identity platform returned HTTP {}", status.as_u16())))
        }
    }

    /// Runs the device code flow to completion.
    async fn device_code_flow(&mut self, scopes: &[&str]) -> Result<StoredSession> {
        let scope = Self::scope_string(scopes);
        let device: DeviceCodeResponse = self
            .post_form(&self.endpoint("devicecode"), &[("client_id", self.config.client_id.as_str()), ("scope", scope.as_str())])
            .await?
            .map_err(OAuthError::into_auth_failed)?;

        let prompt = DeviceCodePrompt {
            message: device.message.clone().unwrap_or_else(|| {
                format!("To sign in, open {} and enter the code {}", device.verification_uri, device.user_code)
            }),
            user_code: device.user_code,
            verification_uri: device.verification_uri,
            expires_in: Duration::from_secs(device.expires_in),
        };
        (self.prompt)(&prompt);

        let mut interval = Duration::from_secs(device.interval.unwrap_or(DEFAULT_POLL_INTERVAL));
        let deadline = tokio::time::Instant::now() + prompt.expires_in;
        let token_endpoint = self.endpoint("token");

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() > deadline {
                return Err(ClipperError::AuthFailed("the device code expired before sign-in completed".to_string()));
            }

            let form = [
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.config.client_id.as_str()),
                ("device_code", device.device_code.as_str()),
            ];
            match self.post_form::<TokenResponse>(&token_endpoint, &form).await? {
                Ok(token) => return self.session_from(token, None),
                Err(e) if e.error == "authorization_pending" => {
                    tracing::debug!("waiting for the user to finish signing in");
                }
                Err(e) if e.error == "slow_down" => {
                    interval += Duration::from_secs(5);
                    tracing::debug!(interval = ?interval, "identity platform asked to slow down");
                }
                Err(e) => return Err(e.into_auth_failed()),
            }
        }
    }

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, current: &StoredSession, scopes: &[&str]) -> Result<StoredSession> {
        let refresh_token = current
            .token
            .refresh_token
            .as_deref()
            .ok_or_else(|| ClipperError::AuthFailed("no refresh token is cached".to_string()))?;
        let scope = Self::scope_string(scopes);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        let token = self
            .post_form::<TokenResponse>(&self.endpoint("token"), &form)
            .await?
            .map_err(OAuthError::into_auth_failed)?;

        self.session_from(token, Some(current))
    }

    /// Builds a session from a token response. A missing ID token or refresh
    /// token keeps the previous session's values.
    fn session_from(&self, token: TokenResponse, previous: Option<&StoredSession>) -> Result<StoredSession> {
        let account = match (&token.id_token, previous) {
            (Some(id_token), _) => account_from_id_token(id_token)?,
            (None, Some(previous)) => previous.account.clone(),
            (None, None) => return Err(ClipperError::AuthFailed("no ID token in the token response".to_string())),
        };
        let refresh_token = token.refresh_token.or_else(|| previous.and_then(|p| p.token.refresh_token.clone()));

        Ok(StoredSession {
            account,
            token: AccessToken {
                secret: token.access_token,
                expires_at: now_secs() + token.expires_in,
                refresh_token,
            },
        })
    }

    fn store(&mut self, session: StoredSession) -> String {
        let secret = session.token.secret.clone();
        if let Some(path) = &self.config.cache_path
            && let Err(e) = save_session(path, &session)
        {
            tracing::warn!(path = %path.display(), "could not write the session cache: {e}");
        }
        self.session = Some(session);
        secret
    }
}

impl IdentityProvider for MicrosoftIdentity {
    fn accounts(&self) -> Vec<Account> {
        self.session.iter().map(|s| s.account.clone()).collect()
    }

    fn active_account(&self) -> Option<Account> {
        self.session.as_ref().map(|s| s.account.clone())
    }

    fn set_active_account(&mut self, account_id: &str) {
        if self.session.as_ref().is_some_and(|s| s.account.id != account_id) {
            tracing::debug!(account_id, "requested account is not cached");
        }
    }

    async fn login_interactive(&mut self, scopes: &[&str]) -> Result<()> {
        let session = self.device_code_flow(scopes).await?;
        self.store(session);
        Ok(())
    }

    async fn acquire_token_silent(&mut self, account: &Account, scopes: &[&str]) -> Result<String> {
        let current = self
            .session
            .clone()
            .filter(|s| s.account.id == account.id)
            .ok_or_else(|| ClipperError::AuthFailed("no cached session for this account".to_string()))?;

        if current.token.is_fresh(now_secs()) {
            return Ok(current.token.secret);
        }

        tracing::debug!("cached access token is expiring, refreshing");
        let refreshed = self.refresh(&current, scopes).await?;
        Ok(self.store(refreshed))
    }

    async fn acquire_token_interactive(&mut self, _account: &Account, scopes: &[&str]) -> Result<String> {
        let session = self.device_code_flow(scopes).await?;
        Ok(self.store(session))
    }

    async fn logout(&mut self) -> Result<()> {
        self.session = None;
        if let Some(path) = &self.config.cache_path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn default_prompt(prompt: &DeviceCodePrompt) {
    tracing::info!(user_code = %prompt.user_code, uri = %prompt.verification_uri, "{}", prompt.message);
}

fn load_session(path: &Path) -> Option<StoredSession> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable session cache: {e}");
            None
        }
    }
}

fn save_session(path: &Path, session: &StoredSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(session)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Provider backed by an access token obtained out of band.
///
/// It reports a single synthetic account while it holds a token and never
/// prompts.
#[derive(Debug, Clone)]
pub struct StaticTokenIdentity {
    token: Option<String>,
}

impl StaticTokenIdentity {
    pub const ACCOUNT_ID: &'static str = "static-token";

    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self { token: (!token.trim().is_empty()).then_some(token) }
    }

    fn account() -> Account {
        Account { id: Self::ACCOUNT_ID.to_string(), username: "access token".to_string(), name: None }
    }

    fn token(&self) -> Result<String> {
        self.token.clone().ok_or(ClipperError::AuthRequired)
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn accounts(&self) -> Vec<Account> {
        self.token.iter().map(|_| Self::account()).collect()
    }

    fn active_account(&self) -> Option<Account> {
        self.token.as_ref().map(|_| Self::account())
    }

    fn set_active_account(&mut self, _account_id: &str) {}

    async fn login_interactive(&mut self, _scopes: &[&str]) -> Result<()> {
        self.token().map(drop)
    }

    async fn acquire_token_silent(&mut self, _account: &Account, _scopes: &[&str]) -> Result<String> {
        self.token()
    }

    async fn acquire_token_interactive(&mut self, _account: &Account, _scopes: &[&str]) -> Result<String> {
        self.token()
    }

    async fn logout(&mut self) -> Result<()> {
        self.token = None;
        Ok(())
    }
}
