//! OAuth2 authorization-code flow against the supported providers

use std::collections::HashMap;

use async_trait::async_trait;
use connect_core::{Profile, ProviderName};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use super::{AuthError, Authenticator, CallbackParams};
use crate::config::Config;

const STATE_COOKIE_PREFIX: &str = "oauth_state_";
const USER_AGENT: &str = "connect-web";

/// Where a provider's OAuth and profile APIs live
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub scopes: Vec<String>,
}

impl ProviderEndpoints {
    pub fn for_provider(provider: ProviderName) -> Self {
        match provider {
            ProviderName::GitHub => Self {
                auth_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                api_base_url: "https://api.github.com".to_string(),
                scopes: vec!["user:email".to_string()],
            },
        }
    }
}

struct ProviderClient {
    client: BasicClient,
    endpoints: ProviderEndpoints,
}

/// Authenticator backed by real OAuth2 providers
pub struct OAuthAuthenticator {
    clients: HashMap<ProviderName, ProviderClient>,
    cookie_key: Key,
    http: reqwest::Client,
}

impl OAuthAuthenticator {
    pub fn new(cookie_key: Key) -> Self {
        Self {
            clients: HashMap::new(),
            cookie_key,
            http: reqwest::Client::new(),
        }
    }

    /// Register every provider that has credentials in `config`
    pub fn from_config(config: &Config, cookie_key: Key) -> Result<Self, AuthError> {
        let mut authenticator = Self::new(cookie_key);
        for provider in ProviderName::ALL.iter().copied() {
            match config.provider_client(provider) {
                Some(creds) => {
                    authenticator = authenticator.with_provider(
                        provider,
                        &creds.client_id,
                        &creds.client_secret,
                        &config.redirect_url(provider),
                        ProviderEndpoints::for_provider(provider),
                    )?;
                }
                None => tracing::warn!(%provider, "No OAuth credentials configured"),
            }
        }
        Ok(authenticator)
    }

    pub fn with_provider(
        mut self,
        provider: ProviderName,
        client_id: &str,
        client_secret: &str,
        redirect_url: &str,
        endpoints: ProviderEndpoints,
    ) -> Result<Self, AuthError> {
        let auth_url =
            AuthUrl::new(endpoints.auth_url.clone()).map_err(|e| AuthError::Config(e.to_string()))?;
        let token_url = TokenUrl::new(endpoints.token_url.clone())
            .map_err(|e| AuthError::Config(e.to_string()))?;
        let redirect_url = RedirectUrl::new(redirect_url.to_string())
            .map_err(|e| AuthError::Config(e.to_string()))?;

        let client = BasicClient::new(
            ClientId::new(client_id.to_string()),
            Some(ClientSecret::new(client_secret.to_string())),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        self.clients
            .insert(provider, ProviderClient { client, endpoints });
        Ok(self)
    }

    fn client(&self, provider: ProviderName) -> Result<&ProviderClient, AuthError> {
        self.clients
            .get(&provider)
            .ok_or(AuthError::NotConfigured(provider))
    }

    fn write_state(&self, cookies: &Cookies, provider: ProviderName, state: &str) {
        let cookie = Cookie::build((state_cookie_name(provider), state.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(Duration::minutes(10))
            .build();
        cookies.private(&self.cookie_key).add(cookie);
    }

    fn take_state(&self, cookies: &Cookies, provider: ProviderName) -> Option<String> {
        let private = cookies.private(&self.cookie_key);
        let cookie = private.get(&state_cookie_name(provider))?;
        let value = cookie.value().to_string();
        private.remove(Cookie::build((state_cookie_name(provider), "")).path("/").build());
        Some(value)
    }

    async fn fetch_profile(
        &self,
        provider: ProviderName,
        endpoints: &ProviderEndpoints,
        access_token: &str,
    ) -> Result<Profile, AuthError> {
        match provider {
            ProviderName::GitHub => self.fetch_github_profile(endpoints, access_token).await,
        }
    }

    async fn fetch_github_profile(
        &self,
        endpoints: &ProviderEndpoints,
        access_token: &str,
    ) -> Result<Profile, AuthError> {
        let base = endpoints.api_base_url.trim_end_matches('/');
        let user: GitHubUser = self.github_get(&format!("{}/user", base), access_token).await?;

        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => email,
            None => {
                let emails: Vec<GitHubEmail> = self
                    .github_get(&format!("{}/user/emails", base), access_token)
                    .await?;
                primary_email(&emails)
                    .ok_or_else(|| AuthError::Profile("no verified email on account".to_string()))?
            }
        };

        Ok(Profile {
            id: user.id.to_string(),
            email,
            username: Some(user.login),
            name: user.name,
            image_url: user.avatar_url,
        })
    }

    async fn github_get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, AuthError> {
        self.http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Profile(e.to_string()))
    }
}

#[async_trait]
impl Authenticator for OAuthAuthenticator {
    async fn authorization_url(
        &self,
        provider: ProviderName,
        cookies: &Cookies,
    ) -> Result<String, AuthError> {
        let provider_client = self.client(provider)?;

        let (url, csrf_token) = provider_client
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(provider_client.endpoints.scopes.iter().cloned().map(Scope::new))
            .url();

        self.write_state(cookies, provider, csrf_token.secret());
        Ok(url.to_string())
    }

    async fn authenticate(
        &self,
        provider: ProviderName,
        params: &CallbackParams,
        cookies: &Cookies,
    ) -> Result<Profile, AuthError> {
        let provider_client = self.client(provider)?;

        // The stored state is single-use whatever happens next
        let stored_state = self.take_state(cookies, provider);

        if let Some(error) = &params.error {
            let detail = params.error_description.as_deref().unwrap_or(error);
            return Err(AuthError::Provider(detail.to_string()));
        }
        let code = params.code.clone().ok_or(AuthError::MissingCode)?;
        match (&params.state, &stored_state) {
            (Some(received), Some(stored)) if received == stored => {}
            _ => return Err(AuthError::StateMismatch),
        }

        let token = provider_client
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        self.fetch_profile(provider, &provider_client.endpoints, token.access_token().secret())
            .await
    }
}

fn state_cookie_name(provider: ProviderName) -> String {
    format!("{}{}", STATE_COOKIE_PREFIX, provider)
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

/// The primary verified address, falling back to any verified one
fn primary_email(emails: &[GitHubEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
        .map(|e| e.email.clone())
}
