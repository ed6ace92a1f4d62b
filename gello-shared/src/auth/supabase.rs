/// [`AuthProvider`] backed by the hosted auth HTTP API
///
/// # Endpoints
///
/// | operation               | request                                          | key          |
/// |-------------------------|--------------------------------------------------|--------------|
/// | `sign_up`               | `POST /auth/v1/signup`                           | anon         |
/// | `sign_in_with_password` | `POST /auth/v1/token?grant_type=password`        | anon         |
/// | `refresh_session`       | `POST /auth/v1/token?grant_type=refresh_token`   | anon         |
/// | `sign_out`              | `POST /auth/v1/logout` (user bearer)             | anon         |
/// | `delete_user`           | `DELETE /auth/v1/admin/users/{id}`               | service role |
///
/// The service-role key bypasses every access policy and is only ever sent on
/// `delete_user`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::provider::{
    AuthIdentity, AuthProvider, AuthProviderError, AuthTokens, SignedIn, SignedUp,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hosted auth API client
#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl std::fmt::Debug for SupabaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAuth")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl RemoteUser {
    fn into_identity(self, fallback_email: &str) -> AuthIdentity {
        AuthIdentity {
            id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteSession {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: RemoteUser,
}

impl RemoteSession {
    fn into_signed_in(self, fallback_email: &str) -> SignedIn {
        SignedIn {
            identity: self.user.into_identity(fallback_email),
            tokens: AuthTokens {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_in: self.expires_in,
            },
        }
    }
}

/// Sign-up answers with a session when email confirmation is off and with
/// the bare user otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(RemoteSession),
    User(RemoteUser),
}

/// Error payload; field names differ between endpoints and service versions
#[derive(Debug, Default, Deserialize)]
struct RemoteError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RemoteError {
    fn text(&self) -> String {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }

    fn is_duplicate_user(&self) -> bool {
        self.error_code.as_deref() == Some("user_already_exists")
            || self.text().to_lowercase().contains("already registered")
    }
}

impl SupabaseAuth {
    /// Creates a client for the project at `base_url`
    pub fn new(
        base_url: &str,
        anon_key: &str,
        service_role_key: &str,
    ) -> Result<Self, AuthProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthProviderError::Upstream(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_role_key: service_role_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn public(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    fn service_role(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn send(builder: RequestBuilder) -> Result<Response, AuthProviderError> {
        builder
            .send()
            .await
            .map_err(|e| AuthProviderError::Upstream(e.to_string()))
    }

    /// Splits a response into its success body or a parsed error payload
    async fn read<T: for<'de> Deserialize<'de>>(
        response: Response,
    ) -> Result<Result<T, (StatusCode, RemoteError)>, AuthProviderError> {
        let status = response.status();

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthProviderError::Upstream(format!("{}: {}", status, body)));
        }

        if !status.is_success() {
            let error = response.json::<RemoteError>().await.unwrap_or_default();
            return Ok(Err((status, error)));
        }

        response
            .json::<T>()
            .await
            .map(Ok)
            .map_err(|e| AuthProviderError::Upstream(format!("Unexpected response: {}", e)))
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignedUp, AuthProviderError> {
        let request = self.public(self.client.post(self.url("/signup"))).json(&json!({
            "email": email,
            "password": password,
            "data": { "display_name": display_name },
        }));

        match Self::read::<SignUpResponse>(Self::send(request).await?).await? {
            Ok(SignUpResponse::Session(session)) => {
                let signed_in = session.into_signed_in(email);
                Ok(SignedUp {
                    identity: signed_in.identity,
                    tokens: Some(signed_in.tokens),
                })
            }
            Ok(SignUpResponse::User(user)) => Ok(SignedUp {
                identity: user.into_identity(email),
                tokens: None,
            }),
            Err((_, error)) if error.is_duplicate_user() => Err(AuthProviderError::DuplicateUser),
            Err((_, error)) => Err(AuthProviderError::Rejected(error.text())),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AuthProviderError> {
        let request = self
            .public(self.client.post(self.url("/token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }));

        match Self::read::<RemoteSession>(Self::send(request).await?).await? {
            Ok(session) => Ok(session.into_signed_in(email)),
            Err((StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED, _)) => {
                Err(AuthProviderError::InvalidCredentials)
            }
            Err((_, error)) => Err(AuthProviderError::Rejected(error.text())),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<SignedIn, AuthProviderError> {
        let request = self
            .public(self.client.post(self.url("/token?grant_type=refresh_token")))
            .json(&json!({ "refresh_token": refresh_token }));

        match Self::read::<RemoteSession>(Self::send(request).await?).await? {
            Ok(session) => Ok(session.into_signed_in("")),
            Err((StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED, _)) => {
                Err(AuthProviderError::InvalidRefreshToken)
            }
            Err((_, error)) => Err(AuthProviderError::Rejected(error.text())),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        let request = self
            .public(self.client.post(self.url("/logout")))
            .bearer_auth(access_token);

        let response = Self::send(request).await?;
        let status = response.status();

        // an already-revoked session is as good as signed out
        if status.is_success() || status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        if status.is_server_error() {
            return Err(AuthProviderError::Upstream(status.to_string()));
        }

        let error = response.json::<RemoteError>().await.unwrap_or_default();
        Err(AuthProviderError::Rejected(error.text()))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthProviderError> {
        let request = self.service_role(
            self.client
                .delete(self.url(&format!("/admin/users/{}", user_id))),
        );

        match Self::read::<serde_json::Value>(Self::send(request).await?).await? {
            Ok(_) => Ok(()),
            Err((StatusCode::NOT_FOUND, _)) => Err(AuthProviderError::UserNotFound),
            Err((_, error)) => Err(AuthProviderError::Rejected(error.text())),
        }
    }
}
