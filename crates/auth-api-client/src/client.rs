//! HTTP client for the auth and profile endpoints.

use crate::response::interpret_response;
use crate::types::*;
use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Where the client reads the bearer token from, and what it clears on 401.
pub trait BearerTokenSource: Send + Sync {
    /// Current access token, if a readable one is stored.
    fn access_token(&self) -> Option<String>;

    /// Drop the stored access token after the server rejected it.
    fn clear_access_token(&self);
}

/// Per-request options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiRequestOptions {
    /// Send and accept cookies (the server keeps the refresh credential in one).
    pub with_credentials: bool,
    /// Do not attach `Authorization: Bearer`.
    pub skip_token: bool,
}

impl ApiRequestOptions {
    pub fn credentialed() -> Self {
        Self {
            with_credentials: true,
            skip_token: false,
        }
    }
}

/// Remote auth operations used by the session manager.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> ApiResult<RegisterResponse>;

    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse>;

    async fn logout(&self, request: &LogoutRequest) -> ApiResult<()>;

    async fn refresh(&self, request: &RefreshRequest) -> ApiResult<RefreshResponse>;

    async fn forgot_password(&self, request: &ForgotPasswordRequest)
        -> ApiResult<MessageResponse>;

    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> ApiResult<ResetPasswordResponse>;

    async fn send_verification(
        &self,
        request: &SendVerificationRequest,
    ) -> ApiResult<MessageResponse>;

    async fn verify_email(&self, request: &VerifyEmailRequest) -> ApiResult<VerifyEmailResponse>;

    /// Fetch the current user's profile (`GET profile/me`).
    async fn get_me(&self) -> ApiResult<UserDetails>;
}

/// [`AuthApi`] over HTTP.
#[derive(Clone)]
pub struct HttpAuthApi {
    /// Shares the cookie jar with nothing; used when `with_credentials` is off.
    http_client: reqwest::Client,
    /// Keeps server-set cookies across credentialed calls.
    credentialed_client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn BearerTokenSource>,
}

impl HttpAuthApi {
    /// Create a client rooted at `base_url` (for example `http://localhost:8080/api`).
    pub fn new(
        base_url: &Url,
        tokens: Arc<dyn BearerTokenSource>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let credentialed_client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http_client,
            credentialed_client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `endpoint` with `query` appended.
    fn endpoint_url(&self, endpoint: &str, query: &[(&str, &str)]) -> ApiResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.base_url,
            endpoint.trim_start_matches('/')
        ))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        options: ApiRequestOptions,
    ) -> ApiResult<reqwest::Request> {
        let url = self.endpoint_url(endpoint, query)?;
        let client = if options.with_credentials {
            &self.credentialed_client
        } else {
            &self.http_client
        };

        let mut builder = client
            .request(method, url)
            .header(header::ACCEPT, "application/json");

        if !options.skip_token {
            if let Some(token) = self.tokens.access_token() {
                builder = builder.bearer_auth(token);
            }
        }

        if let Some(body) = body {
            builder = builder.json(body);
        }

        Ok(builder.build()?)
    }

    /// Send a request and interpret the response; `Ok(None)` means no body.
    async fn call<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        options: ApiRequestOptions,
    ) -> ApiResult<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.build_request(method, endpoint, query, body, options)?;
        let client = if options.with_credentials {
            &self.credentialed_client
        } else {
            &self.http_client
        };

        tracing::debug!(method = %request.method(), endpoint, "API request");

        let response = client.execute(request).await?;
        let status = response.status().as_u16();
        let content_type = header_string(&response, header::CONTENT_TYPE);
        let content_length = header_string(&response, header::CONTENT_LENGTH);
        let text = response.text().await?;

        let value = match interpret_response(
            status,
            content_type.as_deref(),
            content_length.as_deref(),
            &text,
        ) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    endpoint,
                    status,
                    body_summary = %summarize_response_body(&text),
                    "API request failed"
                );
                if matches!(err, ApiError::Unauthorized(_)) {
                    self.tokens.clear_access_token();
                }
                return Err(err);
            }
        };

        value
            .map(|v| {
                serde_json::from_value(v).map_err(|e| ApiError::Decode(format!("{endpoint}: {e}")))
            })
            .transpose()
    }

    async fn call_required<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        options: ApiRequestOptions,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(method, endpoint, query, body, options)
            .await?
            .ok_or_else(|| ApiError::Decode(format!("{endpoint}: empty response")))
    }
}

fn header_string(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn require(value: &str, message: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(message.to_string()));
    }
    Ok(())
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn register(&self, request: &RegisterRequest) -> ApiResult<RegisterResponse> {
        self.call_required(
            Method::POST,
            "auth/register",
            &[],
            Some(request),
            ApiRequestOptions::default(),
        )
        .await
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.call_required(
            Method::POST,
            "auth/login",
            &[],
            Some(request),
            ApiRequestOptions::credentialed(),
        )
        .await
    }

    async fn logout(&self, request: &LogoutRequest) -> ApiResult<()> {
        let _: Option<serde_json::Value> = self
            .call(
                Method::POST,
                "auth/logout",
                &[],
                Some(request),
                ApiRequestOptions::credentialed(),
            )
            .await?;
        Ok(())
    }

    async fn refresh(&self, request: &RefreshRequest) -> ApiResult<RefreshResponse> {
        self.call_required(
            Method::POST,
            "auth/refresh",
            &[],
            Some(request),
            ApiRequestOptions {
                with_credentials: true,
                skip_token: true,
            },
        )
        .await
    }

    async fn forgot_password(
        &self,
        request: &ForgotPasswordRequest,
    ) -> ApiResult<MessageResponse> {
        require(&request.email, "Email is required")?;
        Ok(self
            .call(
                Method::POST,
                "auth/forgot-password",
                &[("email", request.email.as_str())],
                NO_BODY,
                ApiRequestOptions::default(),
            )
            .await?
            .unwrap_or_default())
    }

    async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> ApiResult<ResetPasswordResponse> {
        require(&request.email, "Email is required")?;
        require(&request.token, "Reset token is required")?;
        require(&request.new_password, "New password is required")?;
        let body = serde_json::json!({ "newPassword": request.new_password });
        self.call_required(
            Method::POST,
            "auth/reset-password",
            &[
                ("email", request.email.as_str()),
                ("token", request.token.as_str()),
            ],
            Some(&body),
            ApiRequestOptions::default(),
        )
        .await
    }

    async fn send_verification(
        &self,
        request: &SendVerificationRequest,
    ) -> ApiResult<MessageResponse> {
        require(&request.email, "Email is required")?;
        Ok(self
            .call(
                Method::POST,
                "auth/send-verification",
                &[("email", request.email.as_str())],
                NO_BODY,
                ApiRequestOptions::default(),
            )
            .await?
            .unwrap_or_default())
    }

    async fn verify_email(&self, request: &VerifyEmailRequest) -> ApiResult<VerifyEmailResponse> {
        require(&request.email, "Email is required")?;
        require(&request.token, "Verification token is required")?;
        self.call_required(
            Method::GET,
            "auth/verify-email",
            &[
                ("email", request.email.as_str()),
                ("token", request.token.as_str()),
            ],
            NO_BODY,
            ApiRequestOptions::default(),
        )
        .await
    }

    async fn get_me(&self) -> ApiResult<UserDetails> {
        self.call_required(
            Method::GET,
            "profile/me",
            &[],
            NO_BODY,
            ApiRequestOptions::credentialed(),
        )
        .await
    }
}
