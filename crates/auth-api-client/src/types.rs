//! Request and response bodies of the auth and profile endpoints.

use serde::{Deserialize, Serialize};

/// User summary embedded in auth responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response of `auth/login` and `auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub access_token: String,
    pub user: AuthUser,
}

/// Refresh returns the same shape as login.
pub type RefreshResponse = LoginResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct SendVerificationRequest {
    pub email: String,
}

/// Generic `{ message }` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// `email` and `token` travel in the query string, `new_password` in the body.
#[derive(Debug, Clone)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    #[serde(default)]
    pub message: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyEmailResponse {
    #[serde(default)]
    pub message: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEssentials {
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Current-user profile returned by `profile/me`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(default)]
    pub user_essentials: Option<UserEssentials>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserDetails {
    pub fn username(&self) -> Option<&str> {
        self.user_essentials.as_ref().map(|u| u.username.as_str())
    }
}
