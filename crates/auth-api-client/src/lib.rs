//! REST client for the Wellspring auth and profile endpoints.
//!
//! This crate provides:
//! - Request/response types for `auth/*` and `profile/me`
//! - The [`AuthApi`] trait the session manager depends on
//! - [`HttpAuthApi`], the reqwest implementation with bearer attachment and
//!   token deletion on HTTP 401

mod client;
mod error;
mod response;
mod types;

pub use client::{ApiRequestOptions, AuthApi, BearerTokenSource, HttpAuthApi};
pub use error::{ApiError, ApiResult};
pub use response::{interpret_response, DEFAULT_ERROR_MESSAGE};
pub use types::{
    AuthUser, ForgotPasswordRequest, LoginRequest, LoginResponse, LogoutRequest,
    MessageResponse, RefreshRequest, RefreshResponse, RegisterRequest, RegisterResponse,
    ResetPasswordRequest, ResetPasswordResponse, SendVerificationRequest, UserDetails,
    UserEssentials, VerifyEmailRequest, VerifyEmailResponse,
};
