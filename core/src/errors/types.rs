//! Error types for token acquisition and issuer calls
//!
//! Messages are bilingual (English | Chinese), separated by ` | `.

use thiserror::Error;

/// Failures reported by a credential issuer implementation
///
/// Issuer adapters classify their transport and protocol failures into these
/// variants; the token managers translate them into [`TokenError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssuerError {
    /// Transport failure, timeout or server-side outage
    #[error("Credential issuer unavailable: {message} | 凭证签发方不可用: {message}")]
    Unavailable { message: String },

    /// The issuer answered and refused the request
    #[error("Credential issuer rejected the request ({code}): {message} | 凭证签发方拒绝请求 ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// The presented refresh token is invalid, expired or already consumed
    #[error("Refresh token rejected ({code}): {message} | 刷新令牌无效 ({code}): {message}")]
    RefreshTokenInvalid { code: i64, message: String },
}

impl IssuerError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    pub fn refresh_token_invalid(code: i64, message: impl Into<String>) -> Self {
        Self::RefreshTokenInvalid {
            code,
            message: message.into(),
        }
    }
}

/// Errors surfaced by the app and user token managers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Credential issuer unavailable: {message} | 凭证签发方不可用: {message}")]
    IssuerUnavailable { message: String },

    #[error("Credential issuer rejected the request ({code}): {message} | 凭证签发方拒绝请求 ({code}): {message}")]
    IssuerRejected { code: i64, message: String },

    /// The user must grant access again; no automatic retry can succeed
    #[error("User {user_id} must re-authorize | 用户 {user_id} 需要重新授权")]
    ReauthorizationRequired { user_id: String },

    /// Another caller held the refresh lease for the whole wait budget
    #[error("Timed out after {waited_ms}ms waiting for refresh of {key} | 等待 {key} 刷新超时 ({waited_ms}ms)")]
    LeaseContention { key: String, waited_ms: u64 },

    /// The issuer granted a lifetime no longer than the freshness buffer
    #[error("Issued lifetime {lifetime_seconds}s does not exceed buffer {buffer_seconds}s | 令牌有效期 {lifetime_seconds}s 不超过缓冲期 {buffer_seconds}s")]
    LifetimeTooShort {
        lifetime_seconds: u64,
        buffer_seconds: u64,
    },

    #[error("Invalid input: {field} | 无效输入: {field}")]
    InvalidInput { field: String },

    #[error("Internal error: {message} | 内部错误: {message}")]
    Internal { message: String },
}

impl TokenError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::IssuerUnavailable { .. } => "ISSUER_UNAVAILABLE",
            TokenError::IssuerRejected { .. } => "ISSUER_REJECTED",
            TokenError::ReauthorizationRequired { .. } => "REAUTHORIZATION_REQUIRED",
            TokenError::LeaseContention { .. } => "LEASE_CONTENTION",
            TokenError::LifetimeTooShort { .. } => "LIFETIME_TOO_SHORT",
            TokenError::InvalidInput { .. } => "INVALID_INPUT",
            TokenError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether calling again later may succeed without operator or user action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TokenError::IssuerUnavailable { .. } | TokenError::LeaseContention { .. }
        )
    }

    pub fn invalid_input(field: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
        }
    }
}

impl From<IssuerError> for TokenError {
    fn from(err: IssuerError) -> Self {
        match err {
            IssuerError::Unavailable { message } => TokenError::IssuerUnavailable { message },
            IssuerError::Rejected { code, message }
            | IssuerError::RefreshTokenInvalid { code, message } => {
                TokenError::IssuerRejected { code, message }
            }
        }
    }
}
