//! Error types for tallysync.
//!
//! Errors are grouped by the boundary that raises them:
//!
//! - [`ValidationError`] - rejected input, raised before any store I/O
//! - [`ParseError`] - a single field of a remote payload could not be decoded
//! - [`AuthError`] - sign-in, sign-up and token refresh failures
//! - [`ConfigError`] - remote project configuration could not be read
//! - [`SyncError`] - anything that aborts a sync pass
//! - [`BuildError`] - the local store or an HTTP client could not be set up
//!
//! Only the sync orchestration layer inspects a [`SyncError`]; it does so once,
//! through [`SyncError::class`].

use sea_orm::DbErr;
use thiserror::Error;

/// Input rejected at the service boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{field} must be greater than 0 (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("malformed date: {0}")]
    MalformedDate(String),

    #[error("malformed email address: {0}")]
    MalformedEmail(String),

    #[error("password must be at least {min} characters long")]
    WeakPassword { min: usize },

    #[error("{0}")]
    InvalidState(String),

    #[error("record {kind} #{id} not found")]
    NotFound { kind: &'static str, id: i32 },
}

/// A remote field that could not be decoded into its local type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` holds an invalid timestamp: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("field `{field}` holds an invalid date: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("field `{field}` holds an unknown value: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("remote key `{0}` is not a record id")]
    InvalidKey(String),
}

/// Failures reported by the identity backend or rejected client-side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("wrong email or password")]
    InvalidCredentials,

    #[error("the email address is not valid")]
    InvalidEmail,

    #[error("an account already exists for this email address")]
    EmailAlreadyExists,

    #[error("the password is too weak (at least 6 characters)")]
    WeakPassword,

    #[error("this account has been disabled")]
    UserDisabled,

    #[error("no internet connection; the app keeps working offline, but signing in requires a connection")]
    NetworkUnavailable,

    #[error("the remote project rejected email/password authentication: {0}")]
    BackendMisconfigured(String),

    #[error("remote backend is not configured")]
    NotConfigured,

    #[error("authentication failed: {0}")]
    Rejected(String),

    #[error("could not store the session: {0}")]
    SessionStorage(String),
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MalformedEmail(_) => AuthError::InvalidEmail,
            ValidationError::WeakPassword { .. } => AuthError::WeakPassword,
            other => AuthError::Rejected(other.to_string()),
        }
    }
}

/// Failure of an application-path operation on the local store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

/// Remote project configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration is missing `{0}`")]
    Missing(&'static str),
}

/// Failure while wiring up a [`TallySync`](crate::TallySync) handle.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to open local store: {0}")]
    Store(#[from] DbErr),

    #[error("failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Anything that aborts a sync pass.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("not signed in")]
    SessionMissing,

    #[error("could not obtain a valid access token")]
    TokenUnavailable,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("remote backend is not configured")]
    NotConfigured,

    #[error("local store error: {0}")]
    Store(#[from] DbErr),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed remote data: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => SyncError::Validation(e),
            StoreError::Db(e) => SyncError::Store(e),
        }
    }
}

/// How the orchestration layer treats a failed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected credentials or token: eligible for one refresh + retry.
    Auth,
    /// No connectivity: reported immediately.
    Network,
    /// Everything else: reported with the raw error text.
    Other,
}

const AUTH_MARKERS: &[&str] = &[
    "permission denied",
    "permission_denied",
    "unauthorized",
    "unauthenticated",
    "401",
    "403",
    "auth token",
    "token expired",
    "invalid token",
];

const NETWORK_MARKERS: &[&str] = &["network", "connection", "timed out", "timeout", "dns"];

impl SyncError {
    /// Classify this error for the retry policy.
    ///
    /// Typed variants decide directly; remote errors without a typed signal are
    /// classified by the markers found in their text.
    pub fn class(&self) -> ErrorClass {
        match self {
            SyncError::PermissionDenied(_) | SyncError::TokenUnavailable => ErrorClass::Auth,
            SyncError::Network(_) | SyncError::Auth(AuthError::NetworkUnavailable) => {
                ErrorClass::Network
            }
            SyncError::Remote { status, .. } if *status == 401 || *status == 403 => ErrorClass::Auth,
            SyncError::Remote { .. } => classify_text(&self.to_string()),
            _ => ErrorClass::Other,
        }
    }
}

/// Classify free-form error text by its authentication and network markers.
pub fn classify_text(text: &str) -> ErrorClass {
    let lower = text.to_lowercase();
    if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorClass::Auth
    } else if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorClass::Network
    } else {
        ErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_permission_error_is_auth() {
        let err = SyncError::PermissionDenied("rules rejected write".into());
        assert_eq!(err.class(), ErrorClass::Auth);
    }

    #[test]
    fn test_remote_error_text_is_inspected() {
        let err = SyncError::Remote {
            status: 400,
            message: "Auth token is expired".into(),
        };
        assert_eq!(err.class(), ErrorClass::Auth);

        let err = SyncError::Remote {
            status: 500,
            message: "internal".into(),
        };
        assert_eq!(err.class(), ErrorClass::Other);
    }

    #[test]
    fn test_network_errors_are_not_retried_as_auth() {
        assert_eq!(
            SyncError::Network("connection refused".into()).class(),
            ErrorClass::Network
        );
        assert_eq!(classify_text("operation timed out"), ErrorClass::Network);
    }

    #[test]
    fn test_store_errors_are_other() {
        let err = SyncError::Store(DbErr::Custom("disk full".into()));
        assert_eq!(err.class(), ErrorClass::Other);
    }
}
