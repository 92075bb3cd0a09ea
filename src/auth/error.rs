use thiserror::Error;

/// Failures surfaced by the credential store, the session gate and the
/// product catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad input shape. Shown inline next to the form.
    #[error("{0}")]
    Validation(String),

    /// An account with this email already exists.
    #[error("An account with email '{0}' already exists")]
    DuplicateEmail(String),

    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The operation needs a logged-in session.
    #[error("Please log in first")]
    NotAuthenticated,

    /// Connectivity or schema failure. Ends the current interaction.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Everything except a store failure can be retried by the user on the
    /// same screen.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::StoreUnavailable(_))
    }

    /// Short machine-readable kind, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicateEmail(_) => "duplicate_email",
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotAuthenticated => "not_authenticated",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}
