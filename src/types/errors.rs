use std::fmt;

// === StoreError ===

/// Errors returned by the bookmark backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The request was rejected because a field is invalid.
    Validation(String),
    /// The caller does not own the targeted row.
    Forbidden(String),
    /// The store could not be reached.
    Unavailable(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Validation(msg) => write!(f, "Invalid bookmark: {}", msg),
            StoreError::Forbidden(msg) => write!(f, "Permission denied: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::DatabaseError(msg) => write!(f, "Bookmark database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// === FeedError ===

/// Errors related to change-feed subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The feed refused or failed to open the subscription.
    SubscribeFailed(String),
    /// The feed has shut down.
    Closed,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::SubscribeFailed(msg) => write!(f, "Subscribe failed: {}", msg),
            FeedError::Closed => write!(f, "Change feed closed"),
        }
    }
}

impl std::error::Error for FeedError {}

// === AuthError ===

/// Errors related to the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The provided email address is not usable.
    InvalidEmail(String),
    /// Database operation failed.
    DatabaseError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidEmail(email) => write!(f, "Invalid email: {}", email),
            AuthError::DatabaseError(msg) => write!(f, "Auth database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === AppError ===

/// Errors surfaced by the application core.
#[derive(Debug)]
pub enum AppError {
    /// No user is signed in.
    NotSignedIn,
    /// The auth service failed.
    Auth(AuthError),
    /// Opening or migrating the database failed.
    DatabaseError(String),
    /// Updating or persisting settings failed.
    Settings(SettingsError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotSignedIn => write!(f, "Not signed in"),
            AppError::Auth(e) => write!(f, "Auth failed: {}", e),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::Settings(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Auth(e) => Some(e),
            AppError::Settings(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        AppError::Auth(error)
    }
}

impl From<SettingsError> for AppError {
    fn from(error: SettingsError) -> Self {
        AppError::Settings(error)
    }
}
