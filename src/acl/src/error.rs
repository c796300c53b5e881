//! Error types for the ACL resolution engine

use thiserror::Error;

/// ACL engine errors
///
/// A cache miss is never an error; lookups report misses as `None`.
#[derive(Debug, Error)]
pub enum AclError {
    /// A component was constructed with unusable settings, or the
    /// templated-policy registry was asked for a name it does not hold.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied data failed validation. Carries every violation
    /// found, not just the first, so a single round trip is enough to fix
    /// them all.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A registered template body failed to render. Built-in templates are
    /// fixed at compile time, so this indicates corrupted registry state.
    #[error("failed to render template {template}: {message}")]
    TemplateRender {
        /// Name of the template that failed
        template: String,
        /// Rendering error detail
        message: String,
    },

    /// The external ACL store reported a failure while fetching a record.
    #[error("store error: {0}")]
    Store(String),
}

/// Result type for ACL operations
pub type Result<T> = std::result::Result<T, AclError>;
