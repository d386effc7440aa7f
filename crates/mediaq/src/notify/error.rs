//! Notification error types.

use thiserror::Error;

/// Errors raised while expanding `<%name%>` placeholders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Substitution did not reach a fixed point within the pass budget, or the
    /// expansion grew past the size limit.
    #[error("Unresolved or cyclic template after {passes} passes")]
    Unbounded { passes: usize },
}

/// Errors raised while building a notification target from callback parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// The callback has no `type` parameter.
    #[error("Callback has no 'type' parameter")]
    MissingType,

    #[error("Unknown notification type: '{0}'")]
    UnknownType(String),

    #[error("Notification type '{kind}' requires parameter '{key}'")]
    MissingParameter { kind: &'static str, key: &'static str },
}

/// Errors raised while delivering a notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The endpoint answered with something other than 200.
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    /// Mail settings are missing or unusable.
    #[error("Mail is not configured: {0}")]
    MailConfig(String),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

/// A callback specification that cannot be turned into a target. Retrying
/// does not help.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Target(#[from] TargetError),
}
