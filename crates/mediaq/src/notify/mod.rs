//! Completion notifications.
//!
//! A job's callback specification is expanded with [`template::resolve`],
//! split into `<key:value>` parameters and turned into a
//! [`NotificationTarget`], which is then invoked through a
//! [`NotificationTransport`].

pub mod error;
pub mod params;
pub mod target;
pub mod template;
pub mod transport;

pub use error::{CallbackError, NotifyError, TargetError, TemplateError};
pub use params::parse_params;
pub use target::{HttpTarget, MailTarget, NotificationTarget};
pub use template::{resolve, resolve_for_job, VariableSource};
pub use transport::{HttpResponse, LiveTransport, NotificationTransport};

use crate::config::Config;
use crate::job::Job;

/// Builds the notification target described by `job.callback`.
pub fn build_target(job: &Job, config: &Config) -> Result<NotificationTarget, CallbackError> {
    let resolved = resolve_for_job(&job.callback, job, config)?;
    let params = parse_params(&resolved);
    Ok(NotificationTarget::from_params(&params)?)
}
