//! `<%name%>` placeholder expansion for callback specifications.
//!
//! Placeholders are looked up in an ordered list of [`VariableSource`]s (the
//! job first, then the configuration) and substituted pass by pass until a
//! pass changes nothing. Substituted text is scanned again, so a config value
//! such as `download_url` may itself refer to `<%id%>`. Job attributes are
//! data, not template text: their `:`, `<` and `>` are escaped on the way in,
//! which keeps a title like `Before -> After` inside its parameter and stops
//! it from forming new placeholders.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::error::TemplateError;
use super::params::escape_value;
use crate::config::Config;
use crate::job::Job;

static RE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<%([^<>]+?)%>").unwrap());

/// Upper bound on substitution passes.
pub const MAX_PASSES: usize = 16;

/// Upper bound on the expanded text, in bytes.
pub const MAX_EXPANDED_LEN: usize = 64 * 1024;

/// Prefix that percent-encodes the resolved value, e.g. `<%clean_title%>`.
const CLEAN_PREFIX: &str = "clean_";

/// Something placeholders can be resolved against.
pub trait VariableSource {
    /// Value of `name`, or `None` if this source has no such attribute.
    fn lookup(&self, name: &str) -> Option<String>;

    /// Whether values from this source are escaped before substitution.
    fn escapes_values(&self) -> bool {
        false
    }
}

impl VariableSource for Job {
    fn lookup(&self, name: &str) -> Option<String> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(T::to_string).unwrap_or_default()
        }

        let value = match name {
            "id" => self.id.to_string(),
            "url" => self.url.clone(),
            "audio_only" => self.audio_only.to_string(),
            "callback" => self.callback.clone(),
            "status" => self.status.to_string(),
            "errors" => opt(&self.errors),
            "retry_count" => self.retry_count.to_string(),
            "notify_retry_count" => self.notify_retry_count.to_string(),
            "title" => opt(&self.title),
            "width" => opt(&self.width),
            "height" => opt(&self.height),
            "length" => opt(&self.length),
            "file_size" => opt(&self.file_size),
            "filename" => self
                .filename
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "create_date" => self.create_date.to_rfc3339(),
            "expiry_date" => self.expiry_date.to_rfc3339(),
            _ => return None,
        };
        Some(value)
    }

    fn escapes_values(&self) -> bool {
        true
    }
}

impl VariableSource for Config {
    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name {
            "download_url" => self.download_url.clone(),
            "mail_subject" => self.mail_subject.clone(),
            "mail_body" => self.mail_body.clone(),
            "mail_sender" => self.mail.sender.clone().unwrap_or_default(),
            "download_directory" => self.download_directory.clone(),
            "temp_directory" => self.temp_directory.clone(),
            "output_template" => self.output_template.clone(),
            "expiry_days" => self.expiry_days.to_string(),
            _ => return self.variables.get(name).cloned(),
        };
        Some(value)
    }
}

/// Resolves `name` against `sources` in order; first match wins.
fn lookup(name: &str, sources: &[&dyn VariableSource]) -> Option<String> {
    for source in sources {
        if let Some(value) = source.lookup(name) {
            return Some(if source.escapes_values() {
                escape_value(&value)
            } else {
                value
            });
        }
    }

    let bare = name.strip_prefix(CLEAN_PREFIX)?;
    sources
        .iter()
        .find_map(|s| s.lookup(bare))
        .map(|value| urlencoding::encode(&value).into_owned())
}

/// Expands every resolvable placeholder in `template`.
///
/// Unknown names are left in place. Fails when the expansion does not settle
/// within [`MAX_PASSES`] or grows past [`MAX_EXPANDED_LEN`].
pub fn resolve(template: &str, sources: &[&dyn VariableSource]) -> Result<String, TemplateError> {
    let mut current = template.to_string();

    for pass in 0..MAX_PASSES {
        let mut replaced = false;
        let mut unknown = BTreeSet::new();

        let next = RE_PLACEHOLDER
            .replace_all(&current, |caps: &Captures| match lookup(&caps[1], sources) {
                Some(value) => {
                    replaced = true;
                    value
                }
                None => {
                    unknown.insert(caps[1].to_string());
                    caps[0].to_string()
                }
            })
            .into_owned();

        if !replaced {
            if !unknown.is_empty() {
                log::warn!(
                    "Leaving unknown template variables in place: {}",
                    unknown.into_iter().collect::<Vec<_>>().join(", ")
                );
            }
            return Ok(current);
        }

        if next.len() > MAX_EXPANDED_LEN {
            return Err(TemplateError::Unbounded { passes: pass + 1 });
        }
        current = next;
    }

    Err(TemplateError::Unbounded { passes: MAX_PASSES })
}

/// Resolves a template for `job`, falling back to configuration-level values.
pub fn resolve_for_job(template: &str, job: &Job, config: &Config) -> Result<String, TemplateError> {
    resolve(template, &[job, config])
}
