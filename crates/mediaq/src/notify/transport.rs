//! Delivery backends for notification targets.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use super::error::NotifyError;
use super::target::{HttpTarget, MailTarget};
use crate::config::{Config, MailConfig};
use crate::secrets::resolve_secret_optional;

/// Status and body of an HTTP notification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Performs the side effect behind a [`NotificationTarget`](super::NotificationTarget).
pub trait NotificationTransport: Send + Sync {
    fn send_mail(&self, target: &MailTarget) -> Result<(), NotifyError>;

    /// Issues the request and returns whatever the endpoint answered.
    fn http_call(&self, target: &HttpTarget) -> Result<HttpResponse, NotifyError>;
}

/// SMTP settings with the password already resolved.
struct SmtpSettings {
    sender: String,
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
}

impl SmtpSettings {
    fn from_config(mail: &MailConfig) -> Result<Option<Self>, NotifyError> {
        if mail.server.is_none() {
            return Ok(None);
        }
        let (host, port) = mail.host_port().ok_or_else(|| {
            NotifyError::MailConfig("mail.server must be 'host:port'".to_string())
        })?;
        let sender = mail
            .sender
            .clone()
            .ok_or_else(|| NotifyError::MailConfig("mail.sender is not set".to_string()))?;
        let password = resolve_secret_optional(
            mail.password.as_deref(),
            mail.password_file.as_deref(),
            mail.password_env_var.as_deref(),
        )?;

        Ok(Some(Self {
            sender,
            host: host.to_string(),
            port,
            username: mail.username.clone(),
            password,
        }))
    }
}

/// Real network transport: SMTP over implicit TLS via lettre and HTTP via a
/// blocking reqwest client.
pub struct LiveTransport {
    http: reqwest::blocking::Client,
    smtp: Option<SmtpSettings>,
}

impl LiveTransport {
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        let smtp = SmtpSettings::from_config(&config.mail)?;
        if smtp.is_none() {
            log::info!("No mail server configured; mail notifications will fail");
        }

        Ok(Self { http, smtp })
    }
}

impl NotificationTransport for LiveTransport {
    fn send_mail(&self, target: &MailTarget) -> Result<(), NotifyError> {
        let smtp = self
            .smtp
            .as_ref()
            .ok_or_else(|| NotifyError::MailConfig("mail.server is not set".to_string()))?;

        let from: Mailbox = smtp
            .sender
            .parse()
            .map_err(|e| NotifyError::MailConfig(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = target
            .address
            .parse()
            .map_err(|e| NotifyError::Mail(format!("invalid recipient '{}': {}", target.address, e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(target.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(target.body.clone())
            .map_err(|e| NotifyError::Mail(e.to_string()))?;

        let mut builder = SmtpTransport::relay(&smtp.host)
            .map_err(|e| NotifyError::Mail(e.to_string()))?
            .port(smtp.port);
        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        builder
            .build()
            .send(&message)
            .map_err(|e| NotifyError::Mail(e.to_string()))?;

        log::info!("Sent mail notification to {}", target.address);
        Ok(())
    }

    fn http_call(&self, target: &HttpTarget) -> Result<HttpResponse, NotifyError> {
        let method = reqwest::Method::from_bytes(target.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| NotifyError::Http(format!("invalid HTTP method '{}'", target.method)))?;

        let response = self
            .http
            .request(method, &target.url)
            .body(target.payload.clone())
            .send()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();

        log::info!(
            "HTTP notification to {} answered {}",
            crate::sanitize::redact_url(&target.url),
            status
        );
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_transport_without_mail() {
        let config = Config::new("/d", "/t");
        let transport = LiveTransport::from_config(&config).unwrap();
        let err = transport
            .send_mail(&MailTarget {
                address: "a@example.com".to_string(),
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, NotifyError::MailConfig(_)));
    }

    #[test]
    fn test_smtp_settings_require_sender() {
        let mail = MailConfig {
            server: Some("smtp.example.com:465".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            SmtpSettings::from_config(&mail),
            Err(NotifyError::MailConfig(_))
        ));
    }

    #[test]
    fn test_smtp_settings_resolve_password() {
        let mail = MailConfig {
            sender: Some("bot@example.com".to_string()),
            server: Some("smtp.example.com:465".to_string()),
            username: Some("bot".to_string()),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let settings = SmtpSettings::from_config(&mail).unwrap().unwrap();
        assert_eq!(settings.host, "smtp.example.com");
        assert_eq!(settings.port, 465);
        assert_eq!(
            settings.password.as_ref().map(|p| p.expose_secret().to_string()),
            Some("hunter2".to_string())
        );
    }

    #[test]
    fn test_invalid_method_rejected() {
        let config = Config::new("/d", "/t");
        let transport = LiveTransport::from_config(&config).unwrap();
        let err = transport
            .http_call(&HttpTarget {
                url: "http://127.0.0.1:9/".to_string(),
                method: "NOT A METHOD".to_string(),
                payload: String::new(),
            })
            .unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)));
    }
}
