use std::collections::HashMap;

use super::error::{NotifyError, TargetError};
use super::transport::NotificationTransport;

/// Mail notification parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailTarget {
    pub address: String,
    pub subject: String,
    pub body: String,
}

/// HTTP notification parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    pub url: String,
    pub method: String,
    pub payload: String,
}

/// A resolved, invocable notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Mail(MailTarget),
    Http(HttpTarget),
}

impl NotificationTarget {
    /// Builds a target from parsed callback parameters, dispatching on `type`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, TargetError> {
        let kind = params.get("type").ok_or(TargetError::MissingType)?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "mail" => Ok(NotificationTarget::Mail(MailTarget {
                address: required(params, "mail", "address")?,
                subject: required(params, "mail", "subject")?,
                body: required(params, "mail", "body")?,
            })),
            "http" => Ok(NotificationTarget::Http(HttpTarget {
                url: required(params, "http", "url")?,
                method: required(params, "http", "method")?,
                payload: required(params, "http", "payload")?,
            })),
            _ => Err(TargetError::UnknownType(kind.clone())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotificationTarget::Mail(_) => "mail",
            NotificationTarget::Http(_) => "http",
        }
    }

    /// Delivers the notification through `transport`.
    pub fn invoke(&self, transport: &dyn NotificationTransport) -> Result<(), NotifyError> {
        match self {
            NotificationTarget::Mail(mail) => transport.send_mail(mail),
            NotificationTarget::Http(http) => {
                let response = transport.http_call(http)?;
                if response.status != 200 {
                    return Err(NotifyError::HttpStatus {
                        status: response.status,
                        body: response.body,
                    });
                }
                Ok(())
            }
        }
    }
}

fn required(
    params: &HashMap<String, String>,
    kind: &'static str,
    key: &'static str,
) -> Result<String, TargetError> {
    params
        .get(key)
        .cloned()
        .ok_or(TargetError::MissingParameter { kind, key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::transport::HttpResponse;
    use std::sync::Mutex;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct StubTransport {
        status: u16,
        calls: Mutex<Vec<String>>,
    }

    impl NotificationTransport for StubTransport {
        fn send_mail(&self, target: &MailTarget) -> Result<(), NotifyError> {
            self.calls.lock().unwrap().push(format!("mail {}", target.address));
            Ok(())
        }

        fn http_call(&self, target: &HttpTarget) -> Result<HttpResponse, NotifyError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", target.method, target.url));
            Ok(HttpResponse {
                status: self.status,
                body: "nope".to_string(),
            })
        }
    }

    fn stub(status: u16) -> StubTransport {
        StubTransport {
            status,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_build_http_target() {
        let target = NotificationTarget::from_params(&params(&[
            ("type", "http"),
            ("url", "http://cb"),
            ("method", "post"),
            ("payload", "done"),
        ]))
        .unwrap();

        assert_eq!(
            target,
            NotificationTarget::Http(HttpTarget {
                url: "http://cb".to_string(),
                method: "post".to_string(),
                payload: "done".to_string(),
            })
        );
        assert_eq!(target.kind(), "http");
    }

    #[test]
    fn test_build_mail_target() {
        let target = NotificationTarget::from_params(&params(&[
            ("type", "mail"),
            ("address", "a@example.com"),
            ("subject", "s"),
            ("body", ""),
        ]))
        .unwrap();
        assert_eq!(target.kind(), "mail");
    }

    #[test]
    fn test_missing_type() {
        let result = NotificationTarget::from_params(&params(&[("url", "http://cb")]));
        assert_eq!(result, Err(TargetError::MissingType));
    }

    #[test]
    fn test_unknown_type() {
        let result = NotificationTarget::from_params(&params(&[("type", "pigeon")]));
        assert_eq!(result, Err(TargetError::UnknownType("pigeon".to_string())));
    }

    #[test]
    fn test_missing_required_key() {
        let result =
            NotificationTarget::from_params(&params(&[("type", "http"), ("url", "http://cb")]));
        assert_eq!(
            result,
            Err(TargetError::MissingParameter {
                kind: "http",
                key: "method"
            })
        );
    }

    #[test]
    fn test_invoke_http_ok() {
        let transport = stub(200);
        let target = NotificationTarget::Http(HttpTarget {
            url: "http://cb".to_string(),
            method: "post".to_string(),
            payload: "done".to_string(),
        });
        target.invoke(&transport).unwrap();
        assert_eq!(*transport.calls.lock().unwrap(), vec!["post http://cb"]);
    }

    #[test]
    fn test_invoke_http_non_200_is_error() {
        let transport = stub(201);
        let target = NotificationTarget::Http(HttpTarget {
            url: "http://cb".to_string(),
            method: "get".to_string(),
            payload: String::new(),
        });
        let err = target.invoke(&transport).unwrap_err();
        assert!(matches!(
            err,
            NotifyError::HttpStatus { status: 201, ref body } if body == "nope"
        ));
    }

    #[test]
    fn test_invoke_mail() {
        let transport = stub(200);
        let target = NotificationTarget::Mail(MailTarget {
            address: "a@example.com".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        target.invoke(&transport).unwrap();
        assert_eq!(*transport.calls.lock().unwrap(), vec!["mail a@example.com"]);
    }
}
