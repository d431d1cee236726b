//! SOAP partner login and the session it yields.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use url::Url;

use crate::utils::error::{BulkError, Result};

pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
pub const DEFAULT_API_VERSION: &str = "36.0";

/// How to obtain a session.
#[derive(Clone)]
pub enum Credentials {
    /// Username, password and security token for the SOAP `login()` call.
    Password {
        username: String,
        password: SecretString,
        security_token: SecretString,
    },
    /// A session issued elsewhere, e.g. by an OAuth flow.
    Session {
        instance_url: String,
        session_id: SecretString,
    },
}

#[derive(Clone)]
pub struct LoginParams {
    pub credentials: Credentials,
    pub api_version: String,
    pub login_url: String,
}

impl std::fmt::Debug for LoginParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("LoginParams");
        match &self.credentials {
            Credentials::Password { username, .. } => {
                s.field("username", username).field("password", &"[REDACTED]")
            }
            Credentials::Session { instance_url, .. } => s
                .field("instance_url", instance_url)
                .field("session_id", &"[REDACTED]"),
        };
        s.field("api_version", &self.api_version)
            .field("login_url", &self.login_url)
            .finish()
    }
}

impl LoginParams {
    pub fn with_password(
        username: impl Into<String>,
        password: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Credentials::Password {
                username: username.into(),
                password: SecretString::from(password.into()),
                security_token: SecretString::from(security_token.into()),
            },
            api_version: DEFAULT_API_VERSION.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }

    pub fn with_session(instance_url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::Session {
                instance_url: instance_url.into(),
                session_id: SecretString::from(session_id.into()),
            },
            api_version: DEFAULT_API_VERSION.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    /// A new session can be obtained without the caller's help.
    pub fn can_relogin(&self) -> bool {
        matches!(self.credentials, Credentials::Password { .. })
    }
}

/// An authenticated Bulk API session.
#[derive(Clone)]
pub struct Session {
    pub instance_url: Url,
    pub session_id: SecretString,
    pub api_version: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance_url", &self.instance_url.as_str())
            .field("session_id", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl Session {
    /// Resolves a path under `/services/async/{version}/`.
    pub fn async_url(&self, path: &str) -> Result<Url> {
        let relative = format!(
            "services/async/{}/{}",
            self.api_version,
            path.trim_start_matches('/')
        );
        self.instance_url
            .join(&relative)
            .map_err(|e| BulkError::ConfigError {
                message: format!("Invalid Bulk API path {}: {}", relative, e),
            })
    }
}

pub async fn login(http: &reqwest::Client, params: &LoginParams) -> Result<Session> {
    match &params.credentials {
        Credentials::Session {
            instance_url,
            session_id,
        } => Ok(Session {
            instance_url: parse_instance_url(instance_url)?,
            session_id: session_id.clone(),
            api_version: params.api_version.clone(),
        }),
        Credentials::Password {
            username,
            password,
            security_token,
        } => {
            let endpoint = format!(
                "{}/services/Soap/u/{}",
                params.login_url.trim_end_matches('/'),
                params.api_version
            );
            let envelope = login_envelope(
                username,
                &format!("{}{}", password.expose_secret(), security_token.expose_secret()),
            );

            info!("[LOGIN] POST /services/Soap/u/{} as {}", params.api_version, username);

            let response = http
                .post(&endpoint)
                .header(CONTENT_TYPE, "text/xml; charset=UTF-8")
                .header("SOAPAction", "login")
                .body(envelope)
                .send()
                .await?;

            let status = response.status();
            debug!("[LOGIN] -> {}", status.as_u16());
            let body = response.text().await?;

            let fields = parse_login_response(&body)?;
            if let Some(fault) = fields.fault {
                return Err(BulkError::LoginFailed { message: fault });
            }

            match (fields.server_url, fields.session_id) {
                (Some(server_url), Some(session_id)) => {
                    let instance_url = parse_instance_url(&server_url)?;
                    info!("[LOGIN] session established on {}", instance_url.as_str());
                    Ok(Session {
                        instance_url,
                        session_id: SecretString::from(session_id),
                        api_version: params.api_version.clone(),
                    })
                }
                _ => Err(BulkError::LoginFailed {
                    message: format!(
                        "HTTP {} without sessionId/serverUrl in login response",
                        status.as_u16()
                    ),
                }),
            }
        }
    }
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
            r#"xmlns:env="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<env:Body><n1:login xmlns:n1="urn:partner.soap.sforce.com">"#,
            r#"<n1:username>{}</n1:username><n1:password>{}</n1:password>"#,
            r#"</n1:login></env:Body></env:Envelope>"#
        ),
        escape(username),
        escape(password)
    )
}

#[derive(Debug, Default)]
struct LoginFields {
    server_url: Option<String>,
    session_id: Option<String>,
    fault: Option<String>,
}

fn parse_login_response(xml: &str) -> Result<LoginFields> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fields = LoginFields::default();
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::Text(t)) => {
                let Some(name) = current.as_deref() else {
                    continue;
                };
                let text = t
                    .unescape()
                    .map_err(|e| BulkError::LoginFailed {
                        message: format!("Malformed login response: {}", e),
                    })?
                    .into_owned();
                match name {
                    b"serverUrl" => fields.server_url = Some(text),
                    b"sessionId" => fields.session_id = Some(text),
                    b"faultstring" => fields.fault = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BulkError::LoginFailed {
                    message: format!("Malformed login response: {}", e),
                })
            }
            _ => {}
        }
    }

    Ok(fields)
}

/// Reduces a server URL such as `https://na1.salesforce.com/services/Soap/u/36.0/00D...`
/// to its origin.
fn parse_instance_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| BulkError::InvalidConfigValueError {
        field: "instance_url".to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    let origin = url.origin().ascii_serialization();
    Url::parse(&format!("{}/", origin)).map_err(|e| BulkError::InvalidConfigValueError {
        field: "instance_url".to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
