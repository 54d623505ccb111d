use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::config::{Credentials, ThermostatConfig};
use crate::logger::{Exchange, MessageLogMode, MessageLogger};
use crate::protocol::{
    base_url, command_path, parse_device_reading, parse_envelope, read_device_path, Envelope,
    EndpointStyle,
};
use crate::translate::Command;
use crate::types::*;
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DomoticzClientBuilder {
    api_address: String,
    port: String,
    credentials: Option<Credentials>,
    endpoint: EndpointStyle,
    timeout: Duration,
    accept_invalid_certs: bool,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl DomoticzClientBuilder {
    pub fn new(api_address: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            api_address: api_address.into(),
            port: port.into(),
            credentials: None,
            endpoint: EndpointStyle::default(),
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
            log_mode: None,
            log_path: None,
        }
    }

    pub fn credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn endpoint(mut self, endpoint: EndpointStyle) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Domoticz ships with a self-signed certificate on its HTTPS port.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<DomoticzClient> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        Ok(DomoticzClient {
            http,
            base_url: base_url(&self.api_address, &self.port),
            credentials: self.credentials,
            endpoint: self.endpoint,
            logger,
        })
    }
}

/// HTTP gateway to a Domoticz server. Each call is exactly one GET; nothing
/// is retried or cached.
pub struct DomoticzClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    endpoint: EndpointStyle,
    logger: Option<Mutex<MessageLogger>>,
}

impl DomoticzClient {
    pub fn builder(
        api_address: impl Into<String>,
        port: impl Into<String>,
    ) -> DomoticzClientBuilder {
        DomoticzClientBuilder::new(api_address, port)
    }

    pub fn from_config(config: &ThermostatConfig) -> Result<Self> {
        let mut builder = Self::builder(&config.api_address, config.port.as_str())
            .endpoint(config.endpoint)
            .timeout(config.timeout)
            .accept_invalid_certs(config.accept_invalid_certs);
        if let Some(ref creds) = config.credentials {
            builder = builder.credentials(&creds.username, &creds.password);
        }
        if let Some(ref path) = config.message_log {
            builder = builder.message_log(config.message_log_mode, path);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn read_device(&self, idx: u32) -> Result<DeviceReading> {
        let path = read_device_path(idx, self.endpoint);
        let envelope = self.get(&path).await?;
        let reading = parse_device_reading(idx, &envelope);
        if let Err(ref e) = reading {
            error!(url = %self.url(&path), error = %e, "unusable device reading");
        }
        reading
    }

    pub async fn send_command(&self, command: &Command) -> Result<Ack> {
        let path = command_path(command);
        debug!(idx = command.idx(), action = command.action(), "sending command");
        let envelope = self.get(&path).await?;
        Ok(Ack {
            status: envelope.status,
            title: envelope.title,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Envelope> {
        let id = Uuid::new_v4();
        let url = self.url(path);
        let user = self.credentials.as_ref().map(|c| c.username.as_str());
        debug!(%id, url = %url, "GET");

        let started = Instant::now();
        let mut request = self.http.get(&url);
        if let Some(ref creds) = self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let (status, body, result) = match request.send().await {
            Err(e) => (None, None, Err(Error::from(e))),
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Err(e) => (Some(status.as_u16()), None, Err(Error::from(e))),
                    Ok(body) => {
                        let result = if status == StatusCode::OK {
                            parse_envelope(&body)
                        } else {
                            Err(Error::Status {
                                status: status.as_u16(),
                                body: body.clone(),
                            })
                        };
                        (Some(status.as_u16()), Some(body), result)
                    }
                }
            }
        };

        match &result {
            Ok(_) => trace!(%id, status = ?status, "response ok"),
            Err(e) => error!(
                %id,
                url = %url,
                user = ?user,
                status = ?status,
                body = body.as_deref().unwrap_or_default(),
                error = %e,
                "Domoticz request failed"
            ),
        }

        if let Some(ref logger) = self.logger
            && let Ok(mut logger) = logger.lock()
        {
            logger.log_exchange(&Exchange {
                id,
                path,
                user,
                status,
                body: body.as_deref(),
                error: result.as_ref().err().map(|e| e.to_string()),
                elapsed_ms: started.elapsed().as_millis(),
            });
        }

        result
    }
}
