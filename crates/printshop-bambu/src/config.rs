//! Bridge connection settings.

use std::time::Duration;

use rumqttc::{MqttOptions, TlsConfiguration, Transport};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};
use crate::tls::lan_client_config;

/// MQTT-over-TLS port used by printers and the cloud broker.
pub const MQTT_PORT: u16 = 8883;
/// User name for both LAN and cloud connections.
pub const MQTT_USER: &str = "bblp";
/// Cloud broker host.
pub const CLOUD_HOST: &str = "us.mqtt.bambulab.com";
/// Interval between full-status requests.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);

/// Where the broker lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// The printer's own broker on the LAN, authenticated by access code.
    #[default]
    Local,
    /// The vendor cloud broker, authenticated by account token.
    Cloud,
}

/// Connection settings for one printer.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Printer LAN broker or cloud broker.
    pub mode: ConnectionMode,
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// MQTT user name.
    pub username: String,
    /// Access code or cloud token.
    pub password: String,
    /// Printer serial number.
    pub serial: String,
    /// Wrap the connection in TLS.
    pub tls: bool,
    /// PEM bundle used to verify the cloud broker. System roots when absent.
    /// LAN printers present self-signed certificates and are not verified.
    pub ca_cert: Option<Vec<u8>>,
    /// Interval between full-status requests while connected.
    pub heartbeat: Duration,
    /// How long the first connect may take before the bridge gives up.
    pub connect_timeout: Duration,
    /// Pause before polling again after an established link drops.
    pub retry_delay: Duration,
    /// MQTT keep-alive.
    pub keep_alive: Duration,
}

impl BridgeConfig {
    fn base(mode: ConnectionMode, host: String, password: String, serial: String) -> Self {
        Self {
            mode,
            host,
            port: MQTT_PORT,
            username: MQTT_USER.to_string(),
            password,
            serial,
            tls: true,
            ca_cert: None,
            heartbeat: DEFAULT_HEARTBEAT,
            connect_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(5),
            keep_alive: Duration::from_secs(60),
        }
    }

    /// Connect to a printer on the LAN.
    pub fn local(
        host: impl Into<String>,
        serial: impl Into<String>,
        access_code: impl Into<String>,
    ) -> Self {
        Self::base(ConnectionMode::Local, host.into(), access_code.into(), serial.into())
    }

    /// Connect through the cloud broker.
    pub fn cloud(serial: impl Into<String>, token: impl Into<String>) -> Self {
        Self::base(
            ConnectionMode::Cloud,
            CLOUD_HOST.to_string(),
            token.into(),
            serial.into(),
        )
    }

    /// Settings for `mode`, taking the host only in local mode.
    pub fn for_mode(
        mode: ConnectionMode,
        host: impl Into<String>,
        serial: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        match mode {
            ConnectionMode::Local => Self::local(host, serial, secret),
            ConnectionMode::Cloud => Self::cloud(serial, secret),
        }
    }

    /// Refuse settings that can never connect.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TelemetryError::MissingSetting("host"));
        }
        if self.serial.trim().is_empty() {
            return Err(TelemetryError::MissingSetting("serial"));
        }
        // an unset password was sometimes saved as the literal text "None"
        if self.password.trim().is_empty() || self.password == "None" {
            return Err(TelemetryError::MissingSetting("password"));
        }
        Ok(())
    }

    /// Topic the printer publishes reports on.
    pub fn report_topic(&self) -> String {
        format!("device/{}/report", self.serial)
    }

    /// Topic the printer listens for requests on.
    pub fn request_topic(&self) -> String {
        format!("device/{}/request", self.serial)
    }

    /// Build client options with a fresh client id.
    pub fn mqtt_options(&self) -> Result<MqttOptions> {
        self.validate()?;

        let mut options = MqttOptions::new(client_id(), self.host.trim(), self.port);
        options.set_credentials(self.username.as_str(), self.password.as_str());
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);

        if self.tls {
            let transport = match (self.mode, &self.ca_cert) {
                (ConnectionMode::Local, _) => {
                    Transport::tls_with_config(TlsConfiguration::Rustls(lan_client_config()))
                }
                (ConnectionMode::Cloud, Some(ca)) => {
                    Transport::tls_with_config(TlsConfiguration::Simple {
                        ca: ca.clone(),
                        alpn: None,
                        client_auth: None,
                    })
                }
                (ConnectionMode::Cloud, None) => Transport::tls_with_default_config(),
            };
            options.set_transport(transport);
        }
        Ok(options)
    }
}

fn client_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("PrintShop_{}", &hex[..8])
}
