//! Configuration for the bridge client and the editor-side listener

use std::time::Duration;

/// Port the editor listener binds and the client dials.
pub const DEFAULT_PORT: u16 = 3333;

/// Host the client dials.
pub const DEFAULT_HOST: &str = "localhost";

/// Address the listener binds. Loopback only.
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";

/// How long a caller waits for a correlated response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// How long a connection attempt may take before it counts as failed.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// How long the dispatcher lets a handler run before abandoning it.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Upper bound accepted for any configured timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(600);

/// Error type for configuration building
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Host was empty
    #[error("Host must not be empty")]
    EmptyHost,
    /// Client port was zero
    #[error("Port must be between 1 and 65535")]
    InvalidPort,
    /// A timeout was zero or above [`MAX_TIMEOUT`]
    #[error("{name} must be between 1 ms and {max} s, got {millis} ms", max = MAX_TIMEOUT.as_secs())]
    InvalidTimeout {
        /// Which timeout was rejected
        name: &'static str,
        /// The rejected value
        millis: u128,
    },
}

fn check_timeout(name: &'static str, timeout: Duration) -> Result<Duration, ConfigError> {
    if timeout.is_zero() || timeout > MAX_TIMEOUT {
        return Err(ConfigError::InvalidTimeout {
            name,
            millis: timeout.as_millis(),
        });
    }
    Ok(timeout)
}

fn check_host(host: String) -> Result<String, ConfigError> {
    if host.trim().is_empty() {
        return Err(ConfigError::EmptyHost);
    }
    Ok(host)
}

/// Configuration for the bridge client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host running the editor listener
    pub host: String,

    /// Listener port
    pub port: u16,

    /// Default wait for a correlated response
    pub request_timeout: Duration,

    /// Wait for the transport to reach `Open`
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given endpoint with default timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// `ws://localhost:3333` with default timeouts
    pub fn local() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }

    /// Set the default request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// WebSocket URL of the listener
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    /// Create a new builder instance
    #[inline]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::local()
    }
}

/// Builder for [`ClientConfig`] with validation
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Create a new builder
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    #[inline]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[inline]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the request timeout in milliseconds
    #[inline]
    pub fn request_timeout_ms(self, millis: u64) -> Self {
        self.request_timeout(Duration::from_millis(millis))
    }

    #[inline]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the configuration with validation
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let host = check_host(self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()))?;

        let port = self.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let request_timeout = check_timeout(
            "Request timeout",
            self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        )?;
        let connect_timeout = check_timeout(
            "Connect timeout",
            self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        )?;

        Ok(ClientConfig {
            host,
            port,
            request_timeout,
            connect_timeout,
        })
    }
}

/// Configuration for the editor-side listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to bind; `0` picks an ephemeral port
    pub port: u16,

    /// Deadline after which a running handler is cancelled
    pub handler_timeout: Duration,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// `127.0.0.1:3333`
    pub fn local() -> Self {
        Self::new(DEFAULT_BIND_HOST, DEFAULT_PORT)
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// `host:port` string suitable for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[inline]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::local()
    }
}

/// Builder for [`ServerConfig`] with validation
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    handler_timeout: Option<Duration>,
}

impl ServerConfigBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    #[inline]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[inline]
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let host = check_host(self.host.unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()))?;
        let handler_timeout = check_timeout(
            "Handler timeout",
            self.handler_timeout.unwrap_or(DEFAULT_HANDLER_TIMEOUT),
        )?;

        Ok(ServerConfig {
            host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            handler_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_defaults() {
        let config = ClientConfig::local();
        assert_eq!(config.url(), "ws://localhost:3333");
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));

        let server = ServerConfig::local();
        assert_eq!(server.bind_addr(), "127.0.0.1:3333");
    }

    #[test]
    fn test_builder_validation() {
        assert_eq!(
            ClientConfig::builder().port(0).build(),
            Err(ConfigError::InvalidPort)
        );
        assert_eq!(
            ClientConfig::builder().host("  ").build(),
            Err(ConfigError::EmptyHost)
        );
        assert!(matches!(
            ClientConfig::builder().request_timeout_ms(0).build(),
            Err(ConfigError::InvalidTimeout { name: "Request timeout", .. })
        ));
        assert!(matches!(
            ServerConfig::builder()
                .handler_timeout(Duration::from_secs(601))
                .build(),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::builder()
            .host("127.0.0.1")
            .port(4444)
            .request_timeout_ms(250)
            .build()
            .unwrap();
        assert_eq!(config.url(), "ws://127.0.0.1:4444");
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        // Ephemeral ports are fine for the listener
        let server = ServerConfig::builder().port(0).build().unwrap();
        assert_eq!(server.port, 0);
    }

    #[test]
    fn test_timeout_error_message() {
        let err = ClientConfig::builder()
            .request_timeout_ms(0)
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Request timeout must be between 1 ms and 600 s, got 0 ms"
        );
    }
}
