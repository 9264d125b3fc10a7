//! Client Configuration
//!
//! Builder producing the immutable configuration consumed by the client-side
//! routing layer: server list, connection pooling, retries, consistent-hash
//! strategy, authentication and named failover clusters. All structural
//! validation happens at build time, before any connection is attempted.

use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

/// Default port used when a server address omits one
pub const DEFAULT_PORT: u16 = 11222;

/// One cache server endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Behavior when the connection pool is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExhaustedAction {
    /// Fail the request immediately
    Exception,
    /// Wait for a pooled connection to free up
    #[default]
    Wait,
    /// Open a connection beyond the pool limit
    CreateNew,
}

/// Connection pool tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionPoolConfig {
    pub max_active: usize,
    pub max_wait: Duration,
    pub min_idle: usize,
    pub exhausted_action: ExhaustedAction,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_active: 16,
            max_wait: Duration::from_secs(30),
            min_idle: 1,
            exhausted_action: ExhaustedAction::default(),
        }
    }
}

/// Consistent-hash implementation used for key routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConsistentHashVersion {
    /// Fixed-segment hash wheel
    V2,
    /// Segment hash with virtual nodes
    #[default]
    V3,
}

/// Authentication settings for the client connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthenticationConfig {
    pub enabled: bool,
    pub mechanism: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// A named failover cluster with its own server list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterConfig {
    pub name: String,
    pub servers: Vec<ServerConfig>,
}

/// Immutable client configuration, produced by [`ConfigurationBuilder`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub servers: Vec<ServerConfig>,
    pub connection_pool: ConnectionPoolConfig,
    pub connection_timeout: Duration,
    pub socket_timeout: Duration,
    pub max_retries: u32,
    pub tcp_no_delay: bool,
    pub tcp_keep_alive: bool,
    pub consistent_hash: ConsistentHashVersion,
    pub authentication: AuthenticationConfig,
    pub clusters: Vec<ClusterConfig>,
}

/// Builder for [`Configuration`]
#[derive(Debug)]
pub struct ConfigurationBuilder {
    servers: Vec<ServerConfig>,
    connection_pool: ConnectionPoolConfig,
    connection_timeout: Duration,
    socket_timeout: Duration,
    max_retries: i64,
    tcp_no_delay: bool,
    tcp_keep_alive: bool,
    consistent_hash: ConsistentHashVersion,
    authentication: AuthenticationConfig,
    clusters: Vec<ClusterConfig>,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    /// Start with defaults: no servers, default pool, 60s timeouts, 3
    /// retries, TCP no-delay on
    pub fn new() -> Self {
        Self {
            servers: Vec::new(),
            connection_pool: ConnectionPoolConfig::default(),
            connection_timeout: Duration::from_secs(60),
            socket_timeout: Duration::from_secs(60),
            max_retries: 3,
            tcp_no_delay: true,
            tcp_keep_alive: false,
            consistent_hash: ConsistentHashVersion::default(),
            authentication: AuthenticationConfig::default(),
            clusters: Vec::new(),
        }
    }

    /// Add one server endpoint
    pub fn add_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.servers.push(ServerConfig {
            host: host.into(),
            port,
        });
        self
    }

    /// Add servers from a `;`-separated address list.
    ///
    /// Each address is `host`, `host:port`, `[v6addr]` or `[v6addr]:port`;
    /// omitted ports default to [`DEFAULT_PORT`]. Parsing is deferred to
    /// build-time validation.
    pub fn add_servers(mut self, addresses: &str) -> Self {
        for address in addresses.split(';') {
            let address = address.trim();
            if address.is_empty() {
                continue;
            }
            match parse_server_address(address) {
                Ok(server) => self.servers.push(server),
                // Keep the malformed entry so build() reports it
                Err(_) => self.servers.push(ServerConfig {
                    host: address.to_string(),
                    port: 0,
                }),
            }
        }
        self
    }

    /// Replace the connection-pool tuning
    pub fn connection_pool(mut self, pool: ConnectionPoolConfig) -> Self {
        self.connection_pool = pool;
        self
    }

    /// Connect timeout for new connections
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Read timeout on established connections
    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    /// Number of retries per request before failing over.
    ///
    /// Takes a signed value so that invalid negatives surface as a
    /// configuration error at build time rather than panicking here.
    pub fn max_retries(mut self, retries: i64) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn tcp_no_delay(mut self, enabled: bool) -> Self {
        self.tcp_no_delay = enabled;
        self
    }

    pub fn tcp_keep_alive(mut self, enabled: bool) -> Self {
        self.tcp_keep_alive = enabled;
        self
    }

    /// Select the consistent-hash implementation
    pub fn consistent_hash(mut self, version: ConsistentHashVersion) -> Self {
        self.consistent_hash = version;
        self
    }

    /// Enable authentication with the given mechanism and credentials
    pub fn authentication(
        mut self,
        mechanism: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.authentication = AuthenticationConfig {
            enabled: true,
            mechanism: mechanism.into(),
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Define a named failover cluster; chain [`Self::add_cluster_node`] to
    /// populate it
    pub fn add_cluster(mut self, name: impl Into<String>) -> Self {
        self.clusters.push(ClusterConfig {
            name: name.into(),
            servers: Vec::new(),
        });
        self
    }

    /// Add a node to the most recently defined cluster
    pub fn add_cluster_node(mut self, host: impl Into<String>, port: u16) -> Self {
        if let Some(cluster) = self.clusters.last_mut() {
            cluster.servers.push(ServerConfig {
                host: host.into(),
                port,
            });
        }
        self
    }

    /// Validate and produce the immutable configuration.
    ///
    /// Fails with [`Error::Configuration`] on: negative retry counts,
    /// malformed or empty server hosts, clusters without nodes, duplicate
    /// cluster names, or cluster nodes without a host.
    pub fn build(self) -> Result<Configuration> {
        if self.max_retries < 0 {
            return Err(Error::Configuration(format!(
                "invalid max_retries (value={}): value must be greater or equal to zero",
                self.max_retries
            )));
        }

        let servers = if self.servers.is_empty() {
            vec![ServerConfig {
                host: "127.0.0.1".to_string(),
                port: DEFAULT_PORT,
            }]
        } else {
            self.servers
        };
        for server in &servers {
            validate_server(server, "server list")?;
        }

        let mut seen = std::collections::HashSet::new();
        for cluster in &self.clusters {
            if cluster.name.is_empty() {
                return Err(Error::Configuration(
                    "cluster definition is missing a name".to_string(),
                ));
            }
            if !seen.insert(cluster.name.clone()) {
                return Err(Error::Configuration(format!(
                    "duplicate cluster definition '{}'",
                    cluster.name
                )));
            }
            if cluster.servers.is_empty() {
                return Err(Error::Configuration(format!(
                    "cluster '{}' defines no nodes",
                    cluster.name
                )));
            }
            for server in &cluster.servers {
                validate_server(server, &format!("cluster '{}'", cluster.name))?;
            }
        }

        Ok(Configuration {
            servers,
            connection_pool: self.connection_pool,
            connection_timeout: self.connection_timeout,
            socket_timeout: self.socket_timeout,
            max_retries: self.max_retries as u32,
            tcp_no_delay: self.tcp_no_delay,
            tcp_keep_alive: self.tcp_keep_alive,
            consistent_hash: self.consistent_hash,
            authentication: self.authentication,
            clusters: self.clusters,
        })
    }
}

fn validate_server(server: &ServerConfig, context: &str) -> Result<()> {
    if server.host.is_empty() {
        return Err(Error::Configuration(format!(
            "{} contains a node without a host",
            context
        )));
    }
    if server.port == 0 {
        return Err(Error::Configuration(format!(
            "{} contains an invalid address '{}'",
            context, server.host
        )));
    }
    Ok(())
}

/// Parse `host`, `host:port`, `[v6]` or `[v6]:port`
fn parse_server_address(address: &str) -> Result<ServerConfig> {
    let bad = || Error::Configuration(format!("malformed server address '{}'", address));

    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(bad)?;
        if host.is_empty() {
            return Err(bad());
        }
        let port = match tail {
            "" => DEFAULT_PORT,
            tail => tail
                .strip_prefix(':')
                .and_then(|p| p.parse::<u16>().ok())
                .filter(|p| *p != 0)
                .ok_or_else(bad)?,
        };
        return Ok(ServerConfig {
            host: host.to_string(),
            port,
        });
    }

    match address.rsplit_once(':') {
        // A second ':' means a bare IPv6 literal without brackets
        Some((host, port)) if !host.contains(':') => {
            let port = port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(bad)?;
            if host.is_empty() {
                return Err(bad());
            }
            Ok(ServerConfig {
                host: host.to_string(),
                port,
            })
        }
        Some(_) => Err(bad()),
        None => Ok(ServerConfig {
            host: address.to_string(),
            port: DEFAULT_PORT,
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_full_configuration_builds() {
        let config = ConfigurationBuilder::new()
            .add_server("host1", 11222)
            .add_server("host2", 11222)
            .connection_pool(ConnectionPoolConfig {
                max_active: 100,
                max_wait: Duration::from_millis(1000),
                min_idle: 10,
                exhausted_action: ExhaustedAction::Wait,
            })
            .connection_timeout(Duration::from_millis(100))
            .socket_timeout(Duration::from_millis(100))
            .max_retries(0)
            .tcp_no_delay(false)
            .tcp_keep_alive(true)
            .consistent_hash(ConsistentHashVersion::V2)
            .authentication("SCRAM-SHA-512", "admin", "secret")
            .build()
            .unwrap();

        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.max_retries, 0);
        assert!(!config.tcp_no_delay);
        assert!(config.authentication.enabled);
        assert_eq!(config.consistent_hash, ConsistentHashVersion::V2);
    }

    #[test]
    fn test_parse_server_addresses() {
        let config = ConfigurationBuilder::new()
            .add_servers("1.1.1.1:9999; 2.2.2.2")
            .add_servers("[fe80::290:bff:fe1b:5762]:7777")
            .add_servers("[ff01::1]")
            .add_servers("localhost")
            .add_servers("localhost:8382")
            .build()
            .unwrap();

        let expected = [
            ("1.1.1.1", 9999),
            ("2.2.2.2", DEFAULT_PORT),
            ("fe80::290:bff:fe1b:5762", 7777),
            ("ff01::1", DEFAULT_PORT),
            ("localhost", DEFAULT_PORT),
            ("localhost", 8382),
        ];
        assert_eq!(config.servers.len(), expected.len());
        for (server, (host, port)) in config.servers.iter().zip(expected) {
            assert_eq!(server.host, host);
            assert_eq!(server.port, port);
        }
    }

    #[test]
    fn test_no_servers_defaults_to_loopback() {
        let config = ConfigurationBuilder::new().build().unwrap();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].host, "127.0.0.1");
        assert_eq!(config.servers[0].port, DEFAULT_PORT);
    }

    #[test]
    fn test_negative_retries_fail() {
        let err = ConfigurationBuilder::new().max_retries(-1).build().unwrap_err();
        assert_matches!(err, Error::Configuration(_));
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_cluster_without_nodes_fails() {
        let err = ConfigurationBuilder::new()
            .add_cluster("backup")
            .build()
            .unwrap_err();
        assert_matches!(err, Error::Configuration(_));
        assert!(err.to_string().contains("backup"));
    }

    #[test]
    fn test_duplicate_cluster_names_fail() {
        let err = ConfigurationBuilder::new()
            .add_cluster("site-a")
            .add_cluster_node("host1", 1234)
            .add_cluster("site-a")
            .add_cluster_node("host1", 5678)
            .build()
            .unwrap_err();
        assert_matches!(err, Error::Configuration(_));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_cluster_node_without_host_fails() {
        let err = ConfigurationBuilder::new()
            .add_cluster("site-a")
            .add_cluster_node("", 1234)
            .build()
            .unwrap_err();
        assert_matches!(err, Error::Configuration(_));
    }

    #[test]
    fn test_unnamed_cluster_fails() {
        let err = ConfigurationBuilder::new()
            .add_cluster("")
            .add_cluster_node("host1", 1234)
            .build()
            .unwrap_err();
        assert_matches!(err, Error::Configuration(_));
    }

    #[test]
    fn test_malformed_address_fails_at_build() {
        let err = ConfigurationBuilder::new()
            .add_servers("host1:not-a-port")
            .build()
            .unwrap_err();
        assert_matches!(err, Error::Configuration(_));
    }
}
