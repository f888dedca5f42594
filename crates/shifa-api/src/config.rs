// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP server settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shifa_config::ShifaConfig;
use shifa_core::guard::DEFAULT_ROUTE;

/// Settings the router and listener need.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Bind address.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Allowed CORS origins. Empty or `*` allows any.
    pub cors_origins: Vec<String>,
    /// Where denied requests are redirected.
    pub default_route: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
            default_route: DEFAULT_ROUTE.to_string(),
        }
    }
}

impl ApiSettings {
    /// Extracts server settings from the service configuration.
    pub fn from_config(config: &ShifaConfig) -> Self {
        Self {
            host: config.server.host,
            port: config.server.port,
            request_timeout: config.server.request_timeout,
            cors_origins: config.server.cors_origins.clone(),
            default_route: config.security.default_route.clone(),
        }
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the denial redirect target.
    pub fn with_default_route(mut self, route: impl Into<String>) -> Self {
        self.default_route = route.into();
        self
    }

    /// Returns `true` if any origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}
