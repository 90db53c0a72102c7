//! # Model Addressing
//!
//! A served model is addressed as `<scheme>+<protocol>://<host>/<model>/<version>`,
//! for example `triton+grpc://localhost:8001/resnet/1`. The protocol selects
//! which registered transport talks to the host.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Wire protocol used to reach the serving endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Grpc,
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Grpc => "grpc",
            Protocol::Http => "http",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grpc" => Ok(Protocol::Grpc),
            "http" => Ok(Protocol::Http),
            other => Err(ConfigurationError::UnknownProtocol {
                protocol: other.to_string(),
            }),
        }
    }
}

/// A parsed model address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelAddress {
    scheme: String,
    protocol: Protocol,
    host: String,
    model: String,
    version: String,
}

impl ModelAddress {
    /// Parses `<scheme>+<protocol>://<host>/<model>/<version>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MalformedAddress`] when the address does not
    /// have that shape, and [`ConfigurationError::UnknownProtocol`] when the
    /// protocol is neither `grpc` nor `http`.
    pub fn parse(address: &str) -> Result<Self, ConfigurationError> {
        let malformed = |reason| ConfigurationError::MalformedAddress {
            address: address.to_string(),
            reason,
        };

        let (full_protocol, location) = address
            .split_once("://")
            .ok_or_else(|| malformed("missing `://` separator"))?;
        let (scheme, protocol) = full_protocol
            .split_once('+')
            .ok_or_else(|| malformed("missing `+` between scheme and protocol"))?;
        if scheme.is_empty() || protocol.is_empty() || protocol.contains('+') {
            return Err(malformed("expected exactly one scheme and one protocol"));
        }

        let segments: Vec<&str> = location.split('/').collect();
        let [host, model, version] = segments.as_slice() else {
            return Err(malformed("expected exactly <host>/<model>/<version>"));
        };
        if host.is_empty() || model.is_empty() || version.is_empty() {
            return Err(malformed("host, model and version must be non-empty"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            protocol: protocol.parse()?,
            host: host.to_string(),
            model: model.to_string(),
            version: version.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Host (and optional port) of the serving endpoint.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl FromStr for ModelAddress {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelAddress::parse(s)
    }
}

impl fmt::Display for ModelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+{}://{}/{}/{}",
            self.scheme, self.protocol, self.host, self.model, self.version
        )
    }
}
