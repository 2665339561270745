//! # SIP URIs
//!
//! A compact `scheme:[user@]host[:port][;params]` representation covering the
//! URIs the dialog layer stores (remote targets, route entries, contacts).
//! URI headers (`?h=v`) are not modelled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::parse_complete;
use crate::parser::uri::uri;
use crate::types::param::{write_params, Param, ParamList};

/// A SIP, SIPS or other scheme URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: String,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub params: Vec<Param>,
}

impl Uri {
    /// Creates a `sip:` URI for the given host
    pub fn sip(host: impl Into<String>) -> Self {
        Self {
            scheme: "sip".to_string(),
            user: None,
            host: host.into(),
            port: None,
            params: Vec::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.set_param(param);
        self
    }

    /// Value of a URI parameter, if present with a value
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get_param(name)
    }

    /// Loose-routing flag (`;lr`)
    pub fn is_loose_route(&self) -> bool {
        self.params.has_param("lr")
    }

    /// `host[:port]` as it would appear in a Via sent-by
    pub fn host_port(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host_port())?;
        write_params(f, &self.params)
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_complete(uri, s.trim()).ok_or_else(|| Error::InvalidUri(s.to_string()))
    }
}
