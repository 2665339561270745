//! # Via
//!
//! A single Via header value (`SIP/2.0/UDP host:port;branch=z9hG4bK...`).
//! The branch parameter drives RFC 3261 transaction matching; values that
//! start with the magic cookie identify RFC 3261 compliant peers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::parse_complete;
use crate::parser::via::via;
use crate::types::param::{write_params, Param, ParamList};

/// Branch prefix of RFC 3261 compliant implementations
pub const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

/// One Via hop
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Via {
    /// Transport token, e.g. `UDP`, `TCP`, `TLS`, `WS`
    pub transport: String,
    pub host: String,
    pub port: Option<u16>,
    pub params: Vec<Param>,
}

impl Via {
    pub fn new(transport: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            transport: transport.into().to_ascii_uppercase(),
            host: host.into(),
            port,
            params: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.set_branch(branch);
        self
    }

    pub fn branch(&self) -> Option<&str> {
        self.params.get_param("branch")
    }

    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.params.set_param(Param::branch(branch));
    }

    /// True when the branch carries the RFC 3261 magic cookie
    pub fn has_rfc3261_branch(&self) -> bool {
        self.branch()
            .map(|b| b.starts_with(BRANCH_MAGIC_COOKIE) && b.len() > BRANCH_MAGIC_COOKIE.len())
            .unwrap_or(false)
    }

    /// `host[:port]` of the sending element
    pub fn sent_by(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get_param(name)
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0/{} {}", self.transport, self.sent_by())?;
        write_params(f, &self.params)
    }
}

impl FromStr for Via {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_complete(via, s.trim()).ok_or_else(|| Error::InvalidHeader {
            header: "Via",
            reason: format!("malformed via-parm '{}'", s),
        })
    }
}
