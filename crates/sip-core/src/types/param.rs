//! # SIP Parameters
//!
//! Generic `name[=value]` parameters as they appear on URIs and on header
//! values such as Via, From, To, Contact and Route (RFC 3261 Section 25.1).
//! Parameter names compare case-insensitively; values are kept verbatim.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::params::generic_param;
use crate::parser::parse_complete;

/// A single `name[=value]` parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    /// Creates a parameter with a value (`name=value`)
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Creates a flag parameter without a value (e.g. `lr`)
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Self::new("tag", value)
    }

    pub fn branch(value: impl Into<String>) -> Self {
        Self::new("branch", value)
    }

    /// Case-insensitive name comparison
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for Param {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_complete(generic_param, s.trim()).ok_or_else(|| Error::InvalidHeader {
            header: "param",
            reason: format!("malformed parameter '{}'", s),
        })
    }
}

/// Helpers for a list of parameters, shared by [`Uri`](crate::types::uri::Uri),
/// [`Address`](crate::types::address::Address) and [`Via`](crate::types::via::Via).
pub(crate) trait ParamList {
    fn get_param(&self, name: &str) -> Option<&str>;
    fn has_param(&self, name: &str) -> bool;
    fn set_param(&mut self, param: Param);
    fn remove_param(&mut self, name: &str);
}

impl ParamList for Vec<Param> {
    fn get_param(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|p| p.is(name))
            .and_then(|p| p.value.as_deref())
    }

    fn has_param(&self, name: &str) -> bool {
        self.iter().any(|p| p.is(name))
    }

    fn set_param(&mut self, param: Param) {
        match self.iter_mut().find(|p| p.is(&param.name)) {
            Some(existing) => *existing = param,
            None => self.push(param),
        }
    }

    fn remove_param(&mut self, name: &str) {
        self.retain(|p| !p.is(name));
    }
}

pub(crate) fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    for p in params {
        write!(f, ";{}", p)?;
    }
    Ok(())
}
