//! # Name-Addr values
//!
//! The `[display-name] <uri>;params` form shared by From, To, Contact, Route,
//! Record-Route, Refer-To and Referred-By. The `tag` parameter lives on the
//! address, not on the URI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::address::{address, address_list};
use crate::parser::parse_complete;
use crate::types::param::{write_params, Param, ParamList};
use crate::types::uri::Uri;

/// A name-addr / addr-spec with header parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub display_name: Option<String>,
    pub uri: Uri,
    pub params: Vec<Param>,
}

impl Address {
    pub fn new(uri: Uri) -> Self {
        Self {
            display_name: None,
            uri,
            params: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.set_tag(tag);
        self
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.set_param(param);
        self
    }

    /// The `tag` parameter, if any
    pub fn tag(&self) -> Option<&str> {
        self.params.get_param("tag")
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.params.set_param(Param::tag(tag));
    }

    pub fn remove_tag(&mut self) {
        self.params.remove_param("tag");
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get_param(name)
    }
}

impl From<Uri> for Address {
    fn from(uri: Uri) -> Self {
        Address::new(uri)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name)?;
        }
        write!(f, "<{}>", self.uri)?;
        write_params(f, &self.params)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_complete(address, s.trim()).ok_or_else(|| Error::InvalidUri(s.to_string()))
    }
}

/// Parses a comma-separated list of addresses (Contact, Route, Record-Route)
pub(crate) fn parse_address_list(s: &str) -> Result<Vec<Address>> {
    parse_complete(address_list, s).ok_or_else(|| Error::InvalidHeader {
        header: "address list",
        reason: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_addr_with_tag() {
        let addr: Address = "\"Alice\" <sip:alice@atlanta.com>;tag=1928301774".parse().unwrap();
        assert_eq!(addr.display_name.as_deref(), Some("Alice"));
        assert_eq!(addr.uri.user.as_deref(), Some("alice"));
        assert_eq!(addr.tag(), Some("1928301774"));
    }

    #[test]
    fn test_addr_spec_params_go_to_header() {
        let addr: Address = "sip:bob@biloxi.com;tag=abc".parse().unwrap();
        assert_eq!(addr.tag(), Some("abc"));
        assert!(addr.uri.params.is_empty());
    }

    #[test]
    fn test_set_tag_replaces() {
        let mut addr = Address::new("sip:a@x".parse().unwrap()).with_tag("one");
        addr.set_tag("two");
        assert_eq!(addr.tag(), Some("two"));
        assert_eq!(addr.to_string(), "<sip:a@x>;tag=two");
        addr.remove_tag();
        assert_eq!(addr.tag(), None);
    }

    #[test]
    fn test_parse_address_list() {
        let list = parse_address_list("<sip:p1.example.com;lr>, \"Q, R\" <sip:p2.example.com;lr>").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].uri.host, "p1.example.com");
        assert_eq!(list[1].display_name.as_deref(), Some("Q, R"));
    }

    #[test]
    fn test_malformed_addresses_rejected() {
        assert!("\"Alice\" <sip:alice@atlanta.com".parse::<Address>().is_err());
        assert!("<sip:alice@atlanta.com> trailing".parse::<Address>().is_err());
        assert!("\"unterminated <sip:a@x>".parse::<Address>().is_err());
        assert!(parse_address_list("<sip:a@x>,").is_err());
    }
}
