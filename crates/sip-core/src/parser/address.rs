//! name-addr / addr-spec values and comma-separated lists of them
//!
//! ```text
//! name-addr    = [ display-name ] LAQUOT addr-spec RAQUOT
//! display-name = *(token LWS) / quoted-string
//! ```

use std::str;

use nom::{
    branch::alt,
    combinator::{map, map_res, opt, recognize},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, terminated, tuple},
};

use super::params::header_params;
use super::separators::{comma, laquot, raquot};
use super::token::{quoted_content, token};
use super::uri::{uri, uri_without_params};
use super::whitespace::{lws, sws};
use super::ParseResult;
use crate::types::address::Address;
use crate::types::uri::Uri;

/// display-name, with the quotes of a quoted-string removed
fn display_name(input: &[u8]) -> ParseResult<String> {
    map_res(
        alt((
            quoted_content,
            recognize(separated_list1(lws, token)),
        )),
        |s: &[u8]| str::from_utf8(s).map(str::to_string),
    )(input)
}

fn name_addr(input: &[u8]) -> ParseResult<(Option<String>, Uri)> {
    map(
        tuple((opt(display_name), laquot, uri, raquot)),
        |(name, _, uri, _)| (name.filter(|n| !n.is_empty()), uri),
    )(input)
}

fn addr_spec(input: &[u8]) -> ParseResult<(Option<String>, Uri)> {
    map(uri_without_params, |uri| (None, uri))(input)
}

/// ( name-addr / addr-spec ) *( SEMI generic-param )
pub fn address(input: &[u8]) -> ParseResult<Address> {
    map(
        pair(alt((name_addr, addr_spec)), header_params),
        |((display_name, uri), params)| Address {
            display_name,
            uri,
            params,
        },
    )(input)
}

/// A header value holding any number of comma-separated addresses
pub fn address_list(input: &[u8]) -> ParseResult<Vec<Address>> {
    delimited(sws, separated_list0(comma, terminated(address, sws)), sws)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display_name() {
        let (rem, addr) = address(b"Alice Smith <sip:alice@atlanta.com>;tag=88").unwrap();
        assert!(rem.is_empty());
        assert_eq!(addr.display_name.as_deref(), Some("Alice Smith"));
        assert_eq!(addr.tag(), Some("88"));
    }

    #[test]
    fn test_uri_params_stay_inside_angles() {
        let (_, addr) = address(b"<sip:p1.example.com;lr>;x=1").unwrap();
        assert!(addr.uri.is_loose_route());
        assert_eq!(addr.param("x"), Some("1"));
        assert_eq!(addr.display_name, None);
    }

    #[test]
    fn test_empty_quoted_name_is_none() {
        let (_, addr) = address(b"\"\" <sip:x>").unwrap();
        assert_eq!(addr.display_name, None);
    }

    #[test]
    fn test_address_list_separators() {
        let (rem, list) = address_list(b" <sip:a@x> ,\"B, C\" <sip:b@y>;tag=2 ").unwrap();
        assert!(rem.is_empty());
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].display_name.as_deref(), Some("B, C"));
        assert_eq!(list[1].tag(), Some("2"));

        let (rem, empty) = address_list(b"").unwrap();
        assert!(rem.is_empty());
        assert!(empty.is_empty());
    }
}
