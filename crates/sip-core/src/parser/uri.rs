//! SIP-URI / SIPS-URI (RFC 3261 25.1); URI headers (`?h=v`) are not read

use std::str;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    combinator::{map, map_res, opt, recognize},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::number::unsigned;
use super::params::uri_params;
use super::ParseResult;
use crate::types::uri::Uri;

fn is_scheme_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'+' || c == b'-' || c == b'.'
}

/// scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ), lowercased
pub fn scheme(input: &[u8]) -> ParseResult<String> {
    map_res(
        recognize(pair(
            take_while_m_n(1, 1, |c: u8| c.is_ascii_alphabetic()),
            take_while(is_scheme_char),
        )),
        |s: &[u8]| str::from_utf8(s).map(str::to_ascii_lowercase),
    )(input)
}

/// User and password characters; `;` is left out so it always starts a parameter
fn is_userinfo_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"-_.!~*'()%&=+$,?/:".contains(&c)
}

/// userinfo = user [ ":" password ] "@"
fn userinfo(input: &[u8]) -> ParseResult<String> {
    map_res(
        terminated(take_while1(is_userinfo_char), tag(b"@")),
        |s: &[u8]| str::from_utf8(s).map(str::to_string),
    )(input)
}

fn ipv6_reference(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(delimited(
        tag(b"["),
        take_while1(|c: u8| c.is_ascii_hexdigit() || c == b':' || c == b'.'),
        tag(b"]"),
    ))(input)
}

fn hostname(input: &[u8]) -> ParseResult<&[u8]> {
    take_while1(|c: u8| c.is_ascii_alphanumeric() || c == b'-' || c == b'.' || c == b'_')(input)
}

/// host = hostname / IPv4address / IPv6reference
pub fn host(input: &[u8]) -> ParseResult<String> {
    map_res(alt((ipv6_reference, hostname)), |s: &[u8]| {
        str::from_utf8(s).map(str::to_string)
    })(input)
}

/// hostport = host [ ":" port ]
pub fn host_port(input: &[u8]) -> ParseResult<(String, Option<u16>)> {
    pair(host, opt(preceded(tag(b":"), unsigned::<u16>)))(input)
}

/// A URI up to, but not including, its parameters
///
/// This is the form an addr-spec takes in From, To and Contact without angle
/// brackets, where trailing parameters belong to the header.
pub fn uri_without_params(input: &[u8]) -> ParseResult<Uri> {
    map(
        tuple((scheme, tag(b":"), opt(userinfo), host_port)),
        |(scheme, _, user, (host, port))| Uri {
            scheme,
            user,
            host,
            port,
            params: Vec::new(),
        },
    )(input)
}

/// A full URI with its `;` parameters
pub fn uri(input: &[u8]) -> ParseResult<Uri> {
    map(pair(uri_without_params, uri_params), |(mut uri, params)| {
        uri.params = params;
        uri
    })(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port() {
        let (rem, (host, port)) = host_port(b"[2001:db8::1]:5061;lr").unwrap();
        assert_eq!(host, "[2001:db8::1]");
        assert_eq!(port, Some(5061));
        assert_eq!(rem, b";lr");

        let (rem, (host, port)) = host_port(b"example.com>").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(port, None);
        assert_eq!(rem, b">");
    }

    #[test]
    fn test_userinfo_needs_at_sign() {
        // Without '@' the text is a host, not a user
        let (rem, parsed) = uri(b"sip:proxy.example.com:5070").unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.user, None);
        assert_eq!(parsed.port, Some(5070));

        let (_, parsed) = uri(b"sip:alice:secret@atlanta.com").unwrap();
        assert_eq!(parsed.user.as_deref(), Some("alice:secret"));
    }

    #[test]
    fn test_scheme_is_lowercased() {
        let (_, parsed) = uri(b"SIPS:bob@biloxi.com").unwrap();
        assert_eq!(parsed.scheme, "sips");
        assert!(scheme(b"5ip:x").is_err());
    }

    #[test]
    fn test_addr_spec_leaves_params() {
        let (rem, parsed) = uri_without_params(b"sip:bob@biloxi.com;tag=abc").unwrap();
        assert_eq!(parsed.host, "biloxi.com");
        assert_eq!(rem, b";tag=abc");
    }
}
