//! via-parm = sent-protocol LWS sent-by *( SEMI via-params )

use nom::{
    bytes::complete::{tag, tag_no_case},
    combinator::map,
    sequence::tuple,
};

use super::params::header_params;
use super::separators::slash;
use super::token::token_string;
use super::uri::host_port;
use super::whitespace::lws;
use super::ParseResult;
use crate::types::via::Via;

/// sent-protocol = "SIP" SLASH "2.0" SLASH transport
fn sent_protocol(input: &[u8]) -> ParseResult<String> {
    map(
        tuple((tag_no_case(b"SIP"), slash, tag(b"2.0"), slash, token_string)),
        |(_, _, _, _, transport)| transport.to_ascii_uppercase(),
    )(input)
}

/// A single via-parm
pub fn via(input: &[u8]) -> ParseResult<Via> {
    map(
        tuple((sent_protocol, lws, host_port, header_params)),
        |(transport, _, (host, port), params)| Via {
            transport,
            host,
            port,
            params,
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_protocol_spacing() {
        let (rem, parsed) = via(b"SIP / 2.0 / tcp 10.0.0.1:5061 ;branch=z9hG4bKx").unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.transport, "TCP");
        assert_eq!(parsed.port, Some(5061));
        assert_eq!(parsed.branch(), Some("z9hG4bKx"));
    }

    #[test]
    fn test_sent_by_required() {
        assert!(via(b"SIP/2.0/UDP").is_err());
        assert!(via(b"SIP/2.0/UDP ;branch=z9hG4bKx").is_err());
    }
}
