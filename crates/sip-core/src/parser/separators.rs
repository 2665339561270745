//! Separators with their surrounding optional whitespace (RFC 3261 25.1)

use nom::{
    bytes::complete::tag,
    combinator::recognize,
    sequence::{pair, tuple},
};

use super::whitespace::sws;
use super::ParseResult;

/// SEMI = SWS ";" SWS
pub fn semi(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b";"), sws)))(input)
}

/// COMMA = SWS "," SWS
pub fn comma(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b","), sws)))(input)
}

/// EQUAL = SWS "=" SWS
pub fn equal(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b"="), sws)))(input)
}

/// SLASH = SWS "/" SWS
pub fn slash(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(tuple((sws, tag(b"/"), sws)))(input)
}

/// LAQUOT = SWS "<"
pub fn laquot(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(pair(sws, tag(b"<")))(input)
}

/// RAQUOT = ">" SWS
pub fn raquot(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(pair(tag(b">"), sws))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semi_absorbs_whitespace() {
        let (rem, _) = semi(b" ; lr").unwrap();
        assert_eq!(rem, b"lr");
        assert!(semi(b",").is_err());
    }

    #[test]
    fn test_angle_quotes() {
        let (rem, _) = laquot(b"  <sip:x").unwrap();
        assert_eq!(rem, b"sip:x");
        let (rem, _) = raquot(b">  ;tag=1").unwrap();
        assert_eq!(rem, b";tag=1");
    }
}
