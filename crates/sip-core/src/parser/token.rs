//! token and quoted-string (RFC 3261 25.1)

use std::str;

use nom::{
    branch::alt,
    bytes::complete::{tag, take, take_while1},
    combinator::{map_res, recognize},
    multi::many0,
    sequence::{delimited, pair},
};

use super::ParseResult;

/// token = 1*(alphanum / "-" / "." / "!" / "%" / "*" / "_" / "+" / "`" / "'" / "~")
pub fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"-.!%*_+`'~".contains(&c)
}

pub fn token(input: &[u8]) -> ParseResult<&[u8]> {
    take_while1(is_token_char)(input)
}

/// A token as an owned string
pub fn token_string(input: &[u8]) -> ParseResult<String> {
    map_res(token, |t: &[u8]| str::from_utf8(t).map(str::to_string))(input)
}

fn is_qdtext(c: u8) -> bool {
    c != b'"' && c != b'\\' && c != b'\r' && c != b'\n'
}

/// quoted-pair = "\" any byte
fn quoted_pair(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(pair(tag(b"\\"), take(1usize)))(input)
}

/// The text between the quotes of a quoted-string, escapes left in place
pub fn quoted_content(input: &[u8]) -> ParseResult<&[u8]> {
    delimited(
        tag(b"\""),
        recognize(many0(alt((take_while1(is_qdtext), quoted_pair)))),
        tag(b"\""),
    )(input)
}

/// A whole quoted-string, quotes included
pub fn quoted_string(input: &[u8]) -> ParseResult<&[u8]> {
    recognize(quoted_content)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token() {
        let (rem, val) = token(b"INVITE sip:x").unwrap();
        assert_eq!(val, b"INVITE");
        assert_eq!(rem, b" sip:x");
        assert!(token(b"<sip:x>").is_err());
    }

    #[test]
    fn test_quoted_content_keeps_escapes() {
        let (rem, val) = quoted_content(br#""Q, \"R\"" <sip:x>"#).unwrap();
        assert_eq!(val, br#"Q, \"R\""#);
        assert_eq!(rem, b" <sip:x>");

        let (_, empty) = quoted_content(b"\"\"").unwrap();
        assert!(empty.is_empty());
        assert!(quoted_content(b"\"open").is_err());
    }
}
