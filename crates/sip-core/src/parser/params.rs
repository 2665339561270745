//! `name[=value]` parameters on header values and inside URIs

use std::str;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::{map, map_res, opt},
    multi::many0,
    sequence::{pair, preceded},
};

use super::separators::{equal, semi};
use super::token::{quoted_string, token_string};
use super::ParseResult;
use crate::types::param::Param;

fn is_gen_value_char(c: u8) -> bool {
    // token characters plus what a host or IPv6 reference adds
    super::token::is_token_char(c) || c == b':' || c == b'[' || c == b']'
}

fn utf8_string(bytes: &[u8]) -> Result<String, str::Utf8Error> {
    str::from_utf8(bytes).map(str::to_string)
}

/// gen-value = token / host / quoted-string, kept verbatim
fn gen_value(input: &[u8]) -> ParseResult<String> {
    map_res(
        alt((quoted_string, take_while1(is_gen_value_char))),
        utf8_string,
    )(input)
}

/// generic-param = token [ EQUAL gen-value ]
pub fn generic_param(input: &[u8]) -> ParseResult<Param> {
    map(
        pair(token_string, opt(preceded(equal, gen_value))),
        |(name, value)| Param { name, value },
    )(input)
}

/// *( SEMI generic-param )
pub fn header_params(input: &[u8]) -> ParseResult<Vec<Param>> {
    many0(preceded(semi, generic_param))(input)
}

/// paramchar = param-unreserved / unreserved / escaped
fn is_paramchar(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"-_.!~*'()%[]/:&+$".contains(&c)
}

/// uri-parameter = pname [ "=" pvalue ]
pub fn uri_param(input: &[u8]) -> ParseResult<Param> {
    map(
        pair(
            map_res(take_while1(is_paramchar), utf8_string),
            opt(preceded(tag(b"="), map_res(take_while1(is_paramchar), utf8_string))),
        ),
        |(name, value)| Param { name, value },
    )(input)
}

/// *( ";" uri-parameter ), no whitespace allowed inside a URI
pub fn uri_params(input: &[u8]) -> ParseResult<Vec<Param>> {
    many0(preceded(tag(b";"), uri_param))(input)
}
