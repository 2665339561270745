use std::str::{self, FromStr};

use nom::{
    branch::alt,
    character::complete::digit1,
    combinator::{map_res, opt, rest},
    sequence::{pair, terminated},
};

use super::separators::semi;
use super::whitespace::lws;
use super::ParseResult;

/// 1*DIGIT read into any unsigned integer type; overflow is a parse error
pub fn unsigned<T: FromStr>(input: &[u8]) -> ParseResult<T> {
    map_res(digit1, |digits: &[u8]| {
        str::from_utf8(digits)
            .map_err(|_| ())
            .and_then(|s| s.parse::<T>().map_err(|_| ()))
    })(input)
}

/// Retry-After = delta-seconds [ comment ] *( SEMI retry-param )
///
/// Only the delay is kept.
pub fn retry_after(input: &[u8]) -> ParseResult<u32> {
    terminated(unsigned::<u32>, opt(pair(alt((semi, lws)), rest)))(input)
}
