//! # Header value grammar
//!
//! `nom` combinators over `&[u8]` for the RFC 3261 Section 25.1 productions
//! the message model reads: URIs, name-addr / addr-spec values and lists of
//! them, Via, CSeq, generic parameters and the numeric headers. The
//! `FromStr` impls in [`crate::types`] run these through [`parse_complete`].

use nom::combinator::all_consuming;
use nom::{IResult, Parser};

pub mod address;
pub mod cseq;
pub mod number;
pub mod params;
pub mod separators;
pub mod token;
pub mod uri;
pub mod via;
pub mod whitespace;

// Type alias for parser result
pub type ParseResult<'a, O> = IResult<&'a [u8], O>;

/// Runs `parser` over all of `input`
///
/// Returns `None` when the parser fails or leaves bytes unconsumed.
pub fn parse_complete<'a, O, P>(parser: P, input: &'a str) -> Option<O>
where
    P: Parser<&'a [u8], O, nom::error::Error<&'a [u8]>>,
{
    all_consuming(parser)(input.as_bytes())
        .ok()
        .map(|(_, output)| output)
}
