//! CSeq = 1*DIGIT LWS Method

use nom::{combinator::map_res, sequence::tuple};

use super::number::unsigned;
use super::token::token;
use super::whitespace::lws;
use super::ParseResult;
use crate::types::cseq::CSeq;
use crate::types::method::Method;

pub fn cseq(input: &[u8]) -> ParseResult<CSeq> {
    map_res(
        tuple((unsigned::<u32>, lws, token)),
        |(seq, _, method): (u32, &[u8], &[u8])| {
            std::str::from_utf8(method)
                .map_err(|_| ())
                .and_then(|m| m.parse::<Method>().map_err(|_| ()))
                .map(|method| CSeq { seq, method })
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cseq_extension_method() {
        let (rem, parsed) = cseq(b"42  PUBLISH").unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.seq, 42);
        assert_eq!(parsed.method, Method::Publish);

        let (_, extension) = cseq(b"1 X-CUSTOM").unwrap();
        assert_eq!(extension.method, Method::Extension("X-CUSTOM".to_string()));
    }

    #[test]
    fn test_cseq_overflow_rejected() {
        assert!(cseq(b"4294967296 INVITE").is_err());
        assert!(cseq(b"7INVITE").is_err());
    }
}
