//! CSeq header value (`<seq> <METHOD>`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::cseq::cseq;
use crate::parser::parse_complete;
use crate::types::method::Method;

/// Command sequence: sequence number plus method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

impl FromStr for CSeq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_complete(cseq, s.trim()).ok_or_else(|| Error::InvalidHeader {
            header: "CSeq",
            reason: s.to_string(),
        })
    }
}
