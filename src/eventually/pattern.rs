//! Output patterns.

use std::fmt;
use std::ops::Range;

use regex::bytes::Regex;

use crate::error::HarnessError;
use crate::identity::{self, Arg};
use crate::Result;

/// A regular expression matched against captured output bytes.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| HarnessError::Template(format!("invalid pattern {:?}: {}", pattern, e)))?;
        Ok(Self { regex })
    }

    /// Substitute `args` into `template`, then compile the result.
    ///
    /// Arguments are inserted verbatim, so they are regex syntax too.
    pub fn format(template: &str, args: &[Arg]) -> Result<Self> {
        Self::new(&identity::format(template, args)?)
    }

    /// A pattern matching `text` literally.
    pub fn literal(text: &str) -> Result<Self> {
        Self::new(&regex::escape(text))
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the pattern occurs anywhere in `haystack`.
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        self.regex.is_match(haystack)
    }

    /// Byte range of the first occurrence in `haystack`.
    pub fn find(&self, haystack: &[u8]) -> Option<Range<usize>> {
        self.regex.find(haystack).map(|m| m.range())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.regex.as_str())
    }
}

/// Pattern for the CLI's error convention, `Error: <msg>`.
///
/// `msg` is matched literally.
pub fn prepend_error(msg: &str) -> Result<Pattern> {
    Pattern::literal(&format!("Error: {}", msg))
}
