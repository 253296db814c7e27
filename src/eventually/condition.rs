//! Conditions the matcher polls.

use crate::session::StreamCursor;

use super::pattern::Pattern;

/// Result of evaluating a condition once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// The condition holds.
    Satisfied,
    /// Not yet; carries what was observed.
    Pending(String),
    /// Can never hold from here on; carries what was observed.
    Settled(String),
}

/// Something that can be evaluated repeatedly until it holds.
pub trait Condition {
    /// What the condition waits for, for reports.
    fn describe(&self) -> String;

    /// Evaluate once against the current state of the source.
    fn check(&mut self) -> Check;
}

/// A pattern appearing after a cursor's position.
///
/// A match moves the cursor past the end of the match. Evaluating reads the
/// unread bytes and the closed flag together, so a closed stream without a
/// match is final.
pub struct Say<'a> {
    cursor: &'a mut StreamCursor,
    pattern: &'a Pattern,
}

impl<'a> Say<'a> {
    pub fn new(cursor: &'a mut StreamCursor, pattern: &'a Pattern) -> Self {
        Self { cursor, pattern }
    }
}

impl Condition for Say<'_> {
    fn describe(&self) -> String {
        format!("output matching {}", self.pattern)
    }

    fn check(&mut self) -> Check {
        let (unread, closed) = self.cursor.unread();
        if let Some(found) = self.pattern.find(&unread) {
            self.cursor.advance(found.end);
            return Check::Satisfied;
        }
        let observed = String::from_utf8_lossy(&unread).into_owned();
        if closed {
            Check::Settled(observed)
        } else {
            Check::Pending(observed)
        }
    }
}

/// A side-effecting probe returning a fresh boolean each call.
pub struct Probe<F> {
    description: String,
    probe: F,
}

impl<F> Probe<F>
where
    F: FnMut() -> bool,
{
    pub fn new(description: impl Into<String>, probe: F) -> Self {
        Self {
            description: description.into(),
            probe,
        }
    }
}

impl<F> Condition for Probe<F>
where
    F: FnMut() -> bool,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn check(&mut self) -> Check {
        if (self.probe)() {
            Check::Satisfied
        } else {
            Check::Pending("false".to_string())
        }
    }
}
