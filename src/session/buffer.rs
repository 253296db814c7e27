//! Append-only output buffers and read cursors.

use std::sync::{Arc, PoisonError, RwLock};

use crate::output::strip_ansi;

#[derive(Debug, Default)]
struct Inner {
    data: Vec<u8>,
    closed: bool,
}

/// Growing capture of one output stream of a process.
///
/// The buffer is shared between the capture task that appends to it and
/// any number of readers. Bytes are never removed or rewritten, so a read
/// taken at any time is a prefix of every later read.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    inner: Arc<RwLock<Inner>>,
}

impl OutputBuffer {
    /// Create an empty, open buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the end of the buffer.
    ///
    /// Appending to a closed buffer is ignored.
    pub fn append(&self, bytes: &[u8]) {
        // Append-only data is still consistent after a panicking writer.
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.closed {
            inner.data.extend_from_slice(bytes);
        }
    }

    /// Mark the stream as finished; no more bytes will arrive.
    pub fn close(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
    }

    /// Whether the writing side has finished.
    pub fn is_closed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Number of bytes captured so far.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .len()
    }

    /// Whether nothing has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of everything captured so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .clone()
    }

    /// Everything captured so far, decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&inner.data).into_owned()
    }

    /// Bytes from `offset` to the current end, plus the closed flag, read
    /// under a single lock so the two agree.
    pub fn read_from(&self, offset: usize) -> (Vec<u8>, bool) {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let start = offset.min(inner.data.len());
        (inner.data[start..].to_vec(), inner.closed)
    }

    /// A new cursor positioned at the start of the buffer.
    pub fn cursor(&self) -> StreamCursor {
        StreamCursor::new(self.clone())
    }
}

/// Read position over an [`OutputBuffer`].
///
/// Matching through a cursor moves only the cursor: the buffer keeps every
/// byte, and other cursors over the same buffer are unaffected. With
/// `strip_ansi` enabled the cursor works on the escape-free rendering of
/// the buffer, and its offset counts bytes of that rendering.
#[derive(Debug, Clone)]
pub struct StreamCursor {
    buffer: OutputBuffer,
    offset: usize,
    strip_ansi: bool,
}

impl StreamCursor {
    /// Create a cursor at the start of `buffer`.
    pub fn new(buffer: OutputBuffer) -> Self {
        Self {
            buffer,
            offset: 0,
            strip_ansi: false,
        }
    }

    /// Match against output with ANSI escape sequences removed.
    ///
    /// Resets the cursor, since offsets in the two renderings differ.
    pub fn strip_ansi(mut self, enabled: bool) -> Self {
        if self.strip_ansi != enabled {
            self.offset = 0;
        }
        self.strip_ansi = enabled;
        self
    }

    /// Current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    /// Everything in the underlying buffer, regardless of cursor position.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.contents()
    }

    /// Bytes after the cursor, plus whether the stream has closed.
    pub fn unread(&self) -> (Vec<u8>, bool) {
        if self.strip_ansi {
            let (all, closed) = self.buffer.read_from(0);
            let clean = strip_ansi(&all).into_bytes();
            let start = self.offset.min(clean.len());
            (clean[start..].to_vec(), closed)
        } else {
            self.buffer.read_from(self.offset)
        }
    }

    /// Text after the cursor, decoded lossily.
    pub fn unread_text(&self) -> String {
        String::from_utf8_lossy(&self.unread().0).into_owned()
    }

    /// Move the cursor forward by `n` bytes.
    pub fn advance(&mut self, n: usize) {
        self.offset += n;
    }

    /// Move the cursor to the end of what has been captured so far.
    pub fn skip_to_end(&mut self) {
        let (rest, _) = self.unread();
        self.offset += rest.len();
    }
}
