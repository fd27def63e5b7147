//! Input buffer and cursor types for the matching engine.
//!
//! The buffer is an immutable, random-access view of the input text
//! terminated by the [`EOI`] sentinel. Locations are value-like cursors
//! into the buffer; besides plain advancement they support *virtual*
//! input, synthetic characters queued in front of a real position so a
//! recovery strategy can model an insertion without touching the buffer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Sentinel character returned past the end of the input.
pub const EOI: char = '\u{FFFF}';

/// Marker used inside [`crate::chars::CharacterSet`] to stand for "may
/// match without consuming input". Never occurs in real input.
pub const EMPTY: char = '\u{FFFE}';

// ============================================================================
// INPUT BUFFER
// ============================================================================

/// Random-access character buffer over the input text.
///
/// Indexing past the end yields [`EOI`]. The buffer is immutable during a
/// parse and cheap to share.
///
/// # Examples
///
/// ```rust
/// use vyaka::input::{InputBuffer, EOI};
/// let buf = InputBuffer::new("ab");
/// assert_eq!(buf.char_at(0), 'a');
/// assert_eq!(buf.char_at(2), EOI);
/// ```
#[derive(Debug, Clone)]
pub struct InputBuffer {
    text: Arc<String>,
    chars: Arc<Vec<char>>,
}

impl InputBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let chars = text.chars().collect();
        Self {
            text: Arc::new(text),
            chars: Arc::new(chars),
        }
    }

    /// The character at `index`, or [`EOI`] past the end.
    pub fn char_at(&self, index: usize) -> char {
        self.chars.get(index).copied().unwrap_or(EOI)
    }

    /// Number of characters in the buffer, excluding the sentinel.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The full input text, shared.
    pub fn text(&self) -> Arc<String> {
        Arc::clone(&self.text)
    }

    /// Extracts the text between two character indices (clamped).
    pub fn extract(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        if start >= end {
            return String::new();
        }
        self.chars[start..end].iter().collect()
    }

    /// The text of the 1-based line containing `index`, without its
    /// terminating newline.
    pub fn line_text(&self, line: usize) -> String {
        self.text
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or("")
            .to_string()
    }
}

// ============================================================================
// INPUT LOCATION
// ============================================================================

/// A cursor into an [`InputBuffer`].
///
/// Locations are value-like: cheap to clone, compared by position. Two
/// locations are equal iff they denote the same position, including any
/// pending virtual characters; this equality is the emptiness probe used
/// by the repetition matchers.
///
/// Virtual characters inserted via [`InputLocation::insert_virtual_char`]
/// queue in front of the underlying position and are consumed by
/// [`InputLocation::advance`] before the buffer itself moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLocation {
    /// Character index into the buffer.
    pub index: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    pending: Vec<char>,
}

impl InputLocation {
    /// The location of the first character of a buffer.
    pub fn start() -> Self {
        Self {
            index: 0,
            line: 1,
            column: 1,
            pending: Vec::new(),
        }
    }

    /// The character under the cursor: the front virtual character if any
    /// queued, else the buffer character at `index`.
    pub fn current_char(&self, buffer: &InputBuffer) -> char {
        match self.pending.first() {
            Some(c) => *c,
            None => buffer.char_at(self.index),
        }
    }

    /// True if virtual characters are queued at this location.
    pub fn has_virtual_input(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The location one character further on. Virtual characters are
    /// consumed first and do not move the underlying position. Advancing
    /// at [`EOI`] yields an equal location.
    pub fn advance(&self, buffer: &InputBuffer) -> InputLocation {
        if !self.pending.is_empty() {
            let mut next = self.clone();
            next.pending.remove(0);
            return next;
        }
        let current = buffer.char_at(self.index);
        if current == EOI {
            return self.clone();
        }
        let (line, column) = if current == '\n' {
            (self.line + 1, 1)
        } else {
            (self.line, self.column + 1)
        };
        InputLocation {
            index: self.index + 1,
            line,
            column,
            pending: Vec::new(),
        }
    }

    /// A location with `c` queued as virtual input in front of this one.
    pub fn insert_virtual_char(&self, c: char) -> InputLocation {
        let mut next = self.clone();
        next.pending.insert(0, c);
        next
    }

    /// A location with all of `text` queued as virtual input, first
    /// character first.
    pub fn insert_virtual_text(&self, text: &str) -> InputLocation {
        let mut next = self.clone();
        let mut pending: Vec<char> = text.chars().collect();
        pending.extend(next.pending.drain(..));
        next.pending = pending;
        next
    }
}

impl std::fmt::Display for InputLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_indexing_and_sentinel() {
        let buf = InputBuffer::new("ab\ncd");
        assert_eq!(buf.char_at(2), '\n');
        assert_eq!(buf.char_at(5), EOI);
        assert_eq!(buf.char_at(100), EOI);
        assert_eq!(buf.extract(0, 2), "ab");
        assert_eq!(buf.extract(3, 99), "cd");
        assert_eq!(buf.line_text(2), "cd");
    }

    #[test]
    fn advance_tracks_lines_and_columns() {
        let buf = InputBuffer::new("a\nb");
        let loc = InputLocation::start();
        let loc = loc.advance(&buf);
        assert_eq!((loc.index, loc.line, loc.column), (1, 1, 2));
        let loc = loc.advance(&buf);
        assert_eq!((loc.index, loc.line, loc.column), (2, 2, 1));
        let loc = loc.advance(&buf);
        assert_eq!(loc.current_char(&buf), EOI);
        // advancing at EOI stays put
        assert_eq!(loc.advance(&buf), loc);
    }

    #[test]
    fn virtual_input_queues_in_front() {
        let buf = InputBuffer::new("b");
        let loc = InputLocation::start();
        let v = loc.insert_virtual_char('a');
        assert_ne!(v, loc);
        assert_eq!(v.current_char(&buf), 'a');
        let back = v.advance(&buf);
        assert_eq!(back, loc);
        assert_eq!(back.current_char(&buf), 'b');
    }

    #[test]
    fn virtual_text_is_consumed_in_order() {
        let buf = InputBuffer::new("z");
        let loc = InputLocation::start().insert_virtual_text("xy");
        assert_eq!(loc.current_char(&buf), 'x');
        let loc = loc.advance(&buf);
        assert_eq!(loc.current_char(&buf), 'y');
        let loc = loc.advance(&buf);
        assert_eq!(loc.current_char(&buf), 'z');
    }
}
