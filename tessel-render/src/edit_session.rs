//! In-cell editing state.
//!
//! The cursor is a char index (not a byte offset) into the session text.

use std::borrow::Cow;

use tessel_grid::CellRef;

/// Text and cursor for the cell currently being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    cell: CellRef,
    text: String,
    cursor: usize,
    cursor_visible: bool,
}

impl EditSession {
    /// Start editing `cell` with its current contents, cursor at the end.
    pub fn new(cell: CellRef, text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self {
            cell,
            text,
            cursor,
            cursor_visible: true,
        }
    }

    pub fn cell(&self) -> CellRef {
        self.cell
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    pub fn toggle_cursor(&mut self) {
        self.cursor_visible = !self.cursor_visible;
    }

    /// Place the cursor, clamped to the text.
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.char_len());
    }

    /// Move by `delta` chars, clamped. Returns whether the cursor moved.
    pub fn move_cursor(&mut self, delta: isize) -> bool {
        let target = self.cursor.saturating_add_signed(delta).min(self.char_len());
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    /// Move to the start of the current paragraph.
    pub fn home(&mut self) {
        let mut start = 0;
        for (i, ch) in self.text.chars().enumerate() {
            if i == self.cursor {
                break;
            }
            if ch == '\n' {
                start = i + 1;
            }
        }
        self.cursor = start;
    }

    /// Move to the end of the current paragraph.
    pub fn end(&mut self) {
        let mut pos = self.cursor;
        for ch in self.text.chars().skip(self.cursor) {
            if ch == '\n' {
                break;
            }
            pos += 1;
        }
        self.cursor = pos;
    }

    /// Insert at the cursor and move past the inserted text.
    pub fn insert_str(&mut self, s: &str) {
        let byte_pos = char_to_byte(&self.text, self.cursor);
        self.text.insert_str(byte_pos, s);
        self.cursor += s.chars().count();
    }

    /// Delete the character before the cursor (Backspace).
    pub fn delete_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.remove_at_cursor();
        true
    }

    /// Delete the character at the cursor (Delete key).
    pub fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        self.remove_at_cursor();
        true
    }

    fn remove_at_cursor(&mut self) {
        let byte_pos = char_to_byte(&self.text, self.cursor);
        let next_byte = char_to_byte(&self.text, self.cursor + 1);
        self.text.replace_range(byte_pos..next_byte, "");
    }
}

fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Strip characters that must never reach a cell: C0 controls other than
/// tab, newline and carriage return, DEL, and the byte-order mark. Newlines
/// (and carriage returns) are dropped too unless `allow_newlines` is set.
pub fn sanitize_input(input: &str, allow_newlines: bool) -> Cow<'_, str> {
    let keep = |ch: char| match ch {
        '\t' => true,
        '\n' | '\r' => allow_newlines,
        '\u{7f}' | '\u{feff}' => false,
        c => (c as u32) >= 0x20,
    };
    if input.chars().all(keep) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(input.chars().filter(|&ch| keep(ch)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(text: &str) -> EditSession {
        EditSession::new(CellRef::new(0, 0), text)
    }

    #[test]
    fn starts_at_end_and_visible() {
        let s = session("张三");
        assert_eq!(s.cursor(), 2);
        assert!(s.cursor_visible());
    }

    #[test]
    fn insert_in_middle_of_multibyte_text() {
        let mut s = session("张三");
        s.set_cursor(1);
        s.insert_str("ab");
        assert_eq!(s.text(), "张ab三");
        assert_eq!(s.cursor(), 3);
    }

    #[test]
    fn delete_both_directions() {
        let mut s = session("abc");
        s.set_cursor(1);
        assert!(s.delete_backward());
        assert_eq!((s.text(), s.cursor()), ("bc", 0));
        assert!(!s.delete_backward());
        assert!(s.delete_forward());
        assert_eq!(s.text(), "c");
        s.set_cursor(1);
        assert!(!s.delete_forward());
    }

    #[test]
    fn cursor_moves_are_clamped() {
        let mut s = session("abc");
        assert!(!s.move_cursor(5));
        assert!(s.move_cursor(-2));
        assert_eq!(s.cursor(), 1);
        assert!(s.move_cursor(-10));
        assert_eq!(s.cursor(), 0);
        s.set_cursor(42);
        assert_eq!(s.cursor(), 3);
    }

    #[test]
    fn home_and_end_stay_in_paragraph() {
        let mut s = session("ab\ncde\nf");
        s.set_cursor(5);
        s.home();
        assert_eq!(s.cursor(), 3);
        s.end();
        assert_eq!(s.cursor(), 6);
    }

    #[test]
    fn sanitize_strips_controls() {
        assert!(matches!(sanitize_input("plain 文本", false), Cow::Borrowed(_)));
        assert_eq!(sanitize_input("a\u{0}b\u{1b}c\u{7f}\u{feff}", false), "abc");
        assert_eq!(sanitize_input("a\tb", false), "a\tb");
        assert_eq!(sanitize_input("a\nb\r", false), "ab");
        assert_eq!(sanitize_input("a\nb\r", true), "a\nb\r");
    }
}
