use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Single line editor behind the search box. The cursor counts characters.
#[derive(Debug, Default)]
pub struct Inputter {
    current_input: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub cursor: usize,
    /// Enter or Esc was pressed
    pub finished: bool,
    pub canceled: bool,
    /// The text differs from before the key press
    pub changed: bool,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        let before = self.current_input.clone();
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.finished = true,
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, _) => self.cursor = (self.cursor + 1).min(self.char_len()),
            (KeyCode::Home, _) => self.cursor = 0,
            (KeyCode::End, _) => self.cursor = self.char_len(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.current_input.clear();
                self.cursor = 0;
            }
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => self.insert(chr),
            _ => {}
        }
        let mut result = self.get();
        result.changed = before != self.current_input;
        trace!("Input {:?} -> {:?}", key.code, result);
        result
    }

    /// Starts editing an existing value with the cursor at its end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.current_input = s.to_string();
        self.cursor = self.char_len();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            cursor: self.cursor,
            finished: self.finished,
            canceled: self.canceled,
            changed: false,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.cursor = 0;
    }

    fn escape(&mut self) {
        self.clear();
        self.canceled = true;
        self.finished = true;
    }

    fn insert(&mut self, chr: char) {
        let at = self.byte_pos(self.cursor);
        self.current_input.insert(at, chr);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_pos(self.cursor);
            self.current_input.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_pos(self.cursor);
            self.current_input.remove(at);
        }
    }

    fn char_len(&self) -> usize {
        self.current_input.chars().count()
    }

    fn byte_pos(&self, char_idx: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_idx)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn typed(input: &mut Inputter, text: &str) {
        for c in text.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn edits_at_cursor() {
        let mut input = Inputter::default();
        typed(&mut input, "hrbour");
        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Right);
        let r = press(&mut input, KeyCode::Char('a'));
        assert_eq!(r.input, "harbour");
        assert!(r.changed);
        press(&mut input, KeyCode::End);
        let r = press(&mut input, KeyCode::Backspace);
        assert_eq!(r.input, "harbou");
        assert_eq!(r.cursor, 6);
    }

    #[test]
    fn multibyte_characters() {
        let mut input = Inputter::default();
        typed(&mut input, "café");
        press(&mut input, KeyCode::Left);
        let r = press(&mut input, KeyCode::Delete);
        assert_eq!(r.input, "caf");
        let r = press(&mut input, KeyCode::Left);
        assert!(!r.changed);
    }

    #[test]
    fn escape_cancels_and_enter_finishes() {
        let mut input = Inputter::default();
        input.set("loft");
        let r = press(&mut input, KeyCode::Enter);
        assert!(r.finished && !r.canceled);
        assert_eq!(r.input, "loft");

        input.set("loft");
        let r = press(&mut input, KeyCode::Esc);
        assert!(r.finished && r.canceled);
        assert_eq!(r.input, "");
        assert!(r.changed);
    }
}
