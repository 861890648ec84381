use ropey::Rope;

/// Spaces inserted by [`EditAction::Indent`].
const INDENT: &str = "  ";

/// Cursor movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A single edit coming from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Insert(char),
    Newline,
    Backspace,
    Delete,
    Indent,
    Move(Direction),
    Home,
    End,
}

impl EditAction {
    /// Whether the action can change the text (as opposed to only the cursor).
    pub const fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::Insert(_) | Self::Newline | Self::Backspace | Self::Delete | Self::Indent
        )
    }
}

/// Rope-backed diagram source with a single cursor.
///
/// The cursor is a char index into the rope; line and column are derived
/// from it. Vertical moves remember the column they started from so that
/// passing a short line does not lose it.
#[derive(Clone)]
pub struct SourceBuffer {
    rope: Rope,
    cursor: usize,
    goal_col: Option<usize>,
}

impl SourceBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: 0,
            goal_col: None,
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line contents without the line break.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(idx).to_string();
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Cursor as zero-based `(line, column)`, column counted in chars.
    pub fn cursor(&self) -> (usize, usize) {
        let line = self.rope.char_to_line(self.cursor);
        (line, self.cursor - self.rope.line_to_char(line))
    }

    /// Place the cursor, clamping to the text.
    pub fn set_cursor(&mut self, line: usize, col: usize) {
        let line = line.min(self.line_count().saturating_sub(1));
        let col = col.min(self.line_len(line));
        self.cursor = self.rope.line_to_char(line) + col;
        self.goal_col = None;
    }

    /// Apply one edit. Returns `true` if the text changed.
    pub fn apply(&mut self, action: EditAction) -> bool {
        if !matches!(
            action,
            EditAction::Move(Direction::Up | Direction::Down)
        ) {
            self.goal_col = None;
        }
        match action {
            EditAction::Insert(ch) => {
                self.rope.insert_char(self.cursor, ch);
                self.cursor += 1;
                true
            }
            EditAction::Newline => {
                self.rope.insert_char(self.cursor, '\n');
                self.cursor += 1;
                true
            }
            EditAction::Indent => {
                self.rope.insert(self.cursor, INDENT);
                self.cursor += INDENT.chars().count();
                true
            }
            EditAction::Backspace => {
                if self.cursor == 0 {
                    return false;
                }
                self.rope.remove(self.cursor - 1..self.cursor);
                self.cursor -= 1;
                true
            }
            EditAction::Delete => {
                if self.cursor >= self.rope.len_chars() {
                    return false;
                }
                self.rope.remove(self.cursor..=self.cursor);
                true
            }
            EditAction::Move(direction) => {
                self.step(direction);
                false
            }
            EditAction::Home => {
                let (line, _) = self.cursor();
                self.cursor = self.rope.line_to_char(line);
                false
            }
            EditAction::End => {
                let (line, _) = self.cursor();
                self.cursor = self.rope.line_to_char(line) + self.line_len(line);
                false
            }
        }
    }

    fn step(&mut self, direction: Direction) {
        let (line, col) = self.cursor();
        match direction {
            Direction::Left => self.cursor = self.cursor.saturating_sub(1),
            Direction::Right => self.cursor = (self.cursor + 1).min(self.rope.len_chars()),
            Direction::Up if line > 0 => self.vertical(line - 1, col),
            Direction::Down if line + 1 < self.line_count() => self.vertical(line + 1, col),
            Direction::Up | Direction::Down => {}
        }
    }

    fn vertical(&mut self, target: usize, col: usize) {
        let goal = *self.goal_col.get_or_insert(col);
        self.cursor = self.rope.line_to_char(target) + goal.min(self.line_len(target));
    }

    fn line_len(&self, idx: usize) -> usize {
        let line = self.rope.line(idx);
        let mut len = line.len_chars();
        while len > 0 && matches!(line.char(len - 1), '\n' | '\r') {
            len -= 1;
        }
        len
    }
}

impl std::fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("lines", &self.rope.len_lines())
            .field("cursor", &self.cursor())
            .finish_non_exhaustive()
    }
}
