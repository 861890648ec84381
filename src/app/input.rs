use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::editor::{Direction, EditAction, ExportFormat, Message, ZoomAction};

/// Map a key press to an editor message.
///
/// `Esc` and `Ctrl+Q` leave the editor, `Ctrl+E` exports SVG and
/// `Ctrl+P` exports PNG. `Ctrl+Up`/`Ctrl+Down` (or `Ctrl+=`/`Ctrl+-` where
/// the terminal reports them) zoom the preview and `Ctrl+0` or `Ctrl+R`
/// resets it. Everything else edits the text.
pub fn key_to_message(key: KeyEvent, now_ms: u64) -> Option<Message> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let action = match key.code {
        KeyCode::Esc => return Some(Message::Back),
        KeyCode::Char('q') if ctrl => return Some(Message::Back),
        KeyCode::Char('e') if ctrl => return Some(Message::Export(ExportFormat::Svg)),
        KeyCode::Char('p') if ctrl => return Some(Message::Export(ExportFormat::Png)),
        KeyCode::Char('=' | '+') | KeyCode::Up if ctrl => {
            return Some(Message::Zoom(ZoomAction::In));
        }
        KeyCode::Char('-') | KeyCode::Down if ctrl => return Some(Message::Zoom(ZoomAction::Out)),
        KeyCode::Char('0' | 'r') if ctrl => return Some(Message::Zoom(ZoomAction::Reset)),
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(ch) => EditAction::Insert(ch),
        KeyCode::Enter => EditAction::Newline,
        KeyCode::Tab => EditAction::Indent,
        KeyCode::Backspace => EditAction::Backspace,
        KeyCode::Delete => EditAction::Delete,
        KeyCode::Left => EditAction::Move(Direction::Left),
        KeyCode::Right => EditAction::Move(Direction::Right),
        KeyCode::Up => EditAction::Move(Direction::Up),
        KeyCode::Down => EditAction::Move(Direction::Down),
        KeyCode::Home => EditAction::Home,
        KeyCode::End => EditAction::End,
        _ => return None,
    };
    Some(Message::Input(action, now_ms))
}

pub(super) fn event_to_messages(event: &Event, now_ms: u64) -> Vec<Message> {
    match event {
        Event::Key(key) => key_to_message(*key, now_ms).into_iter().collect(),
        Event::Paste(text) => text
            .chars()
            .filter(|&ch| ch != '\r')
            .map(|ch| {
                let action = if ch == '\n' {
                    EditAction::Newline
                } else {
                    EditAction::Insert(ch)
                };
                Message::Input(action, now_ms)
            })
            .collect(),
        // Any message forces a redraw at the new size.
        Event::Resize(..) => vec![Message::Tick(now_ms)],
        _ => Vec::new(),
    }
}
