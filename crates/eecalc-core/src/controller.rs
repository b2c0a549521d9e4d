//! Client controller: binds user input and relay events to the sheet.
//!
//! The controller is transport-agnostic. Local actions return the events that
//! must be sent to the relay; remote events are fed in through
//! [`Controller::apply_remote`] and never produce outbound traffic.

use std::time::Instant;

use crate::document::{CalcOutcome, Document};
use crate::protocol::{Origin, Snapshot, SyncEvent};
use crate::sheet::{CellList, SheetSignal};
use crate::transition::{Transition, TransitionKind, TransitionScheduler};

/// Keys the controller understands. Front ends translate their own key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Char(char),
}

pub struct Controller {
    doc: Document,
    transitions: TransitionScheduler,
    /// Byte offset of the text cursor inside the focused cell.
    cursor: usize,
    nickname: String,
}

impl Controller {
    pub fn new(doc: Document) -> Self {
        let mut controller = Controller {
            doc,
            transitions: TransitionScheduler::new(),
            cursor: 0,
            nickname: String::new(),
        };
        controller.after_change(Instant::now());
        controller
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn cells(&self) -> &CellList {
        &self.doc.cells
    }

    pub fn transitions(&self) -> &TransitionScheduler {
        &self.transitions
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn set_nickname(&mut self, nickname: &str) {
        self.nickname = nickname.trim().to_string();
        tracing::info!(nickname = %self.nickname, "nickname set");
    }

    /// Dispatch one key press. Returns events for the relay.
    pub fn handle_key(&mut self, key: Key, now: Instant) -> Vec<SyncEvent> {
        match key {
            Key::Enter => self.submit(now),
            Key::Up => {
                self.move_focus(-1, now);
                Vec::new()
            }
            Key::Down => {
                self.move_focus(1, now);
                Vec::new()
            }
            Key::Backspace if self.focused_text().is_some_and(str::is_empty) => {
                match self.doc.cells.focused() {
                    Some(index) => self.request_delete(index, now),
                    None => Vec::new(),
                }
            }
            key => {
                self.edit_focused(key);
                Vec::new()
            }
        }
    }

    /// Send the focused cell's text and calculate it.
    ///
    /// On a value, the cell flashes and editing moves forward: the next cell
    /// gets focus, or a blank cell is appended after the last one.
    pub fn submit(&mut self, now: Instant) -> Vec<SyncEvent> {
        let Some(index) = self.doc.cells.focused() else {
            return Vec::new();
        };
        let Some(content) = self.doc.cells.get(index).map(|c| c.text.clone()) else {
            return Vec::new();
        };
        let event = SyncEvent::EditCell {
            number: index,
            content,
        };

        if self.doc.recalculate_one(index) == CalcOutcome::Value {
            self.flash(index, now);
            if index == self.doc.cells.last_index() {
                if self.doc.cells.has_room() {
                    self.doc.cells.append("");
                }
            } else {
                self.doc.cells.focus(index + 1);
            }
        }
        self.after_change(now);
        vec![event]
    }

    /// Ask to delete the cell at `index` on behalf of the local user.
    pub fn request_delete(&mut self, index: usize, now: Instant) -> Vec<SyncEvent> {
        self.delete_at(index, Origin::Local, now).into_iter().collect()
    }

    fn delete_at(&mut self, index: usize, origin: Origin, now: Instant) -> Option<SyncEvent> {
        let Some(id) = self.doc.cells.begin_delete(index) else {
            tracing::debug!(index, ?origin, "delete ignored");
            return None;
        };
        self.transitions.start(id, TransitionKind::Remove, now);
        match origin {
            Origin::Local => Some(SyncEvent::DeleteCell { number: index }),
            Origin::Remote => None,
        }
    }

    /// Apply an event received from the relay.
    pub fn apply_remote(&mut self, event: SyncEvent, now: Instant) {
        match event {
            SyncEvent::Sheet { cells } => {
                tracing::info!(cells = cells.len(), "received sheet");
                self.doc.cells.full_replace(&cells);
                self.doc.recalculate_all();
            }
            SyncEvent::EditCell { number, content } => {
                tracing::debug!(number, "remote edit");
                if !self.doc.cells.insert_at_or_grow(number, &content) {
                    return;
                }
                if self.doc.recalculate_one(number) == CalcOutcome::Value {
                    self.flash(number, now);
                }
                if self.doc.cells.focused() == Some(number) {
                    self.cursor = content.len();
                }
            }
            SyncEvent::DeleteCell { number } => {
                tracing::debug!(number, "remote delete");
                self.delete_at(number, Origin::Remote, now);
            }
        }
        self.after_change(now);
    }

    /// Replace the sheet with a starter and broadcast every cell.
    pub fn load_starter(&mut self, snapshot: &Snapshot, now: Instant) -> Vec<SyncEvent> {
        self.doc.cells.full_replace(&snapshot.cells);
        let events = self
            .doc
            .cells
            .cells()
            .iter()
            .map(|c| SyncEvent::EditCell {
                number: c.index,
                content: c.text.clone(),
            })
            .collect();
        self.doc.recalculate_all();
        self.after_change(now);
        events
    }

    pub fn recalculate_all(&mut self) {
        self.doc.recalculate_all();
    }

    /// Advance transitions; completed removals take effect here.
    pub fn tick(&mut self, now: Instant) {
        let done = self.transitions.tick(now);
        self.complete(done, now);
    }

    /// Complete every running transition immediately.
    pub fn settle(&mut self) {
        let done = self.transitions.finish_all();
        self.complete(done, Instant::now());
    }

    fn complete(&mut self, done: Vec<Transition>, now: Instant) {
        if done.is_empty() {
            return;
        }
        for transition in done {
            if transition.kind == TransitionKind::Remove {
                self.doc.cells.finish_delete(transition.cell);
            }
        }
        self.after_change(now);
    }

    pub fn move_focus(&mut self, delta: isize, now: Instant) {
        self.doc.cells.move_focus(delta);
        self.after_change(now);
    }

    fn flash(&mut self, index: usize, now: Instant) {
        if let Some(cell) = self.doc.cells.get(index) {
            self.transitions.start(cell.id(), TransitionKind::Flash, now);
        }
    }

    fn focused_text(&self) -> Option<&str> {
        self.doc.cells.focused_cell().map(|c| c.text.as_str())
    }

    /// Drain sheet signals into transitions and cursor state.
    fn after_change(&mut self, now: Instant) {
        for signal in self.doc.cells.drain_signals() {
            match signal {
                SheetSignal::Reset => self.transitions.clear(),
                SheetSignal::Added(id) => self.transitions.start(id, TransitionKind::Appear, now),
                SheetSignal::Removed(id) => self.transitions.cancel_cell(id),
                SheetSignal::Focused(_) => {
                    self.cursor = self.focused_text().map_or(0, str::len);
                }
            }
        }
    }

    fn edit_focused(&mut self, key: Key) {
        let Some(index) = self.doc.cells.focused() else {
            return;
        };
        let Some(cell) = self.doc.cells.get_mut(index) else {
            return;
        };
        if cell.is_deleting() {
            return;
        }
        self.cursor = self.cursor.min(cell.text.len());
        handle_text_input(&mut cell.text, &mut self.cursor, key);
    }
}

/// Handle text editing operations on a buffer with UTF-8 aware cursor movement.
fn handle_text_input(buffer: &mut String, cursor: &mut usize, key: Key) {
    while *cursor > 0 && !buffer.is_char_boundary(*cursor) {
        *cursor -= 1;
    }
    match key {
        Key::Left => {
            if *cursor > 0 {
                let mut new_pos = *cursor - 1;
                while new_pos > 0 && !buffer.is_char_boundary(new_pos) {
                    new_pos -= 1;
                }
                *cursor = new_pos;
            }
        }
        Key::Right => {
            if *cursor < buffer.len() {
                let mut new_pos = *cursor + 1;
                while new_pos < buffer.len() && !buffer.is_char_boundary(new_pos) {
                    new_pos += 1;
                }
                *cursor = new_pos;
            }
        }
        Key::Home => *cursor = 0,
        Key::End => *cursor = buffer.len(),
        Key::Backspace => {
            if *cursor > 0 {
                let mut del_start = *cursor - 1;
                while del_start > 0 && !buffer.is_char_boundary(del_start) {
                    del_start -= 1;
                }
                buffer.drain(del_start..*cursor);
                *cursor = del_start;
            }
        }
        Key::Delete => {
            if *cursor < buffer.len() {
                let mut del_end = *cursor + 1;
                while del_end < buffer.len() && !buffer.is_char_boundary(del_end) {
                    del_end += 1;
                }
                buffer.drain(*cursor..del_end);
            }
        }
        Key::Char(c) => {
            buffer.insert(*cursor, c);
            *cursor += c.len_utf8();
        }
        Key::Enter | Key::Up | Key::Down => {}
    }
}
