use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::forms::{FieldKind, FieldSpec, FormValues, ValidationErrors, parse_month};
use crate::models::{Attachment, LocalFile, Lookups, MAX_ATTACHMENTS, today};
use crate::records::{RecordKind, fields_of};
use crate::service;
use crate::ui::components::date_input::DateInputState;
use crate::ui::components::notice::{Notice, render_notice};
use crate::ui::next_key;

pub enum FormAction {
    Cancel,
    Submit,
}

/// What the focused field is being edited with
enum Editor {
    Text(String),
    Date(DateInputState),
    AttachmentPath(String),
}

pub struct RecordFormState {
    kind: RecordKind,
    id: Option<u64>,
    fields: &'static [FieldSpec],
    pub values: FormValues,
    errors: ValidationErrors,
    current: usize,
    editor: Option<Editor>,
    list_state: ListState,
    pub notice: Option<Notice>,
}

impl RecordFormState {
    pub fn new(kind: RecordKind, id: Option<u64>, values: FormValues) -> Self {
        let fields = fields_of(kind);
        let current = fields.iter().position(FieldSpec::is_editable).unwrap_or(0);
        let mut list_state = ListState::default();
        list_state.select(Some(current));
        Self {
            kind,
            id,
            fields,
            values,
            errors: ValidationErrors::default(),
            current,
            editor: None,
            list_state,
            notice: None,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    pub fn set_errors(&mut self, errors: ValidationErrors) {
        // jump to the first field in error
        if let Some(i) = self
            .fields
            .iter()
            .position(|f| errors.for_field(f.key).is_some())
        {
            self.current = i;
            self.list_state.select(Some(i));
        }
        self.errors = errors;
    }

    fn field(&self) -> &'static FieldSpec {
        &self.fields[self.current]
    }

    fn move_field(&mut self, forward: bool) {
        let len = self.fields.len();
        let mut i = self.current;
        for _ in 0..len {
            i = if forward { (i + 1) % len } else { (i + len - 1) % len };
            if self.fields[i].is_editable() {
                break;
            }
        }
        self.current = i;
        self.list_state.select(Some(i));
    }

    fn start_editing(&mut self) {
        let field = self.field();
        self.editor = match field.kind {
            FieldKind::Text | FieldKind::Remarks | FieldKind::Amount | FieldKind::Integer => {
                Some(Editor::Text(self.values.get(field.key).to_string()))
            }
            FieldKind::Date => {
                let mut input = DateInputState::new(self.values.date(field.key).unwrap_or_else(today));
                input.toggle_editing();
                Some(Editor::Date(input))
            }
            FieldKind::Month => {
                let start = parse_month(self.values.get(field.key)).unwrap_or_else(today);
                let mut input = DateInputState::month(start);
                input.toggle_editing();
                Some(Editor::Date(input))
            }
            FieldKind::Attachments => Some(Editor::AttachmentPath(String::new())),
            FieldKind::Lookup(_) | FieldKind::Derived => None,
        };
    }

    /// A field changed: drop its error and refresh the derived fields.
    fn committed(&mut self, key: &str) {
        self.errors.clear_field(key);
        service::derive(self.kind, &mut self.values);
    }

    fn commit_editor(&mut self) {
        let key = self.field().key;
        match self.editor.take() {
            Some(Editor::Text(text)) => {
                self.values.set(key, text.trim());
                self.committed(key);
            }
            Some(Editor::Date(input)) => {
                if input.month_only {
                    self.values.set_month(key, input.date);
                } else {
                    self.values.set_date(key, input.date);
                }
                self.committed(key);
            }
            Some(Editor::AttachmentPath(_)) | None => {}
        }
    }

    fn add_attachment(&mut self, raw_path: &str) -> bool {
        if self.values.attachments.len() >= MAX_ATTACHMENTS {
            self.notice = Some(Notice::error_message(format!(
                "At most {MAX_ATTACHMENTS} attachments are allowed"
            )));
            return false;
        }
        match LocalFile::from_path(raw_path.trim()) {
            Ok(file) => match file.problem() {
                Some(problem) => {
                    self.notice = Some(Notice::error_message(problem));
                    false
                }
                None => {
                    self.values.attachments.push(Attachment::Local(file));
                    self.committed(self.field().key);
                    true
                }
            },
            Err(err) => {
                self.notice = Some(Notice::error_message(format!("{}: {err}", raw_path.trim())));
                false
            }
        }
    }

    fn cycle_lookup(&mut self, forward: bool, lookups: &Lookups) {
        let field = self.field();
        if let FieldKind::Lookup(kind) = field.kind {
            let current = self.values.lookup_id(field.key);
            if let Some(id) = lookups.cycle(kind, current, forward) {
                self.values.set_id(field.key, Some(id));
                self.committed(field.key);
            }
        }
    }

    fn display_value(&self, field: &FieldSpec, lookups: &Lookups) -> String {
        let raw = self.values.get(field.key);
        match field.kind {
            FieldKind::Lookup(kind) => match self.values.lookup_id(field.key) {
                Some(id) => format!("< {} >", lookups.name(kind, id)),
                None => "< select >".to_string(),
            },
            FieldKind::Attachments => {
                if self.values.attachments.is_empty() {
                    "none".to_string()
                } else {
                    self.values
                        .attachments
                        .iter()
                        .map(Attachment::display)
                        .collect::<Vec<_>>()
                        .join(", ")
                }
            }
            _ => raw.to_string(),
        }
    }
}

pub fn render_record_form<B: Backend>(
    frame: &mut Frame<B>,
    state: &mut RecordFormState,
    lookups: &Lookups,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(3),
        ].as_ref())
        .split(frame.size());

    let title_text = match state.id {
        Some(id) => format!("Edit {} #{id}", state.kind.title()),
        None => format!("New {}", state.kind.title()),
    };
    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    render_fields(frame, state, lookups, chunks[1]);
    render_notice(frame, chunks[2], state.notice.as_ref());

    let help_text = match (&state.editor, state.field().kind) {
        (Some(Editor::Date(_)), _) => {
            "Digits - Type | Left/Right - Date part | Up/Down - Step | <Enter> Done | <Esc> Cancel"
        }
        (Some(Editor::AttachmentPath(_)), _) => {
            "Type a file path | <Enter> Add (empty: done) | <Backspace> on empty removes last | <Esc> Done"
        }
        (Some(Editor::Text(_)), _) => "<Enter> Save field | <Esc> Cancel editing",
        (None, FieldKind::Lookup(_)) => {
            "Left/Right - Choose | Up/Down - Navigate fields | <S> Save | <Esc> Cancel"
        }
        (None, _) => "<Enter> Edit field | Up/Down - Navigate fields | <S> Save | <Esc> Cancel",
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[3]);
}

fn render_fields<B: Backend>(
    frame: &mut Frame<B>,
    state: &mut RecordFormState,
    lookups: &Lookups,
    area: Rect,
) {
    let items: Vec<ListItem> = state
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == state.current;
            let label = if field.required {
                format!("{}*: ", field.label)
            } else {
                format!("{}: ", field.label)
            };

            let value = match (&state.editor, focused) {
                (Some(Editor::Text(text)), true) => format!("{text}|"),
                (Some(Editor::Date(input)), true) => input.get_display_string(),
                (Some(Editor::AttachmentPath(path)), true) => {
                    format!("{} + {path}|", state.display_value(field, lookups))
                }
                _ => state.display_value(field, lookups),
            };

            let label_style = if focused {
                Style::default().fg(Color::Yellow)
            } else if !field.is_editable() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            let value_style = if focused && state.is_editing() {
                Style::default().add_modifier(Modifier::BOLD)
            } else if !field.is_editable() {
                Style::default().fg(Color::Gray)
            } else {
                Style::default()
            };

            let mut spans = vec![
                Span::styled(label, label_style),
                Span::styled(value, value_style),
            ];
            if let Some(error) = state.errors.for_field(field.key) {
                spans.push(Span::styled(
                    format!("  <- {error}"),
                    Style::default().fg(Color::Red),
                ));
            }
            ListItem::new(Spans::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut state.list_state);
}

pub fn handle_key(
    state: &mut RecordFormState,
    key: KeyEvent,
    lookups: &Lookups,
) -> Option<FormAction> {
    match &mut state.editor {
        Some(Editor::Text(text)) => {
            match key.code {
                KeyCode::Enter => state.commit_editor(),
                KeyCode::Esc => state.editor = None,
                KeyCode::Char(c) => text.push(c),
                KeyCode::Backspace => {
                    text.pop();
                }
                _ => {}
            }
            return None;
        }
        Some(Editor::Date(input)) => {
            match key.code {
                KeyCode::Enter => state.commit_editor(),
                KeyCode::Esc => state.editor = None,
                code => input.handle_input(code),
            }
            return None;
        }
        Some(Editor::AttachmentPath(path)) => {
            match key.code {
                KeyCode::Enter if path.trim().is_empty() => state.editor = None,
                KeyCode::Enter => {
                    let raw = std::mem::take(path);
                    if !state.add_attachment(&raw) {
                        state.editor = Some(Editor::AttachmentPath(raw));
                    }
                }
                KeyCode::Esc => state.editor = None,
                KeyCode::Backspace if path.is_empty() => {
                    if state.values.attachments.pop().is_some() {
                        let key = state.field().key;
                        state.committed(key);
                    }
                }
                KeyCode::Backspace => {
                    path.pop();
                }
                KeyCode::Char(c) => path.push(c),
                _ => {}
            }
            return None;
        }
        None => {}
    }

    match key.code {
        KeyCode::Esc => return Some(FormAction::Cancel),
        KeyCode::Down | KeyCode::Tab => state.move_field(true),
        KeyCode::Up | KeyCode::BackTab => state.move_field(false),
        KeyCode::Left => state.cycle_lookup(false, lookups),
        KeyCode::Right => state.cycle_lookup(true, lookups),
        KeyCode::Enter => match state.field().kind {
            FieldKind::Lookup(_) => state.cycle_lookup(true, lookups),
            _ => state.start_editing(),
        },
        KeyCode::Char('s') | KeyCode::Char('S') => return Some(FormAction::Submit),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut RecordFormState, lookups: &Lookups) -> Result<Option<FormAction>> {
    Ok(next_key()?.and_then(|key| handle_key(state, key, lookups)))
}
