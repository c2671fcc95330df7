use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::records::{RecordGroup, RecordKind};
use crate::ui::components::notice::{Notice, render_notice};
use crate::ui::next_key;

// Entity picker, bills first then reports
pub struct HomeState {
    selected: usize,
    list_state: ListState,
    pub notice: Option<Notice>,
}

pub enum HomeAction {
    Exit,
    Open(RecordKind),
}

impl Default for HomeState {
    fn default() -> Self {
        Self::new()
    }
}

impl HomeState {
    pub fn new() -> Self {
        let mut state = Self {
            selected: 0,
            list_state: ListState::default(),
            notice: None,
        };
        state.sync_list();
        state
    }

    /// Start with `kind` selected, e.g. when coming back from its table.
    pub fn with_selected(kind: RecordKind) -> Self {
        let mut state = Self::new();
        state.selected = RecordKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        state.sync_list();
        state
    }

    pub fn selected_kind(&self) -> RecordKind {
        RecordKind::ALL[self.selected]
    }

    pub fn next(&mut self) {
        self.selected = (self.selected + 1) % RecordKind::ALL.len();
        self.sync_list();
    }

    pub fn previous(&mut self) {
        self.selected = if self.selected == 0 {
            RecordKind::ALL.len() - 1
        } else {
            self.selected - 1
        };
        self.sync_list();
    }

    // Group headings occupy rows in the list, so shift past them.
    fn sync_list(&mut self) {
        let headings = match self.selected_kind().group() {
            RecordGroup::Bills => 1,
            RecordGroup::Reports => 2,
        };
        self.list_state.select(Some(self.selected + headings));
    }
}

fn group_title(group: RecordGroup) -> &'static str {
    match group {
        RecordGroup::Bills => "Bills",
        RecordGroup::Reports => "Reports",
    }
}

pub fn render_home<B: Backend>(frame: &mut Frame<B>, state: &mut HomeState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(2),
        ].as_ref())
        .split(frame.size());

    let mut items = Vec::new();
    let mut current_group = None;
    for kind in RecordKind::ALL {
        if current_group != Some(kind.group()) {
            current_group = Some(kind.group());
            items.push(ListItem::new(Spans::from(Span::styled(
                group_title(kind.group()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))));
        }
        items.push(ListItem::new(Spans::from(format!("  {}", kind.title()))));
    }

    let list = List::new(items)
        .block(Block::default().title("Expense Manager").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, chunks[0], &mut state.list_state);

    render_notice(frame, chunks[1], state.notice.as_ref());

    let help = Paragraph::new("<Enter> Open | Up/Down - Navigate | <Esc> Exit")
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(help, chunks[2]);
}

pub fn handle_key(state: &mut HomeState, key: KeyEvent) -> Option<HomeAction> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(HomeAction::Exit),
        KeyCode::Down | KeyCode::Char('j') => state.next(),
        KeyCode::Up | KeyCode::Char('k') => state.previous(),
        KeyCode::Enter => return Some(HomeAction::Open(state.selected_kind())),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut HomeState) -> Result<Option<HomeAction>> {
    Ok(next_key()?.and_then(|key| handle_key(state, key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn selection_skips_group_headings() {
        let mut state = HomeState::new();
        assert_eq!(state.list_state.selected(), Some(1));

        for _ in 0..5 {
            state.next();
        }
        assert_eq!(state.selected_kind(), RecordKind::AdibReport);
        // five bills plus two headings
        assert_eq!(state.list_state.selected(), Some(7));
    }

    #[test]
    fn selection_wraps_and_opens() {
        let mut state = HomeState::new();
        handle_key(&mut state, press(KeyCode::Up));
        assert_eq!(state.selected_kind(), RecordKind::VisaExpenseReport);

        match handle_key(&mut state, press(KeyCode::Enter)) {
            Some(HomeAction::Open(kind)) => assert_eq!(kind, RecordKind::VisaExpenseReport),
            _ => panic!("expected open"),
        }
        assert!(matches!(handle_key(&mut state, press(KeyCode::Esc)), Some(HomeAction::Exit)));
    }

    #[test]
    fn returning_keeps_the_kind_selected() {
        let state = HomeState::with_selected(RecordKind::MessBill);
        assert_eq!(state.selected_kind(), RecordKind::MessBill);
        assert_eq!(state.list_state.selected(), Some(3));
    }
}
