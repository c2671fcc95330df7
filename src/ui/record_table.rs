use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::export::ExportFormat;
use crate::listing::ListQuery;
use crate::models::{LookupKind, Lookups};
use crate::records::RecordKind;
use crate::service::TablePage;
use crate::ui::components::date_input::DateInputState;
use crate::ui::components::notice::{Notice, notice_spans};
use crate::ui::components::popup::{render_confirmation, render_popup};
use crate::ui::next_key;

pub enum TableAction {
    Back,
    /// The query changed (page, search or filters); fetch again
    Reload,
    New,
    Edit(u64),
    Delete(u64),
    Export(ExportFormat),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FilterField {
    From,
    To,
    Lookup,
}

/// Pending filter values, applied to the query only on confirm
pub struct FilterPopup {
    field: FilterField,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    lookup: Option<LookupKind>,
    lookup_id: Option<u64>,
    date_input: Option<DateInputState>,
    error: Option<String>,
}

impl FilterPopup {
    fn new(query: &ListQuery, lookup: Option<LookupKind>) -> Self {
        Self {
            field: FilterField::From,
            from: query.from,
            to: query.to,
            lookup,
            lookup_id: query.lookup_id,
            date_input: None,
            error: None,
        }
    }

    fn fields(&self) -> Vec<FilterField> {
        let mut fields = vec![FilterField::From, FilterField::To];
        if self.lookup.is_some() {
            fields.push(FilterField::Lookup);
        }
        fields
    }

    fn move_field(&mut self, forward: bool) {
        let fields = self.fields();
        let i = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        let next = if forward {
            (i + 1) % fields.len()
        } else {
            (i + fields.len() - 1) % fields.len()
        };
        self.field = fields[next];
    }

    fn date_slot(&mut self) -> Option<&mut Option<NaiveDate>> {
        match self.field {
            FilterField::From => Some(&mut self.from),
            FilterField::To => Some(&mut self.to),
            FilterField::Lookup => None,
        }
    }

    fn toggle_date_editing(&mut self) {
        if let Some(input) = self.date_input.take() {
            let date = input.date;
            if let Some(slot) = self.date_slot() {
                *slot = Some(date);
            }
        } else if let Some(slot) = self.date_slot() {
            let mut input = DateInputState::new(slot.unwrap_or_else(crate::models::today));
            input.toggle_editing();
            self.date_input = Some(input);
        }
    }

    fn clear_field(&mut self) {
        match self.field {
            FilterField::From => self.from = None,
            FilterField::To => self.to = None,
            FilterField::Lookup => self.lookup_id = None,
        }
    }
}

enum TableMode {
    Browse,
    Search(String),
    Filter(FilterPopup),
    ConfirmDelete(u64),
}

pub struct RecordTableState {
    kind: RecordKind,
    pub query: ListQuery,
    page: TablePage,
    table_state: TableState,
    mode: TableMode,
    pub notice: Option<Notice>,
}

impl RecordTableState {
    pub fn new(kind: RecordKind, per_page: u32) -> Self {
        Self {
            kind,
            query: ListQuery::new(per_page),
            page: TablePage::empty(kind),
            table_state: TableState::default(),
            mode: TableMode::Browse,
            notice: None,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Show a freshly loaded page, keeping the selection where possible.
    pub fn set_page(&mut self, page: TablePage) {
        // a stale page number past the end gets the last page's rows back
        self.query.page = page.page.max(1);
        let selected = self.table_state.selected().unwrap_or(0);
        self.page = page;
        if self.page.rows.is_empty() {
            self.table_state.select(None);
        } else {
            self.table_state
                .select(Some(selected.min(self.page.rows.len() - 1)));
        }
    }

    pub fn selected_id(&self) -> Option<u64> {
        self.table_state
            .selected()
            .and_then(|i| self.page.rows.get(i))
            .and_then(|row| row.id)
    }

    pub fn next(&mut self) {
        if self.page.rows.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 < self.page.rows.len() => i + 1,
            Some(_) => 0,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.page.rows.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.page.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    fn next_page(&mut self) -> Option<TableAction> {
        if self.page.has_next() {
            self.query.page += 1;
            self.table_state.select(Some(0));
            Some(TableAction::Reload)
        } else {
            None
        }
    }

    fn previous_page(&mut self) -> Option<TableAction> {
        if self.page.has_previous() {
            self.query.page -= 1;
            self.table_state.select(Some(0));
            Some(TableAction::Reload)
        } else {
            None
        }
    }
}

pub fn render_record_table<B: Backend>(
    frame: &mut Frame<B>,
    state: &mut RecordTableState,
    lookups: &Lookups,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(2),
        ].as_ref())
        .split(frame.size());

    render_table(frame, state, chunks[0]);
    render_status(frame, state, chunks[1]);

    let help_text = match &state.mode {
        TableMode::Search(_) => "Type to search | <Enter> Apply | <Esc> Cancel",
        TableMode::Filter(_) => {
            "Up/Down - Field | <Enter> Edit date | Left/Right - Change | <Del> Clear | <S> Apply | <Esc> Cancel"
        }
        TableMode::ConfirmDelete(_) => "<Y> Delete | <N> Keep",
        TableMode::Browse => {
            "<N> New | <E> Edit | <D> Delete | </> Search | <F> Filter | <C> Clear | <X> Excel | <V> CSV | <R> Reload | Left/Right - Page | <Esc> Back"
        }
    };
    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(help, chunks[2]);

    match &state.mode {
        TableMode::Filter(popup) => render_filter_popup(frame, popup, lookups),
        TableMode::ConfirmDelete(id) => render_confirmation(
            frame,
            "Confirm Delete",
            &format!("Delete {} #{id}? This cannot be undone.", state.kind.title()),
        ),
        _ => {}
    }
}

fn render_table<B: Backend>(frame: &mut Frame<B>, state: &mut RecordTableState, area: Rect) {
    let columns = state.page.columns;
    let widths: Vec<Constraint> = columns
        .iter()
        .map(|c| Constraint::Percentage(c.width))
        .collect();

    let header = Row::new(columns.iter().map(|c| Cell::from(c.title)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = state
        .page
        .rows
        .iter()
        .map(|row| Row::new(row.cells.iter().map(|cell| Cell::from(cell.to_string()))))
        .collect();

    let mut title = state.kind.title().to_string();
    let filters = state.query.describe();
    if !filters.is_empty() {
        title = format!("{title} ({filters})");
    }
    if let TableMode::Search(input) = &state.mode {
        title = format!("{title} | Search: {input}|");
    }

    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .widths(&widths)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(table, area, &mut state.table_state);
}

fn render_status<B: Backend>(frame: &mut Frame<B>, state: &RecordTableState, area: Rect) {
    let mut spans = vec![Span::styled(
        format!(
            "Page {}/{} | {} record(s)  ",
            state.page.page, state.page.page_count, state.page.total
        ),
        Style::default().fg(Color::Gray),
    )];
    if let Some(notice) = &state.notice {
        spans.extend(notice_spans(notice).0);
    }
    frame.render_widget(Paragraph::new(Spans::from(spans)), area);
}

fn render_filter_popup<B: Backend>(frame: &mut Frame<B>, popup: &FilterPopup, lookups: &Lookups) {
    let date_value = |field: FilterField, value: Option<NaiveDate>| -> String {
        match (&popup.date_input, popup.field == field) {
            (Some(input), true) => input.get_display_string(),
            _ => value
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Any".to_string()),
        }
    };

    let mut rows = vec![
        (FilterField::From, "From", date_value(FilterField::From, popup.from)),
        (FilterField::To, "To", date_value(FilterField::To, popup.to)),
    ];
    if let Some(kind) = popup.lookup {
        let value = popup
            .lookup_id
            .map(|id| lookups.name(kind, id))
            .unwrap_or_else(|| "Any".to_string());
        rows.push((FilterField::Lookup, kind.label(), format!("< {value} >")));
    }

    let mut lines = vec![Spans::from("")];
    for (field, label, value) in rows {
        let style = if field == popup.field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Spans::from(vec![
            Span::styled(format!("{label:>10}: "), style),
            Span::raw(value),
        ]));
    }
    if let Some(error) = &popup.error {
        lines.push(Spans::from(""));
        lines.push(Spans::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    render_popup(frame, "Filters", lines, 50, 40);
}

fn handle_filter_key(
    state: &mut RecordTableState,
    key: KeyEvent,
    lookups: &Lookups,
) -> Option<TableAction> {
    let TableMode::Filter(popup) = &mut state.mode else {
        return None;
    };

    if let Some(input) = &mut popup.date_input {
        match key.code {
            KeyCode::Enter => popup.toggle_date_editing(),
            KeyCode::Esc => popup.date_input = None,
            code => input.handle_input(code),
        }
        return None;
    }

    match key.code {
        KeyCode::Esc => state.mode = TableMode::Browse,
        KeyCode::Up => popup.move_field(false),
        KeyCode::Down | KeyCode::Tab => popup.move_field(true),
        KeyCode::Enter if popup.field != FilterField::Lookup => popup.toggle_date_editing(),
        KeyCode::Left | KeyCode::Right if popup.field == FilterField::Lookup => {
            if let Some(kind) = popup.lookup {
                popup.lookup_id = lookups.cycle(kind, popup.lookup_id, key.code == KeyCode::Right);
            }
        }
        KeyCode::Delete | KeyCode::Backspace => popup.clear_field(),
        KeyCode::Char('s') | KeyCode::Char('S') => {
            let mut query = state.query.clone();
            if let Err(err) = query.set_range(popup.from, popup.to) {
                popup.error = Some(err.to_string());
                return None;
            }
            query.set_lookup(popup.lookup_id);
            state.query = query;
            state.mode = TableMode::Browse;
            return Some(TableAction::Reload);
        }
        _ => {}
    }
    None
}

pub fn handle_key(
    state: &mut RecordTableState,
    key: KeyEvent,
    lookups: &Lookups,
) -> Option<TableAction> {
    if matches!(state.mode, TableMode::Filter(_)) {
        return handle_filter_key(state, key, lookups);
    }

    match &mut state.mode {
        TableMode::Filter(_) | TableMode::Browse => {}
        TableMode::Search(input) => {
            match key.code {
                KeyCode::Char(c) => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Enter => {
                    let search = std::mem::take(input);
                    state.query.set_search(&search);
                    state.mode = TableMode::Browse;
                    return Some(TableAction::Reload);
                }
                KeyCode::Esc => state.mode = TableMode::Browse,
                _ => {}
            }
            return None;
        }
        TableMode::ConfirmDelete(id) => {
            let id = *id;
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    state.mode = TableMode::Browse;
                    return Some(TableAction::Delete(id));
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = TableMode::Browse;
                }
                _ => {}
            }
            return None;
        }
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => return Some(TableAction::Back),
        KeyCode::Down | KeyCode::Char('j') => state.next(),
        KeyCode::Up | KeyCode::Char('k') => state.previous(),
        KeyCode::Right | KeyCode::PageDown => return state.next_page(),
        KeyCode::Left | KeyCode::PageUp => return state.previous_page(),
        KeyCode::Char('/') => {
            let current = state.query.search.clone().unwrap_or_default();
            state.mode = TableMode::Search(current);
        }
        KeyCode::Char('f') => {
            let popup = FilterPopup::new(&state.query, state.kind.filter_lookup());
            state.mode = TableMode::Filter(popup);
        }
        KeyCode::Char('c') => {
            if state.query.has_filters() {
                state.query.clear_filters();
                return Some(TableAction::Reload);
            }
        }
        KeyCode::Char('n') => return Some(TableAction::New),
        KeyCode::Char('e') | KeyCode::Enter => return state.selected_id().map(TableAction::Edit),
        KeyCode::Char('d') => {
            if let Some(id) = state.selected_id() {
                state.mode = TableMode::ConfirmDelete(id);
            }
        }
        KeyCode::Char('x') => return Some(TableAction::Export(ExportFormat::Xlsx)),
        KeyCode::Char('v') => return Some(TableAction::Export(ExportFormat::Csv)),
        KeyCode::Char('r') => return Some(TableAction::Reload),
        _ => {}
    }
    None
}

pub fn handle_input(state: &mut RecordTableState, lookups: &Lookups) -> Result<Option<TableAction>> {
    Ok(next_key()?.and_then(|key| handle_key(state, key, lookups)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LookupItem;
    use crate::records::{CellValue, columns_of};
    use crate::service::TableRow;
    use crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn page(kind: RecordKind, ids: &[u64], page: u32, page_count: u32) -> TablePage {
        TablePage {
            kind,
            columns: columns_of(kind),
            rows: ids
                .iter()
                .map(|id| TableRow {
                    id: Some(*id),
                    cells: vec![CellValue::Integer(*id)],
                })
                .collect(),
            total: u64::from(page_count) * 10,
            page,
            page_count,
        }
    }

    fn vehicles() -> Lookups {
        let mut lookups = Lookups::default();
        lookups.insert(
            LookupKind::Vehicle,
            vec![
                LookupItem { id: 1, name: "A 12345".into() },
                LookupItem { id: 2, name: "B 67890".into() },
            ],
        );
        lookups
    }

    #[test]
    fn paging_only_moves_within_bounds() {
        let lookups = Lookups::default();
        let mut state = RecordTableState::new(RecordKind::GeneralBill, 10);
        state.set_page(page(RecordKind::GeneralBill, &[1, 2], 1, 2));

        assert!(handle_key(&mut state, press(KeyCode::Left), &lookups).is_none());
        assert!(matches!(
            handle_key(&mut state, press(KeyCode::Right), &lookups),
            Some(TableAction::Reload)
        ));
        assert_eq!(state.query.page, 2);

        state.set_page(page(RecordKind::GeneralBill, &[3], 2, 2));
        assert!(handle_key(&mut state, press(KeyCode::PageDown), &lookups).is_none());
    }

    #[test]
    fn search_resets_to_first_page() {
        let lookups = Lookups::default();
        let mut state = RecordTableState::new(RecordKind::AdibReport, 10);
        state.set_page(page(RecordKind::AdibReport, &[1], 3, 5));

        handle_key(&mut state, press(KeyCode::Char('/')), &lookups);
        for c in "rent".chars() {
            handle_key(&mut state, press(KeyCode::Char(c)), &lookups);
        }
        let action = handle_key(&mut state, press(KeyCode::Enter), &lookups);
        assert!(matches!(action, Some(TableAction::Reload)));
        assert_eq!(state.query.search.as_deref(), Some("rent"));
        assert_eq!(state.query.page, 1);
    }

    #[test]
    fn delete_needs_confirmation() {
        let lookups = Lookups::default();
        let mut state = RecordTableState::new(RecordKind::MessBill, 10);
        state.set_page(page(RecordKind::MessBill, &[11, 12], 1, 1));
        state.next();

        assert!(handle_key(&mut state, press(KeyCode::Char('d')), &lookups).is_none());
        assert!(handle_key(&mut state, press(KeyCode::Char('n')), &lookups).is_none());
        assert!(matches!(state.mode, TableMode::Browse));

        handle_key(&mut state, press(KeyCode::Char('d')), &lookups);
        match handle_key(&mut state, press(KeyCode::Char('y')), &lookups) {
            Some(TableAction::Delete(id)) => assert_eq!(id, 12),
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn filter_popup_applies_lookup_and_rejects_inverted_range() {
        let lookups = vehicles();
        let mut state = RecordTableState::new(RecordKind::FuelBill, 10);

        handle_key(&mut state, press(KeyCode::Char('f')), &lookups);
        handle_key(&mut state, press(KeyCode::Down), &lookups);
        handle_key(&mut state, press(KeyCode::Down), &lookups);
        handle_key(&mut state, press(KeyCode::Right), &lookups);
        let action = handle_key(&mut state, press(KeyCode::Char('s')), &lookups);
        assert!(matches!(action, Some(TableAction::Reload)));
        assert_eq!(state.query.lookup_id, Some(1));

        handle_key(&mut state, press(KeyCode::Char('f')), &lookups);
        if let TableMode::Filter(popup) = &mut state.mode {
            popup.from = NaiveDate::from_ymd_opt(2024, 5, 1);
            popup.to = NaiveDate::from_ymd_opt(2024, 4, 1);
        }
        assert!(handle_key(&mut state, press(KeyCode::Char('s')), &lookups).is_none());
        match &state.mode {
            TableMode::Filter(popup) => assert!(popup.error.is_some()),
            _ => panic!("popup should stay open"),
        }
        assert_eq!(state.query.from, None);
    }

    #[test]
    fn export_keys_pick_the_format() {
        let lookups = Lookups::default();
        let mut state = RecordTableState::new(RecordKind::PayrollReport, 10);
        assert!(matches!(
            handle_key(&mut state, press(KeyCode::Char('x')), &lookups),
            Some(TableAction::Export(ExportFormat::Xlsx))
        ));
        assert!(matches!(
            handle_key(&mut state, press(KeyCode::Char('v')), &lookups),
            Some(TableAction::Export(ExportFormat::Csv))
        ));
    }
}
