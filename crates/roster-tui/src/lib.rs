// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Tabs};
use roster_app::defaults::PROJECT_GROUP_KEY;
use roster_app::{
    AppCommand, AppEvent, AppMode, AppState, CellValue, ColumnDef, ColumnFormInput, ColumnGroup,
    ColumnType, CommitOutcome, EditSession, FilterSet, FilterValue, FormKind, FormPayload,
    PendingAction, ProjectFormInput, Record, RecordId, RenameColumnInput, SessionState, Table,
    TableKind, TriState, display_date,
};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::debug;

const FILTER_MARK_ACTIVE: &str = "▼";
const DEPLOYED_KEY: &str = "isDeployed";
const CURSOR_MARK: &str = ">";

/// Storage-facing side of the UI. The terminal loop never touches storage
/// directly.
pub trait AppRuntime {
    fn load_table(&mut self, kind: TableKind) -> Result<Table>;
    /// Persists whatever changed in `table` since it was loaded or last saved.
    fn save_table(&mut self, table: &Table) -> Result<()>;
    fn export_table(&mut self, table: &Table) -> Result<PathBuf>;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone)]
struct TableView {
    table: Table,
    session: EditSession,
    filters: FilterSet,
    selected_row: usize,
    selected_col: usize,
}

impl TableView {
    fn new(table: Table) -> Self {
        Self {
            table,
            session: EditSession::new(),
            filters: FilterSet::new(),
            selected_row: 0,
            selected_col: 0,
        }
    }

    fn visible(&self) -> Vec<&Record> {
        self.filters.apply(&self.table)
    }

    fn selected_record_id(&self) -> Option<RecordId> {
        self.visible()
            .get(self.selected_row)
            .map(|record| record.id)
    }

    fn selected_column(&self) -> Option<&ColumnDef> {
        self.table.columns().get(self.selected_col)
    }

    fn select_record(&mut self, id: RecordId) -> bool {
        match self.visible().iter().position(|record| record.id == id) {
            Some(index) => {
                self.selected_row = index;
                true
            }
            None => false,
        }
    }

    fn clamp(&mut self) {
        let rows = self.visible().len();
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
        let columns = self.table.columns().len();
        self.selected_col = self.selected_col.min(columns.saturating_sub(1));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterField {
    Global,
    Column(ColumnDef),
    Group(ColumnGroup),
}

impl FilterField {
    fn label(&self) -> &str {
        match self {
            Self::Global => "search",
            Self::Column(column) => &column.label,
            Self::Group(group) => &group.label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormUiState {
    kind: FormKind,
    text: String,
    column_type: ColumnType,
    target_key: Option<String>,
}

impl FormUiState {
    fn new(kind: FormKind) -> Self {
        Self {
            kind,
            text: String::new(),
            column_type: ColumnType::Text,
            target_key: None,
        }
    }

    fn payload(&self) -> FormPayload {
        match self.kind {
            FormKind::AddColumn => {
                FormPayload::AddColumn(ColumnFormInput::new(self.text.clone(), self.column_type))
            }
            FormKind::RenameColumn => FormPayload::RenameColumn(RenameColumnInput {
                key: self.target_key.clone().unwrap_or_default(),
                label: self.text.clone(),
            }),
            FormKind::AddProject => FormPayload::AddProject(ProjectFormInput {
                name: self.text.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    tables: BTreeMap<TableKind, TableView>,
    draft_field: usize,
    filter_field: usize,
    form: Option<FormUiState>,
    help_visible: bool,
    status_token: u64,
}

impl ViewData {
    fn active(&self, state: &AppState) -> Option<&TableView> {
        self.tables.get(&state.active_tab)
    }

    fn active_mut(&mut self, state: &AppState) -> Option<&mut TableView> {
        self.tables.get_mut(&state.active_tab)
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = ensure_loaded(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
        {
            break;
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn ensure_loaded<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    if !view_data.tables.contains_key(&state.active_tab) {
        let table = runtime.load_table(state.active_tab)?;
        view_data
            .tables
            .insert(state.active_tab, TableView::new(table));
    }
    Ok(())
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if let Err(error) = ensure_loaded(state, runtime, view_data) {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error}"),
        );
        return false;
    }

    match state.mode {
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
        AppMode::Draft => {
            handle_draft_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Filter => {
            handle_filter_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Form(_) => {
            handle_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Confirm => {
            handle_confirm_key(state, runtime, view_data, internal_tx, key);
            false
        }
    }
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) -> Vec<AppEvent> {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::TabChanged(_)))
        && let Err(error) = ensure_loaded(state, runtime, view_data)
    {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error}"),
        );
    }
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
    events
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let tab_command = match key.code {
        KeyCode::Tab | KeyCode::Char('f') => Some(AppCommand::NextTab),
        KeyCode::BackTab | KeyCode::Char('b') => Some(AppCommand::PrevTab),
        KeyCode::Char(digit @ '1'..='3') => {
            let index = digit as usize - '1' as usize;
            Some(AppCommand::SelectTab(TableKind::ALL[index]))
        }
        _ => None,
    };
    if let Some(command) = tab_command {
        dispatch_and_refresh(state, runtime, view_data, command, internal_tx);
        return false;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => move_cursor(state, view_data, 1, 0),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(state, view_data, -1, 0),
        KeyCode::Char('l') | KeyCode::Right => move_cursor(state, view_data, 0, 1),
        KeyCode::Char('h') | KeyCode::Left => move_cursor(state, view_data, 0, -1),
        KeyCode::Char('g') => {
            if let Some(view) = view_data.active_mut(state) {
                view.selected_row = 0;
            }
        }
        KeyCode::Char('G') => {
            if let Some(view) = view_data.active_mut(state) {
                view.selected_row = view.visible().len().saturating_sub(1);
            }
        }
        KeyCode::Char('a') => begin_draft(state, runtime, view_data, internal_tx, None),
        KeyCode::Char('e') | KeyCode::Enter => {
            let Some(id) = view_data.active(state).and_then(TableView::selected_record_id) else {
                emit_status(state, view_data, internal_tx, "no row selected");
                return false;
            };
            begin_draft(state, runtime, view_data, internal_tx, Some(id));
        }
        KeyCode::Char('d') => {
            let Some(id) = view_data.active(state).and_then(TableView::selected_record_id) else {
                emit_status(state, view_data, internal_tx, "no row selected");
                return false;
            };
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::RequestConfirm(PendingAction::DeleteRecord(id)),
                internal_tx,
            );
        }
        KeyCode::Char('/') => {
            view_data.filter_field = 0;
            dispatch_and_refresh(state, runtime, view_data, AppCommand::OpenFilter, internal_tx);
        }
        KeyCode::Char('c') => open_form(state, runtime, view_data, internal_tx, FormKind::AddColumn),
        KeyCode::Char('r') => {
            open_form(state, runtime, view_data, internal_tx, FormKind::RenameColumn);
        }
        KeyCode::Char('p') => open_form(state, runtime, view_data, internal_tx, FormKind::AddProject),
        KeyCode::Char('D') => {
            let Some(key) = view_data
                .active(state)
                .and_then(TableView::selected_column)
                .map(|column| column.key.clone())
            else {
                emit_status(state, view_data, internal_tx, "no column selected");
                return false;
            };
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::RequestConfirm(PendingAction::DeleteColumn(key)),
                internal_tx,
            );
        }
        KeyCode::Char('x') => export_active(state, runtime, view_data, internal_tx),
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Esc => {
            state.dispatch(AppCommand::ClearStatus);
        }
        _ => {}
    }
    false
}

fn move_cursor(state: &AppState, view_data: &mut ViewData, rows: isize, cols: isize) {
    let Some(view) = view_data.active_mut(state) else {
        return;
    };
    view.selected_row = view.selected_row.saturating_add_signed(rows);
    view.selected_col = view.selected_col.saturating_add_signed(cols);
    view.clamp();
}

fn begin_draft<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    edit: Option<RecordId>,
) {
    let Some(view) = view_data.active_mut(state) else {
        return;
    };
    let started = match edit {
        Some(id) => view.session.begin_edit(&view.table, id),
        None => view.session.begin_add(&view.table),
    };
    match started {
        Ok(()) => {
            view_data.draft_field = 0;
            dispatch_and_refresh(state, runtime, view_data, AppCommand::OpenDraft, internal_tx);
        }
        Err(error) => emit_status(state, view_data, internal_tx, error.to_string()),
    }
}

fn handle_draft_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let field_index = view_data.draft_field;
    let Some(view) = view_data.active_mut(state) else {
        return;
    };
    let field_count = view.table.columns().len();

    let submit = key.code == KeyCode::Enter
        || (key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL));
    if submit {
        commit_draft(state, runtime, view_data, internal_tx);
        return;
    }

    match key.code {
        KeyCode::Esc => {
            if view.session.is_dirty() {
                dispatch_and_refresh(
                    state,
                    runtime,
                    view_data,
                    AppCommand::RequestConfirm(PendingAction::DiscardDraft),
                    internal_tx,
                );
            } else {
                view.session.cancel();
                dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
            }
        }
        KeyCode::Tab | KeyCode::Down => {
            view_data.draft_field = cycle_index(field_index, field_count, 1);
        }
        KeyCode::BackTab | KeyCode::Up => {
            view_data.draft_field = cycle_index(field_index, field_count, -1);
        }
        code => {
            let Some(column) = view.table.columns().get(field_index).cloned() else {
                return;
            };
            let current = view
                .session
                .field(&column.key)
                .cloned()
                .unwrap_or_else(|| column.default_value());
            let options = view.table.select_options(&column.key);
            if let Some(next) = edit_cell(&column, &current, &options, code)
                && let Err(error) = view.session.set_field(column.key.clone(), next)
            {
                emit_status(state, view_data, internal_tx, error.to_string());
            }
        }
    }
}

/// New value for a draft cell after `code`, or `None` when the key does not
/// apply to the column type.
fn edit_cell(
    column: &ColumnDef,
    current: &CellValue,
    options: &[String],
    code: KeyCode,
) -> Option<CellValue> {
    if column.column_type == ColumnType::Boolean {
        return match code {
            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => {
                Some(CellValue::Bool(!current.as_bool().unwrap_or(false)))
            }
            KeyCode::Char('y') => Some(CellValue::Bool(true)),
            KeyCode::Char('n') => Some(CellValue::Bool(false)),
            _ => None,
        };
    }

    let text = current.as_text().unwrap_or_default();
    match code {
        KeyCode::Char(ch) => Some(CellValue::text(format!("{text}{ch}"))),
        KeyCode::Backspace => {
            let mut next = text.to_owned();
            next.pop();
            Some(CellValue::text(next))
        }
        KeyCode::Left | KeyCode::Right if column.column_type == ColumnType::Select => {
            let delta = if code == KeyCode::Right { 1 } else { -1 };
            Some(CellValue::text(cycle_option(text, options, delta)))
        }
        _ => None,
    }
}

/// Steps through `options` with a leading blank choice.
fn cycle_option(current: &str, options: &[String], delta: isize) -> String {
    let choices = options.len() + 1;
    let position = options
        .iter()
        .position(|option| option == current)
        .map_or(0, |index| index + 1);
    let next = cycle_index(position, choices, delta);
    if next == 0 {
        String::new()
    } else {
        options[next - 1].clone()
    }
}

fn cycle_index(current: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).rem_euclid(len as isize) as usize
}

fn commit_draft<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let now = runtime.now();
    let Some(view) = view_data.active_mut(state) else {
        return;
    };
    if let Some(message) = invalid_date_message(view) {
        emit_status(state, view_data, internal_tx, message);
        return;
    }

    let noun = view.table.kind().noun();
    let (id, verb) = match view.session.commit(&mut view.table, now) {
        Ok(CommitOutcome::Created(id)) => (id, "added"),
        Ok(CommitOutcome::Updated(id)) => (id, "saved"),
        Ok(CommitOutcome::Rejected) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                "enter at least one value -- or press esc to cancel",
            );
            return;
        }
        Err(error) => {
            emit_status(state, view_data, internal_tx, error.to_string());
            return;
        }
    };

    let shown = view.select_record(id);
    let saved = runtime.save_table(&view.table);
    dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
    let message = match saved {
        Err(error) => format!("{noun} {verb} but not saved: {error:#}"),
        Ok(()) if shown => format!("{noun} {verb}"),
        Ok(()) => format!("{noun} {verb}; hidden by the current filter"),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn invalid_date_message(view: &TableView) -> Option<String> {
    let layout = format_description!("[year]-[month]-[day]");
    view.table
        .columns()
        .iter()
        .filter(|column| column.column_type == ColumnType::Date)
        .find_map(|column| {
            let raw = view.session.field(&column.key)?.as_text()?.trim();
            if raw.is_empty() || Date::parse(raw, &layout).is_ok() {
                return None;
            }
            Some(format!(
                "{} must be YYYY-MM-DD -- fix the date and retry",
                column.label
            ))
        })
}

fn filter_fields(table: &Table) -> Vec<FilterField> {
    let grouped = table
        .groups()
        .iter()
        .flat_map(|group| group.members.iter().map(String::as_str))
        .collect::<Vec<_>>();
    let mut fields = vec![FilterField::Global];
    fields.extend(
        table
            .columns()
            .iter()
            .filter(|column| !grouped.contains(&column.key.as_str()))
            .cloned()
            .map(FilterField::Column),
    );
    fields.extend(table.groups().iter().cloned().map(FilterField::Group));
    fields
}

fn filter_value_for(filters: &FilterSet, field: &FilterField) -> FilterValue {
    match field {
        FilterField::Global => FilterValue::Contains(filters.global().to_owned()),
        FilterField::Column(column) => filters
            .get(&column.key)
            .cloned()
            .unwrap_or_else(|| FilterValue::blank_for(column)),
        FilterField::Group(group) => filters
            .get(&group.key)
            .cloned()
            .unwrap_or_else(|| FilterValue::Contains(String::new())),
    }
}

fn handle_filter_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
        if let Some(view) = view_data.active_mut(state) {
            view.filters.clear_all();
            view.clamp();
        }
        emit_status(state, view_data, internal_tx, "filters cleared");
        return;
    }

    let field_index = view_data.filter_field;
    let Some(view) = view_data.active_mut(state) else {
        return;
    };
    let fields = filter_fields(&view.table);

    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Tab | KeyCode::Down => {
            view_data.filter_field = cycle_index(field_index, fields.len(), 1);
            return;
        }
        KeyCode::BackTab | KeyCode::Up => {
            view_data.filter_field = cycle_index(field_index, fields.len(), -1);
            return;
        }
        _ => {}
    }

    let Some(field) = fields.get(field_index) else {
        return;
    };
    let current = filter_value_for(&view.filters, field);
    let options = match field {
        FilterField::Column(column) => view.table.select_options(&column.key),
        FilterField::Global | FilterField::Group(_) => Vec::new(),
    };
    let Some(next) = edit_filter(&current, &options, key.code) else {
        return;
    };
    match (field, next) {
        (FilterField::Global, FilterValue::Contains(needle)) => view.filters.set_global(needle),
        (FilterField::Global, _) => {}
        (FilterField::Column(column), value) => view.filters.set(column.key.clone(), value),
        (FilterField::Group(group), value) => view.filters.set(group.key.clone(), value),
    }
    view.selected_row = 0;
    view.clamp();
}

fn edit_filter(current: &FilterValue, options: &[String], code: KeyCode) -> Option<FilterValue> {
    match (current, code) {
        (FilterValue::Flag(state), KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left) => {
            Some(FilterValue::Flag(state.next()))
        }
        (FilterValue::Flag(_), _) => None,
        (FilterValue::Equals(option), KeyCode::Left | KeyCode::Right) => {
            let delta = if code == KeyCode::Right { 1 } else { -1 };
            Some(FilterValue::Equals(cycle_option(option, options, delta)))
        }
        (FilterValue::Equals(_), KeyCode::Backspace) => Some(FilterValue::Equals(String::new())),
        (FilterValue::Equals(_), _) => None,
        (FilterValue::Contains(needle), KeyCode::Char(ch)) => {
            Some(FilterValue::Contains(format!("{needle}{ch}")))
        }
        (FilterValue::Contains(needle), KeyCode::Backspace) => {
            let mut next = needle.clone();
            next.pop();
            Some(FilterValue::Contains(next))
        }
        (FilterValue::Contains(_), _) => None,
    }
}

fn open_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: FormKind,
) {
    let Some(view) = view_data.active(state) else {
        return;
    };
    let mut form = FormUiState::new(kind);
    match kind {
        FormKind::AddColumn => {}
        FormKind::RenameColumn => {
            let Some(column) = view.selected_column() else {
                emit_status(state, view_data, internal_tx, "no column selected");
                return;
            };
            form.text = column.label.clone();
            form.target_key = Some(column.key.clone());
        }
        FormKind::AddProject => {
            if view.table.group(PROJECT_GROUP_KEY).is_none() {
                let message = if view.table.kind() == TableKind::Resources {
                    "no project columns left on this table"
                } else {
                    "projects live on the Resources tab -- switch there first"
                };
                emit_status(state, view_data, internal_tx, message);
                return;
            }
        }
    }
    view_data.form = Some(form);
    dispatch_and_refresh(state, runtime, view_data, AppCommand::OpenForm(kind), internal_tx);
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    match key.code {
        KeyCode::Esc => {
            view_data.form = None;
            dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
        }
        KeyCode::Enter => submit_form(state, runtime, view_data, internal_tx),
        KeyCode::Backspace => {
            form.text.pop();
        }
        KeyCode::Left | KeyCode::Right if form.kind == FormKind::AddColumn => {
            let delta = if key.code == KeyCode::Right { 1 } else { -1 };
            let position = ColumnType::ALL
                .iter()
                .position(|column_type| *column_type == form.column_type)
                .unwrap_or(0);
            form.column_type =
                ColumnType::ALL[cycle_index(position, ColumnType::ALL.len(), delta)];
        }
        KeyCode::Char(ch) => form.text.push(ch),
        _ => {}
    }
}

fn submit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(payload) = view_data.form.as_ref().map(FormUiState::payload) else {
        return;
    };
    let Some(view) = view_data.active_mut(state) else {
        return;
    };
    match apply_form(runtime, view, &payload) {
        Ok(message) => {
            debug!(form = payload.kind().title(), "form applied");
            view_data.form = None;
            dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
            emit_status(state, view_data, internal_tx, message);
        }
        Err(error) => emit_status(state, view_data, internal_tx, format!("{error:#}")),
    }
}

fn apply_form<R: AppRuntime>(
    runtime: &mut R,
    view: &mut TableView,
    payload: &FormPayload,
) -> Result<String> {
    payload.validate()?;
    let message = match payload {
        FormPayload::AddColumn(input) => {
            let key = view.table.add_column(input)?;
            view.selected_col = view.table.columns().len().saturating_sub(1);
            format!("column `{key}` added")
        }
        FormPayload::RenameColumn(input) => {
            view.table.rename_column(input)?;
            format!("column `{}` renamed", input.key)
        }
        FormPayload::AddProject(input) => {
            let name = input.name.trim();
            if view.table.add_group_option(PROJECT_GROUP_KEY, name)? == 0 {
                format!("{name} is already listed")
            } else {
                format!("{name} added to the project list")
            }
        }
    };
    runtime.save_table(&view.table)?;
    Ok(message)
}

fn handle_confirm_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let command = match key.code {
        KeyCode::Char('y' | 'Y') => AppCommand::Confirm,
        KeyCode::Char('n' | 'N') | KeyCode::Esc => AppCommand::Decline,
        _ => return,
    };
    let events = dispatch_and_refresh(state, runtime, view_data, command, internal_tx);
    for event in events {
        if let AppEvent::Confirmed(action) = event {
            apply_confirmed(state, runtime, view_data, internal_tx, action);
        }
    }
}

fn apply_confirmed<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: PendingAction,
) {
    let Some(view) = view_data.active_mut(state) else {
        return;
    };
    let message = match apply_action(runtime, view, action) {
        Ok(message) => message,
        Err(error) => format!("{error:#}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn apply_action<R: AppRuntime>(
    runtime: &mut R,
    view: &mut TableView,
    action: PendingAction,
) -> Result<String> {
    let message = match action {
        PendingAction::DiscardDraft => {
            view.session.cancel();
            return Ok("changes discarded".to_owned());
        }
        PendingAction::DeleteRecord(id) => {
            view.table.delete_record(id)?;
            view.session.forget_record(id);
            format!("{} deleted", view.table.kind().noun())
        }
        PendingAction::DeleteColumn(key) => {
            let column = view.table.delete_column(&key)?;
            view.session.drop_field(&column.key);
            view.filters.retain_known(&view.table);
            format!("column `{}` deleted", column.key)
        }
    };
    view.clamp();
    runtime.save_table(&view.table)?;
    Ok(message)
}

fn export_active<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(view) = view_data.active(state) else {
        return;
    };
    let kind = view.table.kind();
    let message = if !kind.supports_export() {
        "export is available on the Resources tab".to_owned()
    } else {
        match runtime.export_table(&view.table) {
            Ok(path) => format!("exported {} {}s to {}", view.table.len(), kind.noun(), path.display()),
            Err(error) => format!("export failed: {error:#}"),
        }
    };
    emit_status(state, view_data, internal_tx, message);
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = TableKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let titles = TableKind::ALL
        .iter()
        .map(|tab| tab_title(*tab, view_data))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("roster").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_table(frame, layout[1], state, view_data);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(view) = view_data.active(state) {
        let overlay = match state.mode {
            AppMode::Draft => Some((render_draft_text(view, view_data.draft_field), draft_title(view))),
            AppMode::Filter => Some((
                render_filter_text(view, view_data.filter_field),
                "filter".to_owned(),
            )),
            AppMode::Form(kind) => view_data
                .form
                .as_ref()
                .map(|form| (render_form_text(form), kind.title().to_owned())),
            AppMode::Nav | AppMode::Confirm => None,
        };
        if let Some((body, title)) = overlay {
            let area = centered_rect(64, 60, frame.area());
            frame.render_widget(Clear, area);
            let panel =
                Paragraph::new(body).block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(panel, area);
        }
    }

    if view_data.help_visible {
        let area = centered_rect(80, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let Some(view) = view_data.active(state) else {
        let empty = Paragraph::new(String::new()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(state.active_tab.label()),
        );
        frame.render_widget(empty, area);
        return;
    };

    let columns = view.table.columns();
    let widths = vec![Constraint::Min(8); columns.len().max(1)];
    let header = Row::new(columns.iter().map(|column| {
        Cell::from(header_label(view, column)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let visible = view.visible();
    let rows = visible.iter().enumerate().map(|(row_index, record)| {
        let selected_row = row_index == view.selected_row;
        let deployed = record.flag(DEPLOYED_KEY);
        let cells = columns
            .iter()
            .enumerate()
            .map(|(column_index, column)| {
                let mut style = Style::default();
                if deployed {
                    style = style.fg(Color::Yellow);
                }
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_row && column_index == view.selected_col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(cell_text(&view.table, record, column)).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let table = ratatui::widgets::Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(view))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn cell_text(table: &Table, record: &Record, column: &ColumnDef) -> String {
    let value = table.value(record, &column.key);
    match (column.column_type, &value) {
        (ColumnType::Date, CellValue::Text(raw)) => display_date(raw),
        (_, CellValue::Bool(true)) if column.key == DEPLOYED_KEY => "deployed".to_owned(),
        (_, CellValue::Bool(false)) if column.key == DEPLOYED_KEY => String::new(),
        _ => value.display(),
    }
}

fn header_label(view: &TableView, column: &ColumnDef) -> String {
    let grouped = view
        .table
        .groups()
        .iter()
        .any(|group| group.members.contains(&column.key) && filter_active(view, &group.key));
    if filter_active(view, &column.key) || grouped {
        format!("{} {FILTER_MARK_ACTIVE}", column.label)
    } else {
        column.label.clone()
    }
}

fn filter_active(view: &TableView, key: &str) -> bool {
    view.filters.get(key).is_some_and(FilterValue::is_active)
}

fn table_title(view: &TableView) -> String {
    let shown = view.visible().len();
    let total = view.table.len();
    let label = view.table.kind().label();
    if view.filters.is_empty() {
        format!("{label} ({total})")
    } else {
        format!(
            "{label} ({shown}/{total}, {} filters)",
            view.filters.active_count()
        )
    }
}

fn tab_title(tab: TableKind, view_data: &ViewData) -> String {
    match view_data.tables.get(&tab) {
        Some(view) if !view.filters.is_empty() => format!("{} {FILTER_MARK_ACTIVE}", tab.label()),
        _ => tab.label().to_owned(),
    }
}

fn draft_title(view: &TableView) -> String {
    match view.session.state() {
        SessionState::Adding => format!("add {}", view.table.kind().noun()),
        SessionState::Editing | SessionState::Viewing => {
            format!("edit {}", view.table.kind().noun())
        }
    }
}

fn render_draft_text(view: &TableView, field_index: usize) -> String {
    let mut lines = Vec::with_capacity(view.table.columns().len() + 2);
    for (index, column) in view.table.columns().iter().enumerate() {
        let marker = if index == field_index { CURSOR_MARK } else { " " };
        let value = view
            .session
            .field(&column.key)
            .cloned()
            .unwrap_or_else(|| column.default_value());
        let mut line = format!("{marker} {}: {}", column.label, value.display());
        if index == field_index && column.column_type == ColumnType::Select {
            let options = view.table.select_options(&column.key);
            if !options.is_empty() {
                line.push_str(&format!("  [{}]", options.join(" | ")));
            }
        }
        lines.push(line);
    }
    lines.push(String::new());
    lines.push("tab/shift+tab field | space toggle | left/right option | enter save | esc cancel".to_owned());
    lines.join("\n")
}

fn render_filter_text(view: &TableView, field_index: usize) -> String {
    let fields = filter_fields(&view.table);
    let mut lines = Vec::with_capacity(fields.len() + 2);
    for (index, field) in fields.iter().enumerate() {
        let marker = if index == field_index { CURSOR_MARK } else { " " };
        let value = filter_value_for(&view.filters, field);
        let shown = match &value {
            FilterValue::Equals(option) if option.is_empty() => "any".to_owned(),
            FilterValue::Flag(TriState::All) => "all".to_owned(),
            other => other.display(),
        };
        lines.push(format!("{marker} {}: {shown}", field.label()));
    }
    lines.push(String::new());
    lines.push("type to match | left/right choose | ctrl+r clear all | enter/esc done".to_owned());
    lines.join("\n")
}

fn render_form_text(form: &FormUiState) -> String {
    match form.kind {
        FormKind::AddColumn => format!(
            "label: {}\ntype: {}  (left/right)\n\nenter add | esc cancel",
            form.text,
            form.column_type.as_str()
        ),
        FormKind::RenameColumn => format!(
            "column: {}\nlabel: {}\n\nenter rename | esc cancel",
            form.target_key.as_deref().unwrap_or_default(),
            form.text
        ),
        FormKind::AddProject => format!("project: {}\n\nenter add | esc cancel", form.text),
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }
    let hints = match state.mode {
        AppMode::Nav => {
            let mut hints =
                "j/k/h/l | b/f tabs | a add | e edit | d del | / filter | c/r/D column".to_owned();
            if state.active_tab == TableKind::Resources {
                hints.push_str(" | p project | x export");
            }
            hints.push_str(" | ? help | ctrl+q");
            hints
        }
        AppMode::Draft => "enter save | esc cancel".to_owned(),
        AppMode::Filter => "enter/esc done".to_owned(),
        AppMode::Form(_) => "enter submit | esc cancel".to_owned(),
        AppMode::Confirm => "y confirm | n cancel".to_owned(),
    };
    let mode = mode_label(state.mode);
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Nav => "NAV",
        AppMode::Draft => "DRAFT",
        AppMode::Filter => "FILTER",
        AppMode::Form(_) => "FORM",
        AppMode::Confirm => "CONFIRM",
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
nav: j/k/h/l move | g/G first/last | b/f or tab tabs | 1-3 jump to tab\n\
nav: a add | e/enter edit | d delete row | / filter | esc clear status\n\
columns: c add | r rename selected | D delete selected\n\
resources: p add project | x export resources.json\n\
draft: tab/shift+tab field | type to edit | space toggle | left/right option | enter save | esc cancel\n\
filter: tab/shift+tab field | type to match | left/right choose | ctrl+r clear | enter/esc done\n\
confirm: y yes | n/esc no"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
