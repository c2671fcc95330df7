mod api;
mod cli;
mod config;
mod export;
mod forms;
mod labour;
mod listing;
mod logging;
mod models;
mod records;
mod service;
mod ui;

use std::io;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info, warn};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::api::ApiClient;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::models::Lookups;
use crate::records::RecordKind;
use crate::service::SaveOutcome;
use crate::ui::{
    components::notice::{Notice, expire},
    home::{HomeAction, HomeState, handle_input as handle_home_input, render_home},
    record_form::{FormAction, RecordFormState, handle_input as handle_form_input, render_record_form},
    record_table::{
        RecordTableState, TableAction, handle_input as handle_table_input, render_record_table,
    },
};

// Represents the current screen in the app
enum AppScreen {
    Home,
    Table,
    Form,
}

// Main application state
struct AppState {
    api: ApiClient,
    config: Config,
    lookups: Lookups,
    screen: AppScreen,
    home_state: HomeState,
    table_state: Option<RecordTableState>,
    form_state: Option<RecordFormState>,
}

impl AppState {
    fn new(api: ApiClient, config: Config) -> Self {
        Self {
            api,
            config,
            lookups: Lookups::default(),
            screen: AppScreen::Home,
            home_state: HomeState::new(),
            table_state: None,
            form_state: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Tui);
    if let Command::Kinds = command {
        cli::run_kinds();
        return Ok(());
    }

    let config = config::init()?;
    let _log_guard = logging::init(&config.log_dir)?;
    info!("expense manager starting");

    match command {
        Command::Tui => run_tui(config).await,
        Command::List { kind, page, filters } => cli::run_list(&config, kind, page, &filters).await,
        Command::Export { kind, format, out, filters } => {
            cli::run_export(&config, kind, format, out, &filters).await
        }
        Command::Kinds => Ok(()),
    }
}

async fn run_tui(config: Config) -> Result<()> {
    let api = ApiClient::new(&config)?;
    info!(base_url = %api.base_url(), "api client ready");
    let mut app_state = AppState::new(api, config);
    load_lookups(&mut app_state).await;

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "expense manager stopped");
        println!("Error: {err:#}");
    }
    result
}

/// Lookups only decorate ids, so a failure is reported but not fatal.
async fn load_lookups(app_state: &mut AppState) {
    match app_state.api.load_lookups().await {
        Ok(lookups) => app_state.lookups = lookups,
        Err(err) => {
            warn!(error = %err, "lookups unavailable");
            app_state.home_state.notice = Some(Notice::error_message(format!(
                "Lookups unavailable, names show as ids: {err}"
            )));
        }
    }
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        expire(&mut app_state.home_state.notice);
        if let Some(state) = &mut app_state.table_state {
            expire(&mut state.notice);
        }
        if let Some(state) = &mut app_state.form_state {
            expire(&mut state.notice);
        }

        // Render current screen
        let AppState {
            screen,
            home_state,
            table_state,
            form_state,
            lookups,
            ..
        } = &mut *app_state;
        terminal.draw(|f| match screen {
            AppScreen::Home => render_home(f, home_state),
            AppScreen::Table => {
                if let Some(state) = table_state {
                    render_record_table(f, state, lookups);
                }
            }
            AppScreen::Form => {
                if let Some(state) = form_state {
                    render_record_form(f, state, lookups);
                }
            }
        })?;

        // Handle input for current screen
        let should_quit = match app_state.screen {
            AppScreen::Home => handle_home_screen(app_state).await?,
            AppScreen::Table => handle_table_screen(app_state).await?,
            AppScreen::Form => handle_form_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn open_table(app_state: &mut AppState, kind: RecordKind) {
    app_state.table_state = Some(RecordTableState::new(kind, app_state.config.page_size));
    app_state.screen = AppScreen::Table;
    reload_table(app_state).await;
}

/// Fetch the current page; an emptied trailing page steps back one.
async fn reload_table(app_state: &mut AppState) {
    let AppState {
        api,
        lookups,
        table_state,
        ..
    } = app_state;
    let Some(state) = table_state else {
        return;
    };

    loop {
        match service::load_page(api, state.kind(), &state.query, lookups).await {
            Ok(page) => {
                let step_back = page.rows.is_empty() && state.query.page > 1 && page.page_count < state.query.page;
                if step_back {
                    state.query.page -= 1;
                    continue;
                }
                state.set_page(page);
            }
            Err(err) => {
                error!(kind = %state.kind(), error = %format!("{err:#}"), "list failed");
                state.notice = Some(Notice::error(&err));
            }
        }
        break;
    }
}

async fn handle_home_screen(app_state: &mut AppState) -> Result<bool> {
    match handle_home_input(&mut app_state.home_state)? {
        Some(HomeAction::Exit) => return Ok(true),
        Some(HomeAction::Open(kind)) => open_table(app_state, kind).await,
        None => {}
    }
    Ok(false)
}

async fn handle_table_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.table_state else {
        app_state.screen = AppScreen::Home;
        return Ok(false);
    };
    let kind = state.kind();

    match handle_table_input(state, &app_state.lookups)? {
        Some(TableAction::Back) => {
            app_state.home_state = HomeState::with_selected(kind);
            app_state.table_state = None;
            app_state.screen = AppScreen::Home;
        }
        Some(TableAction::Reload) => reload_table(app_state).await,
        Some(TableAction::New) => {
            app_state.form_state = Some(RecordFormState::new(kind, None, service::new_form(kind)));
            app_state.screen = AppScreen::Form;
        }
        Some(TableAction::Edit(id)) => match service::load_form(&app_state.api, kind, id).await {
            Ok(values) => {
                app_state.form_state = Some(RecordFormState::new(kind, Some(id), values));
                app_state.screen = AppScreen::Form;
            }
            Err(err) => set_table_notice(app_state, Notice::error(&err)),
        },
        Some(TableAction::Delete(id)) => match service::delete(&app_state.api, kind, id).await {
            Ok(()) => {
                info!(%kind, id, "deleted");
                reload_table(app_state).await;
                set_table_notice(app_state, Notice::success(format!("Deleted #{id}")));
            }
            Err(err) => set_table_notice(app_state, Notice::error(&err)),
        },
        Some(TableAction::Export(format)) => {
            let query = state.query.clone();
            let dir = app_state.config.export_dir.clone();
            let notice = match service::export(&app_state.api, kind, &query, &app_state.lookups, format, dir).await {
                Ok(path) => Notice::success(format!("Exported to {}", path.display())),
                Err(err) => Notice::error(&err),
            };
            set_table_notice(app_state, notice);
        }
        None => {}
    }
    Ok(false)
}

fn set_table_notice(app_state: &mut AppState, notice: Notice) {
    if let Some(state) = &mut app_state.table_state {
        state.notice = Some(notice);
    }
}

async fn handle_form_screen(app_state: &mut AppState) -> Result<bool> {
    let Some(state) = &mut app_state.form_state else {
        app_state.screen = AppScreen::Home;
        return Ok(false);
    };
    let kind = state.kind();

    match handle_form_input(state, &app_state.lookups)? {
        Some(FormAction::Cancel) => {
            app_state.form_state = None;
            app_state.screen = AppScreen::Table;
        }
        Some(FormAction::Submit) => {
            match service::save(&app_state.api, kind, state.id(), &state.values).await {
                Ok(SaveOutcome::Saved { id }) => {
                    info!(%kind, ?id, "saved");
                    app_state.form_state = None;
                    app_state.screen = AppScreen::Table;
                    reload_table(app_state).await;
                    set_table_notice(app_state, Notice::success("Saved"));
                }
                Ok(SaveOutcome::Invalid(errors)) => {
                    state.notice = Some(Notice::error_message(format!(
                        "Please fix {} field(s)",
                        errors.len()
                    )));
                    state.set_errors(errors);
                }
                Err(err) => {
                    error!(%kind, error = %format!("{err:#}"), "save failed");
                    state.notice = Some(Notice::error(&err));
                }
            }
        }
        None => {}
    }
    Ok(false)
}
