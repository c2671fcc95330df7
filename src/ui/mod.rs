pub mod components;
pub mod home;
pub mod record_form;
pub mod record_table;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

/// How long to wait for a key before redrawing (lets notices expire).
const TICK: Duration = Duration::from_millis(250);

/// Next key press, or `None` when nothing was pressed within one tick.
pub fn next_key() -> Result<Option<KeyEvent>> {
    if !event::poll(TICK)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
        _ => Ok(None),
    }
}
