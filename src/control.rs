//! Line-based control channel on stdin: mode switches and viewport resizes.

use crate::compose::Mode;
use crate::state::{SharedState, MAX_VIEWPORT_EDGE};
use anyhow::{Context, Result};
use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetMode(Mode),
    Resize(u32, u32),
}

/// Parse one control line. Blank lines and out-of-range viewports yield
/// `None`; any other word is a mode name, with unknown names falling back
/// to the default mode.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(size) = line.strip_prefix("viewport") {
        let (width, height) = size.trim().split_once('x')?;
        let edge = |v: &str| v.trim().parse().ok().filter(|v: &u32| (1..=MAX_VIEWPORT_EDGE).contains(v));
        let (width, height) = (edge(width)?, edge(height)?);
        return Some(Command::Resize(width, height));
    }

    Some(Command::SetMode(Mode::from_name(line)))
}

pub fn apply(state: &SharedState, command: Command) {
    match command {
        Command::SetMode(mode) => {
            tracing::info!("Mode: {}", mode.as_str());
            state.set_mode(mode);
        }
        Command::Resize(width, height) => {
            tracing::info!("Viewport: {}x{}", width, height);
            state.set_viewport((width, height));
        }
    }
}

/// Read commands from `input` until EOF
pub fn run<R: BufRead>(input: R, state: &SharedState) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read control input")?;
        match parse_command(&line) {
            Some(command) => apply(state, command),
            None if line.trim().is_empty() => {}
            None => tracing::warn!("Ignoring control line '{}'", line.trim()),
        }
    }
    Ok(())
}

pub fn spawn_stdin(state: Arc<SharedState>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("control".into())
        .spawn(move || {
            if let Err(err) = run(std::io::stdin().lock(), &state) {
                tracing::warn!("Control input closed: {:#}", err);
            }
        })
        .context("Failed to spawn control thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_modes_and_viewport() {
        assert_eq!(parse_command("swap"), Some(Command::SetMode(Mode::Swap)));
        assert_eq!(parse_command("  summit "), Some(Command::SetMode(Mode::Summit)));
        assert_eq!(parse_command("viewport 1920x1080"), Some(Command::Resize(1920, 1080)));
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn bad_viewport_is_ignored() {
        assert_eq!(parse_command("viewport 0x10"), None);
        assert_eq!(parse_command("viewport wide"), None);
    }

    #[test]
    fn oversized_viewport_is_rejected() {
        assert_eq!(parse_command("viewport 100000x100000"), None);
        assert_eq!(parse_command("viewport 7681x720"), None);
        assert_eq!(parse_command("viewport 7680x4320"), Some(Command::Resize(7680, 4320)));

        let state = SharedState::new(Mode::Scene, (640, 480));
        run(std::io::Cursor::new("viewport 100000x100000\n"), &state).unwrap();
        assert_eq!(state.viewport(), (640, 480));
    }

    #[test]
    fn unknown_word_selects_default_mode() {
        assert_eq!(parse_command("party"), Some(Command::SetMode(Mode::Scene)));
    }

    #[test]
    fn run_applies_commands_in_order() {
        let state = SharedState::new(Mode::Summit, (640, 480));
        let input = Cursor::new("swap\n\nviewport 800x600\nviewport nope\n");
        run(input, &state).unwrap();

        assert_eq!(state.mode(), Mode::Swap);
        assert_eq!(state.viewport(), (800, 600));
    }
}
