use std::io::{self, Write};

use crossterm::cursor;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};

/// Owns the alternate screen and raw mode for the life of the UI. Dropping it
/// puts the terminal back, including while unwinding from a panic or after an
/// early `?` in `main`.
///
/// Restoring lives here rather than in the panic hook: the hook also fires for
/// render panics that `boundary::guard` catches, and those must keep the UI up.
pub struct TerminalGuard<W: Write> {
    out: W,
    screen: bool,
    raw: bool,
}

impl<W: Write> TerminalGuard<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            screen: false,
            raw: false,
        }
    }

    /// Switches to the alternate screen, captures the mouse and enables raw
    /// mode. Whatever succeeded before an error is still undone on drop.
    pub fn enter(&mut self) -> io::Result<()> {
        execute!(self.out, EnterAlternateScreen, EnableMouseCapture)?;
        self.screen = true;
        enable_raw_mode()?;
        self.raw = true;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.screen || self.raw
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        if self.raw {
            let _ = disable_raw_mode();
        }
        if self.screen {
            let _ = execute!(self.out, LeaveAlternateScreen, DisableMouseCapture, cursor::Show);
        }
        if self.is_active() {
            tracing::debug!(event = "terminal.restored");
        }
    }
}
