use smabot_core::{Terminal, TerminalError};
use tracing::{info, warn};

/// An initialized terminal that must be shut down.
///
/// Open with [`TerminalSession::open`] and release with
/// [`TerminalSession::close`]. Shutdown is async, so it cannot run from
/// `Drop`; a session dropped while still open (e.g. during a panic) only logs.
pub struct TerminalSession<T: Terminal> {
    terminal: T,
    open: bool,
}

impl<T: Terminal> TerminalSession<T> {
    pub async fn open(mut terminal: T) -> Result<Self, TerminalError> {
        terminal.initialize().await?;
        info!("Terminal session opened");
        Ok(Self {
            terminal,
            open: true,
        })
    }

    pub fn terminal(&mut self) -> &mut T {
        &mut self.terminal
    }

    /// Shut the terminal down. A failed shutdown is logged and returned, the
    /// session is considered closed either way.
    pub async fn close(mut self) -> Result<(), TerminalError> {
        self.open = false;
        let result = self.terminal.shutdown().await;
        match &result {
            Ok(()) => info!("Terminal session closed"),
            Err(e) => warn!("Terminal shutdown failed: {}", e),
        }
        result
    }
}

impl<T: Terminal> Drop for TerminalSession<T> {
    fn drop(&mut self) {
        if self.open {
            warn!("Terminal session dropped without shutdown");
        }
    }
}
