use std::io::{self, IsTerminal, Write};

/// A single overwritten progress line on stderr.
///
/// Silent when stderr is not a terminal, so piped output stays clean.
#[derive(Debug, Clone, Copy)]
pub struct StatusLine {
    enabled: bool,
}

impl StatusLine {
    pub fn stderr() -> Self {
        Self {
            enabled: io::stderr().is_terminal(),
        }
    }

    pub fn hidden() -> Self {
        Self { enabled: false }
    }

    pub fn update(&self, msg: &str) {
        if !self.enabled {
            return;
        }
        let mut err = io::stderr();
        let _ = write!(err, "\r\x1b[2K  \x1b[2m{}\x1b[0m", msg);
        let _ = err.flush();
    }

    pub fn clear(&self) {
        if !self.enabled {
            return;
        }
        let mut err = io::stderr();
        let _ = write!(err, "\r\x1b[2K");
        let _ = err.flush();
    }

    /// Print a line that stays on screen.
    pub fn announce(&self, msg: &str) {
        self.clear();
        eprintln!("{}", msg);
    }
}
