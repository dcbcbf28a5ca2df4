//! Interactive API key prompt

use std::io;

use console::Term;
use keycheck_core::Prompt;

/// Asks on the controlling terminal
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.term.write_str(question)?;
        self.term.flush()?;
        self.term.read_line()
    }
}
