//! Console styling for the diagnostic reports
//!
//! Colors are dropped automatically when stdout is not a terminal.

use console::{style, StyledObject};

/// Horizontal rule of `=` characters
pub fn rule(width: usize) -> String {
    "=".repeat(width)
}

pub fn success<D>(msg: D) -> StyledObject<D> {
    style(msg).green()
}

pub fn failure<D>(msg: D) -> StyledObject<D> {
    style(msg).red()
}

pub fn warning<D>(msg: D) -> StyledObject<D> {
    style(msg).yellow()
}

pub fn progress<D>(msg: D) -> StyledObject<D> {
    style(msg).blue()
}

pub fn heading<D>(msg: D) -> StyledObject<D> {
    style(msg).bold()
}
