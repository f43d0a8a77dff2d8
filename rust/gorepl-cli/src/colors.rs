//! ANSI styling for REPL output, keyed by what the text means.

use std::fmt::Display;

/// The roles text plays in REPL output, each with its SGR parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Success,
    Failure,
    Warning,
    Command,
    Heading,
    Hint,
    Label,
}

impl Style {
    fn sgr(self) -> &'static str {
        match self {
            Style::Success => "32",
            Style::Failure => "31",
            Style::Warning => "33",
            Style::Command => "36",
            Style::Heading => "1",
            Style::Hint => "90",
            Style::Label => "1;31",
        }
    }

    pub fn paint(self, text: impl Display) -> String {
        format!("\x1b[{}m{}\x1b[0m", self.sgr(), text)
    }
}

pub fn green(text: &str) -> String {
    Style::Success.paint(text)
}

pub fn red(text: &str) -> String {
    Style::Failure.paint(text)
}

pub fn yellow(text: &str) -> String {
    Style::Warning.paint(text)
}

pub fn cyan(text: &str) -> String {
    Style::Command.paint(text)
}

pub fn bold(text: &str) -> String {
    Style::Heading.paint(text)
}

pub fn gray(text: &str) -> String {
    Style::Hint.paint(text)
}

/// `kind:` in bold red, the prefix of every reported problem.
pub fn error_label(kind: &str) -> String {
    Style::Label.paint(format_args!("{}:", kind))
}
