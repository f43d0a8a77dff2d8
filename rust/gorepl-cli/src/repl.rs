//! Interactive REPL for Go.
//!
//! Every accepted line is merged into a [`Session`], the whole program is
//! re-assembled, compiled and run, and the line is kept only if that
//! succeeds.

use std::fs;
use std::io::{self, Write};

use gorepl_syntax::{FragmentParser, GoParser, Node};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::{debug, info, warn};

use crate::assemble;
use crate::colors::{bold, cyan, error_label, gray, green, red, yellow};
use crate::config::{ReplConfig, HISTORY_PATH_ENV};
use crate::removal::{self, Directive};
use crate::session::Session;
use crate::toolchain::{GoToolchain, RunOutcome, Toolchain, ToolchainError};

/// Packages and one symbol from each, seeded by `auto`.
const AUTO_IMPORTS: &[(&str, &str)] = &[
    ("fmt", "Println"),
    ("os", "Exit"),
    ("strings", "Contains"),
    ("strconv", "Itoa"),
    ("math", "Pi"),
];

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Help,
    Reset,
    Show,
    Run,
    WriteMode,
    ReplMode,
    Auto,
    Import(&'a str),
    Remove(&'a str),
    Persist(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
enum ParsedCommand<'a> {
    NotACommand,
    InvalidUsage(&'static str),
    Command(ReplCommand<'a>),
}

fn parse_repl_command(line: &str) -> ParsedCommand<'_> {
    let trimmed = line.trim();

    match trimmed {
        "?" => return ParsedCommand::Command(ReplCommand::Help),
        "~" => return ParsedCommand::Command(ReplCommand::Reset),
        "!" => return ParsedCommand::Command(ReplCommand::Show),
        "run" => return ParsedCommand::Command(ReplCommand::Run),
        "write" => return ParsedCommand::Command(ReplCommand::WriteMode),
        "repl" => return ParsedCommand::Command(ReplCommand::ReplMode),
        "auto" => return ParsedCommand::Command(ReplCommand::Auto),
        _ => {}
    }

    if let Some(rest) = trimmed.strip_prefix('+').or_else(|| import_keyword(trimmed)) {
        let rest = rest.trim();
        return if rest.is_empty() {
            ParsedCommand::InvalidUsage("usage: + pkg [pkg...]")
        } else {
            ParsedCommand::Command(ReplCommand::Import(rest))
        };
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        return ParsedCommand::Command(ReplCommand::Remove(rest));
    }
    if let Some(rest) = trimmed.strip_prefix(':') {
        let rest = rest.trim();
        return if rest.is_empty() {
            ParsedCommand::InvalidUsage("usage: : statement")
        } else {
            ParsedCommand::Command(ReplCommand::Persist(rest))
        };
    }
    ParsedCommand::NotACommand
}

/// `import fmt`, `import "fmt"` and `import ("fmt"; "os")` all name imports.
fn import_keyword(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("import")?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() || c == '"' || c == '(' => Some(rest),
        Some(_) => None,
    }
}

/// Strip quoting and grouping punctuation from an import argument.
fn package_names(args: &str) -> Vec<String> {
    args.split(|c: char| c.is_whitespace() || c == ';')
        .map(|word| word.trim_matches(|c| c == '"' || c == '(' || c == ')'))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// The session controller: owns the session and drives the toolchain.
pub struct Repl<T: Toolchain, P: FragmentParser = GoParser> {
    session: Session,
    toolchain: T,
    parser: P,
}

impl<T: Toolchain> Repl<T, GoParser> {
    pub fn new(toolchain: T) -> Self {
        Self::with_parser(toolchain, GoParser)
    }
}

impl<T: Toolchain, P: FragmentParser> Repl<T, P> {
    pub fn with_parser(toolchain: T, parser: P) -> Self {
        Self {
            session: Session::new(),
            toolchain,
            parser,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub fn toolchain_mut(&mut self) -> &mut T {
        &mut self.toolchain
    }

    /// `! ` when unstable, the imports, then `> ` (`>> ` in write-only mode).
    pub fn prompt(&self) -> String {
        let mut prompt = String::new();
        if self.session.unstable {
            prompt.push_str("! ");
        }
        prompt.push_str(&self.session.imports.join(" "));
        prompt.push_str(if self.session.write_only { ">> " } else { "> " });
        prompt
    }

    /// Process one input line, writing everything the user should see to `out`.
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.session.trailing = None;

        match parse_repl_command(line) {
            ParsedCommand::NotACommand => self.eval(line, out),
            ParsedCommand::InvalidUsage(usage) => writeln!(out, "{} {}", error_label("error"), usage),
            ParsedCommand::Command(ReplCommand::Help) => print_help(out),
            ParsedCommand::Command(ReplCommand::Reset) => {
                self.session.reset();
                info!("session reset");
                writeln!(out, "{}", gray("Session reset."))
            }
            ParsedCommand::Command(ReplCommand::Show) => {
                write!(out, "{}", assemble::render_annotated(&self.session))
            }
            ParsedCommand::Command(ReplCommand::Run) => self.run_current(out),
            ParsedCommand::Command(ReplCommand::WriteMode) => {
                self.session.write_only = true;
                writeln!(out, "{}", gray("Write-only mode: code is recorded without running."))
            }
            ParsedCommand::Command(ReplCommand::ReplMode) => {
                self.session.write_only = false;
                self.refresh();
                writeln!(out, "{}", gray("Back to evaluating every line."))
            }
            ParsedCommand::Command(ReplCommand::Auto) => self.auto(out),
            ParsedCommand::Command(ReplCommand::Import(args)) => {
                for pkg in package_names(args) {
                    self.session.apply(Node::Import(pkg), false);
                }
                self.refresh();
                Ok(())
            }
            ParsedCommand::Command(ReplCommand::Remove(rest)) => self.remove(rest, out),
            ParsedCommand::Command(ReplCommand::Persist(code)) => self.persist(code, out),
        }
    }

    /// Compile without running and record whether the program still builds.
    fn refresh(&mut self) {
        let source = assemble::render(&self.session);
        self.session.unstable = match self.toolchain.compile(&source) {
            Ok(diagnostics) => !diagnostics.is_empty(),
            Err(err) => {
                warn!(%err, "toolchain unavailable during refresh");
                true
            }
        };
        debug!(unstable = self.session.unstable, "refreshed");
    }

    fn remove(&mut self, rest: &str, out: &mut impl Write) -> io::Result<()> {
        let directive = Directive::parse(rest);
        let report = removal::apply(&mut self.session, &directive);
        for err in &report.errors {
            writeln!(out, "{} {}", error_label("error"), err)?;
        }
        if !report.removed.is_empty() {
            let removed: Vec<String> = report
                .removed
                .iter()
                .map(|(collection, index)| format!("{}{}", collection.letter(), index))
                .collect();
            writeln!(out, "{}", green(&format!("removed {}", removed.join(", "))))?;
        }
        self.refresh();
        Ok(())
    }

    fn persist(&mut self, code: &str, out: &mut impl Write) -> io::Result<()> {
        let stmts = match self.parser.parse_statements(code, self.session.next_line()) {
            Ok(stmts) => stmts,
            Err(err) => return writeln!(out, "{} {}", error_label("parse error"), err),
        };
        for stmt in stmts {
            self.session.apply(Node::from(stmt), true);
        }
        self.session.advance_lines(code);
        if !self.session.write_only {
            self.refresh();
        }
        Ok(())
    }

    fn auto(&mut self, out: &mut impl Write) -> io::Result<()> {
        for (pkg, symbol) in AUTO_IMPORTS {
            let check = format!("_ = {}.{}", pkg, symbol);
            match self.parser.parse_statements(&check, self.session.next_line()) {
                Ok(stmts) => {
                    self.session.apply(Node::Import((*pkg).to_string()), false);
                    for stmt in stmts {
                        self.session.apply(Node::from(stmt), true);
                    }
                    self.session.advance_lines(&check);
                }
                Err(err) => writeln!(out, "{} {}", error_label("parse error"), err)?,
            }
        }
        self.refresh();
        Ok(())
    }

    /// Compile and run the session as it stands.
    fn run_current(&mut self, out: &mut impl Write) -> io::Result<()> {
        let source = assemble::render(&self.session);
        let diagnostics = match self.toolchain.compile(&source) {
            Ok(diagnostics) => diagnostics,
            Err(err) => {
                self.session.unstable = true;
                return report_toolchain_error(&err, out);
            }
        };
        self.session.unstable = !diagnostics.is_empty();
        if !diagnostics.is_empty() {
            return report_diagnostics("Compile error", &diagnostics, out);
        }
        match self.toolchain.run() {
            Ok(RunOutcome::Output(stdout)) => out.write_all(stdout.as_bytes()),
            Ok(RunOutcome::Diagnostics(stderr)) => report_diagnostics("Runtime error", &stderr, out),
            Err(err) => report_toolchain_error(&err, out),
        }
    }

    /// Bare code: parse, tentatively merge, compile, run, and commit or
    /// roll back.
    fn eval(&mut self, line: &str, out: &mut impl Write) -> io::Result<()> {
        let fragment = match self.parser.parse_fragment(line, self.session.next_line()) {
            Ok(fragment) => fragment,
            Err(err) => return writeln!(out, "{} {}", error_label("parse error"), err),
        };
        let nodes = fragment.into_nodes();

        if self.session.write_only {
            for node in nodes {
                self.session.apply(node, true);
            }
            self.session.advance_lines(line);
            return Ok(());
        }

        let checkpoint = self.session.checkpoint();
        let mut changes = false;
        for node in nodes {
            changes |= self.session.apply(node, false);
        }
        self.session.advance_lines(line);

        let source = assemble::render(&self.session);
        let failure = match self.toolchain.compile(&source) {
            Err(err) => Some(("toolchain", report_toolchain_error(&err, out))),
            Ok(diagnostics) if !diagnostics.is_empty() => {
                Some(("compile", report_diagnostics("Compile error", &diagnostics, out)))
            }
            Ok(_) => match self.toolchain.run() {
                Err(err) => Some(("toolchain", report_toolchain_error(&err, out))),
                Ok(RunOutcome::Diagnostics(stderr)) => {
                    Some(("runtime", report_diagnostics("Runtime error", &stderr, out)))
                }
                Ok(RunOutcome::Output(stdout)) => {
                    out.write_all(stdout.as_bytes())?;
                    None
                }
            },
        };

        if let Some((stage, written)) = failure {
            self.session.rollback(checkpoint);
            self.session.unstable |= changes;
            info!(stage, "line rejected, session rolled back");
            return written;
        }

        if changes {
            self.session.trailing = None;
            self.refresh();
        }
        Ok(())
    }
}

fn report_diagnostics(kind: &str, diagnostics: &str, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", error_label(kind))?;
    writeln!(out, "{}", red(diagnostics.trim_end()))
}

fn report_toolchain_error(err: &ToolchainError, out: &mut impl Write) -> io::Result<()> {
    warn!(%err, "toolchain failure");
    writeln!(out, "{} {}", error_label("toolchain error"), err)
}

fn print_help(out: &mut impl Write) -> io::Result<()> {
    let entries: &[(&str, &str)] = &[
        ("?", "Show this help"),
        ("+ pkg [pkg...]", "Import packages (also `import pkg`)"),
        ("- name [name...]", "Remove imported packages by name"),
        ("-[dps] [i,j...]", "Remove declarations, packages or statements by index"),
        ("-", "Remove the last statement"),
        ("~", "Reset the session"),
        (": stmt", "Add persistent statements"),
        ("!", "Show the assembled source with indices"),
        ("run", "Compile and run the current program"),
        ("write, repl", "Record code without running / evaluate every line"),
        ("auto", "Import fmt, os, strings, strconv and math"),
    ];
    writeln!(out, "{}", bold("Commands:"))?;
    for (cmd, what) in entries {
        writeln!(out, "  {:<18} {}", cyan(cmd), gray(what))?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        gray("Anything else is Go code. Bindings and declarations persist; other statements run once.")
    )?;
    writeln!(
        out,
        "{}",
        gray(&format!("History is kept in ${} (default ~/.gorepl/history).", HISTORY_PATH_ENV))
    )
}

/// Run the interactive loop until end of input.
pub fn run_repl(config: ReplConfig) -> Result<(), ReadlineError> {
    println!("{}", bold(&cyan("Welcome to the Go REPL!")));
    println!("{}\n", gray("Enter '?' for a list of commands."));

    let editor_config = rustyline::Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(editor_config)?;

    let history_path = config.history_path.clone();
    if let Some(ref path) = history_path {
        if path.exists() {
            if let Err(err) = rl.load_history(path) {
                eprintln!(
                    "{} failed to load history from {}: {}",
                    yellow("Warning:"),
                    path.display(),
                    err
                );
            }
        }
    }

    let mut repl = Repl::new(GoToolchain::new(config.toolchain));
    let stdout = io::stdout();

    loop {
        match rl.readline(&repl.prompt()) {
            Ok(line) => {
                let mut out = stdout.lock();
                if let Err(err) = repl.handle_line(&line, &mut out).and_then(|_| out.flush()) {
                    warn!(%err, "failed to write output");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", gray("(Ctrl-D to exit)"));
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                eprintln!("{} {}", error_label("error"), err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                eprintln!(
                    "{} failed to create history directory {}: {}",
                    yellow("Warning:"),
                    parent.display(),
                    err
                );
            }
        }
        if let Err(err) = rl.save_history(path) {
            eprintln!(
                "{} failed to save history to {}: {}",
                yellow("Warning:"),
                path.display(),
                err
            );
        }
    }

    Ok(())
}
