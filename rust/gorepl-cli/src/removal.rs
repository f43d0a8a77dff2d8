//! The `-` subcommand: indexed and by-name deletion from a session.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::session::{Collection, Session};

/// Problems with individual items of a removal directive. Each one is
/// reported and skipped; the remaining items still apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserCommandError {
    #[error("'{0}' is not an integer")]
    NotAnInteger(String),

    #[error("{collection} index {index} out of range (have {len})")]
    OutOfRange {
        collection: Collection,
        index: i64,
        len: usize,
    },

    #[error("index {0} already in list")]
    Duplicate(usize),

    #[error("no imported package named '{0}'")]
    UnknownPackage(String),

    #[error("no {0} to remove")]
    Empty(Collection),
}

/// A parsed removal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Remove the last element of a collection.
    Last(Collection),
    /// Remove the listed indices; entries are kept raw until validated.
    Indices(Collection, Vec<String>),
    /// Remove imports by package name.
    Names(Vec<String>),
}

impl Directive {
    /// Parse everything after the `-` sigil.
    pub fn parse(rest: &str) -> Self {
        let rest = rest.trim();
        let mut chars = rest.chars();
        let Some(first) = chars.next() else {
            return Directive::Last(Collection::Statements);
        };

        if let Some(collection) = Collection::from_selector(first) {
            let tail = chars.as_str();
            let index_form = match tail.chars().next() {
                None => true,
                Some(c) => c.is_ascii_digit() || c == '-' || c == ',' || c.is_whitespace(),
            };
            if index_form {
                let tail = tail.trim();
                if tail.is_empty() {
                    return Directive::Last(collection);
                }
                let entries = tail
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect();
                return Directive::Indices(collection, entries);
            }
        }

        Directive::Names(rest.split_whitespace().map(str::to_string).collect())
    }
}

/// What a directive did: indices removed and per-item problems.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Removal {
    pub removed: Vec<(Collection, usize)>,
    pub errors: Vec<UserCommandError>,
}

/// Apply a directive to the session. Valid items are removed in one stable
/// compaction pass.
pub fn apply(session: &mut Session, directive: &Directive) -> Removal {
    let mut report = Removal::default();
    let (collection, indices) = match directive {
        Directive::Last(collection) => {
            let len = session.len_of(*collection);
            if len == 0 {
                report.errors.push(UserCommandError::Empty(*collection));
                return report;
            }
            (*collection, BTreeSet::from([len - 1]))
        }
        Directive::Indices(collection, entries) => {
            let len = session.len_of(*collection);
            (*collection, validate_indices(*collection, entries, len, &mut report.errors))
        }
        Directive::Names(names) => (
            Collection::Imports,
            resolve_names(&session.imports, names, &mut report.errors),
        ),
    };

    if !indices.is_empty() {
        session.remove_indices(collection, &indices);
    }
    report.removed = indices.into_iter().map(|i| (collection, i)).collect();
    report
}

fn validate_indices(
    collection: Collection,
    entries: &[String],
    len: usize,
    errors: &mut Vec<UserCommandError>,
) -> BTreeSet<usize> {
    let mut accepted = BTreeSet::new();
    for entry in entries {
        let index: i64 = match entry.parse() {
            Ok(n) => n,
            Err(_) => {
                errors.push(UserCommandError::NotAnInteger(entry.clone()));
                continue;
            }
        };
        let in_range = usize::try_from(index).ok().filter(|&i| i < len);
        let Some(index) = in_range else {
            errors.push(UserCommandError::OutOfRange { collection, index, len });
            continue;
        };
        if !accepted.insert(index) {
            errors.push(UserCommandError::Duplicate(index));
        }
    }
    accepted
}

fn resolve_names(
    imports: &[String],
    names: &[String],
    errors: &mut Vec<UserCommandError>,
) -> BTreeSet<usize> {
    let mut accepted = BTreeSet::new();
    for name in names {
        let name = name.trim_matches('"');
        match imports.iter().position(|pkg| pkg == name) {
            Some(index) => {
                if !accepted.insert(index) {
                    errors.push(UserCommandError::Duplicate(index));
                }
            }
            None => errors.push(UserCommandError::UnknownPackage(name.to_string())),
        }
    }
    accepted
}
