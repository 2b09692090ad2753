// src/resolve/pattern.rs

//! Turning a user supplied path pattern into a directory + glob pair.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::{FsTriggerError, Result};

/// Canonical directory separator used after normalisation.
pub const SEPARATOR: char = '/';

/// `$NAME` or `${NAME}` macro references.
static MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z0-9_.]+)\}|([A-Za-z0-9_]+))").expect("macro regex is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\r\n]+").expect("whitespace regex is valid"));

/// A resolved pattern: the directory to search and the glob to apply in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternParts {
    pub directory: String,
    pub glob: String,
}

/// Replace `${NAME}` / `$NAME` references with values from `vars`.
///
/// Unknown names are left verbatim.
pub fn expand_macros(input: &str, vars: &BTreeMap<String, String>) -> String {
    MACRO_RE
        .replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Collapse embedded tabs/newlines to a space, turn backslashes into the
/// canonical separator and trim.
pub fn normalize(pattern: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(pattern, " ");
    collapsed.replace('\\', &SEPARATOR.to_string()).trim().to_string()
}

/// Resolve `pattern` against `vars` and split it at the last separator.
///
/// Fails when the pattern is blank, shorter than two characters once
/// expanded, or has no directory component.
pub fn resolve(pattern: &str, vars: &BTreeMap<String, String>) -> Result<PatternParts> {
    if pattern.trim().is_empty() {
        return Err(FsTriggerError::Pattern(
            "There is not files to monitor.".to_string(),
        ));
    }

    let expanded = normalize(&expand_macros(&normalize(pattern), vars));

    if expanded.chars().count() < 2 {
        return Err(FsTriggerError::Pattern(format!(
            "The given pattern '{expanded}' for the file to monitor must have a directory."
        )));
    }

    let Some(idx) = expanded.rfind(SEPARATOR) else {
        return Err(FsTriggerError::Pattern(format!(
            "The given pattern '{expanded}' for the file to monitor must have a directory."
        )));
    };

    let directory = match &expanded[..idx] {
        "" => SEPARATOR.to_string(),
        dir => dir.to_string(),
    };
    let glob = expanded[idx + SEPARATOR.len_utf8()..].to_string();

    Ok(PatternParts { directory, glob })
}
