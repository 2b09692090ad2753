// src/inspect/properties.rs

use std::collections::BTreeMap;
use std::path::Path;


use crate::errors::Result;
use crate::fs::FileSystem;
use crate::inspect::keyed::{compare_maps, KeySelection};
use crate::inspect::{
    state_mismatch, ContentInspector, Evaluation, InspectorConfig, InspectorState,
};
use crate::poll_log::PollLog;

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Key/value comparison of a `.properties` file.
#[derive(Debug, Clone)]
pub struct PropertiesInspector {
    selection: KeySelection,
}

impl PropertiesInspector {
    pub fn from_config(config: &InspectorConfig) -> Self {
        let selection = KeySelection::from_config(config);
        Self { selection }
    }

    fn compute(&self, fs: &dyn FileSystem, path: &Path) -> Result<BTreeMap<String, String>> {
        let bytes = fs.read(path)?;
        let all = parse_properties(&String::from_utf8_lossy(&bytes));
        self.selection.select(all, path, "property")
    }
}

impl ContentInspector for PropertiesInspector {
    fn label(&self) -> &str {
        "properties"
    }

    fn init_content(&self, fs: &dyn FileSystem, path: &Path) -> Result<InspectorState> {
        Ok(InspectorState::Keyed(self.compute(fs, path)?))
    }

    fn evaluate_content(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        let InspectorState::Keyed(previous) = prior else {
            return Err(state_mismatch(self.label(), prior));
        };
        let current = self.compute(fs, path)?;
        let changed = compare_maps(previous, &current, "property", log);
        Ok(Evaluation {
            changed,
            state: InspectorState::Keyed(current),
        })
    }
}

/// Parse Java `.properties` text.
///
/// Handles `#`/`!` comments, `=`, `:` or whitespace separators, backslash
/// line continuations and the usual escapes including `\uXXXX`. Later
/// duplicates win.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut lines = text.lines();

    while let Some(first) = lines.next() {
        let line = first.trim_start_matches(WHITESPACE);
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut logical = line.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start_matches(WHITESPACE)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        map.insert(unescape(key), unescape(value));
    }
    map
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches(WHITESPACE);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches(WHITESPACE);
    }
    (key, rest)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FsTriggerError;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn parses_separators_comments_and_continuations() {
        let text = "# comment\n! other\nname=fstrigger\nversion : 1.0\nspaced value\nlong = one \\\n    two\nescaped\\ key=a\\tb\nunicode=\\u00e9\n";
        let map = parse_properties(text);
        assert_eq!(map["name"], "fstrigger");
        assert_eq!(map["version"], "1.0");
        assert_eq!(map["spaced"], "value");
        assert_eq!(map["long"], "one two");
        assert_eq!(map["escaped key"], "a\tb");
        assert_eq!(map["unicode"], "\u{e9}");
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn value_change_of_tracked_key_triggers() {
        let fs = MockFileSystem::new();
        fs.add_file("/app.properties", "a=1\nb=2\n");
        let path = Path::new("/app.properties");
        let inspector =
            PropertiesInspector::from_config(&InspectorConfig::new("properties").with_keys("a"));

        let state = inspector.init(&fs, path).unwrap();
        let mut log = PollLog::new();

        fs.add_file("/app.properties", "a=1\nb=3\n");
        let untracked = inspector.evaluate(&fs, path, &state, &mut log).unwrap();
        assert!(!untracked.changed);

        fs.add_file("/app.properties", "a=9\nb=3\n");
        let tracked = inspector
            .evaluate(&fs, path, &untracked.state, &mut log)
            .unwrap();
        assert!(tracked.changed);
    }

    #[test]
    fn no_keys_without_all_keys_never_triggers() {
        let fs = MockFileSystem::new();
        fs.add_file("/app.properties", "a=1\n");
        let path = Path::new("/app.properties");
        let inspector = PropertiesInspector::from_config(&InspectorConfig::new("properties"));

        let state = inspector.init(&fs, path).unwrap();
        assert_eq!(state, InspectorState::Keyed(BTreeMap::new()));

        fs.add_file("/app.properties", "a=2\nb=3\nc=4\n");
        let mut log = PollLog::new();
        let eval = inspector.evaluate(&fs, path, &state, &mut log).unwrap();
        assert!(!eval.changed);
    }

    #[test]
    fn file_without_properties_is_a_format_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/empty.properties", "# only comments\n\n");
        let inspector =
            PropertiesInspector::from_config(&InspectorConfig::new("properties").with_all_keys());
        let err = inspector
            .init(&fs, Path::new("/empty.properties"))
            .unwrap_err();
        assert!(matches!(err, FsTriggerError::Format(_)));
    }
}
