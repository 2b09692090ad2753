// src/inspect/xml.rs

use std::collections::BTreeMap;
use std::path::Path;

use sxd_document::parser;
use sxd_xpath::{evaluate_xpath, Value};

use crate::errors::{FsTriggerError, Result};
use crate::fs::FileSystem;
use crate::inspect::{
    state_mismatch, ContentInspector, Evaluation, InspectorConfig, InspectorState,
};
use crate::poll_log::PollLog;

/// Tracks the value of a list of XPath expressions.
///
/// A node-set result yields the string value of its first node in document
/// order, or `None` when the node-set is empty.
#[derive(Debug, Clone)]
pub struct XmlInspector {
    expressions: Vec<String>,
}

impl XmlInspector {
    /// Build from config; every expression is checked against a trivial
    /// document so syntax errors surface at load time.
    pub fn from_config(config: &InspectorConfig) -> Result<Self> {
        if config.expressions.is_empty() {
            return Err(FsTriggerError::ConfigError(
                "the xml inspector needs at least one expression".to_string(),
            ));
        }
        let scratch = parser::parse("<empty/>")
            .map_err(|e| FsTriggerError::Other(anyhow::anyhow!("{e:?}")))?;
        let document = scratch.as_document();
        for expression in &config.expressions {
            evaluate_xpath(&document, expression).map_err(|e| {
                FsTriggerError::ConfigError(format!(
                    "invalid XPath expression '{expression}': {e:?}"
                ))
            })?;
        }
        Ok(Self {
            expressions: config.expressions.clone(),
        })
    }

    fn extract(&self, fs: &dyn FileSystem, path: &Path) -> Result<BTreeMap<String, Option<String>>> {
        let text = fs.read_to_string(path)?;
        let package = parser::parse(&text).map_err(|e| {
            FsTriggerError::Format(format!(
                "The file '{}' is not a well-formed XML document: {e:?}",
                path.display()
            ))
        })?;
        let document = package.as_document();

        let mut results = BTreeMap::new();
        for expression in &self.expressions {
            let value = evaluate_xpath(&document, expression).map_err(|e| {
                FsTriggerError::Format(format!(
                    "Evaluating '{expression}' on '{}' failed: {e:?}",
                    path.display()
                ))
            })?;
            let extracted = match value {
                Value::Nodeset(nodes) => nodes.document_order_first().map(|n| n.string_value()),
                Value::String(s) => Some(s),
                Value::Number(n) => Some(format_number(n)),
                Value::Boolean(b) => Some(b.to_string()),
            };
            results.insert(expression.clone(), extracted);
        }
        Ok(results)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl ContentInspector for XmlInspector {
    fn label(&self) -> &str {
        "xml"
    }

    fn init_content(&self, fs: &dyn FileSystem, path: &Path) -> Result<InspectorState> {
        Ok(InspectorState::Xml(self.extract(fs, path)?))
    }

    fn evaluate_content(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        prior: &InspectorState,
        log: &mut PollLog,
    ) -> Result<Evaluation> {
        let InspectorState::Xml(previous) = prior else {
            return Err(state_mismatch(self.label(), prior));
        };
        let current = self.extract(fs, path)?;

        if previous.len() != current.len() {
            return Err(FsTriggerError::Format(
                "The number of XPath results differs between the previous and the current poll."
                    .to_string(),
            ));
        }
        if !current.keys().all(|k| previous.contains_key(k)) {
            return Err(FsTriggerError::Format(
                "The XPath expressions differ between the previous and the current poll."
                    .to_string(),
            ));
        }

        let mut changed = false;
        for (expression, old) in previous {
            let new = current.get(expression).cloned().flatten();
            match (old, new) {
                (None, None) => {
                    log.info(format!(
                        "There is no matching for the expression '{expression}'."
                    ));
                }
                (None, Some(_)) => {
                    log.info(format!(
                        "There was no value and there is a new value for the expression '{expression}'."
                    ));
                    changed = true;
                }
                (Some(_), None) => {
                    log.info(format!(
                        "There was a value and now there is no value for the expression '{expression}'."
                    ));
                    changed = true;
                }
                (Some(old), Some(new)) if *old != new => {
                    log.info(format!(
                        "The value for the expression '{expression}' has changed."
                    ));
                    changed = true;
                }
                (Some(_), Some(_)) => {}
            }
            if changed {
                break;
            }
        }

        Ok(Evaluation {
            changed,
            state: InspectorState::Xml(current),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn inspector(exprs: &[&str]) -> XmlInspector {
        let mut cfg = InspectorConfig::new("xml");
        for e in exprs {
            cfg = cfg.with_expression(*e);
        }
        XmlInspector::from_config(&cfg).unwrap()
    }

    #[test]
    fn value_change_and_disappearance() {
        let fs = MockFileSystem::new();
        let path = Path::new("/pom.xml");
        fs.add_file(path, "<project><version>1.0</version></project>");
        let xml = inspector(&["/project/version", "count(/project/*)"]);

        let state = xml.init(&fs, path).unwrap();
        let InspectorState::Xml(values) = &state else {
            panic!("unexpected state");
        };
        assert_eq!(values["/project/version"].as_deref(), Some("1.0"));
        assert_eq!(values["count(/project/*)"].as_deref(), Some("1"));

        let mut log = PollLog::new();
        fs.add_file(path, "<project><version>1.1</version></project>");
        let bumped = xml.evaluate(&fs, path, &state, &mut log).unwrap();
        assert!(bumped.changed);

        fs.add_file(path, "<project/>");
        let gone = xml.evaluate(&fs, path, &bumped.state, &mut log).unwrap();
        assert!(gone.changed);
        assert!(log.contains("now there is no value"));
    }

    #[test]
    fn unmatched_expression_stays_unchanged() {
        let fs = MockFileSystem::new();
        let path = Path::new("/a.xml");
        fs.add_file(path, "<a><b>x</b></a>");
        let xml = inspector(&["/a/missing"]);
        let state = xml.init(&fs, path).unwrap();

        let mut log = PollLog::new();
        let eval = xml.evaluate(&fs, path, &state, &mut log).unwrap();
        assert!(!eval.changed);
        assert!(log.contains("There is no matching"));
    }

    #[test]
    fn different_expression_sets_are_a_format_error() {
        let fs = MockFileSystem::new();
        let path = Path::new("/a.xml");
        fs.add_file(path, "<a/>");
        let prior = inspector(&["/a", "/b"]).init(&fs, path).unwrap();
        let mut log = PollLog::new();
        let err = inspector(&["/a"])
            .evaluate(&fs, path, &prior, &mut log)
            .unwrap_err();
        assert!(matches!(err, FsTriggerError::Format(_)));
    }

    #[test]
    fn malformed_document_is_a_format_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/bad.xml", "<a><b></a>");
        let err = inspector(&["/a"]).init(&fs, Path::new("/bad.xml")).unwrap_err();
        assert!(matches!(err, FsTriggerError::Format(_)));
    }
}
