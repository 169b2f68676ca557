//! Declarative YAML scenarios

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::driver::ElementHandle;
use crate::error::{HarnessError, HarnessResult};
use crate::storage::Filter;

/// Placeholder of the subject's "new todo" input.
pub const NEW_TODO_PLACEHOLDER: &str = "What needs to be done?";

/// A named, ordered script of drive actions and assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Group the scenario belongs to (set from the file's `suite`)
    #[serde(default)]
    pub suite: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Route or absolute URL to open instead of the configured base URL
    #[serde(default)]
    pub url: Option<String>,

    /// Assert the subject starts with no stored records
    #[serde(default)]
    pub expect_empty_baseline: bool,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// A single step: drive actions first, then assertions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a route (relative to the subject URL) or absolute URL
    Navigate { url: String },

    /// Replace an input's value
    Fill { target: ElementHandle, value: String },

    /// Empty an input
    Clear { target: ElementHandle },

    /// Type text key by key
    Type { target: ElementHandle, text: String },

    /// Press a key or chord
    Press { target: ElementHandle, key: String },

    /// Platform "select all" chord
    SelectAll { target: ElementHandle },

    Click { target: ElementHandle },

    Dblclick { target: ElementHandle },

    Hover { target: ElementHandle },

    Check { target: ElementHandle },

    Uncheck { target: ElementHandle },

    Reload,

    /// Fill the new-todo input and submit it
    AddTodo { title: String },

    /// Click a filter link in the footer
    ShowFilter { filter: Filter },

    ExpectTexts { target: ElementHandle, texts: Vec<String> },

    ExpectNotTexts { target: ElementHandle, texts: Vec<String> },

    ExpectCount { target: ElementHandle, count: usize },

    ExpectChecked { target: ElementHandle, checked: bool },

    ExpectVisible { target: ElementHandle, visible: bool },

    ExpectStoredCount { count: usize },

    ExpectCompletedCount { count: usize },

    ExpectStoredTitle { title: String },

    ExpectStoredTitles { titles: Vec<String> },

    /// Rendered list equals the stored records under `filter`
    ExpectProjection {
        #[serde(default)]
        filter: Filter,
    },

    /// Reload and require identical list and storage afterwards
    ExpectReloadStable,

    /// Log a message (for debugging)
    Log { message: String },
}

impl Step {
    /// Whether the step changes the subject (and must settle afterwards).
    pub fn is_drive(&self) -> bool {
        !matches!(
            self,
            Step::ExpectTexts { .. }
                | Step::ExpectNotTexts { .. }
                | Step::ExpectCount { .. }
                | Step::ExpectChecked { .. }
                | Step::ExpectVisible { .. }
                | Step::ExpectStoredCount { .. }
                | Step::ExpectCompletedCount { .. }
                | Step::ExpectStoredTitle { .. }
                | Step::ExpectStoredTitles { .. }
                | Step::ExpectProjection { .. }
                | Step::ExpectReloadStable
                | Step::Log { .. }
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url } => write!(f, "navigate:{}", url),
            Step::Fill { target, .. } => write!(f, "fill:{}", target),
            Step::Clear { target } => write!(f, "clear:{}", target),
            Step::Type { target, .. } => write!(f, "type:{}", target),
            Step::Press { target, key } => write!(f, "press:{}:{}", target, key),
            Step::SelectAll { target } => write!(f, "select_all:{}", target),
            Step::Click { target } => write!(f, "click:{}", target),
            Step::Dblclick { target } => write!(f, "dblclick:{}", target),
            Step::Hover { target } => write!(f, "hover:{}", target),
            Step::Check { target } => write!(f, "check:{}", target),
            Step::Uncheck { target } => write!(f, "uncheck:{}", target),
            Step::Reload => f.write_str("reload"),
            Step::AddTodo { title } => write!(f, "add_todo:{:?}", title),
            Step::ShowFilter { filter } => write!(f, "show_filter:{}", filter.link_name()),
            Step::ExpectTexts { target, .. } => write!(f, "expect_texts:{}", target),
            Step::ExpectNotTexts { target, .. } => write!(f, "expect_not_texts:{}", target),
            Step::ExpectCount { target, count } => write!(f, "expect_count:{}={}", target, count),
            Step::ExpectChecked { target, checked } => {
                write!(f, "expect_checked:{}={}", target, checked)
            }
            Step::ExpectVisible { target, visible } => {
                write!(f, "expect_visible:{}={}", target, visible)
            }
            Step::ExpectStoredCount { count } => write!(f, "expect_stored_count={}", count),
            Step::ExpectCompletedCount { count } => write!(f, "expect_completed_count={}", count),
            Step::ExpectStoredTitle { title } => write!(f, "expect_stored_title:{:?}", title),
            Step::ExpectStoredTitles { .. } => f.write_str("expect_stored_titles"),
            Step::ExpectProjection { filter } => {
                write!(f, "expect_projection:{}", filter.link_name())
            }
            Step::ExpectReloadStable => f.write_str("expect_reload_stable"),
            Step::Log { message } => {
                let end = message
                    .char_indices()
                    .nth(30)
                    .map(|(i, _)| i)
                    .unwrap_or(message.len());
                write!(f, "log:{}", &message[..end])
            }
        }
    }
}

/// A scenario file holds either one scenario or a named suite of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Suite {
        suite: String,
        #[serde(default)]
        tags: Vec<String>,
        scenarios: Vec<Scenario>,
    },
    Single(Scenario),
}

impl Scenario {
    /// Parse a single scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse every scenario in a YAML document (single or suite form)
    pub fn parse_file(yaml: &str) -> HarnessResult<Vec<Self>> {
        let scenarios = match serde_yaml::from_str::<ScenarioFile>(yaml)? {
            ScenarioFile::Single(s) => vec![s],
            ScenarioFile::Suite { suite, tags, scenarios } => scenarios
                .into_iter()
                .map(|mut s| {
                    s.suite = Some(suite.clone());
                    for tag in &tags {
                        if !s.tags.contains(tag) {
                            s.tags.push(tag.clone());
                        }
                    }
                    s
                })
                .collect(),
        };
        for s in &scenarios {
            s.validate()?;
        }
        Ok(scenarios)
    }

    /// Parse scenarios from a YAML file
    pub fn from_file(path: &Path) -> HarnessResult<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_file(&content)
            .map_err(|e| HarnessError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios below a directory, in path order
    pub fn load_all(dir: &Path) -> HarnessResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(HarnessError::ScenarioParse(format!(
                "scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut scenarios = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            for scenario in Self::from_file(&path)? {
                if !seen.insert(scenario.name.clone()) {
                    return Err(HarnessError::ScenarioParse(format!(
                        "duplicate scenario name '{}' in {}",
                        scenario.name,
                        path.display()
                    )));
                }
                scenarios.push(scenario);
            }
        }
        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag(scenarios: Vec<Self>, tag: &str) -> Vec<Self> {
        scenarios
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    fn validate(&self) -> HarnessResult<()> {
        if self.name.trim().is_empty() {
            return Err(HarnessError::ScenarioParse("scenario without a name".into()));
        }
        if self.steps.is_empty() {
            return Err(HarnessError::ScenarioParse(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_scenario() {
        let yaml = r#"
name: add-two
description: Add two records
tags: [create, smoke]
expect_empty_baseline: true
steps:
  - action: fill
    target: { placeholder: "What needs to be done?" }
    value: complete code challenge for reach
  - action: press
    target: { placeholder: "What needs to be done?" }
    key: Enter
  - action: expect_texts
    target: { test_id: todo-title }
    texts: [complete code challenge for reach]
  - action: expect_stored_count
    count: 1
  - action: reload
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "add-two");
        assert_eq!(scenario.steps.len(), 5);
        assert!(scenario.expect_empty_baseline);
        assert!(scenario.steps[0].is_drive());
        assert!(!scenario.steps[3].is_drive());
        assert!(matches!(scenario.steps[4], Step::Reload));
    }

    #[test]
    fn test_parse_suite_file() {
        let yaml = r#"
suite: Marking as completed
tags: [complete]
scenarios:
  - name: mark-one
    tags: [smoke]
    steps:
      - action: add_todo
        title: a
      - action: check
        target: { role: checkbox, name: Toggle Todo, nth: 0 }
      - action: show_filter
        filter: completed
      - action: expect_projection
        filter: completed
  - name: mark-none
    steps:
      - action: expect_completed_count
        count: 0
"#;
        let scenarios = Scenario::parse_file(yaml).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].suite.as_deref(), Some("Marking as completed"));
        assert_eq!(scenarios[0].tags, vec!["smoke".to_string(), "complete".to_string()]);
        assert_eq!(scenarios[0].steps[2].to_string(), "show_filter:Completed");
        assert_eq!(Scenario::filter_by_tag(scenarios.clone(), "smoke").len(), 1);
        assert_eq!(Scenario::filter_by_tag(scenarios, "complete").len(), 2);
    }

    #[test]
    fn test_reject_empty_scenario() {
        assert!(Scenario::from_yaml("name: nothing\nsteps: []\n").is_err());
    }

    #[test]
    fn test_reject_unknown_action() {
        let yaml = "name: x\nsteps:\n  - action: teleport\n";
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_log_step_name_is_truncated_on_char_boundary() {
        let step = Step::Log {
            message: "é".repeat(40),
        };
        assert_eq!(step.to_string(), format!("log:{}", "é".repeat(30)));
    }
}
