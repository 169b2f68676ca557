//! Browser automation capability
//!
//! The harness never talks to a browser directly. Scenario execution and the
//! assertion helpers only see the [`Driver`] trait, so the same scenarios run
//! against Playwright or against the in-memory [`crate::fake`] subject.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// How an element is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Role,
    Placeholder,
    TestId,
    Text,
    Label,
    Css,
}

/// A concrete lookup, mirroring Playwright's `getBy*` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Role { role: String, name: Option<String> },
    Placeholder(String),
    TestId(String),
    Text(String),
    Label(String),
    Css(String),
}

impl Selector {
    pub fn new(kind: SelectorKind, value: &str) -> Self {
        let value = value.to_string();
        match kind {
            SelectorKind::Role => Selector::Role {
                role: value,
                name: None,
            },
            SelectorKind::Placeholder => Selector::Placeholder(value),
            SelectorKind::TestId => Selector::TestId(value),
            SelectorKind::Text => Selector::Text(value),
            SelectorKind::Label => Selector::Label(value),
            SelectorKind::Css => Selector::Css(value),
        }
    }
}

/// Lazy reference to zero or more elements on the page.
///
/// Creating a handle performs no I/O; elements are resolved when an action
/// or a read uses the handle, so the same handle can be reused across DOM
/// updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TargetSpec", into = "TargetSpec")]
pub struct ElementHandle {
    pub selector: Selector,
    /// Require an exact (case-sensitive, whole string) text/name match
    pub exact: bool,
    /// Pick the n-th match (0-based); `None` means all matches
    pub nth: Option<usize>,
}

impl ElementHandle {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            exact: false,
            nth: None,
        }
    }

    pub fn role(role: &str, name: &str) -> Self {
        Self::new(Selector::Role {
            role: role.to_string(),
            name: Some(name.to_string()),
        })
    }

    pub fn placeholder(value: &str) -> Self {
        Self::new(Selector::new(SelectorKind::Placeholder, value))
    }

    pub fn test_id(value: &str) -> Self {
        Self::new(Selector::new(SelectorKind::TestId, value))
    }

    pub fn text(value: &str) -> Self {
        Self::new(Selector::new(SelectorKind::Text, value))
    }

    pub fn label(value: &str) -> Self {
        Self::new(Selector::new(SelectorKind::Label, value))
    }

    pub fn css(value: &str) -> Self {
        Self::new(Selector::new(SelectorKind::Css, value))
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::Role { role, name: Some(name) } => write!(f, "role={}[name={:?}]", role, name)?,
            Selector::Role { role, name: None } => write!(f, "role={}", role)?,
            Selector::Placeholder(v) => write!(f, "placeholder={:?}", v)?,
            Selector::TestId(v) => write!(f, "test_id={}", v)?,
            Selector::Text(v) => write!(f, "text={:?}", v)?,
            Selector::Label(v) => write!(f, "label={:?}", v)?,
            Selector::Css(v) => write!(f, "css={}", v)?,
        }
        if let Some(n) = self.nth {
            write!(f, ".nth({})", n)?;
        }
        Ok(())
    }
}

/// Flat wire/YAML form of an [`ElementHandle`]: exactly one lookup field.
///
/// ```yaml
/// target: { role: link, name: Active }
/// target: { test_id: todo-title, nth: 0 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default)]
    pub exact: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

impl TryFrom<TargetSpec> for ElementHandle {
    type Error = HarnessError;

    fn try_from(spec: TargetSpec) -> Result<Self, Self::Error> {
        let mut found = Vec::new();
        if let Some(role) = spec.role {
            found.push(Selector::Role {
                role,
                name: spec.name.clone(),
            });
        } else if spec.name.is_some() {
            return Err(HarnessError::InvalidTarget("'name' requires 'role'".into()));
        }
        let plain = [
            (SelectorKind::Placeholder, spec.placeholder),
            (SelectorKind::TestId, spec.test_id),
            (SelectorKind::Text, spec.text),
            (SelectorKind::Label, spec.label),
            (SelectorKind::Css, spec.css),
        ];
        for (kind, value) in plain {
            if let Some(v) = value {
                found.push(Selector::new(kind, &v));
            }
        }

        if found.len() != 1 {
            return Err(HarnessError::InvalidTarget(format!(
                "expected exactly one of role/placeholder/test_id/text/label/css, found {}",
                found.len()
            )));
        }

        Ok(ElementHandle {
            selector: found.remove(0),
            exact: spec.exact,
            nth: spec.nth,
        })
    }
}

impl From<ElementHandle> for TargetSpec {
    fn from(handle: ElementHandle) -> Self {
        let mut spec = TargetSpec {
            exact: handle.exact,
            nth: handle.nth,
            ..Default::default()
        };
        match handle.selector {
            Selector::Role { role, name } => {
                spec.role = Some(role);
                spec.name = name;
            }
            Selector::Placeholder(v) => spec.placeholder = Some(v),
            Selector::TestId(v) => spec.test_id = Some(v),
            Selector::Text(v) => spec.text = Some(v),
            Selector::Label(v) => spec.label = Some(v),
            Selector::Css(v) => spec.css = Some(v),
        }
        spec
    }
}

/// Playwright text matching: whitespace-normalized; case-insensitive
/// substring unless `exact`.
pub fn text_matches(pattern: &str, candidate: &str, exact: bool) -> bool {
    let pattern = normalize_whitespace(pattern);
    let candidate = normalize_whitespace(candidate);
    if exact {
        pattern == candidate
    } else {
        candidate.to_lowercase().contains(&pattern.to_lowercase())
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capability the harness consumes to drive and observe a page.
///
/// Actions resolve only once the backend reports them done. Reads reflect
/// the page at the time of the call; callers that need to wait for a value
/// go through [`crate::settle::poll_until`].
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Load `url` in the driver's page.
    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Build a lazy handle. No I/O happens here.
    fn locate(&self, kind: SelectorKind, value: &str) -> ElementHandle {
        ElementHandle::new(Selector::new(kind, value))
    }

    /// Type text key by key into the element (or the focused edit field).
    async fn type_text(&self, target: &ElementHandle, text: &str) -> HarnessResult<()>;

    /// Replace the element's value in one go.
    async fn fill(&self, target: &ElementHandle, value: &str) -> HarnessResult<()>;

    async fn clear(&self, target: &ElementHandle) -> HarnessResult<()>;

    /// Press a key or chord (`Enter`, `Escape`, `Meta+A`).
    async fn press_key(&self, target: &ElementHandle, key: &str) -> HarnessResult<()>;

    async fn click(&self, target: &ElementHandle) -> HarnessResult<()>;

    async fn dblclick(&self, target: &ElementHandle) -> HarnessResult<()>;

    async fn hover(&self, target: &ElementHandle) -> HarnessResult<()>;

    /// Check or uncheck a checkbox (or the control a label points at).
    async fn set_checked(&self, target: &ElementHandle, checked: bool) -> HarnessResult<()>;

    async fn reload(&self) -> HarnessResult<()>;

    /// Text content of every matched element, in document order.
    async fn read_text(&self, target: &ElementHandle) -> HarnessResult<Vec<String>>;

    async fn read_count(&self, target: &ElementHandle) -> HarnessResult<usize>;

    async fn is_checked(&self, target: &ElementHandle) -> HarnessResult<bool>;

    /// False when nothing matches or the match is hidden.
    async fn is_visible(&self, target: &ElementHandle) -> HarnessResult<bool>;

    /// Raw value of a client-side storage entry.
    async fn storage_item(&self, key: &str) -> HarnessResult<Option<String>>;

    /// Wait for pending UI work (animation frame, queued handlers) to drain.
    async fn settle(&self) -> HarnessResult<()> {
        Ok(())
    }

    /// Release the browser resources behind this driver.
    async fn close(&self) -> HarnessResult<()> {
        Ok(())
    }
}

/// Produces one isolated driver (own browser context and storage) per scenario.
#[async_trait::async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: Driver;

    async fn launch(&self) -> HarnessResult<Self::Driver>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[derive(Deserialize)]
    struct Wrapper {
        target: ElementHandle,
    }

    #[test]
    fn test_parse_role_target() {
        let w: Wrapper = serde_yaml::from_str("target: { role: link, name: Active }").unwrap();
        assert_eq!(w.target, ElementHandle::role("link", "Active"));
    }

    #[test]
    fn test_parse_nth_target() {
        let w: Wrapper = serde_yaml::from_str("target: { test_id: todo-title, nth: 1 }").unwrap();
        assert_eq!(w.target, ElementHandle::test_id("todo-title").nth(1));
        assert_eq!(w.target.to_string(), "test_id=todo-title.nth(1)");
    }

    #[test]
    fn test_reject_ambiguous_target() {
        let err = serde_yaml::from_str::<Wrapper>("target: { test_id: a, css: b }");
        assert!(err.is_err());
        let err = serde_yaml::from_str::<Wrapper>("target: { name: Active }");
        assert!(err.is_err());
    }

    #[test]
    fn test_wire_form_round_trips_through_json() {
        let handle = ElementHandle::label("Delete").exact();
        let json = serde_json::to_value(&handle).unwrap();
        assert_eq!(json, serde_json::json!({ "label": "Delete", "exact": true }));
    }

    #[test_case(SelectorKind::Role, "role=checkbox" ; "role")]
    #[test_case(SelectorKind::Placeholder, "placeholder=\"checkbox\"" ; "placeholder")]
    #[test_case(SelectorKind::TestId, "test_id=checkbox" ; "test id")]
    #[test_case(SelectorKind::Text, "text=\"checkbox\"" ; "text")]
    #[test_case(SelectorKind::Label, "label=\"checkbox\"" ; "label")]
    #[test_case(SelectorKind::Css, "css=checkbox" ; "css")]
    fn test_selector_kinds(kind: SelectorKind, shown: &str) {
        let handle = ElementHandle::new(Selector::new(kind, "checkbox"));
        assert_eq!(handle.to_string(), shown);
        assert!(!handle.exact);
        assert_eq!(handle.nth, None);
    }

    #[test]
    fn test_yaml_kind_matches_selector_kind() {
        let kind: SelectorKind = serde_yaml::from_str("test_id").unwrap();
        let w: Wrapper = serde_yaml::from_str("target: { test_id: todo-count }").unwrap();
        assert_eq!(w.target.selector, Selector::new(kind, "todo-count"));
    }

    #[test]
    fn test_text_matching() {
        assert!(text_matches("mark all", "Mark all as complete", false));
        assert!(!text_matches("mark all", "Mark all as complete", true));
        assert!(text_matches("All", "  All ", true));
        assert!(text_matches("a  b", "A B c", false));
    }
}
