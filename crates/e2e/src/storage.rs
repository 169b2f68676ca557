//! Persisted-state inspection
//!
//! The subject persists its list as a JSON blob under a fixed key. Reading
//! that blob gives a second source of truth next to the rendered DOM.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::Driver;
use crate::error::{HarnessError, HarnessResult};

/// Storage key used by the React TodoMVC demo.
pub const DEFAULT_STORAGE_KEY: &str = "react-todos";

/// Identifier the subject assigns to a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TodoId {
    Text(String),
    Number(u64),
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoId::Text(s) => f.write_str(s),
            TodoId::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub id: TodoId,
    pub title: String,
    pub completed: bool,
}

/// Visibility filter of the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn admits(&self, record: &TodoRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !record.completed,
            Filter::Completed => record.completed,
        }
    }

    /// Link label in the subject's footer.
    pub fn link_name(&self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }

    /// URL fragment the subject routes on.
    pub fn route(&self) -> &'static str {
        match self {
            Filter::All => "#/",
            Filter::Active => "#/active",
            Filter::Completed => "#/completed",
        }
    }

    pub fn from_route(url: &str) -> Self {
        match url.rsplit_once('#').map(|(_, frag)| frag.trim_start_matches('/')) {
            Some("active") => Filter::Active,
            Some("completed") => Filter::Completed,
            _ => Filter::All,
        }
    }
}

impl FromStr for Filter {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(HarnessError::ScenarioParse(format!("unknown filter: {}", other))),
        }
    }
}

/// Everything the subject has persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub todos: Vec<TodoRecord>,
    /// Only present when the backend persists it
    pub filter: Option<Filter>,
}

/// Accepted on-disk layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLayout {
    List(Vec<TodoRecord>),
    Envelope {
        todos: Vec<TodoRecord>,
        #[serde(default)]
        filter: Option<Filter>,
    },
}

impl Snapshot {
    pub fn parse(key: &str, raw: &str) -> HarnessResult<Self> {
        let layout: StoredLayout =
            serde_json::from_str(raw).map_err(|e| HarnessError::MalformedState {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(match layout {
            StoredLayout::List(todos) => Snapshot { todos, filter: None },
            StoredLayout::Envelope { todos, filter } => Snapshot { todos, filter },
        })
    }

    pub fn count(&self) -> usize {
        self.todos.len()
    }

    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|t| t.completed).count()
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.todos.iter().any(|t| t.title.trim() == title)
    }

    pub fn titles(&self) -> Vec<String> {
        self.todos.iter().map(|t| t.title.clone()).collect()
    }

    /// Records the list shows under `filter`, in stored order.
    pub fn project(&self, filter: Filter) -> Vec<&TodoRecord> {
        self.todos.iter().filter(|t| filter.admits(t)).collect()
    }

    pub fn project_titles(&self, filter: Filter) -> Vec<String> {
        self.project(filter).into_iter().map(|t| t.title.clone()).collect()
    }
}

/// Result of one look at storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Nothing written yet
    Absent,
    Present(Snapshot),
}

impl Observation {
    pub fn snapshot(self) -> Snapshot {
        match self {
            Observation::Absent => Snapshot::default(),
            Observation::Present(s) => s,
        }
    }
}

/// Where the persisted blob comes from.
#[async_trait::async_trait]
pub trait StateSource: Send + Sync {
    /// Name of the entry, for diagnostics.
    fn key(&self) -> &str;

    async fn read_raw(&self) -> HarnessResult<Option<String>>;
}

/// Reads a browser `localStorage` entry through the driver.
pub struct LocalStorageSource<'a, D: Driver + ?Sized> {
    driver: &'a D,
    key: String,
}

impl<'a, D: Driver + ?Sized> LocalStorageSource<'a, D> {
    pub fn new(driver: &'a D, key: impl Into<String>) -> Self {
        Self {
            driver,
            key: key.into(),
        }
    }
}

#[async_trait::async_trait]
impl<'a, D: Driver + ?Sized> StateSource for LocalStorageSource<'a, D> {
    fn key(&self) -> &str {
        &self.key
    }

    async fn read_raw(&self) -> HarnessResult<Option<String>> {
        self.driver.storage_item(&self.key).await
    }
}

/// Queries over the subject's persisted state.
///
/// Every query is a fresh read; nothing is cached and nothing is written.
pub struct Inspector<S: StateSource> {
    source: S,
}

impl<S: StateSource> Inspector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn key(&self) -> &str {
        self.source.key()
    }

    /// The stored blob as-is, without parsing.
    pub async fn raw(&self) -> HarnessResult<Option<String>> {
        self.source.read_raw().await
    }

    /// One read; distinguishes "never written" from an empty list.
    pub async fn observe(&self) -> HarnessResult<Observation> {
        match self.source.read_raw().await? {
            None => Ok(Observation::Absent),
            Some(raw) => {
                let snapshot = Snapshot::parse(self.source.key(), &raw)?;
                debug!(
                    "storage '{}': {} record(s), {} completed",
                    self.source.key(),
                    snapshot.count(),
                    snapshot.completed_count()
                );
                Ok(Observation::Present(snapshot))
            }
        }
    }

    /// Current snapshot; an unwritten key reads as the empty list.
    pub async fn snapshot(&self) -> HarnessResult<Snapshot> {
        Ok(self.observe().await?.snapshot())
    }

    pub async fn count(&self) -> HarnessResult<usize> {
        Ok(self.snapshot().await?.count())
    }

    pub async fn completed_count(&self) -> HarnessResult<usize> {
        Ok(self.snapshot().await?.completed_count())
    }

    pub async fn contains_record(&self, title: &str) -> HarnessResult<bool> {
        Ok(self.snapshot().await?.contains_title(title))
    }
}
