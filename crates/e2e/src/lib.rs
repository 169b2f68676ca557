//! TodoMVC behavioral test harness
//!
//! This crate drives a TodoMVC page through a browser and verifies it
//! against two independent sources of truth:
//! - the rendered DOM, read back through the [`Driver`] capability
//! - the persisted `localStorage` blob, read by the [`storage::Inspector`]
//!
//! Scenarios are declarative YAML scripts; each runs in its own browser
//! instance so scenarios never share state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ScenarioRunner<F: DriverFactory>           │
//! │    ├── preflight() -> subject reachable?                    │
//! │    ├── run_scenarios([Scenario]) -> SuiteReport             │
//! │    └── run_scenario(Scenario)    -> ScenarioReport          │
//! │          Setup -> Running(step_i) -> Passed | Failed        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Expectations (polling, SettlePolicy)                       │
//! │    ├── DOM:     texts, count, checked, visible              │
//! │    ├── storage: stored_count, completed_count, stored_title │
//! │    └── both:    projection(filter), reload_preserves_state  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Inspector<StateSource> ── LocalStorageSource ── Driver     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Driver: PlaywrightDriver (Node bridge) | FakeTodoApp       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod assertions;
pub mod config;
pub mod driver;
pub mod error;
pub mod fake;
pub mod keys;
pub mod playwright;
pub mod preflight;
pub mod runner;
pub mod scenario;
pub mod settle;
pub mod storage;

pub use config::HarnessConfig;
pub use driver::{Driver, DriverFactory, ElementHandle, SelectorKind};
pub use error::{FailureKind, HarnessError, HarnessResult};
pub use runner::{ScenarioReport, ScenarioRunner, ScenarioStatus, Selection, SuiteReport};
pub use scenario::{Scenario, Step};
pub use storage::{Filter, Inspector, Snapshot, TodoRecord};
