//! Scenario executor: isolation, step sequencing, aggregation

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::assertions::Expectations;
use crate::config::HarnessConfig;
use crate::driver::{Driver, DriverFactory, ElementHandle};
use crate::error::{FailureKind, HarnessError, HarnessResult};
use crate::preflight;
use crate::scenario::{Scenario, Step, NEW_TODO_PLACEHOLDER};

/// Lifecycle of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Setup,
    Running(usize),
    Passed,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScenarioState::Passed | ScenarioState::Failed)
    }

    /// Step being executed, `None` outside `Running`.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            ScenarioState::Running(index) => Some(*index),
            _ => None,
        }
    }

    /// Terminal state reached from here.
    pub fn finish(self, failed: bool) -> Self {
        if failed {
            ScenarioState::Failed
        } else {
            ScenarioState::Passed
        }
    }

    pub fn status(&self) -> Option<ScenarioStatus> {
        match self {
            ScenarioState::Passed => Some(ScenarioStatus::Passed),
            ScenarioState::Failed => Some(ScenarioStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
}

/// Why a scenario failed and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    /// Index into `steps`; `None` when setup failed
    pub step_index: Option<usize>,
    pub step: String,
    pub kind: FailureKind,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl StepFailure {
    fn new(step_index: Option<usize>, step: String, err: &HarnessError) -> Self {
        let (expected, actual) = err.expected_actual();
        Self {
            step_index,
            step,
            kind: err.kind(),
            message: err.to_string(),
            expected,
            actual,
        }
    }

    fn setup(err: &HarnessError) -> Self {
        Self::new(None, "setup".to_string(), err)
    }

    /// Failure of `scenario` while it was in `state`.
    fn at(state: ScenarioState, scenario: &Scenario, err: &HarnessError) -> Self {
        match state.step_index().and_then(|i| scenario.steps.get(i).map(|s| (i, s))) {
            Some((index, step)) => Self::new(Some(index), step.to_string(), err),
            None => Self::setup(err),
        }
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub suite: Option<String>,
    pub status: ScenarioStatus,
    pub duration_ms: u64,
    /// Steps that completed successfully
    pub steps_run: usize,
    pub failure: Option<StepFailure>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

/// Which scenarios to run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub name: Option<String>,
    pub tag: Option<String>,
    pub grep: Option<Regex>,
}

impl Selection {
    pub fn apply(&self, scenarios: Vec<Scenario>) -> HarnessResult<Vec<Scenario>> {
        if let Some(name) = &self.name {
            let found = scenarios
                .into_iter()
                .find(|s| &s.name == name)
                .ok_or_else(|| HarnessError::ScenarioParse(format!("Scenario not found: {}", name)))?;
            return Ok(vec![found]);
        }

        let scenarios = match &self.tag {
            Some(tag) => Scenario::filter_by_tag(scenarios, tag),
            None => scenarios,
        };
        Ok(scenarios
            .into_iter()
            .filter(|s| self.grep.as_ref().map_or(true, |re| re.is_match(&s.name)))
            .collect())
    }
}

/// Runs scenarios, each against its own driver from the factory.
pub struct ScenarioRunner<F: DriverFactory> {
    factory: F,
    config: HarnessConfig,
}

impl<F: DriverFactory> ScenarioRunner<F> {
    pub fn new(factory: F, config: HarnessConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Make sure the subject answers before launching any browser
    pub async fn preflight(&self) -> HarnessResult<()> {
        if !self.config.subject.preflight {
            return Ok(());
        }
        preflight::wait_for_subject(&self.config.subject.base_url, self.config.settle.timeout()).await
    }

    /// Load scenarios from the configured directory and run the selected ones
    pub async fn run_selected(&self, selection: &Selection) -> HarnessResult<SuiteReport> {
        let scenarios = Scenario::load_all(&self.config.run.scenarios_dir)?;
        let scenarios = selection.apply(scenarios)?;
        Ok(self.run_scenarios(&scenarios).await)
    }

    /// Run a list of scenarios; failures are recorded, never propagated
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> SuiteReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let workers = self.config.run.workers.max(1);

        info!("Running {} scenario(s) with {} worker(s)...", scenarios.len(), workers);

        let reports: Vec<ScenarioReport> = stream::iter(scenarios)
            .map(|scenario| self.run_scenario(scenario))
            .buffered(workers)
            .collect()
            .await;

        let passed = reports.iter().filter(|r| r.passed()).count();
        let failed = reports.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteReport {
            total: reports.len(),
            passed,
            failed,
            duration_ms,
            started_at,
            scenarios: reports,
        }
    }

    /// Run one scenario in a fresh driver
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut state = ScenarioState::Setup;
        let mut steps_run = 0;

        let failure = match self.factory.launch().await {
            Ok(driver) => {
                let outcome = self.execute(&driver, scenario, &mut state, &mut steps_run).await;
                if let Err(e) = driver.close().await {
                    warn!("Closing driver for '{}' failed: {}", scenario.name, e);
                }
                outcome.err().map(|e| StepFailure::at(state, scenario, &e))
            }
            Err(e) => Some(StepFailure::at(state, scenario, &e)),
        };
        let state = state.finish(failure.is_some());

        let duration_ms = start.elapsed().as_millis() as u64;
        match &failure {
            None => info!("✓ {} ({} ms)", scenario.name, duration_ms),
            Some(f) => error!(
                "✗ {} - step {} [{}]: {}",
                scenario.name,
                f.step_index.map(|i| i.to_string()).unwrap_or_else(|| "setup".into()),
                f.step,
                f.message
            ),
        }

        ScenarioReport {
            name: scenario.name.clone(),
            suite: scenario.suite.clone(),
            status: state.status().unwrap_or(ScenarioStatus::Failed),
            duration_ms,
            steps_run,
            failure,
        }
    }

    async fn execute(
        &self,
        driver: &F::Driver,
        scenario: &Scenario,
        state: &mut ScenarioState,
        steps_run: &mut usize,
    ) -> HarnessResult<()> {
        let expect = Expectations::new(driver, &self.config.subject.storage_key, self.config.settle);

        let url = self.config.resolve_url(scenario.url.as_deref());
        driver.navigate(&url).await?;
        driver.settle().await?;
        if scenario.expect_empty_baseline {
            expect.stored_count(0).await?;
        }

        for (index, step) in scenario.steps.iter().enumerate() {
            *state = ScenarioState::Running(index);
            debug!("[{}] step {}: {}", scenario.name, index, step);

            self.execute_step(driver, &expect, step).await?;
            if step.is_drive() {
                Self::settle_after(driver, &expect).await?;
            }
            *steps_run += 1;
        }
        Ok(())
    }

    /// A drive action is done once the page has caught up and any debounced
    /// storage write has landed.
    async fn settle_after(
        driver: &F::Driver,
        expect: &Expectations<'_, F::Driver>,
    ) -> HarnessResult<()> {
        driver.settle().await?;
        expect.storage_quiet().await
    }

    async fn execute_step(
        &self,
        driver: &F::Driver,
        expect: &Expectations<'_, F::Driver>,
        step: &Step,
    ) -> HarnessResult<()> {
        match step {
            Step::Navigate { url } => driver.navigate(&self.config.resolve_url(Some(url))).await,
            Step::Fill { target, value } => driver.fill(target, value).await,
            Step::Clear { target } => driver.clear(target).await,
            Step::Type { target, text } => driver.type_text(target, text).await,
            Step::Press { target, key } => driver.press_key(target, key).await,
            Step::SelectAll { target } => {
                driver
                    .press_key(target, &self.config.run.platform.select_all())
                    .await
            }
            Step::Click { target } => driver.click(target).await,
            Step::Dblclick { target } => driver.dblclick(target).await,
            Step::Hover { target } => driver.hover(target).await,
            Step::Check { target } => driver.set_checked(target, true).await,
            Step::Uncheck { target } => driver.set_checked(target, false).await,
            Step::Reload => driver.reload().await,
            Step::AddTodo { title } => {
                let input = ElementHandle::placeholder(NEW_TODO_PLACEHOLDER);
                driver.fill(&input, title).await?;
                driver.press_key(&input, "Enter").await
            }
            Step::ShowFilter { filter } => {
                driver
                    .click(&ElementHandle::role("link", filter.link_name()).exact())
                    .await
            }
            Step::ExpectTexts { target, texts } => expect.texts(target, texts).await,
            Step::ExpectNotTexts { target, texts } => expect.not_texts(target, texts).await,
            Step::ExpectCount { target, count } => expect.count(target, *count).await,
            Step::ExpectChecked { target, checked } => expect.checked(target, *checked).await,
            Step::ExpectVisible { target, visible } => expect.visible(target, *visible).await,
            Step::ExpectStoredCount { count } => expect.stored_count(*count).await,
            Step::ExpectCompletedCount { count } => expect.completed_count(*count).await,
            Step::ExpectStoredTitle { title } => expect.stored_title(title).await,
            Step::ExpectStoredTitles { titles } => expect.stored_titles(titles).await,
            Step::ExpectProjection { filter } => expect.projection(*filter).await,
            Step::ExpectReloadStable => expect.reload_preserves_state().await,
            Step::Log { message } => {
                info!("[SCENARIO LOG] {}", message);
                Ok(())
            }
        }
    }

    /// Write the report as pretty JSON into the output directory
    pub fn write_report(&self, report: &SuiteReport) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.config.run.output_dir)?;

        let path = self.config.run.output_dir.join("scenario-report.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("Report written to: {}", path.display());
        Ok(path)
    }
}
