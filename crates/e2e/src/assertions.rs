//! Reusable checks against the DOM and the persisted state
//!
//! Every check polls under the configured [`SettlePolicy`] the way
//! Playwright's `expect` does, so a scenario never asserts on a half-applied
//! action. None of the checks mutate the subject.

use tracing::debug;

use crate::driver::{Driver, ElementHandle};
use crate::error::HarnessResult;
use crate::settle::{poll_until, wait_for_quiet, Probe, SettlePolicy};
use crate::storage::{Filter, Inspector, LocalStorageSource, Observation, Snapshot};

/// Test id of the per-record title element in the subject.
pub const TODO_TITLE_TEST_ID: &str = "todo-title";

pub struct Expectations<'a, D: Driver + ?Sized> {
    driver: &'a D,
    inspector: Inspector<LocalStorageSource<'a, D>>,
    policy: SettlePolicy,
    list_items: ElementHandle,
}

impl<'a, D: Driver + ?Sized> Expectations<'a, D> {
    pub fn new(driver: &'a D, storage_key: &str, policy: SettlePolicy) -> Self {
        Self {
            driver,
            inspector: Inspector::new(LocalStorageSource::new(driver, storage_key)),
            policy,
            list_items: ElementHandle::test_id(TODO_TITLE_TEST_ID),
        }
    }

    pub fn inspector(&self) -> &Inspector<LocalStorageSource<'a, D>> {
        &self.inspector
    }

    pub fn policy(&self) -> &SettlePolicy {
        &self.policy
    }

    /// Wait until the persisted blob stops changing, so a debounced write
    /// has landed before the next action.
    pub async fn storage_quiet(&self) -> HarnessResult<()> {
        let subject = format!("storage '{}' to stop changing", self.inspector.key());
        wait_for_quiet(&self.policy, &subject, || self.inspector.raw()).await?;
        Ok(())
    }

    /// Number of stored records. An unwritten key counts as zero.
    pub async fn stored_count(&self, expected: usize) -> HarnessResult<()> {
        poll_until(&self.policy, "stored todo count", &expected.to_string(), || async move {
            Ok(match self.inspector.observe().await? {
                Observation::Absent if expected == 0 => Probe::Matched,
                Observation::Absent => Probe::Absent,
                Observation::Present(s) => Probe::compare(&expected, &s.count()),
            })
        })
        .await
    }

    /// Number of stored records with `completed == true`.
    pub async fn completed_count(&self, expected: usize) -> HarnessResult<()> {
        poll_until(&self.policy, "stored completed count", &expected.to_string(), || async move {
            Ok(match self.inspector.observe().await? {
                Observation::Absent if expected == 0 => Probe::Matched,
                Observation::Absent => Probe::Absent,
                Observation::Present(s) => Probe::compare(&expected, &s.completed_count()),
            })
        })
        .await
    }

    /// Some stored record's trimmed title equals `title`.
    pub async fn stored_title(&self, title: &str) -> HarnessResult<()> {
        let subject = format!("stored record titled {:?}", title);
        poll_until(&self.policy, &subject, "present", || async move {
            Ok(match self.inspector.observe().await? {
                Observation::Absent => Probe::Absent,
                Observation::Present(s) if s.contains_title(title) => Probe::Matched,
                Observation::Present(s) => Probe::Mismatch(format!("{:?}", s.titles())),
            })
        })
        .await
    }

    /// Stored titles, in order.
    pub async fn stored_titles(&self, expected: &[String]) -> HarnessResult<()> {
        let expected = expected.to_vec();
        let expected_ref = &expected;
        poll_until(&self.policy, "stored titles", &format!("{:?}", expected), || async move {
            Ok(match self.inspector.observe().await? {
                Observation::Absent if expected_ref.is_empty() => Probe::Matched,
                Observation::Absent => Probe::Absent,
                Observation::Present(s) => Probe::compare(expected_ref, &s.titles()),
            })
        })
        .await
    }

    /// Texts of all matched elements equal `expected`, in order.
    pub async fn texts(&self, target: &ElementHandle, expected: &[String]) -> HarnessResult<()> {
        let subject = format!("text of {}", target);
        poll_until(&self.policy, &subject, &format!("{:?}", expected), || async move {
            let actual = self.driver.read_text(target).await?;
            if actual.is_empty() && !expected.is_empty() {
                return Ok(Probe::Absent);
            }
            Ok(Probe::compare(&expected.to_vec(), &actual))
        })
        .await
    }

    /// Texts of all matched elements differ from `unexpected`.
    pub async fn not_texts(&self, target: &ElementHandle, unexpected: &[String]) -> HarnessResult<()> {
        let subject = format!("text of {}", target);
        let expected = format!("anything but {:?}", unexpected);
        poll_until(&self.policy, &subject, &expected, || async move {
            let actual = self.driver.read_text(target).await?;
            if actual.as_slice() == unexpected {
                Ok(Probe::Mismatch(format!("{:?}", actual)))
            } else {
                Ok(Probe::Matched)
            }
        })
        .await
    }

    pub async fn count(&self, target: &ElementHandle, expected: usize) -> HarnessResult<()> {
        let subject = format!("count of {}", target);
        poll_until(&self.policy, &subject, &expected.to_string(), || async move {
            let actual = self.driver.read_count(target).await?;
            Ok(Probe::compare(&expected, &actual))
        })
        .await
    }

    pub async fn checked(&self, target: &ElementHandle, expected: bool) -> HarnessResult<()> {
        let subject = format!("checked state of {}", target);
        poll_until(&self.policy, &subject, &expected.to_string(), || async move {
            if self.driver.read_count(target).await? == 0 {
                return Ok(Probe::Absent);
            }
            let actual = self.driver.is_checked(target).await?;
            Ok(Probe::compare(&expected, &actual))
        })
        .await
    }

    pub async fn visible(&self, target: &ElementHandle, expected: bool) -> HarnessResult<()> {
        let subject = format!("visibility of {}", target);
        poll_until(&self.policy, &subject, &expected.to_string(), || async move {
            let actual = self.driver.is_visible(target).await?;
            Ok(Probe::compare(&expected, &actual))
        })
        .await
    }

    /// The rendered list equals the stored records projected through `filter`.
    pub async fn projection(&self, filter: Filter) -> HarnessResult<()> {
        let subject = format!("visible list under '{}' filter vs storage", filter.link_name());
        poll_until(&self.policy, &subject, "identical", || async move {
            let stored = self.inspector.snapshot().await?.project_titles(filter);
            let visible = self.driver.read_text(&self.list_items).await?;
            if stored == visible {
                Ok(Probe::Matched)
            } else {
                Ok(Probe::Mismatch(format!("visible {:?}, stored {:?}", visible, stored)))
            }
        })
        .await
    }

    /// Reload the page and require the list and storage to come back unchanged.
    pub async fn reload_preserves_state(&self) -> HarnessResult<()> {
        self.storage_quiet().await?;
        let before_visible = self.driver.read_text(&self.list_items).await?;
        let before_stored: Snapshot = self.inspector.snapshot().await?;
        debug!(
            "reload round-trip: {} visible, {} stored",
            before_visible.len(),
            before_stored.count()
        );

        self.driver.reload().await?;
        self.driver.settle().await?;

        let expected = format!("{:?}", before_visible);
        let before_visible = &before_visible;
        let before_stored = &before_stored;
        poll_until(&self.policy, "state after reload", &expected, || async move {
            let visible = self.driver.read_text(&self.list_items).await?;
            let stored = self.inspector.snapshot().await?;
            if &visible == before_visible && &stored == before_stored {
                Ok(Probe::Matched)
            } else if visible.is_empty() && !before_visible.is_empty() {
                Ok(Probe::Absent)
            } else {
                Ok(Probe::Mismatch(format!(
                    "visible {:?}, stored {:?}",
                    visible,
                    stored.titles()
                )))
            }
        })
        .await
    }
}
