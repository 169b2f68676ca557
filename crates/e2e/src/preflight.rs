//! Reachability check of the subject before any browser is launched

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Poll `url` until it answers with a success status or `budget` runs out.
pub async fn wait_for_subject(url: &str, budget: Duration) -> HarnessResult<()> {
    if url.starts_with("file://") {
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;
    let mut last_problem = String::from("no attempt made");

    while attempts == 0 || start.elapsed() < budget {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Subject reachable at {} ({} attempt(s))", url, attempts);
                return Ok(());
            }
            Ok(resp) => {
                warn!("Subject returned {}", resp.status());
                last_problem = format!("HTTP {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for subject at {}...", url);
                }
                last_problem = e.to_string();
            }
        }

        sleep(Duration::from_millis(250)).await;
    }

    Err(HarnessError::SubjectUnreachable(format!(
        "{} after {} attempt(s): {}",
        url, attempts, last_problem
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[tokio::test]
    async fn test_file_urls_skip_the_check() {
        wait_for_subject("file:///tmp/index.html", Duration::from_millis(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = wait_for_subject(&format!("http://127.0.0.1:{}/", port), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Driver);
        assert!(err.to_string().contains("attempt"));
    }
}
