//! Playwright browser automation
//!
//! Each [`PlaywrightDriver`] owns one Node.js bridge process, which owns one
//! browser, one context and one page. Requests are JSON lines on the
//! bridge's stdin, answered by JSON lines on its stdout:
//!
//! ```text
//! -> {"id":3,"op":"fill","target":{"placeholder":"What needs to be done?"},"value":"x"}
//! <- {"id":3,"ok":true,"value":null}
//! <- {"id":4,"ok":false,"kind":"timeout","error":"locator.click: Timeout 5000ms exceeded"}
//! ```

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::driver::{Driver, DriverFactory, ElementHandle};
use crate::error::{HarnessError, HarnessResult};

/// Time allowed for the browser to launch and report ready.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Slack on top of the in-browser action timeout before the bridge itself
/// is considered hung.
const BRIDGE_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(HarnessError::Config(format!("unknown browser: {}", other))),
        }
    }
}

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const cfg = JSON.parse(process.argv[2]);
const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

function locate(page, t) {
  if (!t) throw new Error('missing target');
  const exact = !!t.exact;
  let loc;
  if (t.role !== undefined) {
    loc = t.name !== undefined
      ? page.getByRole(t.role, { name: t.name, exact })
      : page.getByRole(t.role);
  } else if (t.placeholder !== undefined) {
    loc = page.getByPlaceholder(t.placeholder, { exact });
  } else if (t.test_id !== undefined) {
    loc = page.getByTestId(t.test_id);
  } else if (t.text !== undefined) {
    loc = page.getByText(t.text, { exact });
  } else if (t.label !== undefined) {
    loc = page.getByLabel(t.label, { exact });
  } else if (t.css !== undefined) {
    loc = page.locator(t.css);
  } else {
    throw new Error('empty target');
  }
  if (t.nth !== undefined && t.nth !== null) loc = loc.nth(t.nth);
  return loc;
}

(async () => {
  const browser = await playwright[cfg.browser].launch({ headless: cfg.headless });
  const context = await browser.newContext({
    viewport: { width: cfg.viewportWidth, height: cfg.viewportHeight },
  });
  context.setDefaultTimeout(cfg.actionTimeoutMs);
  const page = await context.newPage();

  const ops = {
    goto: async (r) => { await page.goto(r.url); return null; },
    type: async (r) => { await locate(page, r.target).pressSequentially(r.text); return null; },
    fill: async (r) => { await locate(page, r.target).fill(r.value); return null; },
    clear: async (r) => { await locate(page, r.target).clear(); return null; },
    press: async (r) => { await locate(page, r.target).press(r.key); return null; },
    click: async (r) => { await locate(page, r.target).click(); return null; },
    dblclick: async (r) => { await locate(page, r.target).dblclick(); return null; },
    hover: async (r) => { await locate(page, r.target).hover(); return null; },
    set_checked: async (r) => { await locate(page, r.target).setChecked(r.checked); return null; },
    reload: async () => { await page.reload(); return null; },
    read_text: async (r) => locate(page, r.target).allTextContents(),
    read_count: async (r) => locate(page, r.target).count(),
    is_checked: async (r) => locate(page, r.target).isChecked(),
    is_visible: async (r) => {
      const loc = locate(page, r.target);
      if ((await loc.count()) === 0) return false;
      return loc.first().isVisible();
    },
    storage_item: async (r) => page.evaluate((k) => window.localStorage.getItem(k), r.key),
    settle: async () => {
      await page.evaluate(() => new Promise((res) => requestAnimationFrame(() => setTimeout(res, 0))));
      return null;
    },
  };

  const rl = readline.createInterface({ input: process.stdin });
  let queue = Promise.resolve();

  rl.on('line', (line) => {
    queue = queue.then(async () => {
      let req;
      try {
        req = JSON.parse(line);
      } catch (e) {
        send({ id: 0, ok: false, kind: 'protocol', error: 'bad request: ' + e.message });
        return;
      }
      if (req.op === 'close') {
        await browser.close();
        send({ id: req.id, ok: true, value: null });
        process.exit(0);
      }
      const handler = ops[req.op];
      if (!handler) {
        send({ id: req.id, ok: false, kind: 'protocol', error: 'unknown op ' + req.op });
        return;
      }
      try {
        const value = await handler(req);
        send({ id: req.id, ok: true, value: value === undefined ? null : value });
      } catch (e) {
        const kind = e && e.name === 'TimeoutError' ? 'timeout' : 'error';
        send({ id: req.id, ok: false, kind, error: String(e && e.message ? e.message : e) });
      }
    });
  });

  rl.on('close', async () => {
    await browser.close();
    process.exit(0);
  });

  send({ ready: true });
})().catch((e) => {
  send({ ready: false, error: String(e && e.message ? e.message : e) });
  process.exit(1);
});
"#;

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Playwright-backed [`Driver`]: one bridge process per instance.
pub struct PlaywrightDriver {
    io: Mutex<BridgeIo>,
    child: Mutex<Option<Child>>,
    next_id: AtomicU64,
    request_timeout: Duration,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Spawn a bridge and wait for its browser to come up.
    pub async fn launch(config: &BrowserConfig) -> HarnessResult<Self> {
        Self::check_playwright_installed(config).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let bridge_config = json!({
            "browser": config.engine.as_str(),
            "headless": config.headless,
            "viewportWidth": config.viewport_width,
            "viewportHeight": config.viewport_height,
            "actionTimeoutMs": config.action_timeout_ms,
        });

        let mut cmd = Command::new(&config.node_binary);
        cmd.arg(&script_path)
            .arg(bridge_config.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.node_modules_dir {
            cmd.env("NODE_PATH", dir.join("node_modules"));
        }

        let mut child = cmd.spawn().map_err(|e| {
            HarnessError::Bridge(format!(
                "failed to spawn {}: {}",
                config.node_binary.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HarnessError::Bridge("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarnessError::Bridge("bridge stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright", "{}", line);
                }
            });
        }

        let mut io = BridgeIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let ready = timeout(LAUNCH_TIMEOUT, Self::read_response(&mut io))
            .await
            .map_err(|_| HarnessError::Bridge("browser did not start in time".into()))??;
        if ready.ready != Some(true) {
            return Err(HarnessError::Bridge(format!(
                "browser launch failed: {}",
                ready.error.unwrap_or_else(|| "unknown error".into())
            )));
        }

        info!(
            "Launched {} (pid {:?})",
            config.engine.as_str(),
            child.id()
        );

        Ok(Self {
            io: Mutex::new(io),
            child: Mutex::new(Some(child)),
            next_id: AtomicU64::new(1),
            request_timeout: Duration::from_millis(config.action_timeout_ms) + BRIDGE_SLACK,
            _script_dir: script_dir,
        })
    }

    /// Check that Node can resolve the `playwright` package
    async fn check_playwright_installed(config: &BrowserConfig) -> HarnessResult<()> {
        let mut cmd = Command::new(&config.node_binary);
        cmd.args(["-e", "require.resolve('playwright')"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &config.node_modules_dir {
            cmd.env("NODE_PATH", dir.join("node_modules"));
        }

        match cmd.status().await {
            Ok(status) if status.success() => Ok(()),
            _ => Err(HarnessError::PlaywrightNotFound),
        }
    }

    async fn read_response(io: &mut BridgeIo) -> HarnessResult<BridgeResponse> {
        loop {
            let line = io
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| HarnessError::Bridge("bridge exited".into()))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<BridgeResponse>(line) {
                Ok(resp) => return Ok(resp),
                // Libraries occasionally print to stdout; skip non-protocol lines.
                Err(_) => debug!(target: "playwright", "stdout: {}", line),
            }
        }
    }

    async fn request(&self, op: &str, mut args: Value, target: Option<&ElementHandle>) -> HarnessResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Value::Object(map) = &mut args {
            map.insert("id".into(), json!(id));
            map.insert("op".into(), json!(op));
            if let Some(t) = target {
                map.insert("target".into(), serde_json::to_value(t)?);
            }
        }

        let mut line = serde_json::to_string(&args)?;
        line.push('\n');

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let resp = loop {
            let resp = timeout(self.request_timeout, Self::read_response(&mut io))
                .await
                .map_err(|_| HarnessError::Bridge(format!("no answer to '{}' request", op)))??;
            if resp.id == id {
                break resp;
            }
            warn!("Dropping stale bridge response {} (waiting for {})", resp.id, id);
        };
        drop(io);

        if resp.ok {
            return Ok(resp.value);
        }

        let reason = resp.error.unwrap_or_else(|| "unknown error".into());
        match (resp.kind.as_deref(), target) {
            (Some("timeout"), Some(t)) => Err(HarnessError::ElementNotFound {
                action: op.to_string(),
                selector: t.to_string(),
            }),
            _ => Err(HarnessError::driver(op, reason)),
        }
    }

    async fn act(&self, op: &str, target: &ElementHandle, args: Value) -> HarnessResult<()> {
        self.request(op, args, Some(target)).await.map(|_| ())
    }

    /// Stop the bridge: ask politely, then SIGTERM, then kill.
    pub async fn stop(&self) -> HarnessResult<()> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };

        let _ = timeout(Duration::from_secs(5), self.request("close", json!({}), None)).await;

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let (Ok(None), Some(pid)) = (child.try_wait(), child.id()) {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    let _ = timeout(Duration::from_millis(500), child.wait()).await;
                }
            }
        }

        if let Ok(None) = child.try_wait() {
            let _ = child.kill().await;
        }
        debug!("Playwright bridge stopped");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Driver for PlaywrightDriver {
    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        self.request("goto", json!({ "url": url }), None).await.map(|_| ())
    }

    async fn type_text(&self, target: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.act("type", target, json!({ "text": text })).await
    }

    async fn fill(&self, target: &ElementHandle, value: &str) -> HarnessResult<()> {
        self.act("fill", target, json!({ "value": value })).await
    }

    async fn clear(&self, target: &ElementHandle) -> HarnessResult<()> {
        self.act("clear", target, json!({})).await
    }

    async fn press_key(&self, target: &ElementHandle, key: &str) -> HarnessResult<()> {
        self.act("press", target, json!({ "key": key })).await
    }

    async fn click(&self, target: &ElementHandle) -> HarnessResult<()> {
        self.act("click", target, json!({})).await
    }

    async fn dblclick(&self, target: &ElementHandle) -> HarnessResult<()> {
        self.act("dblclick", target, json!({})).await
    }

    async fn hover(&self, target: &ElementHandle) -> HarnessResult<()> {
        self.act("hover", target, json!({})).await
    }

    async fn set_checked(&self, target: &ElementHandle, checked: bool) -> HarnessResult<()> {
        self.act("set_checked", target, json!({ "checked": checked })).await
    }

    async fn reload(&self) -> HarnessResult<()> {
        self.request("reload", json!({}), None).await.map(|_| ())
    }

    async fn read_text(&self, target: &ElementHandle) -> HarnessResult<Vec<String>> {
        let value = self.request("read_text", json!({}), Some(target)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn read_count(&self, target: &ElementHandle) -> HarnessResult<usize> {
        let value = self.request("read_count", json!({}), Some(target)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn is_checked(&self, target: &ElementHandle) -> HarnessResult<bool> {
        let value = self.request("is_checked", json!({}), Some(target)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn is_visible(&self, target: &ElementHandle) -> HarnessResult<bool> {
        let value = self.request("is_visible", json!({}), Some(target)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn storage_item(&self, key: &str) -> HarnessResult<Option<String>> {
        let value = self.request("storage_item", json!({ "key": key }), None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn settle(&self) -> HarnessResult<()> {
        self.request("settle", json!({}), None).await.map(|_| ())
    }

    async fn close(&self) -> HarnessResult<()> {
        self.stop().await
    }
}

/// Launches a fresh browser per scenario.
#[derive(Debug, Clone)]
pub struct PlaywrightFactory {
    config: BrowserConfig,
}

impl PlaywrightFactory {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Whether node and the `playwright` package can be found.
    pub async fn is_available(&self) -> bool {
        PlaywrightDriver::check_playwright_installed(&self.config)
            .await
            .is_ok()
    }
}

#[async_trait::async_trait]
impl DriverFactory for PlaywrightFactory {
    type Driver = PlaywrightDriver;

    async fn launch(&self) -> HarnessResult<PlaywrightDriver> {
        PlaywrightDriver::launch(&self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_response_shapes() {
        let ok: BridgeResponse =
            serde_json::from_str(r#"{"id":3,"ok":true,"value":["a","b"]}"#).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.value, json!(["a", "b"]));

        let ready: BridgeResponse = serde_json::from_str(r#"{"ready":true}"#).unwrap();
        assert_eq!(ready.ready, Some(true));

        let err: BridgeResponse = serde_json::from_str(
            r#"{"id":4,"ok":false,"kind":"timeout","error":"Timeout 5000ms exceeded"}"#,
        )
        .unwrap();
        assert_eq!(err.kind.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_bridge_script_handles_every_driver_op() {
        for op in [
            "goto", "type", "fill", "clear", "press", "click", "dblclick", "hover",
            "set_checked", "reload", "read_text", "read_count", "is_checked",
            "is_visible", "storage_item", "settle", "close",
        ] {
            assert!(BRIDGE_SCRIPT.contains(op), "bridge lacks op {}", op);
        }
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("webkit".parse::<Browser>().unwrap(), Browser::Webkit);
        assert!("netscape".parse::<Browser>().is_err());
    }
}
