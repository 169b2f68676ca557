//! Platform-dependent key chords

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Keyboard convention of the machine the browser runs on.
///
/// Text inputs honour the platform's own "select all" binding only; on macOS
/// `Control+A` moves the caret to the start of the line instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Macos,
    Windows,
    Linux,
}

impl Platform {
    /// Platform of the current host.
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Primary shortcut modifier.
    pub fn modifier(&self) -> &'static str {
        match self {
            Platform::Macos => "Meta",
            Platform::Windows | Platform::Linux => "Control",
        }
    }

    /// Chord that selects the whole contents of a text input.
    pub fn select_all(&self) -> String {
        format!("{}+A", self.modifier())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Macos => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "macos" | "mac" | "darwin" => Ok(Platform::Macos),
            "windows" | "win" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            other => Err(HarnessError::Config(format!("unknown platform: {}", other))),
        }
    }
}

/// A parsed key chord such as `Meta+A` or `Enter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl Chord {
    pub fn parse(chord: &str) -> Self {
        let mut parts: Vec<String> = chord.split('+').map(|p| p.trim().to_string()).collect();
        // "Control++" names the plus key itself.
        if chord.ends_with("++") {
            parts.truncate(parts.len().saturating_sub(2));
            parts.push("+".to_string());
        }
        let key = parts.pop().unwrap_or_default();
        Self {
            modifiers: parts,
            key,
        }
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.iter().any(|m| m.eq_ignore_ascii_case(name))
    }

    /// Whether this chord means "select all" on the given platform.
    pub fn is_select_all(&self, platform: Platform) -> bool {
        self.key.eq_ignore_ascii_case("a")
            && self.modifiers.len() == 1
            && (self.has_modifier(platform.modifier()) || self.has_modifier("ControlOrMeta"))
    }
}
