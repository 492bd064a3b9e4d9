//! Log batch wire format shared by the reporter and the log server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Platform a test harness reports from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Desktop browser.
    Web,
    /// Server-side runtime.
    Node,
    /// Hybrid-app webview.
    Cordova,
    /// React Native bridge.
    ReactNative,
    /// NativeScript bridge.
    NativeScript,
}

impl Platform {
    /// Wire name of the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Node => "node",
            Self::Cordova => "cordova",
            Self::ReactNative => "reactnative",
            Self::NativeScript => "nativescript",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "node" => Ok(Self::Node),
            "cordova" => Ok(Self::Cordova),
            "reactnative" => Ok(Self::ReactNative),
            "nativescript" => Ok(Self::NativeScript),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

/// One HTTP POST payload: a platform tag and its ordered log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatch {
    /// Platform that produced the lines.
    pub platform: Platform,
    /// Raw log lines, in emission order.
    pub logs: Vec<String>,
}

impl LogBatch {
    /// Create a batch carrying a single line.
    pub fn single(platform: Platform, line: impl Into<String>) -> Self {
        Self {
            platform,
            logs: vec![line.into()],
        }
    }

    /// Decode a batch from a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(body)?)
    }
}
