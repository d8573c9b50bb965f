use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_LINUX_IMAGE, DEFAULT_WINDOWS_IMAGE};

/// Container images used for each target platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationImages {
    linux: String,
    windows: String,
}

impl IsolationImages {
    /// Creates an image selection.
    #[must_use]
    pub fn new(linux: impl Into<String>, windows: impl Into<String>) -> Self {
        Self {
            linux: linux.into(),
            windows: windows.into(),
        }
    }

    /// Image for Linux dry runs and installs.
    #[must_use]
    pub fn linux(&self) -> &str {
        &self.linux
    }

    /// Image for Windows dry runs and installs.
    #[must_use]
    pub fn windows(&self) -> &str {
        &self.windows
    }
}

impl Default for IsolationImages {
    fn default() -> Self {
        Self::new(DEFAULT_LINUX_IMAGE, DEFAULT_WINDOWS_IMAGE)
    }
}
