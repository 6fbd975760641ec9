/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Host preferences, read from a kebab-case TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::registries::atomic::RendererPolicy;
use crate::shell::runtime::diagnostics::DiagnosticsState;

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api/";
const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid preferences: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid api-base-url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ShellPreferences {
    /// Root of the experience API; `experiences/{id}` is appended to it.
    pub api_base_url: String,
    /// Composite image and video assets over the camera when available.
    pub camera_overlay: bool,
    /// Number of recent events the diagnostics ring keeps.
    pub diagnostics_capacity: usize,
    /// `EnvFilter` directive for the optional tracing subscriber.
    pub tracing_filter: Option<String>,
}

impl Default for ShellPreferences {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            camera_overlay: true,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            tracing_filter: None,
        }
    }
}

impl ShellPreferences {
    pub fn from_toml_str(source: &str) -> Result<Self, PrefsError> {
        let prefs: Self = toml::from_str(source)?;
        prefs.api_base_url()?;
        Ok(prefs)
    }

    pub fn api_base_url(&self) -> Result<Url, PrefsError> {
        Url::parse(&self.api_base_url).map_err(|source| PrefsError::InvalidUrl {
            url: self.api_base_url.clone(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PrefsError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| PrefsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let prefs = Self::from_toml_str(&source)?;
        log::debug!("loaded preferences from {}", path.display());
        Ok(prefs)
    }

    /// Host startup: installs the tracing subscriber when a filter is set and
    /// the process-wide diagnostics ring sized from these preferences.
    pub fn install_runtime(&self) -> DiagnosticsState {
        if crate::init_tracing(self.tracing_filter.as_deref()) {
            log::debug!("tracing enabled");
        }
        DiagnosticsState::install(self.diagnostics_capacity)
    }

    pub fn renderer_policy(&self) -> RendererPolicy {
        RendererPolicy {
            camera_overlay: self.camera_overlay,
        }
    }
}
