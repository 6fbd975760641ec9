/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset};
use tokio_util::sync::CancellationToken;

use super::{
    MountFuture, MountHandle, MountIds, Readiness, RendererStrategy, StrategyError, SurfaceMount,
    UnsupportedReason, failed_mount,
};
use crate::platform::{ContentSurface, Presentation};
use crate::registries::atomic::RendererChoice;

const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "data:", "vbscript:"];

fn is_unsafe_source(url: &str) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();
    UNSAFE_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Web content in a sandboxed frame.
pub struct EmbeddedFrameStrategy {
    surface: SurfaceMount,
}

impl EmbeddedFrameStrategy {
    pub(crate) fn new(surface: Rc<dyn ContentSurface>, ids: MountIds) -> Self {
        Self {
            surface: SurfaceMount::new(surface, ids, RendererChoice::EmbeddedFrame),
        }
    }
}

impl RendererStrategy for EmbeddedFrameStrategy {
    fn renderer(&self) -> RendererChoice {
        RendererChoice::EmbeddedFrame
    }

    fn check(&self, asset: &Asset, _caps: &ArCapabilities) -> Result<Readiness, StrategyError> {
        match asset.url() {
            Some(url) if is_unsafe_source(url) => {
                Ok(Readiness::Declined(UnsupportedReason::UnsafeSource))
            }
            Some(_) => Ok(Readiness::Ready),
            None => Err(StrategyError::MountFailed(format!(
                "asset {} has no url",
                asset.id()
            ))),
        }
    }

    fn mount(&self, asset: &Asset, _caps: &ArCapabilities, cancel: CancellationToken) -> MountFuture {
        match asset.url() {
            Some(url) if !is_unsafe_source(url) => self.surface.mount(
                Presentation::Frame {
                    url: url.to_string(),
                },
                cancel,
            ),
            _ => failed_mount(StrategyError::MountFailed(format!(
                "asset {} cannot be embedded",
                asset.id()
            ))),
        }
    }

    fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError> {
        self.surface.unmount(handle)
    }

    fn fallback(&self, _asset: &Asset) -> Option<Presentation> {
        Some(Presentation::Placeholder {
            label: "This content cannot be shown here.".into(),
        })
    }
}
