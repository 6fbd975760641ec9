/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Inert orbit-camera preview for 3D models on devices without any AR
//! entry point. It never activates an AR session: `check` always declines
//! and the preview is offered as the fallback presentation instead.

use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset};
use tokio_util::sync::CancellationToken;

use super::{
    MountFuture, MountHandle, MountIds, Readiness, RendererStrategy, StrategyError, SurfaceMount,
    UnsupportedReason, failed_mount,
};
use crate::platform::{ContentSurface, Presentation};
use crate::registries::atomic::RendererChoice;

pub(crate) fn scene_preview(asset: &Asset) -> Option<Presentation> {
    asset.url().map(|url| Presentation::ScenePreview {
        model_url: url.to_string(),
    })
}

pub struct ScenePreviewStrategy {
    surface: SurfaceMount,
}

impl ScenePreviewStrategy {
    pub(crate) fn new(surface: Rc<dyn ContentSurface>, ids: MountIds) -> Self {
        Self {
            surface: SurfaceMount::new(surface, ids, RendererChoice::ScenePreview),
        }
    }
}

impl RendererStrategy for ScenePreviewStrategy {
    fn renderer(&self) -> RendererChoice {
        RendererChoice::ScenePreview
    }

    fn check(&self, _asset: &Asset, _caps: &ArCapabilities) -> Result<Readiness, StrategyError> {
        Ok(Readiness::Declined(UnsupportedReason::ArSurfaceUnavailable))
    }

    /// Places the preview directly, for hosts that embed it outside a session.
    fn mount(&self, asset: &Asset, _caps: &ArCapabilities, cancel: CancellationToken) -> MountFuture {
        match scene_preview(asset) {
            Some(preview) => self.surface.mount(preview, cancel),
            None => failed_mount(StrategyError::MountFailed(format!(
                "asset {} has no model url",
                asset.id()
            ))),
        }
    }

    fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError> {
        self.surface.unmount(handle)
    }

    fn fallback(&self, asset: &Asset) -> Option<Presentation> {
        scene_preview(asset)
    }
}
