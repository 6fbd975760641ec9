/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Image or video composited over the live rear camera.
//!
//! The stream is owned by the instance that acquired it and is stopped
//! synchronously in `unmount`. Acquisition goes through the device gate shared
//! with native AR, so two permission prompts are never in flight at once and a
//! cancelled acquisition has released its tracks before the next one starts.

use std::cell::RefCell;
use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset};
use futures_util::FutureExt;
use futures_util::lock::Mutex;
use tokio_util::sync::CancellationToken;

use super::static_media::media_presentation;
use super::{
    MountFuture, MountHandle, MountId, MountIds, Readiness, RendererStrategy, StrategyError,
    UnsupportedReason, failed_mount,
};
use crate::platform::{CameraAccess, CameraStream, ContentSurface, Presentation, SurfaceSlot};
use crate::registries::atomic::RendererChoice;

struct CameraMount {
    id: MountId,
    stream: Box<dyn CameraStream>,
    slot: SurfaceSlot,
}

pub struct CameraOverlayStrategy {
    camera: Rc<dyn CameraAccess>,
    surface: Rc<dyn ContentSurface>,
    gate: Rc<Mutex<()>>,
    ids: MountIds,
    mounted: Rc<RefCell<Option<CameraMount>>>,
}

impl CameraOverlayStrategy {
    pub(crate) fn new(
        camera: Rc<dyn CameraAccess>,
        surface: Rc<dyn ContentSurface>,
        gate: Rc<Mutex<()>>,
        ids: MountIds,
    ) -> Self {
        Self {
            camera,
            surface,
            gate,
            ids,
            mounted: Rc::new(RefCell::new(None)),
        }
    }
}

impl RendererStrategy for CameraOverlayStrategy {
    fn renderer(&self) -> RendererChoice {
        RendererChoice::CameraOverlay
    }

    fn check(&self, asset: &Asset, caps: &ArCapabilities) -> Result<Readiness, StrategyError> {
        if media_presentation(asset).is_none() {
            return Err(StrategyError::MountFailed(format!(
                "asset {} cannot be overlaid on the camera",
                asset.id()
            )));
        }
        if !(caps.camera() && caps.secure_context()) {
            return Ok(Readiness::Declined(UnsupportedReason::CameraUnavailable));
        }
        Ok(Readiness::Ready)
    }

    fn mount(&self, asset: &Asset, _caps: &ArCapabilities, cancel: CancellationToken) -> MountFuture {
        let Some(presentation) = media_presentation(asset) else {
            return failed_mount(StrategyError::MountFailed(format!(
                "asset {} cannot be overlaid on the camera",
                asset.id()
            )));
        };
        let camera = self.camera.clone();
        let surface = self.surface.clone();
        let gate = self.gate.clone();
        let ids = self.ids.clone();
        let mounted = self.mounted.clone();

        async move {
            let _acquiring = gate.lock().await;
            if cancel.is_cancelled() {
                return Err(StrategyError::Cancelled);
            }
            let mut stream = camera.request_stream().await?;
            if cancel.is_cancelled() {
                // Navigated away during the permission prompt.
                stream.stop_all_tracks();
                return Err(StrategyError::Cancelled);
            }
            let slot = match surface.present_over_camera(stream.as_ref(), presentation) {
                Ok(slot) => slot,
                Err(err) => {
                    stream.stop_all_tracks();
                    return Err(err.into());
                }
            };
            let id = ids.next();
            mounted.replace(Some(CameraMount { id, stream, slot }));
            Ok(MountHandle {
                id,
                renderer: RendererChoice::CameraOverlay,
            })
        }
        .boxed_local()
    }

    fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError> {
        let taken = {
            let mut mounted = self.mounted.borrow_mut();
            match mounted.as_ref() {
                Some(mount) if mount.id == handle.id => mounted.take(),
                _ => None,
            }
        };
        let Some(mut mount) = taken else {
            return Ok(());
        };
        // Tracks first: the device must be free even if the surface misbehaves.
        mount.stream.stop_all_tracks();
        self.surface
            .dismiss(mount.slot)
            .map_err(|err| StrategyError::UnmountFailed(err.to_string()))
    }

    fn fallback(&self, asset: &Asset) -> Option<Presentation> {
        media_presentation(asset)
    }
}
