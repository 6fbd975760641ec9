/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::Cell;
use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset};
use futures_util::FutureExt;
use futures_util::lock::Mutex;
use tokio_util::sync::CancellationToken;

use super::scene_preview::scene_preview;
use super::{
    MountFuture, MountHandle, MountId, MountIds, Readiness, RendererStrategy, StrategyError,
    UnsupportedReason, failed_mount,
};
use crate::platform::{NativeArOutcome, NativeArRequest, NativeArSurface, Presentation};
use crate::registries::atomic::RendererChoice;

/// Hands the model to the platform's own AR viewer. Tracking stays opaque;
/// this strategy only learns whether activation worked.
pub struct NativeArStrategy {
    native_ar: Rc<dyn NativeArSurface>,
    gate: Rc<Mutex<()>>,
    ids: MountIds,
    active: Rc<Cell<Option<MountId>>>,
}

impl NativeArStrategy {
    pub(crate) fn new(native_ar: Rc<dyn NativeArSurface>, gate: Rc<Mutex<()>>, ids: MountIds) -> Self {
        Self {
            native_ar,
            gate,
            ids,
            active: Rc::new(Cell::new(None)),
        }
    }
}

fn request_for(asset: &Asset) -> Result<NativeArRequest, StrategyError> {
    let model_url = asset
        .url()
        .ok_or_else(|| StrategyError::MountFailed(format!("asset {} has no model url", asset.id())))?;
    Ok(NativeArRequest {
        model_url: model_url.to_string(),
        mime_type: asset.mime_type().map(str::to_string),
    })
}

impl RendererStrategy for NativeArStrategy {
    fn renderer(&self) -> RendererChoice {
        RendererChoice::NativeArViewer
    }

    fn check(&self, asset: &Asset, _caps: &ArCapabilities) -> Result<Readiness, StrategyError> {
        request_for(asset)?;
        if !self.native_ar.is_available() {
            return Ok(Readiness::Declined(UnsupportedReason::ArSurfaceUnavailable));
        }
        Ok(Readiness::Ready)
    }

    fn mount(&self, asset: &Asset, _caps: &ArCapabilities, cancel: CancellationToken) -> MountFuture {
        let request = match request_for(asset) {
            Ok(request) => request,
            Err(err) => return failed_mount(err),
        };
        let native_ar = self.native_ar.clone();
        let gate = self.gate.clone();
        let ids = self.ids.clone();
        let active = self.active.clone();

        async move {
            let _activating = gate.lock().await;
            if cancel.is_cancelled() {
                return Err(StrategyError::Cancelled);
            }
            match native_ar.activate(request).await? {
                NativeArOutcome::Activated => {
                    if cancel.is_cancelled() {
                        if let Err(err) = native_ar.deactivate() {
                            log::warn!("native AR deactivate after cancel failed: {err}");
                        }
                        return Err(StrategyError::Cancelled);
                    }
                    let id = ids.next();
                    active.set(Some(id));
                    Ok(MountHandle {
                        id,
                        renderer: RendererChoice::NativeArViewer,
                    })
                }
                NativeArOutcome::Unsupported => Err(StrategyError::MountFailed(
                    "platform reported AR unsupported at activation".into(),
                )),
            }
        }
        .boxed_local()
    }

    fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError> {
        if self.active.get() != Some(handle.id) {
            return Ok(());
        }
        self.active.set(None);
        self.native_ar
            .deactivate()
            .map_err(|err| StrategyError::UnmountFailed(err.to_string()))
    }

    fn fallback(&self, asset: &Asset) -> Option<Presentation> {
        scene_preview(asset)
    }
}
