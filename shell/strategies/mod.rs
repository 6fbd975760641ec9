/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Renderer strategies.
//!
//! A strategy is instantiated per bind by [`StrategyFactory`], so whatever a
//! mount acquires (camera stream, surface slot, native AR activation) belongs
//! to exactly one instance. `mount` is asynchronous and observes the bind's
//! cancellation token; `unmount` is synchronous and must release everything
//! before it returns.

pub(crate) mod camera_overlay;
pub(crate) mod embedded_frame;
pub(crate) mod native_ar;
pub(crate) mod scene_preview;
pub(crate) mod static_media;
pub(crate) mod text_panel;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset};
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use futures_util::lock::Mutex;
use tokio_util::sync::CancellationToken;

use crate::platform::{ContentSurface, PlatformError, PlatformServices, Presentation, SurfaceSlot};
use crate::registries::atomic::RendererChoice;

pub use camera_overlay::CameraOverlayStrategy;
pub use embedded_frame::EmbeddedFrameStrategy;
pub use native_ar::NativeArStrategy;
pub use scene_preview::ScenePreviewStrategy;
pub use static_media::StaticMediaStrategy;
pub use text_panel::TextPanelStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountHandle {
    pub id: MountId,
    pub renderer: RendererChoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Declined(UnsupportedReason),
}

/// Why a session ended up `unsupported`. Informational, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
    ArSurfaceUnavailable,
    CameraUnavailable,
    UnknownAssetKind(String),
    UnsafeSource,
}

impl UnsupportedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArSurfaceUnavailable => "ar_surface_unavailable",
            Self::CameraUnavailable => "camera_unavailable",
            Self::UnknownAssetKind(_) => "unknown_asset_kind",
            Self::UnsafeSource => "unsafe_source",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("mount failed: {0}")]
    MountFailed(String),
    #[error("unmount failed: {0}")]
    UnmountFailed(String),
    #[error("mount cancelled")]
    Cancelled,
}

impl StrategyError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl From<PlatformError> for StrategyError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied(message) => Self::PermissionDenied(message),
            other => Self::MountFailed(other.to_string()),
        }
    }
}

pub type MountFuture = LocalBoxFuture<'static, Result<MountHandle, StrategyError>>;

pub trait RendererStrategy {
    fn renderer(&self) -> RendererChoice;

    /// Decides whether this strategy can mount `asset` on this device.
    fn check(&self, asset: &Asset, caps: &ArCapabilities) -> Result<Readiness, StrategyError>;

    /// Starts mounting. The future must resolve to `Cancelled` and hold no
    /// resources if `cancel` fires before it acquires them.
    fn mount(&self, asset: &Asset, caps: &ArCapabilities, cancel: CancellationToken) -> MountFuture;

    /// Releases everything `handle` holds. Unknown handles are ignored.
    fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError>;

    /// What to show instead when `check` declines.
    fn fallback(&self, _asset: &Asset) -> Option<Presentation> {
        None
    }
}

pub(crate) fn failed_mount(err: StrategyError) -> MountFuture {
    futures_util::future::ready(Err(err)).boxed_local()
}

/// Mount ids are unique across every strategy a factory creates.
#[derive(Debug, Clone, Default)]
pub(crate) struct MountIds(Rc<Cell<u64>>);

impl MountIds {
    pub(crate) fn next(&self) -> MountId {
        let id = self.0.get() + 1;
        self.0.set(id);
        MountId(id)
    }
}

/// A single presentation on the content surface, shared by the strategies
/// that only place something on the page.
#[derive(Clone)]
pub(crate) struct SurfaceMount {
    surface: Rc<dyn ContentSurface>,
    ids: MountIds,
    renderer: RendererChoice,
    mounted: Rc<RefCell<Option<(MountId, SurfaceSlot)>>>,
}

impl SurfaceMount {
    pub(crate) fn new(
        surface: Rc<dyn ContentSurface>,
        ids: MountIds,
        renderer: RendererChoice,
    ) -> Self {
        Self {
            surface,
            ids,
            renderer,
            mounted: Rc::new(RefCell::new(None)),
        }
    }

    pub(crate) fn mount(&self, presentation: Presentation, cancel: CancellationToken) -> MountFuture {
        let this = self.clone();
        async move {
            if cancel.is_cancelled() {
                return Err(StrategyError::Cancelled);
            }
            let slot = this.surface.present(presentation)?;
            let id = this.ids.next();
            this.mounted.replace(Some((id, slot)));
            Ok(MountHandle {
                id,
                renderer: this.renderer,
            })
        }
        .boxed_local()
    }

    pub(crate) fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError> {
        let taken = {
            let mut mounted = self.mounted.borrow_mut();
            match *mounted {
                Some((id, _)) if id == handle.id => mounted.take(),
                _ => None,
            }
        };
        if let Some((_, slot)) = taken {
            self.surface
                .dismiss(slot)
                .map_err(|err| StrategyError::UnmountFailed(err.to_string()))?;
        }
        Ok(())
    }
}

/// Builds a fresh strategy instance per bind. The device gate and the mount id
/// allocator are shared across instances.
///
/// Camera overlay and native AR both take the one device gate, so a new device
/// mount waits until a superseded one has resolved and released what it got.
pub struct StrategyFactory {
    platform: PlatformServices,
    ids: MountIds,
    device_gate: Rc<Mutex<()>>,
}

impl StrategyFactory {
    pub fn new(platform: PlatformServices) -> Self {
        Self {
            platform,
            ids: MountIds::default(),
            device_gate: Rc::new(Mutex::new(())),
        }
    }

    pub fn platform(&self) -> &PlatformServices {
        &self.platform
    }

    pub fn instantiate(&self, choice: RendererChoice) -> Rc<dyn RendererStrategy> {
        let surface = self.platform.surface.clone();
        match choice {
            RendererChoice::NativeArViewer => Rc::new(NativeArStrategy::new(
                self.platform.native_ar.clone(),
                self.device_gate.clone(),
                self.ids.clone(),
            )),
            RendererChoice::ScenePreview => {
                Rc::new(ScenePreviewStrategy::new(surface, self.ids.clone()))
            }
            RendererChoice::CameraOverlay => Rc::new(CameraOverlayStrategy::new(
                self.platform.camera.clone(),
                surface,
                self.device_gate.clone(),
                self.ids.clone(),
            )),
            RendererChoice::StaticMedia => {
                Rc::new(StaticMediaStrategy::new(surface, self.ids.clone()))
            }
            RendererChoice::TextPanel => Rc::new(TextPanelStrategy::new(surface, self.ids.clone())),
            RendererChoice::EmbeddedFrame => {
                Rc::new(EmbeddedFrameStrategy::new(surface, self.ids.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use arshell_core::{Asset, AssetKind};
    use futures_util::FutureExt;
    use tokio_util::sync::CancellationToken;

    use super::{MountIds, StrategyError, StrategyFactory};
    use crate::platform::PlatformError;
    use crate::registries::atomic::RendererChoice;
    use crate::test_utils::{FakePlatform, ar_phone_caps};

    #[test]
    fn factory_builds_the_requested_renderer() {
        let fakes = FakePlatform::new();
        let factory = StrategyFactory::new(fakes.services());

        for choice in [
            RendererChoice::NativeArViewer,
            RendererChoice::ScenePreview,
            RendererChoice::CameraOverlay,
            RendererChoice::StaticMedia,
            RendererChoice::TextPanel,
            RendererChoice::EmbeddedFrame,
        ] {
            assert_eq!(factory.instantiate(choice).renderer(), choice);
        }
    }

    #[test]
    fn mount_ids_are_shared_and_increasing() {
        let ids = MountIds::default();
        let shared = ids.clone();
        let first = ids.next();
        let second = shared.next();
        assert!(second > first);
    }

    #[test]
    fn platform_permission_errors_stay_distinguishable() {
        let denied: StrategyError = PlatformError::PermissionDenied("camera".into()).into();
        let unsupported: StrategyError = PlatformError::NotSupported("xr".into()).into();

        assert!(denied.is_permission_denied());
        assert!(!unsupported.is_permission_denied());
        assert_eq!(
            unsupported,
            StrategyError::MountFailed("not supported: xr".into())
        );
    }

    #[test]
    fn camera_waits_for_a_cancelled_native_activation() {
        let fakes = FakePlatform::new();
        fakes.native_ar.set_deferred(true);
        let factory = StrategyFactory::new(fakes.services());
        let model = Asset::media("m1", AssetKind::Model3d, "https://cdn.test/chair.glb")
            .expect("valid");
        let image = Asset::media("i1", AssetKind::Image, "https://cdn.test/poster.png")
            .expect("valid");
        let native = factory.instantiate(RendererChoice::NativeArViewer);
        let overlay = factory.instantiate(RendererChoice::CameraOverlay);
        let native_cancel = CancellationToken::new();

        let mut native_mount = native.mount(&model, &ar_phone_caps(), native_cancel.clone());
        let mut overlay_mount = overlay.mount(&image, &ar_phone_caps(), CancellationToken::new());
        assert!((&mut native_mount).now_or_never().is_none());
        native_cancel.cancel();
        assert!((&mut overlay_mount).now_or_never().is_none());
        assert_eq!(fakes.camera.requests(), 0);

        assert!(fakes.native_ar.complete_pending());
        assert_eq!(
            native_mount.now_or_never().expect("resolved"),
            Err(StrategyError::Cancelled)
        );
        assert!(!fakes.native_ar.is_active());

        let handle = overlay_mount
            .now_or_never()
            .expect("gate released")
            .expect("mounted");
        assert_eq!(fakes.camera.live_streams(), 1);
        overlay.unmount(handle).expect("unmount");
    }
}
