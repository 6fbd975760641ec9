/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset, AssetKind};
use tokio_util::sync::CancellationToken;

use super::{
    MountFuture, MountHandle, MountIds, Readiness, RendererStrategy, StrategyError, SurfaceMount,
    failed_mount,
};
use crate::platform::{ContentSurface, Presentation};
use crate::registries::atomic::RendererChoice;

/// Image or video presentation for `asset`, if it is one.
pub(crate) fn media_presentation(asset: &Asset) -> Option<Presentation> {
    let url = asset.url()?.to_string();
    match asset.kind() {
        AssetKind::Image => Some(Presentation::Image { url }),
        AssetKind::Video => Some(Presentation::Video {
            url,
            mime_type: asset.mime_type().map(str::to_string),
        }),
        _ => None,
    }
}

fn not_media(asset: &Asset) -> StrategyError {
    StrategyError::MountFailed(format!(
        "asset {} ({}) is not image or video",
        asset.id(),
        asset.kind()
    ))
}

/// Plain image/video on the page, no camera.
pub struct StaticMediaStrategy {
    surface: SurfaceMount,
}

impl StaticMediaStrategy {
    pub(crate) fn new(surface: Rc<dyn ContentSurface>, ids: MountIds) -> Self {
        Self {
            surface: SurfaceMount::new(surface, ids, RendererChoice::StaticMedia),
        }
    }
}

impl RendererStrategy for StaticMediaStrategy {
    fn renderer(&self) -> RendererChoice {
        RendererChoice::StaticMedia
    }

    fn check(&self, asset: &Asset, _caps: &ArCapabilities) -> Result<Readiness, StrategyError> {
        media_presentation(asset)
            .map(|_| Readiness::Ready)
            .ok_or_else(|| not_media(asset))
    }

    fn mount(&self, asset: &Asset, _caps: &ArCapabilities, cancel: CancellationToken) -> MountFuture {
        match media_presentation(asset) {
            Some(presentation) => self.surface.mount(presentation, cancel),
            None => failed_mount(not_media(asset)),
        }
    }

    fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError> {
        self.surface.unmount(handle)
    }
}

#[cfg(test)]
mod tests {
    use arshell_core::{Asset, AssetKind};
    use futures_util::FutureExt;
    use tokio_util::sync::CancellationToken;

    use super::StaticMediaStrategy;
    use crate::platform::Presentation;
    use crate::shell::strategies::{MountIds, Readiness, RendererStrategy, StrategyError};
    use crate::test_utils::{FakePlatform, desktop_caps};

    #[test]
    fn presents_video_with_mime_type_and_dismisses_on_unmount() {
        let fakes = FakePlatform::new();
        let strategy = StaticMediaStrategy::new(fakes.surface.clone(), MountIds::default());
        let asset = Asset::media("v1", AssetKind::Video, "https://cdn.test/clip.mp4")
            .expect("valid")
            .with_mime_type("video/mp4");

        assert_eq!(strategy.check(&asset, &desktop_caps()), Ok(Readiness::Ready));
        let handle = strategy
            .mount(&asset, &desktop_caps(), CancellationToken::new())
            .now_or_never()
            .expect("ready immediately")
            .expect("mounted");

        assert_eq!(
            fakes.surface.presented(),
            vec![Presentation::Video {
                url: "https://cdn.test/clip.mp4".into(),
                mime_type: Some("video/mp4".into()),
            }]
        );
        strategy.unmount(handle).expect("unmount");
        assert_eq!(fakes.surface.visible_count(), 0);
    }

    #[test]
    fn cancelled_mount_presents_nothing() {
        let fakes = FakePlatform::new();
        let strategy = StaticMediaStrategy::new(fakes.surface.clone(), MountIds::default());
        let asset = Asset::media("i1", AssetKind::Image, "https://cdn.test/a.png").expect("valid");
        let cancel = CancellationToken::new();
        let mount = strategy.mount(&asset, &desktop_caps(), cancel.clone());
        cancel.cancel();

        let result = mount.now_or_never().expect("ready");

        assert_eq!(result, Err(StrategyError::Cancelled));
        assert!(fakes.surface.presented().is_empty());
    }

    #[test]
    fn rejects_non_media_assets() {
        let fakes = FakePlatform::new();
        let strategy = StaticMediaStrategy::new(fakes.surface.clone(), MountIds::default());
        let asset = Asset::message("m1", "hello").expect("valid");

        assert!(matches!(
            strategy.check(&asset, &desktop_caps()),
            Err(StrategyError::MountFailed(_))
        ));
    }
}
