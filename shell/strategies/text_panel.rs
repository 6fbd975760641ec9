/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset};
use tokio_util::sync::CancellationToken;

use super::{
    MountFuture, MountHandle, MountIds, Readiness, RendererStrategy, StrategyError, SurfaceMount,
    failed_mount,
};
use crate::platform::{ContentSurface, Presentation};
use crate::registries::atomic::RendererChoice;

pub struct TextPanelStrategy {
    surface: SurfaceMount,
}

impl TextPanelStrategy {
    pub(crate) fn new(surface: Rc<dyn ContentSurface>, ids: MountIds) -> Self {
        Self {
            surface: SurfaceMount::new(surface, ids, RendererChoice::TextPanel),
        }
    }
}

fn missing_text(asset: &Asset) -> StrategyError {
    StrategyError::MountFailed(format!("asset {} has no text content", asset.id()))
}

impl RendererStrategy for TextPanelStrategy {
    fn renderer(&self) -> RendererChoice {
        RendererChoice::TextPanel
    }

    fn check(&self, asset: &Asset, _caps: &ArCapabilities) -> Result<Readiness, StrategyError> {
        match asset.text_content() {
            Some(_) => Ok(Readiness::Ready),
            None => Err(missing_text(asset)),
        }
    }

    fn mount(&self, asset: &Asset, _caps: &ArCapabilities, cancel: CancellationToken) -> MountFuture {
        match asset.text_content() {
            Some(content) => self.surface.mount(
                Presentation::Text {
                    content: content.to_string(),
                },
                cancel,
            ),
            None => failed_mount(missing_text(asset)),
        }
    }

    fn unmount(&self, handle: MountHandle) -> Result<(), StrategyError> {
        self.surface.unmount(handle)
    }
}

#[cfg(test)]
mod tests {
    use arshell_core::Asset;
    use futures_util::FutureExt;
    use tokio_util::sync::CancellationToken;

    use super::TextPanelStrategy;
    use crate::platform::Presentation;
    use crate::shell::strategies::{MountIds, RendererStrategy};
    use crate::test_utils::{FakePlatform, desktop_caps};

    #[test]
    fn shows_message_text_without_any_capability() {
        let fakes = FakePlatform::new();
        let strategy = TextPanelStrategy::new(fakes.surface.clone(), MountIds::default());
        let asset = Asset::message("m1", "Look up!").expect("valid");

        let handle = strategy
            .mount(&asset, &desktop_caps(), CancellationToken::new())
            .now_or_never()
            .expect("ready")
            .expect("mounted");

        assert_eq!(
            fakes.surface.presented(),
            vec![Presentation::Text {
                content: "Look up!".into()
            }]
        );
        // Unmounting twice is harmless.
        strategy.unmount(handle).expect("unmount");
        strategy.unmount(handle).expect("second unmount is a no-op");
        assert_eq!(fakes.surface.dismissed_count(), 1);
    }
}
