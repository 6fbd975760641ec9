use std::fmt;

use arshell_core::{ArCapabilities, AssetKind};

use crate::shell::runtime::channels::{
    CHANNEL_RENDERER_FALLBACK_USED, CHANNEL_RENDERER_SELECTED, CHANNEL_RENDERER_UNSUPPORTED_KIND,
};
use crate::shell::runtime::diagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererChoice {
    NativeArViewer,
    ScenePreview,
    CameraOverlay,
    StaticMedia,
    TextPanel,
    EmbeddedFrame,
}

impl RendererChoice {
    pub fn renderer_id(self) -> &'static str {
        match self {
            Self::NativeArViewer => "renderer:native-ar",
            Self::ScenePreview => "renderer:scene-preview",
            Self::CameraOverlay => "renderer:camera-overlay",
            Self::StaticMedia => "renderer:static-media",
            Self::TextPanel => "renderer:text-panel",
            Self::EmbeddedFrame => "renderer:embedded-frame",
        }
    }
}

impl fmt::Display for RendererChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.renderer_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererSelection {
    pub renderer: RendererChoice,
    pub fallback_used: bool,
    pub matched_by: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported asset kind `{kind}`")]
pub struct UnsupportedAssetKind {
    pub kind: String,
}

/// Host-level switches that shape resolution without making it impure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererPolicy {
    pub camera_overlay: bool,
}

impl Default for RendererPolicy {
    fn default() -> Self {
        Self {
            camera_overlay: true,
        }
    }
}

/// Maps an asset kind and a capability snapshot to one renderer.
///
/// Resolution is a pure function of `(policy, kind, capabilities)`; the
/// registry holds no other state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetRendererRegistry {
    policy: RendererPolicy,
}

impl AssetRendererRegistry {
    pub fn new(policy: RendererPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RendererPolicy {
        self.policy
    }

    pub fn resolve(
        &self,
        kind: &AssetKind,
        caps: &ArCapabilities,
    ) -> Result<RendererSelection, UnsupportedAssetKind> {
        let selection = match kind {
            AssetKind::Model3d if caps.webxr_immersive_ar() => RendererSelection {
                renderer: RendererChoice::NativeArViewer,
                fallback_used: false,
                matched_by: "webxr",
            },
            AssetKind::Model3d if caps.is_mobile() => RendererSelection {
                renderer: RendererChoice::NativeArViewer,
                fallback_used: false,
                matched_by: "mobile-viewer",
            },
            AssetKind::Model3d => RendererSelection {
                renderer: RendererChoice::ScenePreview,
                fallback_used: true,
                matched_by: "fallback",
            },
            AssetKind::Image | AssetKind::Video
                if self.policy.camera_overlay && caps.camera() && caps.secure_context() =>
            {
                RendererSelection {
                    renderer: RendererChoice::CameraOverlay,
                    fallback_used: false,
                    matched_by: "camera",
                }
            }
            AssetKind::Image | AssetKind::Video => RendererSelection {
                renderer: RendererChoice::StaticMedia,
                fallback_used: false,
                matched_by: "kind",
            },
            AssetKind::Message => RendererSelection {
                renderer: RendererChoice::TextPanel,
                fallback_used: false,
                matched_by: "kind",
            },
            AssetKind::WebContent => RendererSelection {
                renderer: RendererChoice::EmbeddedFrame,
                fallback_used: false,
                matched_by: "kind",
            },
            AssetKind::Unknown(tag) => {
                diagnostics::emit(CHANNEL_RENDERER_UNSUPPORTED_KIND, tag.clone());
                return Err(UnsupportedAssetKind { kind: tag.clone() });
            }
        };

        let channel = if selection.fallback_used {
            CHANNEL_RENDERER_FALLBACK_USED
        } else {
            CHANNEL_RENDERER_SELECTED
        };
        diagnostics::emit(
            channel,
            format!("{} {}", kind.as_str(), selection.renderer.renderer_id()),
        );
        Ok(selection)
    }
}
