/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Host collaborator boundary.
//!
//! The engine never touches the camera, the native AR viewer, or the page
//! directly. It talks to these traits, which the browser host implements in
//! [`web`] and the test harness implements with fakes. Everything here is
//! single-threaded: futures are `LocalBoxFuture` and handles are `Rc`.

pub(crate) mod spawn;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::any::Any;
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use serde::Serialize;

#[cfg(not(target_arch = "wasm32"))]
pub use spawn::TokioLocalSpawner;
#[cfg(target_arch = "wasm32")]
pub use spawn::WasmSpawner;
pub use spawn::TaskSpawner;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("{0}")]
    Failure(String),
}

/// A granted camera stream. Holding one means holding the device.
pub trait CameraStream {
    fn track_count(&self) -> usize;

    /// Stops every track. Must release the device before returning.
    fn stop_all_tracks(&mut self);

    fn as_any(&self) -> &dyn Any;
}

pub trait CameraAccess {
    /// Requests the rear camera; may wait on a permission prompt.
    fn request_stream(&self) -> LocalBoxFuture<'static, Result<Box<dyn CameraStream>, PlatformError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArRequest {
    pub model_url: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeArOutcome {
    Activated,
    Unsupported,
}

/// The platform's own AR entry point (WebXR session, Scene Viewer, Quick Look).
/// Tracking is opaque; the engine only learns whether activation worked.
pub trait NativeArSurface {
    /// Whether the page currently exposes an AR entry point at all.
    fn is_available(&self) -> bool;

    fn activate(
        &self,
        request: NativeArRequest,
    ) -> LocalBoxFuture<'static, Result<NativeArOutcome, PlatformError>>;

    fn deactivate(&self) -> Result<(), PlatformError>;
}

/// What the content surface should show for an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Presentation {
    Image { url: String },
    Video { url: String, mime_type: Option<String> },
    Text { content: String },
    Frame { url: String },
    ScenePreview { model_url: String },
    Placeholder { label: String },
}

impl Presentation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Text { .. } => "text",
            Self::Frame { .. } => "frame",
            Self::ScenePreview { .. } => "scene-preview",
            Self::Placeholder { .. } => "placeholder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceSlot(pub u64);

/// The declarative page area assets are rendered into.
pub trait ContentSurface {
    fn present(&self, presentation: Presentation) -> Result<SurfaceSlot, PlatformError>;

    /// Presents on top of a live camera feed.
    fn present_over_camera(
        &self,
        stream: &dyn CameraStream,
        presentation: Presentation,
    ) -> Result<SurfaceSlot, PlatformError>;

    fn dismiss(&self, slot: SurfaceSlot) -> Result<(), PlatformError>;
}

/// Bundle of host collaborators handed to the strategy factory.
#[derive(Clone)]
pub struct PlatformServices {
    pub camera: Rc<dyn CameraAccess>,
    pub native_ar: Rc<dyn NativeArSurface>,
    pub surface: Rc<dyn ContentSurface>,
}

impl PlatformServices {
    pub fn new(
        camera: Rc<dyn CameraAccess>,
        native_ar: Rc<dyn NativeArSurface>,
        surface: Rc<dyn ContentSurface>,
    ) -> Self {
        Self {
            camera,
            native_ar,
            surface,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Presentation;

    #[test]
    fn presentations_serialize_for_the_host_page() {
        let video = Presentation::Video {
            url: "https://cdn.test/clip.mp4".into(),
            mime_type: Some("video/mp4".into()),
        };
        assert_eq!(
            serde_json::to_value(&video).expect("serialize"),
            json!({ "kind": "video", "url": "https://cdn.test/clip.mp4", "mimeType": "video/mp4" })
        );

        let preview = Presentation::ScenePreview {
            model_url: "https://cdn.test/chair.glb".into(),
        };
        assert_eq!(
            serde_json::to_value(&preview).expect("serialize"),
            json!({ "kind": "scene-preview", "modelUrl": "https://cdn.test/chair.glb" })
        );
        assert_eq!(preview.label(), "scene-preview");
    }
}
