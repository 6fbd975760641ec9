/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Browser implementations of the platform traits.
//!
//! Feature detection goes through `js_sys::Reflect` so that a missing API is
//! an ordinary `false` or error value instead of a thrown exception. The
//! native AR button and the content surfaces are owned by the host page; they
//! are reached through a [`JsHostBridge`] object the page passes in.

use std::any::Any;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{DomException, MediaStream, MediaStreamConstraints, MediaStreamTrack, Window};

use super::{
    CameraAccess, CameraStream, ContentSurface, NativeArOutcome, NativeArRequest,
    NativeArSurface, PlatformError, Presentation, SurfaceSlot,
};
use crate::shell::runtime::capability_probe::{CapabilityEnvironment, ProbeError, XrFeature};

fn describe(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

fn platform_error(value: JsValue) -> PlatformError {
    match value.dyn_ref::<DomException>().map(|e| e.name()) {
        Some(name) if name == "NotAllowedError" || name == "SecurityError" => {
            PlatformError::PermissionDenied(describe(&value))
        }
        Some(name) if name == "NotFoundError" || name == "NotSupportedError" => {
            PlatformError::NotSupported(describe(&value))
        }
        _ => PlatformError::Failure(describe(&value)),
    }
}

fn has(target: &JsValue, key: &str) -> Result<bool, ProbeError> {
    Reflect::has(target, &JsValue::from_str(key)).map_err(|e| ProbeError::Threw(describe(&e)))
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
}

fn window() -> Result<Window, ProbeError> {
    web_sys::window().ok_or_else(|| ProbeError::Missing("window".into()))
}

/// Feature detection against the live page.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebCapabilityEnvironment;

impl CapabilityEnvironment for WebCapabilityEnvironment {
    fn secure_context(&self) -> Result<bool, ProbeError> {
        Ok(window()?.is_secure_context())
    }

    fn immersive_ar_supported(&self) -> LocalBoxFuture<'_, Result<bool, ProbeError>> {
        async move {
            let navigator: JsValue = window()?.navigator().into();
            let xr = get(&navigator, "xr").map_err(|e| ProbeError::Threw(describe(&e)))?;
            if xr.is_undefined() || xr.is_null() {
                return Ok(false);
            }
            let check = get(&xr, "isSessionSupported")
                .map_err(|e| ProbeError::Threw(describe(&e)))?
                .dyn_into::<Function>()
                .map_err(|_| ProbeError::Missing("navigator.xr.isSessionSupported".into()))?;
            let promise = check
                .call1(&xr, &JsValue::from_str("immersive-ar"))
                .map_err(|e| ProbeError::Threw(describe(&e)))?
                .dyn_into::<Promise>()
                .map_err(|_| ProbeError::Threw("isSessionSupported returned no promise".into()))?;
            let supported = JsFuture::from(promise)
                .await
                .map_err(|e| ProbeError::Threw(describe(&e)))?;
            Ok(supported.as_bool().unwrap_or(false))
        }
        .boxed_local()
    }

    fn xr_feature_hint(&self, feature: XrFeature) -> Result<bool, ProbeError> {
        let interface = match feature {
            XrFeature::HitTest => "XRHitTestSource",
            XrFeature::LightEstimation => "XRLightProbe",
            XrFeature::PlaneDetection => "XRPlane",
        };
        let window: JsValue = window()?.into();
        has(&window, interface)
    }

    fn camera_api_present(&self) -> Result<bool, ProbeError> {
        let navigator: JsValue = window()?.navigator().into();
        let devices = get(&navigator, "mediaDevices").map_err(|e| ProbeError::Threw(describe(&e)))?;
        if devices.is_undefined() || devices.is_null() {
            return Ok(false);
        }
        has(&devices, "getUserMedia")
    }

    fn device_motion_present(&self) -> Result<bool, ProbeError> {
        let window: JsValue = window()?.into();
        has(&window, "DeviceMotionEvent")
    }

    fn geolocation_present(&self) -> Result<bool, ProbeError> {
        let navigator: JsValue = window()?.navigator().into();
        has(&navigator, "geolocation")
    }

    fn user_agent(&self) -> Result<String, ProbeError> {
        window()?
            .navigator()
            .user_agent()
            .map_err(|e| ProbeError::Threw(describe(&e)))
    }

    fn max_touch_points(&self) -> Result<u32, ProbeError> {
        Ok(u32::try_from(window()?.navigator().max_touch_points()).unwrap_or(0))
    }
}

pub struct WebMediaStream {
    stream: MediaStream,
    stopped: bool,
}

impl WebMediaStream {
    pub fn media_stream(&self) -> &MediaStream {
        &self.stream
    }
}

impl CameraStream for WebMediaStream {
    fn track_count(&self) -> usize {
        if self.stopped {
            0
        } else {
            self.stream.get_tracks().length() as usize
        }
    }

    fn stop_all_tracks(&mut self) {
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
        self.stopped = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rear camera through `getUserMedia`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebCamera;

impl CameraAccess for WebCamera {
    fn request_stream(
        &self,
    ) -> LocalBoxFuture<'static, Result<Box<dyn CameraStream>, PlatformError>> {
        async move {
            let window =
                web_sys::window().ok_or_else(|| PlatformError::NotSupported("window".into()))?;
            let devices = window.navigator().media_devices().map_err(platform_error)?;

            let video = Object::new();
            Reflect::set(
                &video,
                &JsValue::from_str("facingMode"),
                &JsValue::from_str("environment"),
            )
            .map_err(platform_error)?;
            let constraints = MediaStreamConstraints::new();
            constraints.set_audio(&JsValue::FALSE);
            constraints.set_video(video.as_ref());

            let promise = devices
                .get_user_media_with_constraints(&constraints)
                .map_err(platform_error)?;
            let stream = JsFuture::from(promise)
                .await
                .map_err(platform_error)?
                .dyn_into::<MediaStream>()
                .map_err(|_| PlatformError::Failure("getUserMedia resolved to a non-stream".into()))?;
            let stream: Box<dyn CameraStream> = Box::new(WebMediaStream {
                stream,
                stopped: false,
            });
            Ok(stream)
        }
        .boxed_local()
    }
}

/// Host-page object exposing the native AR button and content surfaces.
///
/// Expected methods: `arAvailable()`, `activateAr(request) -> Promise<"activated" |
/// "unsupported">`, `deactivateAr()`, `present(presentation) -> number`,
/// `presentOverCamera(stream, presentation) -> number`, `dismiss(slot)`.
#[derive(Debug, Clone)]
pub struct JsHostBridge {
    host: JsValue,
}

impl JsHostBridge {
    pub fn new(host: JsValue) -> Self {
        Self { host }
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, PlatformError> {
        let function = get(&self.host, method)
            .map_err(platform_error)?
            .dyn_into::<Function>()
            .map_err(|_| PlatformError::NotSupported(format!("host.{method}")))?;
        let args: Array = args.iter().collect();
        function.apply(&self.host, &args).map_err(platform_error)
    }

    fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, PlatformError> {
        let json = serde_json::to_string(value).map_err(|e| PlatformError::Failure(e.to_string()))?;
        js_sys::JSON::parse(&json).map_err(platform_error)
    }

    fn slot(value: JsValue) -> Result<SurfaceSlot, PlatformError> {
        value
            .as_f64()
            .filter(|slot| *slot >= 0.0)
            .map(|slot| SurfaceSlot(slot as u64))
            .ok_or_else(|| PlatformError::Failure("host returned no surface slot".into()))
    }
}

impl NativeArSurface for JsHostBridge {
    fn is_available(&self) -> bool {
        self.call("arAvailable", &[])
            .map(|value| value.as_bool().unwrap_or(false))
            .unwrap_or(false)
    }

    fn activate(
        &self,
        request: NativeArRequest,
    ) -> LocalBoxFuture<'static, Result<NativeArOutcome, PlatformError>> {
        let bridge = self.clone();
        async move {
            let payload = Object::new();
            Reflect::set(
                &payload,
                &JsValue::from_str("modelUrl"),
                &JsValue::from_str(&request.model_url),
            )
            .map_err(platform_error)?;
            if let Some(mime) = request.mime_type.as_deref() {
                Reflect::set(&payload, &JsValue::from_str("mimeType"), &JsValue::from_str(mime))
                    .map_err(platform_error)?;
            }
            let result = bridge.call("activateAr", &[JsValue::from(payload)])?;
            let result = match result.dyn_into::<Promise>() {
                Ok(promise) => JsFuture::from(promise).await.map_err(platform_error)?,
                Err(value) => value,
            };
            match result.as_string().as_deref() {
                Some("activated") => Ok(NativeArOutcome::Activated),
                _ => Ok(NativeArOutcome::Unsupported),
            }
        }
        .boxed_local()
    }

    fn deactivate(&self) -> Result<(), PlatformError> {
        self.call("deactivateAr", &[]).map(|_| ())
    }
}

impl ContentSurface for JsHostBridge {
    fn present(&self, presentation: Presentation) -> Result<SurfaceSlot, PlatformError> {
        let value = self.call("present", &[Self::to_js(&presentation)?])?;
        Self::slot(value)
    }

    fn present_over_camera(
        &self,
        stream: &dyn CameraStream,
        presentation: Presentation,
    ) -> Result<SurfaceSlot, PlatformError> {
        let stream = stream
            .as_any()
            .downcast_ref::<WebMediaStream>()
            .ok_or_else(|| PlatformError::Failure("camera stream is not a browser stream".into()))?;
        let value = self.call(
            "presentOverCamera",
            &[JsValue::from(stream.media_stream().clone()), Self::to_js(&presentation)?],
        )?;
        Self::slot(value)
    }

    fn dismiss(&self, slot: SurfaceSlot) -> Result<(), PlatformError> {
        self.call("dismiss", &[JsValue::from_f64(slot.0 as f64)])
            .map(|_| ())
    }
}
