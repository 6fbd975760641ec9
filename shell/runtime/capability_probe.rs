/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! One-shot AR capability detection.
//!
//! Every check is feature detection against a [`CapabilityEnvironment`] and is
//! independent of the others. A check that fails degrades its flag to `false`;
//! the probe itself cannot fail. User-agent sniffing only fills
//! [`PlatformInfo`] and never feeds a flag.

use std::cell::OnceCell;
use std::sync::OnceLock;

use arshell_core::{ArCapabilities, CapabilityFlags, PlatformInfo};
use futures_util::future::LocalBoxFuture;

use crate::shell::runtime::channels::{
    CHANNEL_CAPABILITY_CHECK_FAILED, CHANNEL_CAPABILITY_PROBE_COMPLETED,
};
use crate::shell::runtime::diagnostics;

static PROCESS_CAPABILITIES: OnceLock<ArCapabilities> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("host API missing: {0}")]
    Missing(String),
    #[error("host API threw: {0}")]
    Threw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XrFeature {
    HitTest,
    LightEstimation,
    PlaneDetection,
}

/// Names each individual check for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityCheck {
    SecureContext,
    ImmersiveAr,
    Xr(XrFeature),
    Camera,
    DeviceMotion,
    Geolocation,
    UserAgent,
    TouchPoints,
}

impl CapabilityCheck {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecureContext => "secure_context",
            Self::ImmersiveAr => "immersive_ar",
            Self::Xr(XrFeature::HitTest) => "hit_test",
            Self::Xr(XrFeature::LightEstimation) => "light_estimation",
            Self::Xr(XrFeature::PlaneDetection) => "plane_detection",
            Self::Camera => "camera",
            Self::DeviceMotion => "device_motion",
            Self::Geolocation => "geolocation",
            Self::UserAgent => "user_agent",
            Self::TouchPoints => "max_touch_points",
        }
    }
}

/// What the host page exposes. Implementations must not cache across calls;
/// memoization is the probe's job.
pub trait CapabilityEnvironment {
    fn secure_context(&self) -> Result<bool, ProbeError>;

    /// `navigator.xr.isSessionSupported("immersive-ar")` or equivalent.
    fn immersive_ar_supported(&self) -> LocalBoxFuture<'_, Result<bool, ProbeError>>;

    /// Whether the XR runtime advertises an optional feature. Hints only; the
    /// snapshot clears them when immersive AR is missing.
    fn xr_feature_hint(&self, feature: XrFeature) -> Result<bool, ProbeError>;

    fn camera_api_present(&self) -> Result<bool, ProbeError>;

    fn device_motion_present(&self) -> Result<bool, ProbeError>;

    fn geolocation_present(&self) -> Result<bool, ProbeError>;

    fn user_agent(&self) -> Result<String, ProbeError>;

    fn max_touch_points(&self) -> Result<u32, ProbeError>;
}

/// Memoizing probe bound to one environment.
pub struct CapabilityProbe<E> {
    env: E,
    cached: OnceCell<ArCapabilities>,
}

impl<E: CapabilityEnvironment> CapabilityProbe<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            cached: OnceCell::new(),
        }
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Runs the checks on first call and returns the same snapshot afterwards.
    pub async fn probe(&self) -> ArCapabilities {
        if let Some(caps) = self.cached.get() {
            return caps.clone();
        }
        let caps = run_checks(&self.env).await;
        self.cached.get_or_init(|| caps).clone()
    }

    pub fn cached(&self) -> Option<&ArCapabilities> {
        self.cached.get()
    }
}

/// Process-wide snapshot. The first caller's environment wins; only a reload
/// (a new process) invalidates it.
pub async fn probe_process<E: CapabilityEnvironment>(env: &E) -> ArCapabilities {
    if let Some(caps) = PROCESS_CAPABILITIES.get() {
        return caps.clone();
    }
    let caps = run_checks(env).await;
    PROCESS_CAPABILITIES.get_or_init(|| caps).clone()
}

pub(crate) async fn run_checks<E: CapabilityEnvironment + ?Sized>(env: &E) -> ArCapabilities {
    let immersive = match env.immersive_ar_supported().await {
        Ok(supported) => supported,
        Err(err) => degrade(CapabilityCheck::ImmersiveAr, &err, false),
    };

    let flags = CapabilityFlags {
        webxr_immersive_ar: immersive,
        hit_test: check(CapabilityCheck::Xr(XrFeature::HitTest), || {
            env.xr_feature_hint(XrFeature::HitTest)
        }),
        light_estimation: check(CapabilityCheck::Xr(XrFeature::LightEstimation), || {
            env.xr_feature_hint(XrFeature::LightEstimation)
        }),
        plane_detection: check(CapabilityCheck::Xr(XrFeature::PlaneDetection), || {
            env.xr_feature_hint(XrFeature::PlaneDetection)
        }),
        camera: check(CapabilityCheck::Camera, || env.camera_api_present()),
        secure_context: check(CapabilityCheck::SecureContext, || env.secure_context()),
        device_motion: check(CapabilityCheck::DeviceMotion, || env.device_motion_present()),
        geolocation: check(CapabilityCheck::Geolocation, || env.geolocation_present()),
    };

    let user_agent = env
        .user_agent()
        .unwrap_or_else(|err| degrade(CapabilityCheck::UserAgent, &err, String::new()));
    let touch_points = env
        .max_touch_points()
        .unwrap_or_else(|err| degrade(CapabilityCheck::TouchPoints, &err, 0));

    let caps = ArCapabilities::new(flags, PlatformInfo::from_user_agent(&user_agent, touch_points));
    log::info!(
        "capability probe: webxr={} camera={} secure={} mobile={} browser={}",
        caps.webxr_immersive_ar(),
        caps.camera(),
        caps.secure_context(),
        caps.is_mobile(),
        caps.platform().browser_name
    );
    if let Ok(json) = serde_json::to_string(&caps) {
        diagnostics::emit(CHANNEL_CAPABILITY_PROBE_COMPLETED, json);
    }
    caps
}

fn check(which: CapabilityCheck, run: impl FnOnce() -> Result<bool, ProbeError>) -> bool {
    run().unwrap_or_else(|err| degrade(which, &err, false))
}

fn degrade<T>(which: CapabilityCheck, err: &ProbeError, fallback: T) -> T {
    log::debug!("capability check {} failed: {err}", which.as_str());
    diagnostics::emit(
        CHANNEL_CAPABILITY_CHECK_FAILED,
        format!("{}: {err}", which.as_str()),
    );
    fallback
}

#[cfg(test)]
mod tests {
    use arshell_core::CapabilityFlags;

    use super::{CapabilityCheck, CapabilityProbe, XrFeature, probe_process, run_checks};
    use crate::shell::runtime::diagnostics::{DiagnosticsState, install_global_sender};
    use crate::test_utils::{ANDROID_CHROME_UA, StaticEnvironment};

    fn ar_phone_flags() -> CapabilityFlags {
        CapabilityFlags {
            webxr_immersive_ar: true,
            hit_test: true,
            light_estimation: true,
            plane_detection: false,
            camera: true,
            secure_context: true,
            device_motion: true,
            geolocation: true,
        }
    }

    #[tokio::test]
    async fn probe_reports_environment_flags_and_platform() {
        let probe = CapabilityProbe::new(StaticEnvironment::new(ar_phone_flags(), ANDROID_CHROME_UA));

        let caps = probe.probe().await;

        assert!(caps.webxr_immersive_ar());
        assert!(caps.hit_test());
        assert!(!caps.plane_detection());
        assert!(caps.camera());
        assert!(caps.platform().is_android);
        assert_eq!(caps.platform().browser_name, "Chrome");
    }

    #[tokio::test]
    async fn probe_is_memoized_per_instance() {
        let probe = CapabilityProbe::new(StaticEnvironment::new(ar_phone_flags(), ANDROID_CHROME_UA));

        let first = probe.probe().await;
        let second = probe.probe().await;

        assert_eq!(first, second);
        assert_eq!(probe.environment().immersive_queries(), 1);
    }

    #[tokio::test]
    async fn failing_checks_degrade_to_false_without_touching_others() {
        let (tx, mut diagnostics) = DiagnosticsState::with_channel(16);
        install_global_sender(tx);
        let env = StaticEnvironment::new(ar_phone_flags(), ANDROID_CHROME_UA)
            .failing(CapabilityCheck::ImmersiveAr)
            .failing(CapabilityCheck::Camera);

        let caps = run_checks(&env).await;

        assert!(!caps.webxr_immersive_ar());
        // Hit-test depends on immersive AR, so normalization clears it too.
        assert!(!caps.hit_test());
        assert!(!caps.camera());
        assert!(caps.geolocation());
        assert!(caps.device_motion());
        diagnostics.drain();
        assert_eq!(
            diagnostics.channel_count("runtime.capability.check_failed"),
            2
        );
    }

    #[tokio::test]
    async fn user_agent_failure_leaves_flags_alone() {
        let env = StaticEnvironment::new(ar_phone_flags(), ANDROID_CHROME_UA)
            .failing(CapabilityCheck::UserAgent)
            .failing(CapabilityCheck::Xr(XrFeature::LightEstimation));

        let caps = run_checks(&env).await;

        assert!(caps.webxr_immersive_ar());
        assert!(!caps.light_estimation());
        assert!(!caps.is_mobile());
        assert_eq!(caps.platform().browser_name, "Unknown");
    }

    #[tokio::test]
    async fn insecure_context_never_reports_camera_or_webxr() {
        let flags = CapabilityFlags {
            secure_context: false,
            ..ar_phone_flags()
        };

        let caps = run_checks(&StaticEnvironment::new(flags, ANDROID_CHROME_UA)).await;

        assert!(!caps.secure_context());
        assert!(!caps.webxr_immersive_ar());
        assert!(!caps.camera());
        // Sniffing still works: it is advisory and independent of the flags.
        assert!(caps.is_mobile());
    }

    #[tokio::test]
    async fn process_snapshot_is_idempotent() {
        let env = StaticEnvironment::new(ar_phone_flags(), ANDROID_CHROME_UA);
        let first = probe_process(&env).await;
        let second = probe_process(&StaticEnvironment::new(
            CapabilityFlags::default(),
            "curl/8.0",
        ))
        .await;

        assert_eq!(first, second);
    }
}
