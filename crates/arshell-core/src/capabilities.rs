/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Capability snapshot produced once per page load.
//!
//! [`ArCapabilities`] is a value object: fields are private and the only
//! constructor normalizes the flags, so a snapshot can never claim a
//! capability whose prerequisite is missing (hit-test without immersive AR,
//! camera outside a secure context, ...).
//!
//! [`PlatformInfo`] is user-agent sniffing. It is advisory: it feeds analytics
//! and UX copy and is never consulted when computing a capability flag.

use serde::{Deserialize, Serialize};

/// Raw capability flags as reported by individual checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityFlags {
    #[serde(rename = "webxrImmersiveAR")]
    pub webxr_immersive_ar: bool,
    pub hit_test: bool,
    pub light_estimation: bool,
    pub plane_detection: bool,
    pub camera: bool,
    pub secure_context: bool,
    pub device_motion: bool,
    pub geolocation: bool,
}

impl CapabilityFlags {
    /// Clears every flag whose prerequisite is absent.
    pub fn normalized(self) -> Self {
        let secure = self.secure_context;
        let webxr = self.webxr_immersive_ar && secure;
        Self {
            webxr_immersive_ar: webxr,
            hit_test: self.hit_test && webxr,
            light_estimation: self.light_estimation && webxr,
            plane_detection: self.plane_detection && webxr,
            camera: self.camera && secure,
            secure_context: secure,
            device_motion: self.device_motion && secure,
            geolocation: self.geolocation && secure,
        }
    }

    pub fn is_consistent(&self) -> bool {
        *self == self.normalized()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub is_mobile: bool,
    pub is_android: bool,
    #[serde(rename = "isIOS")]
    pub is_ios: bool,
    pub browser_name: String,
}

impl PlatformInfo {
    pub fn desktop(browser_name: impl Into<String>) -> Self {
        Self {
            browser_name: browser_name.into(),
            ..Self::default()
        }
    }

    pub fn from_user_agent(user_agent: &str, max_touch_points: u32) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        let is_android = ua.contains("android");
        // iPadOS 13+ reports a desktop Safari UA; touch support gives it away.
        let is_ios = ["iphone", "ipad", "ipod"].iter().any(|d| ua.contains(d))
            || (ua.contains("macintosh") && max_touch_points > 1);
        let is_mobile = is_android || is_ios || ua.contains("mobile");
        Self {
            is_mobile,
            is_android,
            is_ios,
            browser_name: browser_name(&ua).to_string(),
        }
    }
}

fn browser_name(ua: &str) -> &'static str {
    if ua.contains("samsungbrowser") {
        "Samsung Internet"
    } else if ua.contains("edg/") || ua.contains("edga/") || ua.contains("edgios/") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("firefox") || ua.contains("fxios") {
        "Firefox"
    } else if ua.contains("crios") || ua.contains("chrome") || ua.contains("chromium") {
        "Chrome"
    } else if ua.contains("safari") {
        "Safari"
    } else {
        "Unknown"
    }
}

/// Immutable capability snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArCapabilities {
    #[serde(flatten)]
    flags: CapabilityFlags,
    platform: PlatformInfo,
}

impl ArCapabilities {
    pub fn new(flags: CapabilityFlags, platform: PlatformInfo) -> Self {
        Self {
            flags: flags.normalized(),
            platform,
        }
    }

    /// Snapshot with every flag cleared.
    pub fn none(platform: PlatformInfo) -> Self {
        Self::new(CapabilityFlags::default(), platform)
    }

    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub fn webxr_immersive_ar(&self) -> bool {
        self.flags.webxr_immersive_ar
    }

    pub fn hit_test(&self) -> bool {
        self.flags.hit_test
    }

    pub fn light_estimation(&self) -> bool {
        self.flags.light_estimation
    }

    pub fn plane_detection(&self) -> bool {
        self.flags.plane_detection
    }

    pub fn camera(&self) -> bool {
        self.flags.camera
    }

    pub fn secure_context(&self) -> bool {
        self.flags.secure_context
    }

    pub fn device_motion(&self) -> bool {
        self.flags.device_motion
    }

    pub fn geolocation(&self) -> bool {
        self.flags.geolocation
    }

    pub fn is_mobile(&self) -> bool {
        self.platform.is_mobile
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::{ArCapabilities, CapabilityFlags, PlatformInfo};

    const PIXEL_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36";
    const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
    const IPAD_DESKTOP_MODE: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15";
    const WINDOWS_EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0";

    #[rstest]
    #[case(PIXEL_CHROME, 5, true, true, false, "Chrome")]
    #[case(IPHONE_SAFARI, 5, true, false, true, "Safari")]
    #[case(IPAD_DESKTOP_MODE, 5, true, false, true, "Safari")]
    #[case(IPAD_DESKTOP_MODE, 0, false, false, false, "Safari")]
    #[case(WINDOWS_EDGE, 0, false, false, false, "Edge")]
    fn sniffs_platform_from_user_agent(
        #[case] ua: &str,
        #[case] touch_points: u32,
        #[case] mobile: bool,
        #[case] android: bool,
        #[case] ios: bool,
        #[case] browser: &str,
    ) {
        let info = PlatformInfo::from_user_agent(ua, touch_points);
        assert_eq!(info.is_mobile, mobile);
        assert_eq!(info.is_android, android);
        assert_eq!(info.is_ios, ios);
        assert_eq!(info.browser_name, browser);
    }

    #[test]
    fn insecure_context_clears_dependent_flags() {
        let caps = ArCapabilities::new(
            CapabilityFlags {
                webxr_immersive_ar: true,
                hit_test: true,
                camera: true,
                geolocation: true,
                secure_context: false,
                ..CapabilityFlags::default()
            },
            PlatformInfo::default(),
        );
        assert!(!caps.webxr_immersive_ar());
        assert!(!caps.hit_test());
        assert!(!caps.camera());
        assert!(!caps.geolocation());
    }

    #[test]
    fn xr_features_require_immersive_ar() {
        let caps = ArCapabilities::new(
            CapabilityFlags {
                secure_context: true,
                hit_test: true,
                plane_detection: true,
                light_estimation: true,
                ..CapabilityFlags::default()
            },
            PlatformInfo::default(),
        );
        assert!(!caps.hit_test());
        assert!(!caps.plane_detection());
        assert!(!caps.light_estimation());
        assert!(caps.secure_context());
    }

    #[test]
    fn snapshot_serializes_flat_camel_case() {
        let caps = ArCapabilities::none(PlatformInfo::desktop("Firefox"));
        let value = serde_json::to_value(&caps).expect("serialize");
        assert_eq!(value["webxrImmersiveAR"], false);
        assert_eq!(value["platform"]["browserName"], "Firefox");
        assert_eq!(value["platform"]["isIOS"], false);
    }

    fn any_flags() -> impl Strategy<Value = CapabilityFlags> {
        proptest::array::uniform8(any::<bool>()).prop_map(|b| CapabilityFlags {
            webxr_immersive_ar: b[0],
            hit_test: b[1],
            light_estimation: b[2],
            plane_detection: b[3],
            camera: b[4],
            secure_context: b[5],
            device_motion: b[6],
            geolocation: b[7],
        })
    }

    proptest! {
        #[test]
        fn every_snapshot_is_internally_consistent(flags in any_flags()) {
            let caps = ArCapabilities::new(flags, PlatformInfo::default());
            prop_assert!(caps.flags().is_consistent());
            prop_assert!(!caps.hit_test() || caps.webxr_immersive_ar());
            prop_assert!(caps.secure_context() || !caps.webxr_immersive_ar());
        }

        #[test]
        fn normalization_is_idempotent(flags in any_flags()) {
            prop_assert_eq!(flags.normalized(), flags.normalized().normalized());
        }
    }
}
