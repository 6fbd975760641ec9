/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Diagnostics channel identifiers.
//!
//! These are internal engine signals, separate from the lifecycle events the
//! instrumentation sink receives.

pub(crate) const CHANNEL_CAPABILITY_CHECK_FAILED: &str = "runtime.capability.check_failed";
pub(crate) const CHANNEL_CAPABILITY_PROBE_COMPLETED: &str = "runtime.capability.probe_completed";
pub(crate) const CHANNEL_RENDERER_SELECTED: &str = "registry.renderer.selected";
pub(crate) const CHANNEL_RENDERER_FALLBACK_USED: &str = "registry.renderer.fallback_used";
pub(crate) const CHANNEL_RENDERER_UNSUPPORTED_KIND: &str = "registry.renderer.unsupported_kind";
pub(crate) const CHANNEL_SESSION_MOUNT_DISCARDED: &str = "lifecycle.session.mount_discarded";
pub(crate) const CHANNEL_SESSION_UNMOUNT_FAILED: &str = "lifecycle.session.unmount_failed";
pub(crate) const CHANNEL_SESSION_FALLBACK_FAILED: &str = "lifecycle.session.fallback_failed";
pub(crate) const CHANNEL_INSTRUMENTATION_RECORD_FAILED: &str =
    "runtime.instrumentation.record_failed";
pub(crate) const CHANNEL_EXPERIENCE_LOAD_FAILED: &str = "services.experience.load_failed";
