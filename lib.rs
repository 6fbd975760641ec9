/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Capability detection and AR session orchestration for QR-launched
//! experiences.
//!
//! A host page probes the device once ([`CapabilityProbe`]), opens an
//! experience ([`open_experience`]) and drives the resulting
//! [`ExperiencePlayer`]: navigation calls, [`ExperiencePlayer::pump`] after
//! spawned mounts make progress, and [`ExperiencePlayer::view`] for what to
//! render. Device access goes through the traits in [`platform`].

pub mod platform;
pub(crate) mod prefs;
pub(crate) mod registries;
pub(crate) mod services;
pub(crate) mod shell;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use arshell_core::{
    ArCapabilities, Asset, AssetError, AssetId, AssetKind, CapabilityFlags, Experience,
    ExperienceId, ExperienceRef, IdentifierError, NotPlayable, PlatformInfo, SessionId,
};
pub use prefs::{PrefsError, ShellPreferences};
pub use registries::atomic::{
    AssetRendererRegistry, RendererChoice, RendererPolicy, RendererSelection, UnsupportedAssetKind,
};
pub use services::experience_source::{
    ExperienceSource, FetchError, HttpExperienceSource, InMemoryExperienceSource, LoadCause,
    LoadFailure, open_experience,
};
pub use shell::lifecycle::ar_session::{
    ArSession, BindEpoch, CompletionOutcome, FailureReason, MountCompletion, PendingMount,
    SessionFailure, SessionState, SessionView,
};
pub use shell::lifecycle::experience_player::{ExperiencePlayer, PlayerError, PlayerServices};
pub use shell::runtime::capability_probe::{
    CapabilityCheck, CapabilityEnvironment, CapabilityProbe, ProbeError, XrFeature, probe_process,
};
pub use shell::runtime::diagnostics::{DiagnosticEvent, DiagnosticsState};
pub use shell::runtime::instrumentation::{
    ChannelSink, EventPayload, InstrumentationSink, LifecycleEventKind, LogSink, NullSink,
    RecordedEvent, SinkError,
};
pub use shell::strategies::{
    CameraOverlayStrategy, EmbeddedFrameStrategy, MountFuture, MountHandle, MountId,
    NativeArStrategy, Readiness, RendererStrategy, ScenePreviewStrategy, StaticMediaStrategy,
    StrategyError, StrategyFactory, TextPanelStrategy, UnsupportedReason,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Installs a `tracing` fmt subscriber filtered by `filter` (an `EnvFilter`
/// directive such as `arshell=debug`). Returns false if no filter was given
/// or a global subscriber was already set.
#[cfg(feature = "tracing")]
pub fn init_tracing(filter: Option<&str>) -> bool {
    use tracing_subscriber::EnvFilter;

    let Some(directive) = filter else {
        return false;
    };
    let env_filter = EnvFilter::try_new(directive).unwrap_or_else(|err| {
        log::warn!("invalid tracing filter `{directive}`: {err}, falling back to info");
        EnvFilter::new("info")
    });
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter = directive, "tracing subscriber installed");
    }
    installed
}

#[cfg(not(feature = "tracing"))]
pub fn init_tracing(_filter: Option<&str>) -> bool {
    false
}
