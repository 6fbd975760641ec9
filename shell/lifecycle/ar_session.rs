/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Session state machine for the asset a player is currently showing.
//!
//! ```text
//! idle -> checking -> ready -> active -> ended
//!                  \-> unsupported
//! checking | ready | active -> error
//! ```
//!
//! [`ArSession::bind`] tears down whatever is live before starting over, so a
//! session never holds two mounts. Mounting is asynchronous: `bind` hands back
//! a [`PendingMount`] and the result comes back through
//! [`ArSession::complete_mount`], tagged with the [`BindEpoch`] it was started
//! under. Completions from an older epoch are discarded.

use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset, AssetId, SessionId};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::platform::{ContentSurface, Presentation, SurfaceSlot};
use crate::registries::atomic::{RendererChoice, UnsupportedAssetKind};
use crate::shell::runtime::channels::{
    CHANNEL_SESSION_FALLBACK_FAILED, CHANNEL_SESSION_MOUNT_DISCARDED,
    CHANNEL_SESSION_UNMOUNT_FAILED,
};
use crate::shell::runtime::diagnostics;
use crate::shell::runtime::instrumentation::{EventEmitter, LifecycleEventKind};
use crate::shell::strategies::{
    MountFuture, MountHandle, Readiness, RendererStrategy, StrategyError, UnsupportedReason,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BindEpoch(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    MountFailed,
    PermissionDenied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub asset_id: AssetId,
    pub reason: FailureReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Checking,
    Ready,
    Unsupported(UnsupportedReason),
    Active,
    Ended,
    Error(SessionFailure),
}

impl SessionState {
    /// Holding or acquiring a mount.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Checking | Self::Ready | Self::Active)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Checking | Self::Ready)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Ready => "ready",
            Self::Unsupported(_) => "unsupported",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Error(_) => "error",
        }
    }

    fn permits(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle | Ended | Unsupported(_) | Error(_), Checking) => true,
            (Checking, Ready | Unsupported(_) | Error(_)) => true,
            (Ready, Active | Error(_) | Ended) => true,
            (Active, Error(_) | Ended) => true,
            (Checking | Unsupported(_) | Error(_), Ended) => true,
            _ => false,
        }
    }
}

/// Flags the presentation layer renders from. Always derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: &'static str,
    pub show_spinner: bool,
    pub show_error_banner: bool,
    pub show_permission_help: bool,
    pub show_unsupported_fallback: bool,
    pub show_active_hud: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SessionView {
    pub fn from_state(state: &SessionState) -> Self {
        let failure = match state {
            SessionState::Error(failure) => Some(failure),
            _ => None,
        };
        Self {
            state: state.label(),
            show_spinner: state.is_loading(),
            show_error_banner: failure.is_some(),
            show_permission_help: failure
                .is_some_and(|f| f.reason == FailureReason::PermissionDenied),
            show_unsupported_fallback: matches!(state, SessionState::Unsupported(_)),
            show_active_hud: *state == SessionState::Active,
            error_message: failure.map(|f| f.message.clone()),
        }
    }
}

/// A mount started by `bind`, to be driven by the host executor.
pub struct PendingMount {
    epoch: BindEpoch,
    asset_id: AssetId,
    strategy: Rc<dyn RendererStrategy>,
    future: MountFuture,
}

impl PendingMount {
    pub fn epoch(&self) -> BindEpoch {
        self.epoch
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub async fn resolve(self) -> MountCompletion {
        let result = self.future.await;
        MountCompletion {
            epoch: self.epoch,
            asset_id: self.asset_id,
            strategy: self.strategy,
            result,
        }
    }
}

pub struct MountCompletion {
    pub epoch: BindEpoch,
    pub asset_id: AssetId,
    pub strategy: Rc<dyn RendererStrategy>,
    pub result: Result<MountHandle, StrategyError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    Discarded,
}

pub struct ArSession {
    state: SessionState,
    bound_asset: Option<AssetId>,
    session_id: Option<SessionId>,
    epoch: BindEpoch,
    cancel: Option<CancellationToken>,
    strategy: Option<Rc<dyn RendererStrategy>>,
    handle: Option<MountHandle>,
    fallback_slot: Option<SurfaceSlot>,
    surface: Rc<dyn ContentSurface>,
    events: Rc<EventEmitter>,
}

impl ArSession {
    pub(crate) fn new(surface: Rc<dyn ContentSurface>, events: Rc<EventEmitter>) -> Self {
        Self {
            state: SessionState::Idle,
            bound_asset: None,
            session_id: None,
            epoch: BindEpoch::default(),
            cancel: None,
            strategy: None,
            handle: None,
            fallback_slot: None,
            surface,
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn view(&self) -> SessionView {
        SessionView::from_state(&self.state)
    }

    pub fn bound_asset_id(&self) -> Option<&AssetId> {
        self.bound_asset.as_ref()
    }

    /// Correlation token of the current activation; set only while `active`.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn epoch(&self) -> BindEpoch {
        self.epoch
    }

    pub fn renderer(&self) -> Option<RendererChoice> {
        self.strategy.as_ref().map(|strategy| strategy.renderer())
    }

    pub fn failure(&self) -> Option<&SessionFailure> {
        match &self.state {
            SessionState::Error(failure) => Some(failure),
            _ => None,
        }
    }

    /// Binds `asset`, ending any live session first.
    ///
    /// `resolution` is the registry's answer for the asset. Returns the mount
    /// to drive when the strategy is ready; `None` when the session settled
    /// synchronously in `unsupported` or `error`.
    pub fn bind(
        &mut self,
        asset: &Asset,
        caps: &ArCapabilities,
        resolution: Result<Rc<dyn RendererStrategy>, UnsupportedAssetKind>,
    ) -> Option<PendingMount> {
        self.unbind();

        self.epoch = BindEpoch(self.epoch.0 + 1);
        self.bound_asset = Some(asset.id().clone());
        self.session_id = None;
        self.transition(SessionState::Checking);

        let strategy = match resolution {
            Ok(strategy) => strategy,
            Err(UnsupportedAssetKind { kind }) => {
                self.emit(
                    LifecycleEventKind::AssetBound,
                    Some(json!({ "kind": kind.as_str() })),
                );
                self.show_fallback(Presentation::Placeholder {
                    label: format!("Unsupported content type: {kind}"),
                });
                self.settle_unsupported(UnsupportedReason::UnknownAssetKind(kind));
                return None;
            }
        };
        self.emit(
            LifecycleEventKind::AssetBound,
            Some(json!({
                "kind": asset.kind().as_str(),
                "renderer": strategy.renderer().renderer_id(),
            })),
        );
        self.strategy = Some(strategy.clone());

        match strategy.check(asset, caps) {
            Ok(Readiness::Ready) => {}
            Ok(Readiness::Declined(reason)) => {
                if let Some(fallback) = strategy.fallback(asset) {
                    self.show_fallback(fallback);
                }
                self.settle_unsupported(reason);
                return None;
            }
            Err(err) => {
                self.fail(err);
                return None;
            }
        }

        self.transition(SessionState::Ready);
        self.emit(LifecycleEventKind::SessionReady, None);

        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        Some(PendingMount {
            epoch: self.epoch,
            asset_id: asset.id().clone(),
            future: strategy.mount(asset, caps, cancel),
            strategy,
        })
    }

    /// Applies a finished mount if it still belongs to the current bind.
    pub fn complete_mount(&mut self, completion: MountCompletion) -> CompletionOutcome {
        let MountCompletion {
            epoch,
            asset_id,
            strategy,
            result,
        } = completion;

        if epoch != self.epoch || self.state != SessionState::Ready {
            log::debug!(
                "discarding mount for {asset_id} from epoch {} (now {} in {})",
                epoch.0,
                self.epoch.0,
                self.state.label()
            );
            diagnostics::emit(
                CHANNEL_SESSION_MOUNT_DISCARDED,
                format!("{asset_id} epoch {}", epoch.0),
            );
            if let Ok(handle) = result
                && let Err(err) = strategy.unmount(handle)
            {
                log::warn!("unmount of discarded mount for {asset_id} failed: {err}");
                diagnostics::emit(CHANNEL_SESSION_UNMOUNT_FAILED, err.to_string());
            }
            return CompletionOutcome::Discarded;
        }

        match result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.session_id = Some(SessionId::new());
                self.transition(SessionState::Active);
                self.emit(
                    LifecycleEventKind::SessionActive,
                    Some(json!({ "renderer": handle.renderer.renderer_id() })),
                );
            }
            Err(err) => self.fail(err),
        }
        CompletionOutcome::Applied
    }

    /// Ends the live session. Unmount runs before the state changes and its
    /// failure never stops the transition.
    pub fn unbind(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.release_mount();
        self.dismiss_fallback();
        self.strategy = None;

        if matches!(self.state, SessionState::Idle | SessionState::Ended) {
            return;
        }
        // Leaving `unsupported` or `error` still ends the session, marked not live.
        let extra = (!self.state.is_live()).then(|| json!({ "live": false }));
        let session_id = self.session_id.take();
        self.transition(SessionState::Ended);
        self.events.emit(
            LifecycleEventKind::SessionEnded,
            self.bound_asset.as_ref(),
            session_id,
            extra,
        );
    }

    /// Moves a `ready` or `active` session to `error` after a runtime failure
    /// reported by the host (camera track ended, AR session lost). Returns
    /// whether the failure was applied.
    pub fn report_failure(&mut self, err: StrategyError) -> bool {
        if !matches!(self.state, SessionState::Ready | SessionState::Active) {
            log::debug!(
                "ignoring strategy failure in {}: {err}",
                self.state.label()
            );
            return false;
        }
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.release_mount();
        self.fail(err);
        true
    }

    fn release_mount(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let Some(strategy) = self.strategy.as_ref() else {
            return;
        };
        if let Err(err) = strategy.unmount(handle) {
            log::warn!(
                "unmount of {} failed, continuing: {err}",
                handle.renderer.renderer_id()
            );
            diagnostics::emit(CHANNEL_SESSION_UNMOUNT_FAILED, err.to_string());
        }
    }

    fn show_fallback(&mut self, presentation: Presentation) {
        match self.surface.present(presentation) {
            Ok(slot) => self.fallback_slot = Some(slot),
            Err(err) => {
                log::warn!("fallback presentation failed: {err}");
                diagnostics::emit(CHANNEL_SESSION_FALLBACK_FAILED, err.to_string());
            }
        }
    }

    fn dismiss_fallback(&mut self) {
        if let Some(slot) = self.fallback_slot.take()
            && let Err(err) = self.surface.dismiss(slot)
        {
            log::warn!("dismissing fallback failed: {err}");
            diagnostics::emit(CHANNEL_SESSION_FALLBACK_FAILED, err.to_string());
        }
    }

    fn settle_unsupported(&mut self, reason: UnsupportedReason) {
        let extra = match &reason {
            UnsupportedReason::UnknownAssetKind(kind) => {
                json!({ "reason": reason.as_str(), "kind": kind })
            }
            _ => json!({ "reason": reason.as_str() }),
        };
        self.transition(SessionState::Unsupported(reason));
        self.emit(LifecycleEventKind::SessionUnsupported, Some(extra));
    }

    fn fail(&mut self, err: StrategyError) {
        self.cancel = None;
        let reason = if err.is_permission_denied() {
            FailureReason::PermissionDenied
        } else {
            FailureReason::MountFailed
        };
        let asset_id = self
            .bound_asset
            .clone()
            .unwrap_or_else(|| AssetId::new(""));
        let failure = SessionFailure {
            asset_id,
            reason,
            message: err.to_string(),
        };
        let extra = json!({ "reason": reason, "message": failure.message });
        self.transition(SessionState::Error(failure));
        self.emit(LifecycleEventKind::SessionError, Some(extra));
    }

    fn transition(&mut self, next: SessionState) {
        if !self.state.permits(&next) {
            log::warn!(
                "unexpected session transition {} -> {}",
                self.state.label(),
                next.label()
            );
        }
        log::debug!(
            "session {}: {} -> {}",
            self.bound_asset
                .as_ref()
                .map(AssetId::as_str)
                .unwrap_or("-"),
            self.state.label(),
            next.label()
        );
        self.state = next;
    }

    fn emit(&self, kind: LifecycleEventKind, extra: Option<serde_json::Value>) {
        self.events
            .emit(kind, self.bound_asset.as_ref(), self.session_id, extra);
    }
}
