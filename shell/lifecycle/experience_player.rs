/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Navigation over an experience's assets.
//!
//! The player owns the only [`ArSession`] for its experience. Every navigation
//! runs the same sequence: end the live session, move the index, bind the
//! asset now under the index. Mount futures run on the host's
//! [`TaskSpawner`] and report back over a channel that [`ExperiencePlayer::pump`]
//! drains on the UI thread.

use std::rc::Rc;

use arshell_core::{ArCapabilities, Asset, Experience, ExperienceId};
use crossbeam_channel::{Receiver, Sender, unbounded};
use futures_util::FutureExt;
use serde_json::{Value, json};

use crate::platform::{PlatformServices, TaskSpawner};
use crate::registries::atomic::AssetRendererRegistry;
use crate::shell::lifecycle::ar_session::{
    ArSession, CompletionOutcome, MountCompletion, SessionState, SessionView,
};
use crate::shell::runtime::instrumentation::{
    EventEmitter, InstrumentationSink, LifecycleEventKind,
};
use crate::shell::strategies::{StrategyError, StrategyFactory};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    #[error("asset index {index} out of range for {len} assets")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("experience {0} has no assets")]
    EmptyExperience(ExperienceId),
}

/// Collaborators a player needs besides the experience itself.
#[derive(Clone)]
pub struct PlayerServices {
    pub registry: AssetRendererRegistry,
    pub platform: PlatformServices,
    pub sink: Rc<dyn InstrumentationSink>,
    pub spawner: Rc<dyn TaskSpawner>,
}

#[derive(Debug, Clone, Copy)]
enum Navigation {
    Next,
    Previous,
    Jump,
}

impl Navigation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Jump => "jump",
        }
    }
}

pub struct ExperiencePlayer {
    experience: Experience,
    caps: ArCapabilities,
    registry: AssetRendererRegistry,
    factory: StrategyFactory,
    spawner: Rc<dyn TaskSpawner>,
    events: Rc<EventEmitter>,
    session: ArSession,
    current: usize,
    completions_tx: Sender<MountCompletion>,
    completions_rx: Receiver<MountCompletion>,
}

impl ExperiencePlayer {
    pub fn new(
        experience: Experience,
        caps: ArCapabilities,
        services: PlayerServices,
    ) -> Result<Self, PlayerError> {
        if experience.is_empty() {
            return Err(PlayerError::EmptyExperience(experience.id().clone()));
        }
        let events = Rc::new(EventEmitter::new(services.sink, experience.id().clone()));
        let (completions_tx, completions_rx) = unbounded();
        Ok(Self {
            session: ArSession::new(services.platform.surface.clone(), events.clone()),
            factory: StrategyFactory::new(services.platform),
            registry: services.registry,
            spawner: services.spawner,
            experience,
            caps,
            events,
            current: 0,
            completions_tx,
            completions_rx,
        })
    }

    /// Binds the first asset. Later calls do nothing.
    pub fn start(&mut self) {
        if *self.session.state() == SessionState::Idle {
            self.bind_current();
        }
    }

    pub fn experience(&self) -> &Experience {
        &self.experience
    }

    pub fn capabilities(&self) -> &ArCapabilities {
        &self.caps
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_asset(&self) -> Option<&Asset> {
        self.experience.asset(self.current)
    }

    pub fn len(&self) -> usize {
        self.experience.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experience.is_empty()
    }

    pub fn session(&self) -> &ArSession {
        &self.session
    }

    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn view(&self) -> SessionView {
        self.session.view()
    }

    pub fn next(&mut self) {
        let target = (self.current + 1) % self.len();
        self.navigate(target, Navigation::Next);
    }

    pub fn previous(&mut self) {
        let len = self.len();
        let target = (self.current + len - 1) % len;
        self.navigate(target, Navigation::Previous);
    }

    pub fn jump_to(&mut self, index: usize) -> Result<(), PlayerError> {
        let len = self.len();
        if index >= len {
            return Err(PlayerError::IndexOutOfRange { index, len });
        }
        self.navigate(index, Navigation::Jump);
        Ok(())
    }

    /// Rebinds the current asset from scratch, e.g. after an error.
    pub fn retry(&mut self) {
        self.pump();
        self.bind_current();
    }

    /// Ends the live session; the index stays where it is.
    pub fn exit(&mut self) {
        self.pump();
        self.session.unbind();
    }

    /// Forwards a runtime failure of the mounted strategy into the session.
    pub fn report_strategy_error(&mut self, err: StrategyError) -> bool {
        self.session.report_failure(err)
    }

    /// Applies mount completions delivered since the last call, in arrival
    /// order. Returns how many were applied to the current bind.
    ///
    /// Navigation, `retry` and `exit` pump first, so a mount that finished
    /// but was never applied is still released by the unbind that follows.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.session.complete_mount(completion) == CompletionOutcome::Applied {
                applied += 1;
            }
        }
        applied
    }

    /// Records a user interaction (`ar_button_tapped`, `asset_shared`, ...)
    /// against the current asset and session.
    pub fn record_interaction(&self, name: &str, extra: Option<Value>) {
        self.events.record(
            name,
            self.current_asset().map(Asset::id),
            self.session.session_id(),
            extra,
        );
    }

    fn navigate(&mut self, target: usize, via: Navigation) {
        self.pump();
        let from = self.current;
        if target == from {
            // Nothing to switch to; keep the current session untouched.
            self.emit_navigated(from, target, via);
            return;
        }
        self.session.unbind();
        self.current = target;
        self.emit_navigated(from, target, via);
        self.bind_current();
    }

    fn emit_navigated(&self, from: usize, to: usize, via: Navigation) {
        self.events.emit(
            LifecycleEventKind::AssetNavigated,
            self.current_asset().map(Asset::id),
            self.session.session_id(),
            Some(json!({ "from": from, "to": to, "via": via.as_str() })),
        );
    }

    fn bind_current(&mut self) {
        let Some(asset) = self.experience.asset(self.current) else {
            return;
        };
        let resolution = self
            .registry
            .resolve(asset.kind(), &self.caps)
            .map(|selection| self.factory.instantiate(selection.renderer));
        let Some(pending) = self.session.bind(asset, &self.caps, resolution) else {
            return;
        };
        let tx = self.completions_tx.clone();
        self.spawner.spawn_local(
            async move {
                let completion = pending.resolve().await;
                if tx.send(completion).is_err() {
                    log::debug!("player dropped before mount completed");
                }
            }
            .boxed_local(),
        );
    }
}

impl Drop for ExperiencePlayer {
    fn drop(&mut self) {
        self.pump();
        self.session.unbind();
    }
}
