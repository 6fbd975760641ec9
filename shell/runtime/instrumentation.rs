/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Lifecycle and interaction events for the external instrumentation sink.
//!
//! Recording is fire-and-forget: the engine calls the sink synchronously in
//! transition order and swallows any failure, so analytics can never stall or
//! break navigation.

use std::rc::Rc;

use arshell_core::{AssetId, ExperienceId, SessionId};
use crossbeam_channel::Sender;
use serde::Serialize;
use serde_json::Value;

use crate::shell::runtime::channels::CHANNEL_INSTRUMENTATION_RECORD_FAILED;
use crate::shell::runtime::diagnostics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEventKind {
    AssetBound,
    SessionReady,
    SessionActive,
    SessionError,
    SessionUnsupported,
    SessionEnded,
    AssetNavigated,
    ExperienceLoaded,
    ExperienceLoadFailed,
}

impl LifecycleEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssetBound => "asset_bound",
            Self::SessionReady => "session_ready",
            Self::SessionActive => "session_active",
            Self::SessionError => "session_error",
            Self::SessionUnsupported => "session_unsupported",
            Self::SessionEnded => "session_ended",
            Self::AssetNavigated => "asset_navigated",
            Self::ExperienceLoaded => "experience_loaded",
            Self::ExperienceLoadFailed => "experience_load_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub experience_id: ExperienceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("instrumentation sink failed: {0}")]
pub struct SinkError(pub String);

pub trait InstrumentationSink {
    fn record(&self, event_name: &str, payload: &EventPayload) -> Result<(), SinkError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl InstrumentationSink for NullSink {
    fn record(&self, _event_name: &str, _payload: &EventPayload) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes each event as one `info` line with a JSON payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl InstrumentationSink for LogSink {
    fn record(&self, event_name: &str, payload: &EventPayload) -> Result<(), SinkError> {
        let json = serde_json::to_string(payload).map_err(|e| SinkError(e.to_string()))?;
        log::info!("instrumentation {event_name} {json}");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    pub payload: EventPayload,
}

/// Forwards events to a channel so an uploader can batch them off the hot path.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<RecordedEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<RecordedEvent>) -> Self {
        Self { tx }
    }
}

impl InstrumentationSink for ChannelSink {
    fn record(&self, event_name: &str, payload: &EventPayload) -> Result<(), SinkError> {
        self.tx
            .try_send(RecordedEvent {
                name: event_name.to_string(),
                payload: payload.clone(),
            })
            .map_err(|e| SinkError(e.to_string()))
    }
}

/// Stamps the experience id onto every event and shields callers from sink
/// failures.
pub(crate) struct EventEmitter {
    sink: Rc<dyn InstrumentationSink>,
    experience_id: ExperienceId,
}

impl EventEmitter {
    pub(crate) fn new(sink: Rc<dyn InstrumentationSink>, experience_id: ExperienceId) -> Self {
        Self {
            sink,
            experience_id,
        }
    }

    pub(crate) fn emit(
        &self,
        kind: LifecycleEventKind,
        asset_id: Option<&AssetId>,
        session_id: Option<SessionId>,
        extra: Option<Value>,
    ) {
        self.record(kind.as_str(), asset_id, session_id, extra);
    }

    pub(crate) fn record(
        &self,
        event_name: &str,
        asset_id: Option<&AssetId>,
        session_id: Option<SessionId>,
        extra: Option<Value>,
    ) {
        let payload = EventPayload {
            experience_id: self.experience_id.clone(),
            asset_id: asset_id.cloned(),
            session_id,
            extra,
        };
        if let Err(err) = self.sink.record(event_name, &payload) {
            log::debug!("dropping instrumentation event {event_name}: {err}");
            diagnostics::emit(CHANNEL_INSTRUMENTATION_RECORD_FAILED, event_name.to_string());
        }
    }
}
