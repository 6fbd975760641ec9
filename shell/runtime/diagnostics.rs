/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Internal diagnostics bus.
//!
//! Engine components call [`emit_event`] with a channel id from
//! [`super::channels`]; whoever installed the global sender (normally a
//! [`DiagnosticsState`]) drains and aggregates them. Emission never blocks and
//! is a no-op until a sender is installed.

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde_json::{Value, json};

static GLOBAL_DIAGNOSTICS_TX: OnceLock<Sender<DiagnosticEvent>> = OnceLock::new();

#[cfg(test)]
thread_local! {
    static TEST_DIAGNOSTICS_TX: std::cell::RefCell<Option<Sender<DiagnosticEvent>>> =
        const { std::cell::RefCell::new(None) };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub channel_id: &'static str,
    pub detail: String,
}

impl DiagnosticEvent {
    pub(crate) fn new(channel_id: &'static str, detail: impl Into<String>) -> Self {
        Self {
            channel_id,
            detail: detail.into(),
        }
    }
}

pub(crate) fn install_global_sender(sender: Sender<DiagnosticEvent>) {
    let _ = GLOBAL_DIAGNOSTICS_TX.set(sender.clone());

    #[cfg(test)]
    {
        TEST_DIAGNOSTICS_TX.with(|slot| {
            *slot.borrow_mut() = Some(sender.clone());
        });
    }
}

pub(crate) fn emit_event(event: DiagnosticEvent) {
    #[cfg(test)]
    {
        let mut event = Some(event);
        TEST_DIAGNOSTICS_TX.with(|slot| {
            if let Some(tx) = slot.borrow().as_ref()
                && let Some(payload) = event.take()
            {
                let _ = tx.send(payload);
            }
        });
        if let Some(payload) = event
            && let Some(tx) = GLOBAL_DIAGNOSTICS_TX.get()
        {
            let _ = tx.send(payload);
        }
    }

    #[cfg(not(test))]
    {
        if let Some(tx) = GLOBAL_DIAGNOSTICS_TX.get() {
            let _ = tx.send(event);
        }
    }
}

pub(crate) fn emit(channel_id: &'static str, detail: impl Into<String>) {
    emit_event(DiagnosticEvent::new(channel_id, detail));
}

/// Bounded ring of recent diagnostics plus per-channel counters.
pub struct DiagnosticsState {
    rx: Receiver<DiagnosticEvent>,
    ring: VecDeque<DiagnosticEvent>,
    capacity: usize,
    counts: HashMap<&'static str, u64>,
}

impl DiagnosticsState {
    /// Creates the state and installs its sender as the process-wide sink.
    /// Only the first installation in a process takes effect.
    pub fn install(capacity: usize) -> Self {
        let (tx, state) = Self::with_channel(capacity);
        install_global_sender(tx);
        state
    }

    pub(crate) fn with_channel(capacity: usize) -> (Sender<DiagnosticEvent>, Self) {
        let (tx, rx) = unbounded();
        let state = Self {
            rx,
            ring: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            counts: HashMap::new(),
        };
        (tx, state)
    }

    /// Moves pending events into the ring. Returns how many were drained.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(event) = self.rx.try_recv() {
            *self.counts.entry(event.channel_id).or_insert(0) += 1;
            if self.ring.len() == self.capacity {
                self.ring.pop_front();
            }
            self.ring.push_back(event);
            drained += 1;
        }
        drained
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channel_count(&self, channel_id: &str) -> u64 {
        self.counts.get(channel_id).copied().unwrap_or(0)
    }

    pub fn recent(&self) -> impl Iterator<Item = &DiagnosticEvent> {
        self.ring.iter()
    }

    pub fn snapshot_json(&self) -> Value {
        let mut channels: Vec<(&&'static str, &u64)> = self.counts.iter().collect();
        channels.sort_by(|a, b| a.0.cmp(b.0));
        let channel_counts: serde_json::Map<String, Value> = channels
            .into_iter()
            .map(|(channel, count)| (channel.to_string(), json!(count)))
            .collect();
        let recent: Vec<Value> = self
            .ring
            .iter()
            .map(|event| json!({ "channel": event.channel_id, "detail": event.detail }))
            .collect();
        json!({
            "capacity": self.capacity,
            "channel_counts": channel_counts,
            "recent": recent,
        })
    }
}
