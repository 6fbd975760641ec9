/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Experience fetch contract and the loader that turns a scanned identifier
//! into a running player.
//!
//! The engine does not own experience data. It reads it once through an
//! [`ExperienceSource`] and collapses every way that can go wrong into a
//! single [`LoadFailure`] for the presentation layer. Nothing is retried.

use std::collections::HashMap;

use arshell_core::{
    ArCapabilities, Experience, ExperienceId, ExperienceRef, IdentifierError, NotPlayable,
};
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use serde_json::json;
use url::Url;

use crate::prefs::{PrefsError, ShellPreferences};
use crate::shell::lifecycle::experience_player::{ExperiencePlayer, PlayerError, PlayerServices};
use crate::shell::runtime::channels::CHANNEL_EXPERIENCE_LOAD_FAILED;
use crate::shell::runtime::diagnostics;
use crate::shell::runtime::instrumentation::{EventEmitter, LifecycleEventKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("experience {0} not found")]
    NotFound(ExperienceRef),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed experience payload: {0}")]
    Decode(String),
}

pub trait ExperienceSource {
    fn fetch_experience(
        &self,
        identifier: &ExperienceRef,
    ) -> LocalBoxFuture<'_, Result<Experience, FetchError>>;
}

/// Reads `GET {base}/experiences/{identifier}` from the admin backend.
pub struct HttpExperienceSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpExperienceSource {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    pub fn from_preferences(prefs: &ShellPreferences) -> Result<Self, PrefsError> {
        Ok(Self::new(prefs.api_base_url()?))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn experience_url(&self, identifier: &ExperienceRef) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .push("experiences")
            .push(identifier.as_str());
        Ok(url)
    }

    async fn fetch(&self, identifier: &ExperienceRef) -> Result<Experience, FetchError> {
        let url = self.experience_url(identifier)?;
        log::debug!("fetching experience from {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(identifier.clone()));
        }
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {status}")));
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let experience: Experience =
            serde_json::from_slice(&body).map_err(|err| FetchError::Decode(err.to_string()))?;
        Ok(experience.absolutized(&self.base))
    }
}

impl ExperienceSource for HttpExperienceSource {
    fn fetch_experience(
        &self,
        identifier: &ExperienceRef,
    ) -> LocalBoxFuture<'_, Result<Experience, FetchError>> {
        let identifier = identifier.clone();
        async move { self.fetch(&identifier).await }.boxed_local()
    }
}

/// Fixed set of experiences, looked up by id or slug.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExperienceSource {
    experiences: HashMap<ExperienceId, Experience>,
}

impl InMemoryExperienceSource {
    pub fn new(experiences: impl IntoIterator<Item = Experience>) -> Self {
        Self {
            experiences: experiences
                .into_iter()
                .map(|experience| (experience.id().clone(), experience))
                .collect(),
        }
    }

    pub fn insert(&mut self, experience: Experience) {
        self.experiences.insert(experience.id().clone(), experience);
    }

    fn lookup(&self, identifier: &ExperienceRef) -> Option<&Experience> {
        match identifier {
            ExperienceRef::Id(id) => self.experiences.get(id).or_else(|| {
                self.experiences
                    .values()
                    .find(|experience| experience.answers_to(identifier))
            }),
            ExperienceRef::Slug(_) => self
                .experiences
                .values()
                .find(|experience| experience.answers_to(identifier)),
        }
    }
}

impl ExperienceSource for InMemoryExperienceSource {
    fn fetch_experience(
        &self,
        identifier: &ExperienceRef,
    ) -> LocalBoxFuture<'_, Result<Experience, FetchError>> {
        let found = self
            .lookup(identifier)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(identifier.clone()));
        futures_util::future::ready(found).boxed_local()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadCause {
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    NotPlayable(#[from] NotPlayable),
    #[error(transparent)]
    Player(#[from] PlayerError),
}

/// The one failure the presentation layer sees when an experience cannot be
/// opened. `cause` is kept for logs and analytics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not load experience `{identifier}`: {cause}")]
pub struct LoadFailure {
    pub identifier: String,
    #[source]
    pub cause: LoadCause,
}

impl LoadFailure {
    pub fn is_not_found(&self) -> bool {
        matches!(self.cause, LoadCause::Fetch(FetchError::NotFound(_)))
    }
}

/// Fetches the experience behind a scanned identifier, checks it is playable
/// and starts a player on its first asset.
pub async fn open_experience<S: ExperienceSource + ?Sized>(
    source: &S,
    identifier: &str,
    caps: ArCapabilities,
    services: PlayerServices,
) -> Result<ExperiencePlayer, LoadFailure> {
    let sink = services.sink.clone();
    match load(source, identifier, caps, services).await {
        Ok(mut player) => {
            let experience = player.experience();
            log::info!(
                "loaded experience {} ({} assets)",
                experience.id(),
                experience.len()
            );
            EventEmitter::new(sink, experience.id().clone()).emit(
                LifecycleEventKind::ExperienceLoaded,
                None,
                None,
                Some(json!({
                    "identifier": identifier,
                    "title": experience.title(),
                    "assetCount": experience.len(),
                })),
            );
            player.start();
            Ok(player)
        }
        Err(cause) => {
            let failure = LoadFailure {
                identifier: identifier.to_string(),
                cause,
            };
            log::info!("{failure}");
            diagnostics::emit(CHANNEL_EXPERIENCE_LOAD_FAILED, failure.to_string());
            EventEmitter::new(sink, ExperienceId::new(identifier.trim())).emit(
                LifecycleEventKind::ExperienceLoadFailed,
                None,
                None,
                Some(json!({ "message": failure.cause.to_string() })),
            );
            Err(failure)
        }
    }
}

async fn load<S: ExperienceSource + ?Sized>(
    source: &S,
    identifier: &str,
    caps: ArCapabilities,
    services: PlayerServices,
) -> Result<ExperiencePlayer, LoadCause> {
    let reference = ExperienceRef::parse(identifier)?;
    let experience = source.fetch_experience(&reference).await?;
    experience.ensure_playable()?;
    Ok(ExperiencePlayer::new(experience, caps, services)?)
}
