/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Experiences: the ordered asset sequence behind one QR code.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::asset::Asset;
use crate::ids::ExperienceId;

fn default_active() -> bool {
    true
}

/// An ordered, immutable collection of assets.
///
/// Asset order is the navigation order and is kept exactly as the backend
/// delivered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    id: ExperienceId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NotPlayable {
    #[error("experience is not active")]
    Inactive,
    #[error("experience has no assets")]
    NoAssets,
}

impl Experience {
    pub fn new(id: impl Into<ExperienceId>, title: impl Into<String>, assets: Vec<Asset>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            slug: None,
            is_active: true,
            assets,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn id(&self) -> &ExperienceId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn asset(&self, index: usize) -> Option<&Asset> {
        self.assets.get(index)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn ensure_playable(&self) -> Result<(), NotPlayable> {
        if !self.is_active {
            return Err(NotPlayable::Inactive);
        }
        if self.assets.is_empty() {
            return Err(NotPlayable::NoAssets);
        }
        Ok(())
    }

    /// Resolves relative asset urls against the api origin. Order is untouched.
    pub fn absolutized(mut self, base: &Url) -> Self {
        self.assets = self
            .assets
            .into_iter()
            .map(|asset| asset.absolutized(base))
            .collect();
        self
    }

    /// True when `identifier` names this experience by id or slug.
    pub fn answers_to(&self, identifier: &ExperienceRef) -> bool {
        match identifier {
            ExperienceRef::Id(id) => &self.id == id,
            ExperienceRef::Slug(slug) => self
                .slug
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(slug)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("experience identifier is empty")]
pub struct IdentifierError;

/// How a QR code or deep link names an experience.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExperienceRef {
    Id(ExperienceId),
    Slug(String),
}

impl ExperienceRef {
    /// UUIDs and all-digit strings are ids; everything else is a slug.
    pub fn parse(identifier: &str) -> Result<Self, IdentifierError> {
        let identifier = identifier.trim().trim_matches('/');
        if identifier.is_empty() {
            return Err(IdentifierError);
        }
        let looks_like_id = uuid::Uuid::parse_str(identifier).is_ok()
            || identifier.bytes().all(|b| b.is_ascii_digit());
        if looks_like_id {
            Ok(Self::Id(ExperienceId::new(identifier)))
        } else {
            Ok(Self::Slug(identifier.to_ascii_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Id(id) => id.as_str(),
            Self::Slug(slug) => slug,
        }
    }
}

impl std::fmt::Display for ExperienceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
