/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Assets: the individual items an experience steps through.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ids::AssetId;

/// Asset type tag as delivered by the backend.
///
/// Unrecognized tags are kept verbatim in [`AssetKind::Unknown`] so the renderer
/// registry can report them instead of the whole experience failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetKind {
    Image,
    Video,
    Model3d,
    Message,
    WebContent,
    Unknown(String),
}

impl AssetKind {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "image" => Self::Image,
            "video" => Self::Video,
            "model3d" | "model" | "3d" => Self::Model3d,
            "message" | "text" => Self::Message,
            "webcontent" | "web" | "iframe" => Self::WebContent,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Model3d => "model3d",
            Self::Message => "message",
            Self::WebContent => "webcontent",
            Self::Unknown(tag) => tag,
        }
    }

    pub fn requires_url(&self) -> bool {
        matches!(
            self,
            Self::Image | Self::Video | Self::Model3d | Self::WebContent
        )
    }

    pub fn requires_text(&self) -> bool {
        matches!(self, Self::Message)
    }
}

impl From<String> for AssetKind {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<AssetKind> for String {
    fn from(kind: AssetKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("message asset `{asset_id}` has no text content")]
    MissingText { asset_id: AssetId },
    #[error("{kind} asset `{asset_id}` has no url")]
    MissingUrl { asset_id: AssetId, kind: AssetKind },
}

/// Wire form of an asset, validated into [`Asset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRecord {
    id: AssetId,
    #[serde(rename = "type", alias = "kind")]
    kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, alias = "content", skip_serializing_if = "Option::is_none")]
    text_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
}

/// A single immutable asset. Construction enforces that message assets carry
/// text and every media kind carries a url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AssetRecord", into = "AssetRecord")]
pub struct Asset {
    id: AssetId,
    kind: AssetKind,
    url: Option<String>,
    text_content: Option<String>,
    mime_type: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Asset {
    pub fn new(
        id: impl Into<AssetId>,
        kind: AssetKind,
        url: Option<String>,
        text_content: Option<String>,
        mime_type: Option<String>,
    ) -> Result<Self, AssetError> {
        let id = id.into();
        let url = non_blank(url);
        let text_content = non_blank(text_content);
        if kind.requires_text() && text_content.is_none() {
            return Err(AssetError::MissingText { asset_id: id });
        }
        if kind.requires_url() && url.is_none() {
            return Err(AssetError::MissingUrl { asset_id: id, kind });
        }
        Ok(Self {
            id,
            kind,
            url,
            text_content,
            mime_type: non_blank(mime_type),
        })
    }

    pub fn media(
        id: impl Into<AssetId>,
        kind: AssetKind,
        url: impl Into<String>,
    ) -> Result<Self, AssetError> {
        Self::new(id, kind, Some(url.into()), None, None)
    }

    pub fn message(id: impl Into<AssetId>, text: impl Into<String>) -> Result<Self, AssetError> {
        Self::new(id, AssetKind::Message, None, Some(text.into()), None)
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = non_blank(Some(mime_type.into()));
        self
    }

    pub fn id(&self) -> &AssetId {
        &self.id
    }

    pub fn kind(&self) -> &AssetKind {
        &self.kind
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text_content.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Rewrites a relative url (`/uploads/chair.glb`) against `base`. Absolute
    /// urls and urls that fail to join are left untouched.
    pub fn absolutized(mut self, base: &Url) -> Self {
        if let Some(url) = self.url.as_deref()
            && Url::parse(url).is_err()
            && let Ok(joined) = base.join(url)
        {
            self.url = Some(joined.into());
        }
        self
    }
}

impl TryFrom<AssetRecord> for Asset {
    type Error = AssetError;

    fn try_from(record: AssetRecord) -> Result<Self, Self::Error> {
        Self::new(
            record.id,
            record.kind,
            record.url,
            record.text_content,
            record.mime_type,
        )
    }
}

impl From<Asset> for AssetRecord {
    fn from(asset: Asset) -> Self {
        Self {
            id: asset.id,
            kind: asset.kind,
            url: asset.url,
            text_content: asset.text_content,
            mime_type: asset.mime_type,
        }
    }
}
