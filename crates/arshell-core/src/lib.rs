/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Portable model for arshell: experiences, assets, identifiers, and the
//! capability snapshot. No I/O lives here; the runtime crate consumes these
//! types from both the browser host and native test harnesses.

pub mod asset;
pub mod capabilities;
pub mod experience;
pub mod ids;

pub use asset::{Asset, AssetError, AssetKind};
pub use capabilities::{ArCapabilities, CapabilityFlags, PlatformInfo};
pub use experience::{Experience, ExperienceRef, IdentifierError, NotPlayable};
pub use ids::{AssetId, ExperienceId, SessionId};
