/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use arshell::VERSION;
use arshell::test_utils::PlayerFixture;
use arshell::{Asset, AssetKind, Experience, ExperiencePlayer};

mod events;
mod navigation;
mod sessions;

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}

pub(crate) fn images(ids: &[&str]) -> Experience {
    let assets = ids
        .iter()
        .map(|id| {
            Asset::media(*id, AssetKind::Image, format!("https://cdn.test/{id}.png"))
                .expect("valid image")
        })
        .collect();
    Experience::new("exp-images", "Images", assets)
}

/// Starts the player and lets its first mount settle.
pub(crate) fn settle(fixture: &PlayerFixture, player: &mut ExperiencePlayer) {
    fixture.run();
    player.pump();
}
