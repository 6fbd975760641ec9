/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use arshell::test_utils::{
    PlayerFixture, ar_phone_caps, camera_phone_caps, desktop_caps, sample_experience,
};
use arshell::{ArCapabilities, ExperiencePlayer, PlayerError, SessionState};
use proptest::prelude::*;

use crate::{images, settle};

#[test]
fn single_asset_next_keeps_the_session() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(images(&["only"]), desktop_caps());
    player.start();
    settle(&fixture, &mut player);
    let epoch = player.session().epoch();
    let session_id = player.session().session_id();
    fixture.sink.clear();

    player.next();
    player.previous();

    assert_eq!(player.current_index(), 0);
    assert_eq!(player.session().epoch(), epoch);
    assert_eq!(player.session().session_id(), session_id);
    assert_eq!(player.session_state(), &SessionState::Active);
    assert_eq!(fixture.spawner.pending_tasks(), 0);
    assert_eq!(fixture.sink.names(), vec!["asset_navigated", "asset_navigated"]);
    assert_eq!(fixture.platform.surface.presented().len(), 1);
}

#[test]
fn jump_to_current_index_does_not_rebind() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(sample_experience(), desktop_caps());
    player.start();
    settle(&fixture, &mut player);
    let epoch = player.session().epoch();
    fixture.sink.clear();

    player.jump_to(0).expect("in range");

    assert_eq!(player.session().epoch(), epoch);
    assert_eq!(fixture.sink.names(), vec!["asset_navigated"]);
    assert_eq!(
        player.jump_to(9),
        Err(PlayerError::IndexOutOfRange { index: 9, len: 4 })
    );
}

#[test]
fn navigating_before_the_mount_is_applied_still_releases_it() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(images(&["a", "b"]), camera_phone_caps());
    player.start();
    fixture.run();
    assert_eq!(fixture.platform.camera.live_streams(), 1);

    player.next();

    assert_eq!(fixture.platform.camera.live_streams(), 0);
    assert_eq!(fixture.platform.surface.visible_count(), 0);
    settle(&fixture, &mut player);
    assert_eq!(fixture.platform.camera.live_streams(), 1);
    assert_eq!(fixture.platform.camera.max_live_streams(), 1);
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Next,
    Previous,
    Jump(usize),
    Run,
    Pump,
    Retry,
    Exit,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Next),
        2 => Just(Op::Previous),
        2 => (0usize..4).prop_map(Op::Jump),
        3 => Just(Op::Run),
        3 => Just(Op::Pump),
        1 => Just(Op::Retry),
        1 => Just(Op::Exit),
    ]
}

fn caps_preset(index: usize) -> ArCapabilities {
    match index {
        0 => desktop_caps(),
        1 => camera_phone_caps(),
        _ => ar_phone_caps(),
    }
}

fn apply(fixture: &PlayerFixture, player: &mut ExperiencePlayer, op: Op) {
    match op {
        Op::Next => player.next(),
        Op::Previous => player.previous(),
        Op::Jump(index) => {
            let _ = player.jump_to(index);
        }
        Op::Run => {
            fixture.run();
        }
        Op::Pump => {
            player.pump();
        }
        Op::Retry => player.retry(),
        Op::Exit => player.exit(),
    }
}

fn check_single_live(
    fixture: &PlayerFixture,
    player: &ExperiencePlayer,
) -> Result<(), TestCaseError> {
    let platform = &fixture.platform;
    prop_assert!(platform.camera.live_streams() <= 1);
    prop_assert!(platform.surface.visible_count() <= 1);
    prop_assert!(!(platform.native_ar.is_active() && platform.surface.visible_count() > 0));
    let state = player.session_state();
    if state.is_loading() || *state == SessionState::Active {
        prop_assert_eq!(
            player.session().bound_asset_id(),
            player.current_asset().map(|asset| asset.id())
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn at_most_one_surface_is_live(
        caps in 0usize..3,
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let fixture = PlayerFixture::new();
        let mut player = fixture.player(sample_experience(), caps_preset(caps));
        player.start();
        check_single_live(&fixture, &player)?;

        for op in ops {
            apply(&fixture, &mut player, op);
            check_single_live(&fixture, &player)?;
        }

        drop(player);
        prop_assert_eq!(fixture.platform.camera.live_streams(), 0);
        prop_assert_eq!(fixture.platform.surface.visible_count(), 0);
        prop_assert!(!fixture.platform.native_ar.is_active());
    }

    #[test]
    fn navigation_wraps_around(len in 1usize..6, steps in 0usize..20) {
        let names: Vec<String> = (0..len).map(|i| format!("a{i}")).collect();
        let ids: Vec<&str> = names.iter().map(String::as_str).collect();
        let fixture = PlayerFixture::new();
        let mut player = fixture.player(images(&ids), desktop_caps());
        player.start();

        for _ in 0..steps {
            player.next();
        }
        prop_assert_eq!(player.current_index(), steps % len);

        for _ in 0..steps {
            player.previous();
        }
        prop_assert_eq!(player.current_index(), 0);
    }
}
