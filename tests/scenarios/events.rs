/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use arshell::test_utils::{PlayerFixture, camera_phone_caps, desktop_caps, sample_experience};

use crate::settle;

fn trace(fixture: &PlayerFixture) -> String {
    fixture
        .sink
        .events()
        .iter()
        .map(|event| {
            let asset = event
                .payload
                .asset_id
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or("-");
            format!("{} {asset}", event.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn full_tour_emits_one_event_per_transition() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(sample_experience(), camera_phone_caps());
    player.start();
    settle(&fixture, &mut player);
    for _ in 0..4 {
        player.next();
        settle(&fixture, &mut player);
    }

    insta::assert_snapshot!(trace(&fixture), @r"
    asset_bound chair
    session_ready chair
    session_active chair
    session_ended chair
    asset_navigated poster
    asset_bound poster
    session_ready poster
    session_active poster
    session_ended poster
    asset_navigated welcome
    asset_bound welcome
    session_ready welcome
    session_active welcome
    session_ended welcome
    asset_navigated site
    asset_bound site
    session_ready site
    session_active site
    session_ended site
    asset_navigated chair
    asset_bound chair
    session_ready chair
    session_active chair
    ");
}

#[test]
fn every_event_carries_the_experience_id() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(sample_experience(), desktop_caps());
    player.start();
    settle(&fixture, &mut player);
    player.next();
    settle(&fixture, &mut player);

    let events = fixture.sink.events();
    assert!(!events.is_empty());
    assert!(
        events
            .iter()
            .all(|event| event.payload.experience_id.as_str() == "exp-sample")
    );
}

#[test]
fn session_ids_appear_only_once_active() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(sample_experience(), camera_phone_caps());
    player.start();
    settle(&fixture, &mut player);
    player.next();

    let events = fixture.sink.events();
    let with_session: Vec<&str> = events
        .iter()
        .filter(|event| event.payload.session_id.is_some())
        .map(|event| event.name.as_str())
        .collect();
    assert_eq!(with_session, vec!["session_active", "session_ended"]);
}

#[test]
fn unsupported_model_on_desktop_is_ended_when_left() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(sample_experience(), desktop_caps());
    player.start();
    settle(&fixture, &mut player);
    player.next();

    let ended = fixture
        .sink
        .events()
        .into_iter()
        .find(|event| event.name == "session_ended")
        .expect("ended");
    assert_eq!(ended.payload.extra, Some(serde_json::json!({ "live": false })));
    insta::assert_snapshot!(trace(&fixture), @r"
    asset_bound chair
    session_unsupported chair
    session_ended chair
    asset_navigated poster
    asset_bound poster
    session_ready poster
    ");
}
