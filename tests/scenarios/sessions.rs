/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use arshell::test_utils::{
    CameraMode, PlayerFixture, ar_phone_caps, camera_phone_caps, desktop_caps, sample_experience,
};
use arshell::{Asset, AssetKind, Experience, FailureReason, SessionState, UnsupportedReason};

use crate::{images, settle};

#[test]
fn model_on_desktop_shows_preview_and_never_activates() {
    let fixture = PlayerFixture::new();
    let model = Asset::media("chair", AssetKind::Model3d, "https://cdn.test/chair.glb")
        .expect("valid model");
    let mut player = fixture.player(Experience::new("exp", "Chair", vec![model]), desktop_caps());

    player.start();
    assert_eq!(fixture.spawner.pending_tasks(), 0);
    settle(&fixture, &mut player);

    assert_eq!(
        player.session_state(),
        &SessionState::Unsupported(UnsupportedReason::ArSurfaceUnavailable)
    );
    let view = player.view();
    assert!(view.show_unsupported_fallback);
    assert!(!view.show_spinner && !view.show_active_hud);
    let visible = fixture.platform.surface.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].label(), "scene-preview");
    assert!(fixture.platform.native_ar.requests().is_empty());

    let names = fixture.sink.names();
    assert!(names.contains(&"session_unsupported".to_string()));
    assert!(!names.contains(&"session_active".to_string()));
}

#[test]
fn camera_denial_is_reported_and_next_asset_binds_fresh() {
    let fixture = PlayerFixture::new();
    fixture.platform.camera.set_mode(CameraMode::Deny);
    let poster = Asset::media("poster", AssetKind::Image, "https://cdn.test/poster.png")
        .expect("valid image");
    let welcome = Asset::message("welcome", "Hello").expect("valid message");
    let mut player = fixture.player(
        Experience::new("exp", "Denied", vec![poster, welcome]),
        camera_phone_caps(),
    );

    player.start();
    settle(&fixture, &mut player);

    let failure = player.session().failure().expect("error state");
    assert_eq!(failure.reason, FailureReason::PermissionDenied);
    assert_eq!(failure.asset_id.as_str(), "poster");
    let view = player.view();
    assert!(view.show_error_banner && view.show_permission_help);
    assert!(view.error_message.is_some());
    assert_eq!(fixture.platform.camera.live_streams(), 0);

    player.next();
    assert_eq!(player.session_state(), &SessionState::Ready);
    settle(&fixture, &mut player);

    assert_eq!(player.session_state(), &SessionState::Active);
    assert_eq!(
        player.session().bound_asset_id().map(|id| id.as_str()),
        Some("welcome")
    );
    assert_eq!(fixture.platform.camera.requests(), 1);
}

#[test]
fn retry_after_granting_permission_activates_the_overlay() {
    let fixture = PlayerFixture::new();
    fixture.platform.camera.set_mode(CameraMode::Deny);
    let mut player = fixture.player(images(&["poster"]), camera_phone_caps());
    player.start();
    settle(&fixture, &mut player);
    assert!(player.session().failure().is_some());

    fixture.platform.camera.set_mode(CameraMode::Grant);
    player.retry();
    settle(&fixture, &mut player);

    assert_eq!(player.session_state(), &SessionState::Active);
    assert_eq!(fixture.platform.camera.live_streams(), 1);
    assert_eq!(fixture.platform.surface.camera_presentations(), 1);
}

#[test]
fn superseded_camera_mount_is_discarded_and_its_stream_stopped() {
    let fixture = PlayerFixture::new();
    fixture.platform.camera.set_mode(CameraMode::Deferred);
    let mut player = fixture.player(images(&["a", "b"]), camera_phone_caps());

    player.start();
    assert_eq!(fixture.run(), 0);
    assert_eq!(fixture.platform.camera.requests(), 1);

    // Navigate while the first permission prompt is still open.
    player.next();
    assert_eq!(fixture.run(), 0);
    assert_eq!(fixture.platform.camera.requests(), 1);

    assert!(fixture.platform.camera.grant_pending());
    assert_eq!(fixture.run(), 1);
    assert_eq!(player.pump(), 0);
    assert_eq!(player.session_state(), &SessionState::Ready);
    assert_eq!(
        player.session().bound_asset_id().map(|id| id.as_str()),
        Some("b")
    );
    assert_eq!(fixture.platform.camera.live_streams(), 0);
    assert_eq!(fixture.platform.camera.requests(), 2);

    assert!(fixture.platform.camera.grant_pending());
    fixture.run();
    assert_eq!(player.pump(), 1);

    assert_eq!(player.session_state(), &SessionState::Active);
    assert_eq!(fixture.platform.camera.live_streams(), 1);
    assert_eq!(fixture.platform.camera.max_live_streams(), 1);
    assert_eq!(fixture.platform.surface.visible_count(), 1);
}

#[test]
fn camera_waits_until_a_superseded_ar_activation_has_released() {
    let fixture = PlayerFixture::new();
    fixture.platform.native_ar.set_deferred(true);
    let chair = Asset::media("chair", AssetKind::Model3d, "https://cdn.test/chair.glb")
        .expect("valid model");
    let poster = Asset::media("poster", AssetKind::Image, "https://cdn.test/poster.png")
        .expect("valid image");
    let mut player = fixture.player(
        Experience::new("exp", "Mixed", vec![chair, poster]),
        ar_phone_caps(),
    );

    player.start();
    assert_eq!(fixture.run(), 0);
    assert_eq!(fixture.platform.native_ar.pending_activations(), 1);

    // The platform is still activating the chair when the user moves on.
    player.next();
    assert_eq!(fixture.run(), 0);
    assert_eq!(fixture.platform.camera.requests(), 0);
    assert_eq!(fixture.platform.camera.live_streams(), 0);

    assert!(fixture.platform.native_ar.complete_pending());
    assert_eq!(fixture.run(), 2);
    assert!(!fixture.platform.native_ar.is_active());
    assert_eq!(player.pump(), 1);

    assert_eq!(player.session_state(), &SessionState::Active);
    assert_eq!(
        player.session().bound_asset_id().map(|id| id.as_str()),
        Some("poster")
    );
    assert_eq!(fixture.platform.camera.requests(), 1);
    assert_eq!(fixture.platform.camera.max_live_streams(), 1);
    assert_eq!(fixture.platform.surface.camera_presentations(), 1);
}

#[test]
fn unknown_kind_from_the_backend_shows_a_placeholder() {
    let experience: Experience = serde_json::from_str(
        r#"{
            "id": 7,
            "title": "Future formats",
            "assets": [
                {"id": 1, "type": "hologram", "url": "https://cdn.test/h.holo"},
                {"id": 2, "type": "message", "textContent": "Still here"}
            ]
        }"#,
    )
    .expect("unknown kinds decode");
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(experience, desktop_caps());

    player.start();
    settle(&fixture, &mut player);

    assert_eq!(
        player.session_state(),
        &SessionState::Unsupported(UnsupportedReason::UnknownAssetKind("hologram".into()))
    );
    let visible = fixture.platform.surface.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].label(), "placeholder");

    player.next();
    settle(&fixture, &mut player);
    assert_eq!(player.session_state(), &SessionState::Active);
    assert_eq!(fixture.platform.surface.visible()[0].label(), "text");
}

#[test]
fn unsafe_frame_source_is_declined() {
    let fixture = PlayerFixture::new();
    let frame = Asset::media("site", AssetKind::WebContent, "  JavaScript:alert(1)")
        .expect("url present");
    let mut player = fixture.player(Experience::new("exp", "Frame", vec![frame]), desktop_caps());

    player.start();

    assert_eq!(
        player.session_state(),
        &SessionState::Unsupported(UnsupportedReason::UnsafeSource)
    );
    assert_eq!(fixture.platform.surface.visible()[0].label(), "placeholder");
}

#[test]
fn failing_sink_never_blocks_navigation() {
    let fixture = PlayerFixture::new();
    fixture.sink.set_failing(true);
    let mut player = fixture.player(sample_experience(), desktop_caps());

    player.start();
    settle(&fixture, &mut player);
    player.next();
    settle(&fixture, &mut player);
    player.next();
    settle(&fixture, &mut player);
    player.record_interaction("ar_button_tapped", None);

    assert_eq!(player.current_index(), 2);
    assert_eq!(player.session_state(), &SessionState::Active);
    assert!(fixture.sink.events().is_empty());
}

#[test]
fn host_reported_failure_then_exit_leaves_nothing_mounted() {
    let fixture = PlayerFixture::new();
    let mut player = fixture.player(images(&["poster"]), camera_phone_caps());
    player.start();
    settle(&fixture, &mut player);
    assert_eq!(fixture.platform.camera.live_streams(), 1);

    assert!(player.report_strategy_error(arshell::StrategyError::MountFailed(
        "camera track ended".into()
    )));
    assert_eq!(
        player.session().failure().map(|f| f.reason),
        Some(FailureReason::MountFailed)
    );

    player.exit();
    assert_eq!(player.session_state(), &SessionState::Ended);
    assert_eq!(fixture.platform.camera.live_streams(), 0);
    assert_eq!(fixture.platform.surface.visible_count(), 0);
}
