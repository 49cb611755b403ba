/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::time::Duration;

use media_dummy::EngineCall;
use media_traits::{NetworkState as PlayerNetworkState, ReadyState, TimeRanges};
use script::dom::bindings::error::Error;
use script::dom::htmlmediaelement::{BehaviorRestrictions, NetworkState};
use script::dom::mediacontrollerinterface::MediaControllerInterface;

use crate::page::{EventLog, MEDIA_EVENTS, Page, webm_engine};

#[test]
fn plays_a_resource_through_to_the_end() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    video.set_src(Some("movie.webm"));
    page.run();
    assert_eq!(log.take(), ["loadstart"]);
    assert_eq!(video.network_state(), NetworkState::Loading);
    assert_eq!(video.current_src(), "https://example.com/media/movie.webm");
    assert_eq!(video.current_engine_name().as_deref(), Some("dummy"));

    let player = engine.last_player().unwrap();
    player.set_network_state(PlayerNetworkState::Loading);
    player.set_duration(10.);
    player.set_ready_state(ReadyState::HaveMetadata);
    page.run();
    assert_eq!(log.take(), ["durationchange", "durationchange", "loadedmetadata"]);
    assert_eq!(video.duration(), 10.);
    assert_eq!(video.network_state(), NetworkState::Loading);

    player.set_ready_state(ReadyState::HaveEnoughData);
    page.run();
    assert_eq!(log.take(), ["loadeddata", "canplay", "canplaythrough"]);

    // Finishing the download fires a last progress before going idle.
    player.set_network_state(PlayerNetworkState::Loaded);
    page.run();
    assert_eq!(log.take(), ["progress", "suspend"]);
    assert_eq!(video.network_state(), NetworkState::Idle);

    video.play();
    page.run();
    assert_eq!(log.take(), ["play", "playing"]);
    assert!(!video.paused());
    assert!(!player.is_paused());
    assert!(player.calls().contains(&EngineCall::Play));

    page.event_loop.advance(Duration::from_millis(250));
    assert_eq!(log.take(), ["timeupdate"]);

    player.reach_end();
    page.run();
    assert_eq!(log.take(), ["timeupdate", "pause", "ended"]);
    assert!(video.ended());
    assert!(video.paused());
    assert!(player.is_paused());
    let played = video.played();
    assert_eq!(played.length(), 1);
    assert_eq!(played.end(0), Ok(10.));
}

#[test]
fn seeking_fires_seeking_then_seeked() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    video.set_src(Some("movie.webm"));
    page.run();
    let player = engine.last_player().unwrap();
    player.set_duration(10.);
    player.set_seekable(TimeRanges::from_range(0., 10.));
    player.set_ready_state(ReadyState::HaveEnoughData);
    page.run();

    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);
    assert!(video.set_current_time(4.).is_ok());
    assert!(video.seeking());
    page.run();
    assert_eq!(log.take(), ["seeking", "timeupdate", "seeked"]);
    assert!(!video.seeking());
    assert_eq!(video.current_time(), 4.);
    assert!(player.calls().contains(&EngineCall::Seek(4.)));

    player.hold_seeks();
    assert!(video.set_current_time(6.).is_ok());
    page.run();
    assert_eq!(log.take(), ["seeking", "timeupdate"]);
    assert!(video.seeking());
    assert_eq!(video.current_time(), 6.);

    player.finish_seek();
    page.run();
    assert_eq!(log.take(), ["seeked"]);
    assert!(!video.seeking());
}

#[test]
fn seeks_past_the_end_are_clamped_to_the_duration() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    video.set_src(Some("movie.webm"));
    page.run();
    let player = engine.last_player().unwrap();
    player.set_duration(10.);
    player.set_seekable(TimeRanges::from_range(0., 10.));
    player.set_ready_state(ReadyState::HaveEnoughData);
    page.run();

    assert!(video.set_current_time(25.).is_ok());
    page.run();
    assert_eq!(video.current_time(), 10.);
}

#[test]
fn volume_changes_reach_the_engine() {
    let engine = std::rc::Rc::new(
        media_dummy::DummyEngineFactory::new("dummy")
            .with_type("video/webm", media_traits::SupportsType::MayBeSupported)
            .with_muting(),
    );
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    video.set_src(Some("movie.webm"));
    page.run();
    let player = engine.last_player().unwrap();

    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    assert_eq!(video.set_volume(1.5), Err(Error::IndexSize));
    assert_eq!(video.set_volume(-0.1), Err(Error::IndexSize));
    assert_eq!(video.volume(), 1.);

    assert!(video.set_volume(0.5).is_ok());
    assert!(player.calls().contains(&EngineCall::SetVolume(0.5)));

    page.document.set_media_volume(0.5);
    assert!(player.calls().contains(&EngineCall::SetVolume(0.25)));

    video.set_muted(true);
    assert!(video.muted());
    assert!(player.calls().contains(&EngineCall::SetMuted(true)));

    page.run();
    assert_eq!(log.take(), ["volumechange", "volumechange"]);
}

#[test]
fn blocked_until_enough_data_is_available() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    video.set_src(Some("movie.webm"));
    page.run();
    let player = engine.last_player().unwrap();

    for state in ReadyState::ALL {
        player.set_ready_state(state);
        page.run();
        assert_eq!(
            video.is_blocked(),
            state <= ReadyState::HaveCurrentData,
            "ready state {:?}",
            state
        );
    }
}

#[test]
fn waits_for_page_consent_before_loading() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    page.document.set_can_start_media(false);
    let video = page.video();
    video.add_behavior_restriction(BehaviorRestrictions::REQUIRE_PAGE_CONSENT_TO_LOAD_MEDIA);
    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    video.set_src(Some("movie.webm"));
    page.run();
    assert!(log.take().is_empty());
    assert_eq!(page.document.media_can_start_listener_count(), 1);
    assert_eq!(engine.players_created(), 0);
    assert!(video.is_blocked());

    page.document.set_can_start_media(true);
    page.run();
    assert_eq!(log.take(), ["loadstart"]);
    assert_eq!(video.network_state(), NetworkState::Loading);
    assert_eq!(engine.players_created(), 1);
    assert!(
        !video
            .behavior_restrictions()
            .contains(BehaviorRestrictions::REQUIRE_PAGE_CONSENT_TO_LOAD_MEDIA)
    );
}

#[test]
fn play_requires_a_gesture_when_restricted() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    video.add_behavior_restriction(BehaviorRestrictions::REQUIRE_USER_GESTURE_FOR_RATE_CHANGE);
    video.set_src(Some("movie.webm"));
    page.run();
    engine
        .last_player()
        .unwrap()
        .set_ready_state(ReadyState::HaveEnoughData);
    page.run();

    video.play();
    assert!(video.paused());

    page.gesture.set_processing_user_gesture(true);
    video.play();
    page.gesture.set_processing_user_gesture(false);
    assert!(!video.paused());
}

#[test]
fn load_restarts_resource_selection() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    video.set_src(Some("movie.webm"));
    page.run();
    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    video.load();
    page.run();
    assert_eq!(log.take(), ["abort", "emptied", "loadstart"]);
    assert_eq!(engine.players_created(), 2);
    assert_eq!(engine.players()[0].calls().last(), Some(&EngineCall::CancelLoad));
}
