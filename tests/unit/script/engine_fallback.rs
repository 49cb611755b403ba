/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use media_traits::{NetworkState as PlayerNetworkState, ReadyState};
use script::dom::htmlmediaelement::{CanPlayTypeResult, NetworkState};
use script::dom::mediaerror::MediaErrorCode;

use crate::page::{EventLog, MEDIA_EVENTS, Page, webm_engine};

#[test]
fn a_failing_engine_hands_the_resource_to_the_next_one() {
    let first = webm_engine("first");
    let second = webm_engine("second");
    let page = Page::new(&[first.clone(), second.clone()]);
    let video = page.video();
    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    video.set_src(Some("movie.webm"));
    page.run();
    assert_eq!(video.current_engine_name().as_deref(), Some("first"));

    first
        .last_player()
        .unwrap()
        .set_network_state(PlayerNetworkState::FormatError);
    page.run();
    assert_eq!(video.current_engine_name().as_deref(), Some("second"));
    assert_eq!(first.players_created(), 1);
    assert_eq!(second.players_created(), 1);
    assert_eq!(log.take(), ["loadstart"]);
    assert!(video.error().is_none());

    second
        .last_player()
        .unwrap()
        .set_network_state(PlayerNetworkState::FormatError);
    page.run();
    assert_eq!(log.take(), ["error"]);
    assert_eq!(video.network_state(), NetworkState::NoSource);
    assert_eq!(
        video.error().map(|error| error.error_code()),
        Some(MediaErrorCode::SrcNotSupported)
    );
}

#[test]
fn failures_after_metadata_stay_with_the_engine() {
    let first = webm_engine("first");
    let second = webm_engine("second");
    let page = Page::new(&[first.clone(), second.clone()]);
    let video = page.video();
    let log = EventLog::default();

    video.set_src(Some("movie.webm"));
    page.run();
    let player = first.last_player().unwrap();
    player.set_duration(10.);
    player.set_ready_state(ReadyState::HaveMetadata);
    page.run();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    player.set_network_state(PlayerNetworkState::DecodeError);
    page.run();
    assert_eq!(second.players_created(), 0);
    assert_eq!(log.take(), ["error", "emptied"]);
    assert_eq!(video.network_state(), NetworkState::Empty);
    assert_eq!(
        video.error().map(|error| error.error_code()),
        Some(MediaErrorCode::Decode)
    );
}

#[test]
fn can_play_type_reports_the_best_engine() {
    let page = Page::new(&[
        webm_engine("webm"),
        std::rc::Rc::new(
            media_dummy::DummyEngineFactory::new("mp4")
                .with_type("video/mp4", media_traits::SupportsType::IsSupported),
        ),
    ]);
    let video = page.video();

    assert_eq!(video.can_play_type("video/webm"), CanPlayTypeResult::Maybe);
    assert_eq!(video.can_play_type("video/mp4"), CanPlayTypeResult::Probably);
    assert_eq!(video.can_play_type("video/ogg"), CanPlayTypeResult::Empty);
    assert_eq!(video.can_play_type("video/ogg").as_str(), "");
}
