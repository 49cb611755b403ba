/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use media_traits::{NetworkState as PlayerNetworkState, ReadyState};
use script::dom::event::EventType;
use script::dom::htmlmediaelement::NetworkState;
use script::dom::htmlsourceelement::HTMLSourceElement;
use script::dom::mediacontrollerinterface::MediaControllerInterface;
use script::dom::mediaerror::MediaError;

use crate::page::{EventLog, MEDIA_EVENTS, Page, webm_engine};

fn source(page: &Page, log: &EventLog, src: &str, type_: &str) -> Rc<HTMLSourceElement> {
    let source = HTMLSourceElement::new(&page.event_loop, src, type_);
    log.listen(source.event_target(), src, &[EventType::Error]);
    source
}

#[test]
fn skips_sources_of_unsupported_types() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    let element_log = EventLog::default();
    element_log.listen(video.event_target(), "", MEDIA_EVENTS);
    let source_log = EventLog::default();

    for (src, type_) in [("a.mp4", "video/mp4"), ("b.ogv", "video/ogg"), ("c.webm", "video/webm")] {
        video.append_source(&source(&page, &source_log, src, type_));
    }
    page.run();

    assert_eq!(source_log.take(), ["a.mp4:error", "b.ogv:error"]);
    assert_eq!(element_log.take(), ["loadstart"]);
    assert_eq!(video.current_src(), "https://example.com/media/c.webm");
    assert_eq!(engine.players_created(), 1);

    engine
        .last_player()
        .unwrap()
        .set_ready_state(ReadyState::HaveMetadata);
    page.run();
    assert_eq!(video.ready_state(), ReadyState::HaveMetadata);
    assert!(video.error().is_none());
}

#[test]
fn failed_sources_fall_through_then_wait_for_more() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    let element_log = EventLog::default();
    element_log.listen(video.event_target(), "", MEDIA_EVENTS);
    let source_log = EventLog::default();

    video.append_source(&source(&page, &source_log, "a.webm", "video/webm"));
    video.append_source(&source(&page, &source_log, "b.webm", "video/webm"));
    page.run();
    assert_eq!(video.current_src(), "https://example.com/media/a.webm");

    engine.players()[0].set_network_state(PlayerNetworkState::FormatError);
    page.run();
    assert_eq!(source_log.take(), ["a.webm:error"]);
    assert_eq!(video.current_src(), "https://example.com/media/b.webm");
    assert_eq!(engine.players_created(), 2);

    engine.players()[1].set_network_state(PlayerNetworkState::FormatError);
    page.run();
    assert_eq!(source_log.take(), ["b.webm:error"]);
    assert_eq!(video.network_state(), NetworkState::NoSource);
    assert!(video.error().is_none());
    assert_eq!(element_log.take(), ["loadstart"]);

    video.append_source(&source(&page, &source_log, "c.webm", "video/webm"));
    assert_eq!(video.network_state(), NetworkState::Loading);
    page.run();
    assert_eq!(video.current_src(), "https://example.com/media/c.webm");
    assert_eq!(engine.players_created(), 3);
    assert!(source_log.take().is_empty());
}

#[test]
fn sources_without_src_are_skipped() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    let source_log = EventLog::default();

    video.append_source(&source(&page, &source_log, "", ""));
    video.append_source(&source(&page, &source_log, "movie.webm", ""));
    page.run();

    assert_eq!(source_log.take(), ["error"]);
    assert_eq!(video.current_src(), "https://example.com/media/movie.webm");
}

#[test]
fn src_attribute_wins_over_sources() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    let source_log = EventLog::default();

    video.set_src(Some("attribute.webm"));
    video.append_source(&source(&page, &source_log, "child.webm", "video/webm"));
    page.run();

    assert_eq!(video.current_src(), "https://example.com/media/attribute.webm");
    assert_eq!(engine.players_created(), 1);
}

#[test]
fn unsupported_src_attribute_reports_an_error() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let video = page.video();
    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    video.set_src(Some("clip.mp4"));
    page.run();
    assert_eq!(log.take(), ["loadstart"]);

    engine
        .last_player()
        .unwrap()
        .set_network_state(PlayerNetworkState::FormatError);
    page.run();
    assert_eq!(log.take(), ["error"]);
    assert_eq!(video.network_state(), NetworkState::NoSource);
    assert_eq!(
        video.error().map(|error| error.code()),
        Some(MediaError::MEDIA_ERR_SRC_NOT_SUPPORTED)
    );
}

#[test]
fn loading_without_any_engine_fails_immediately() {
    let page = Page::new(&[]);
    let video = page.video();
    let log = EventLog::default();
    log.listen(video.event_target(), "", MEDIA_EVENTS);

    video.set_src(Some("movie.webm"));
    page.run();
    assert_eq!(log.take(), ["loadstart", "error"]);
    assert_eq!(video.network_state(), NetworkState::NoSource);
    assert_eq!(video.current_engine_name(), None);
    assert_eq!(
        video.error().map(|error| error.code()),
        Some(MediaError::MEDIA_ERR_SRC_NOT_SUPPORTED)
    );
}
