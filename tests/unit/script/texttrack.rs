/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use media_dummy::{DummyEngineFactory, DummyPlayerHandle};
use media_traits::{CueDataId, GenericCueData, InbandTextTrackInfo, InbandTrackId, ReadyState, TextTrackKind};
use script::dom::event::EventType;
use script::dom::htmlmediaelement::HTMLMediaElement;
use script::dom::mediacontrollerinterface::MediaControllerInterface;
use script::dom::texttrack::TextTrackMode;
use script::dom::texttrackcue::TextTrackCue;

use crate::page::{EventLog, Page, webm_engine};

fn loaded_video(page: &Page, engine: &DummyEngineFactory) -> (Rc<HTMLMediaElement>, DummyPlayerHandle) {
    let video = page.video();
    video.set_src(Some("movie.webm"));
    page.run();
    let player = engine.last_player().unwrap();
    player.set_duration(10.);
    player.set_ready_state(ReadyState::HaveEnoughData);
    page.run();
    (video, player)
}

fn cue(log: &EventLog, label: &str, start: f64, end: f64) -> Rc<TextTrackCue> {
    let cue = TextTrackCue::new(start, end, label);
    log.listen(cue.event_target(), label, &[EventType::Enter, EventType::Exit]);
    cue
}

#[test]
fn cues_fire_enter_and_exit_as_time_moves() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let (video, player) = loaded_video(&page, &engine);
    let log = EventLog::default();

    let track = video.add_text_track("subtitles", "English", "en").unwrap();
    log.listen(track.event_target(), "track", &[EventType::CueChange]);
    let a = cue(&log, "a", 1., 3.);
    let b = cue(&log, "b", 2., 4.);
    let c = cue(&log, "c", 5., 5.);
    for cue in [&a, &b, &c] {
        track.add_cue(cue.clone());
    }
    page.run();
    assert!(log.take().is_empty());

    player.set_current_time(2.5);
    page.run();
    assert_eq!(log.take(), ["a:enter", "b:enter", "track:cuechange"]);
    assert!(a.is_active());
    assert!(b.is_active());
    assert_eq!(video.active_cues().len(), 2);
    assert_eq!(track.active_cues().map(|cues| cues.len()), Some(2));

    player.set_current_time(4.5);
    page.run();
    assert_eq!(log.take(), ["a:exit", "b:exit", "track:cuechange"]);
    assert!(video.active_cues().is_empty());

    // A cue skipped over entirely still fires both events.
    player.set_current_time(6.);
    page.run();
    assert_eq!(log.take(), ["c:enter", "c:exit", "track:cuechange"]);
    assert!(!c.is_active());
}

#[test]
fn leaving_a_pause_on_exit_cue_pauses_playback() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let (video, player) = loaded_video(&page, &engine);
    let log = EventLog::default();

    let track = video.add_text_track("captions", "", "").unwrap();
    let a = cue(&log, "a", 1., 3.);
    a.set_pause_on_exit(true);
    track.add_cue(a.clone());

    video.play();
    page.run();
    assert!(!player.is_paused());

    player.set_current_time(2.);
    page.run();
    assert!(a.is_active());
    assert!(!video.paused());

    player.set_current_time(3.5);
    page.run();
    assert!(!a.is_active());
    assert!(video.paused());
    assert!(player.is_paused());
}

#[test]
fn disabling_a_track_deactivates_its_cues() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let (video, player) = loaded_video(&page, &engine);
    let log = EventLog::default();

    let track = video.add_text_track("metadata", "chapters", "").unwrap();
    let a = cue(&log, "a", 0., 5.);
    track.add_cue(a.clone());
    player.set_current_time(1.);
    page.run();
    assert!(a.is_active());

    track.set_mode(TextTrackMode::Disabled);
    assert!(!a.is_active());
    assert!(track.cues().is_none());
    assert!(video.active_cues().is_empty());
}

#[test]
fn removed_cues_stop_being_tracked() {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let (video, player) = loaded_video(&page, &engine);
    let log = EventLog::default();

    let track = video.add_text_track("subtitles", "", "").unwrap();
    let a = cue(&log, "a", 0., 5.);
    track.add_cue(a.clone());
    player.set_current_time(1.);
    page.run();
    assert!(a.is_active());

    assert!(track.remove_cue(&a).is_ok());
    assert!(!a.is_active());
    assert!(a.track().is_none());
    assert!(track.remove_cue(&a).is_err());
    assert!(video.active_cues().is_empty());
}

#[test]
fn add_text_track_rejects_unknown_kinds() {
    let page = Page::new(&[]);
    let video = page.video();
    assert!(video.add_text_track("karaoke", "", "").is_err());

    let track = video.add_text_track("descriptions", "Audio description", "fr").unwrap();
    assert_eq!(track.kind(), TextTrackKind::Descriptions);
    assert_eq!(track.label(), "Audio description");
    assert_eq!(track.language(), "fr");
    assert_eq!(track.mode(), TextTrackMode::Hidden);
    assert_eq!(video.text_tracks().length(), 1);
}

#[test]
fn in_band_tracks_follow_the_engine() {
    let engine = Rc::new(
        DummyEngineFactory::new("dummy")
            .with_type("video/webm", media_traits::SupportsType::MayBeSupported),
    );
    let page = Page::new(&[engine.clone()]);
    let (video, player) = loaded_video(&page, &engine);
    let list_log = EventLog::default();
    list_log.listen(
        video.text_tracks().event_target(),
        "",
        &[EventType::AddTrack, EventType::RemoveTrack],
    );

    let id = InbandTrackId(7);
    player.add_text_track(InbandTextTrackInfo {
        id,
        kind: TextTrackKind::Subtitles,
        label: "Deutsch".to_owned(),
        language: "de".to_owned(),
        is_default: true,
    });
    page.run();
    assert_eq!(list_log.take(), ["addtrack"]);
    let track = video.text_tracks().item(0).unwrap();
    assert_eq!(track.label(), "Deutsch");
    // A default subtitle track is shown when nothing else is.
    assert_eq!(track.mode(), TextTrackMode::Showing);

    player.add_generic_cue(id, GenericCueData::new(CueDataId(1), 0., 4., "Hallo"));
    page.run();
    let cues = track.cues().unwrap();
    assert_eq!(cues.length(), 1);
    assert_eq!(cues.item(0).unwrap().text(), "Hallo");

    player.remove_generic_cue(id, CueDataId(1));
    page.run();
    assert_eq!(track.cues().unwrap().length(), 0);

    player.remove_text_track(id);
    page.run();
    assert_eq!(list_log.take(), ["removetrack"]);
    assert!(video.text_tracks().is_empty());
}
