/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use media_dummy::{DummyEngineFactory, DummyPlayerHandle, EngineCall};
use media_traits::ReadyState;
use script::dom::bindings::error::Error;
use script::dom::event::EventType;
use script::dom::htmlmediaelement::HTMLMediaElement;
use script::dom::mediacontroller::{MediaController, PlaybackState};
use script::dom::mediacontrollerinterface::MediaControllerInterface;

use crate::page::{EventLog, Page, webm_engine};

const CONTROLLER_EVENTS: &[EventType] = &[
    EventType::LoadedMetadata,
    EventType::LoadedData,
    EventType::CanPlay,
    EventType::CanPlayThrough,
    EventType::Playing,
    EventType::Waiting,
    EventType::Ended,
    EventType::Pause,
    EventType::Play,
    EventType::VolumeChange,
];

struct Group {
    page: Page,
    engine: Rc<DummyEngineFactory>,
    first: Rc<HTMLMediaElement>,
    second: Rc<HTMLMediaElement>,
    controller: Rc<MediaController>,
}

impl Group {
    fn new() -> Group {
        let engine = webm_engine("dummy");
        let page = Page::new(&[engine.clone()]);
        let first = page.video();
        let second = page.video();
        first.set_media_group(Some("group"));
        second.set_media_group(Some("group"));
        let controller = first.controller().unwrap();
        first.set_src(Some("first.webm"));
        second.set_src(Some("second.webm"));
        page.run();
        Group {
            page,
            engine,
            first,
            second,
            controller,
        }
    }

    fn players(&self) -> (DummyPlayerHandle, DummyPlayerHandle) {
        let players = self.engine.players();
        (players[0].clone(), players[1].clone())
    }
}

#[test]
fn elements_in_a_media_group_share_a_controller() {
    let group = Group::new();
    let second_controller = group.second.controller().unwrap();
    assert!(Rc::ptr_eq(&group.controller, &second_controller));
    assert_eq!(group.controller.media_elements().len(), 2);

    let page = &group.page;
    let other = page.video();
    other.set_media_group(Some("other"));
    assert!(!Rc::ptr_eq(&other.controller().unwrap(), &group.controller));

    group.first.set_media_group(None);
    assert!(group.first.controller().is_none());
    assert_eq!(group.controller.media_elements().len(), 1);
}

#[test]
fn controller_ready_state_is_the_lowest_of_its_elements() {
    let group = Group::new();
    let log = EventLog::default();
    log.listen(group.controller.event_target(), "", CONTROLLER_EVENTS);
    let (first, second) = group.players();

    first.set_duration(10.);
    first.set_ready_state(ReadyState::HaveEnoughData);
    group.page.run();
    assert_eq!(group.controller.ready_state(), ReadyState::HaveNothing);

    second.set_duration(20.);
    second.set_ready_state(ReadyState::HaveMetadata);
    group.page.run();
    assert_eq!(group.controller.ready_state(), ReadyState::HaveMetadata);
    assert_eq!(log.take(), ["loadedmetadata"]);
    assert_eq!(group.controller.duration(), 20.);

    second.set_ready_state(ReadyState::HaveEnoughData);
    group.page.run();
    assert_eq!(group.controller.ready_state(), ReadyState::HaveEnoughData);
    assert_eq!(log.take(), ["loadeddata", "canplay", "canplaythrough"]);
}

#[test]
fn controller_drives_playback_of_its_elements() {
    let group = Group::new();
    let (first, second) = group.players();
    for (player, duration) in [(&first, 10.), (&second, 20.)] {
        player.set_duration(duration);
        player.set_ready_state(ReadyState::HaveEnoughData);
    }
    group.page.run();
    assert_eq!(group.controller.playback_state(), PlaybackState::Waiting);

    group.controller.play();
    group.page.run();
    assert_eq!(group.controller.playback_state(), PlaybackState::Playing);
    assert!(!first.is_paused());
    assert!(!second.is_paused());

    group.controller.pause();
    group.page.run();
    assert!(group.controller.paused());
    assert_eq!(group.controller.playback_state(), PlaybackState::Waiting);
    assert!(first.is_paused());
    assert!(second.is_paused());
    // The elements keep their own paused attribute.
    assert!(!group.first.paused());
    assert!(!group.second.paused());
}

#[test]
fn lowering_ready_state_fires_only_the_new_state() {
    let group = Group::new();
    let (first, second) = group.players();
    for player in [&first, &second] {
        player.set_duration(10.);
        player.set_ready_state(ReadyState::HaveEnoughData);
    }
    group.page.run();
    assert_eq!(group.controller.ready_state(), ReadyState::HaveEnoughData);

    let log = EventLog::default();
    log.listen(group.controller.event_target(), "", CONTROLLER_EVENTS);
    second.set_ready_state(ReadyState::HaveMetadata);
    group.page.run();
    assert_eq!(group.controller.ready_state(), ReadyState::HaveMetadata);
    assert_eq!(log.take(), ["loadedmetadata"]);
}

#[test]
fn controller_pauses_itself_once_every_slave_has_ended() {
    let group = Group::new();
    let (first, second) = group.players();
    for player in [&first, &second] {
        player.set_duration(10.);
        player.set_ready_state(ReadyState::HaveEnoughData);
    }
    group.page.run();

    let log = EventLog::default();
    log.listen(group.controller.event_target(), "", CONTROLLER_EVENTS);
    group.controller.play();
    group.page.run();
    assert_eq!(group.controller.playback_state(), PlaybackState::Playing);
    assert!(!group.controller.paused());
    log.take();

    first.reach_end();
    second.reach_end();
    group.page.run();
    assert!(group.first.ended());
    assert!(group.second.ended());
    assert_eq!(group.controller.playback_state(), PlaybackState::Ended);
    assert!(group.controller.paused());
    assert_eq!(log.take(), ["pause", "ended"]);
}

#[test]
fn autoplaying_slaves_block_until_played_or_paused() {
    let group = Group::new();
    let (first, second) = group.players();
    for player in [&first, &second] {
        player.set_duration(10.);
        player.set_ready_state(ReadyState::HaveEnoughData);
    }
    group.page.run();
    assert!(group.controller.is_blocked());

    group.first.play();
    group.page.run();
    // The second slave is still paused with its autoplaying flag set.
    assert!(group.second.is_autoplaying());
    assert!(group.second.paused());
    assert!(group.controller.is_blocked());

    group.second.pause();
    group.page.run();
    assert!(!group.second.is_autoplaying());
    assert!(!group.controller.is_blocked());

    // A slave without enough data blocks the controller.
    second.set_ready_state(ReadyState::HaveMetadata);
    group.page.run();
    assert!(group.controller.is_blocked());

    second.set_ready_state(ReadyState::HaveEnoughData);
    group.page.run();
    assert!(!group.controller.is_blocked());

    group.controller.pause();
    assert!(group.controller.is_blocked());
}

#[derive(Clone, Copy, Debug)]
enum Slave {
    /// Playing, but without enough data.
    Blocked,
    /// Freshly loaded and never played or paused.
    AutoplayingPaused,
    Paused,
    Playing,
}

const SLAVE_STATES: [Slave; 4] = [
    Slave::Blocked,
    Slave::AutoplayingPaused,
    Slave::Paused,
    Slave::Playing,
];

fn is_blocked_with(states: &[Slave], controller_paused: bool) -> bool {
    let engine = webm_engine("dummy");
    let page = Page::new(&[engine.clone()]);
    let elements: Vec<Rc<HTMLMediaElement>> = (0..states.len())
        .map(|index| {
            let video = page.video();
            video.set_media_group(Some("table"));
            let src = format!("{}.webm", index);
            video.set_src(Some(src.as_str()));
            video
        })
        .collect();
    let controller = match elements.first() {
        Some(element) => element.controller().unwrap(),
        None => MediaController::new(&page.event_loop),
    };
    page.run();

    for (player, state) in engine.players().iter().zip(states) {
        player.set_duration(10.);
        player.set_ready_state(match state {
            Slave::Blocked => ReadyState::HaveMetadata,
            _ => ReadyState::HaveEnoughData,
        });
    }
    page.run();

    for (element, state) in elements.iter().zip(states) {
        match state {
            Slave::Blocked | Slave::Playing => element.play(),
            Slave::Paused => element.pause(),
            Slave::AutoplayingPaused => {},
        }
    }
    page.run();

    if controller_paused {
        controller.pause();
    }
    assert_eq!(controller.media_elements().len(), states.len());
    controller.is_blocked()
}

#[test]
fn is_blocked_truth_table() {
    for slave_count in [0u32, 1, 3] {
        for combination in 0..4usize.pow(slave_count) {
            let states: Vec<Slave> = (0..slave_count)
                .map(|slot| SLAVE_STATES[combination / 4usize.pow(slot) % 4])
                .collect();
            for controller_paused in [false, true] {
                let any_blocked = states
                    .iter()
                    .any(|state| matches!(state, Slave::Blocked | Slave::AutoplayingPaused));
                let all_paused = !states.is_empty() &&
                    states
                        .iter()
                        .all(|state| matches!(state, Slave::AutoplayingPaused | Slave::Paused));
                let expected = controller_paused || any_blocked || all_paused;
                assert_eq!(
                    is_blocked_with(&states, controller_paused),
                    expected,
                    "slaves {:?}, controller paused {}",
                    states,
                    controller_paused
                );
            }
        }
    }
}

#[test]
fn slaved_elements_cannot_seek_on_their_own() {
    let group = Group::new();
    let (first, _) = group.players();
    first.set_duration(10.);
    first.set_ready_state(ReadyState::HaveEnoughData);
    group.page.run();

    assert_eq!(group.first.set_current_time(2.), Err(Error::InvalidState));
}

#[test]
fn controller_volume_scales_element_volume() {
    let group = Group::new();
    let (first, second) = group.players();

    assert_eq!(group.controller.set_volume(2.), Err(Error::IndexSize));
    assert_eq!(group.controller.volume(), 1.);

    assert!(group.controller.set_volume(0.5).is_ok());
    assert!(first.calls().contains(&EngineCall::SetVolume(0.5)));
    assert!(second.calls().contains(&EngineCall::SetVolume(0.5)));

    let log = EventLog::default();
    log.listen(group.controller.event_target(), "", CONTROLLER_EVENTS);
    group.page.run();
    assert_eq!(log.take(), ["volumechange"]);
}

#[test]
fn dropped_elements_leave_their_controller() {
    let Group {
        page,
        controller,
        first,
        second,
        ..
    } = Group::new();
    drop(second);
    assert_eq!(controller.media_elements().len(), 1);
    assert!(controller.contains_media_element(&first));
    page.run();
}
