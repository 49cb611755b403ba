/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::debug;
use media_config::{pref, prefs};
use media_traits::{ReadyState, TimeRanges};
use strum::IntoStaticStr;

use crate::clock::{Clock, PlatformClock};
use crate::dom::bindings::error::{Error, ErrorResult};
use crate::dom::event::EventType;
use crate::dom::eventtarget::EventTarget;
use crate::dom::genericeventqueue::GenericEventQueue;
use crate::dom::htmlmediaelement::HTMLMediaElement;
use crate::dom::mediacontrollerinterface::MediaControllerInterface;
use crate::event_loop::EventLoop;
use crate::timers::Timer;

/// <https://html.spec.whatwg.org/multipage/#most-recently-reported-playback-state>
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum PlaybackState {
    Waiting,
    Playing,
    Ended,
}

fn event_for_ready_state(state: ReadyState) -> EventType {
    match state {
        ReadyState::HaveNothing => EventType::Emptied,
        ReadyState::HaveMetadata => EventType::LoadedMetadata,
        ReadyState::HaveCurrentData => EventType::LoadedData,
        ReadyState::HaveFutureData => EventType::CanPlay,
        ReadyState::HaveEnoughData => EventType::CanPlayThrough,
    }
}

/// Drives a group of media elements ("slaved" elements) as one transport.
///
/// The controller does not own its elements: each element registers itself
/// and unregisters when it leaves the controller or goes away.
///
/// <https://www.w3.org/TR/2011/WD-html5-20110525/video.html#mediacontroller>
pub struct MediaController {
    this: Weak<MediaController>,
    event_target: Rc<EventTarget>,
    event_loop: Rc<EventLoop>,
    media_elements: RefCell<Vec<Weak<HTMLMediaElement>>>,
    paused: Cell<bool>,
    default_playback_rate: Cell<f64>,
    volume: Cell<f64>,
    muted: Cell<bool>,
    /// Position sampled from the clock during the current task.
    position: Rc<Cell<Option<f64>>>,
    ready_state: Cell<ReadyState>,
    playback_state: Cell<PlaybackState>,
    closed_captions_visible: Cell<bool>,
    clock: Box<dyn Clock>,
    event_queue: GenericEventQueue,
    clear_position_timer: Timer,
    timeupdate_timer: Timer,
    previous_timeupdate_time: Cell<Option<Duration>>,
}

impl MediaController {
    pub fn new(event_loop: &Rc<EventLoop>) -> Rc<MediaController> {
        MediaController::new_with_clock(event_loop, Box::new(PlatformClock::new(event_loop)))
    }

    pub fn new_with_clock(event_loop: &Rc<EventLoop>, clock: Box<dyn Clock>) -> Rc<MediaController> {
        Rc::new_cyclic(|this| MediaController {
            this: this.clone(),
            event_target: EventTarget::new(),
            event_loop: event_loop.clone(),
            media_elements: RefCell::new(Vec::new()),
            paused: Cell::new(false),
            default_playback_rate: Cell::new(1.),
            volume: Cell::new(1.),
            muted: Cell::new(false),
            position: Rc::new(Cell::new(None)),
            ready_state: Cell::new(ReadyState::HaveNothing),
            playback_state: Cell::new(PlaybackState::Waiting),
            closed_captions_visible: Cell::new(false),
            clock,
            event_queue: GenericEventQueue::new(event_loop),
            clear_position_timer: Timer::new(event_loop),
            timeupdate_timer: Timer::new(event_loop),
            previous_timeupdate_time: Cell::new(None),
        })
    }

    pub fn event_target(&self) -> &Rc<EventTarget> {
        &self.event_target
    }

    /// The live slaved elements, in the order they joined.
    pub fn media_elements(&self) -> Vec<Rc<HTMLMediaElement>> {
        let mut elements = self.media_elements.borrow_mut();
        elements.retain(|element| element.strong_count() > 0);
        elements.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn contains_media_element(&self, element: &HTMLMediaElement) -> bool {
        self.media_elements
            .borrow()
            .iter()
            .any(|existing| std::ptr::eq(existing.as_ptr(), element))
    }

    pub(crate) fn add_media_element(&self, element: &Rc<HTMLMediaElement>) {
        if self.contains_media_element(element) {
            return;
        }
        self.media_elements
            .borrow_mut()
            .push(Rc::downgrade(element));
        self.bring_element_up_to_speed(element);
    }

    pub(crate) fn remove_media_element(&self, element: &HTMLMediaElement) {
        self.media_elements
            .borrow_mut()
            .retain(|existing| !std::ptr::eq(existing.as_ptr(), element));
    }

    // https://html.spec.whatwg.org/multipage/#bring-the-media-element-up-to-speed-with-its-new-media-controller
    pub(crate) fn bring_element_up_to_speed(&self, element: &HTMLMediaElement) {
        let _ = element.seek(self.current_time());
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-unpause
    pub fn unpause(&self) {
        // If the MediaController is a paused media controller,
        if !self.paused.get() {
            return;
        }
        // change the MediaController into a playing media controller,
        self.paused.set(false);
        // queue a task to fire a simple event named play at the MediaController,
        self.schedule_event(EventType::Play);
        // and then report the controller state of the MediaController.
        self.report_controller_state();
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state.get()
    }

    // https://html.spec.whatwg.org/multipage/#report-the-controller-state
    pub fn report_controller_state(&self) {
        self.update_ready_state();
        self.update_playback_state();
    }

    fn update_ready_state(&self) {
        let old_ready_state = self.ready_state.get();
        // If there are no slaved media elements, the new readiness state is
        // HAVE_NOTHING, otherwise the lowest of theirs.
        let new_ready_state = self
            .media_elements()
            .iter()
            .map(|element| element.ready_state())
            .min()
            .unwrap_or(ReadyState::HaveNothing);

        if new_ready_state == old_ready_state {
            return;
        }
        debug!(
            "Controller ready state {:?} -> {:?}",
            old_ready_state, new_ready_state
        );

        // Going down fires only the event of the new state.
        if old_ready_state > new_ready_state {
            self.schedule_event(event_for_ready_state(new_ready_state));
            self.ready_state.set(new_ready_state);
            return;
        }

        // Going up fires the event of every state on the way, in order.
        let mut next_state = old_ready_state as u8;
        while next_state < new_ready_state as u8 {
            next_state += 1;
            if let Some(state) = ReadyState::from_u8(next_state) {
                self.schedule_event(event_for_ready_state(state));
            }
        }
        self.ready_state.set(new_ready_state);
    }

    fn update_playback_state(&self) {
        let old_playback_state = self.playback_state.get();

        let new_playback_state = if self.media_elements().is_empty() {
            PlaybackState::Waiting
        } else if self.has_ended() {
            PlaybackState::Ended
        } else if self.is_blocked() {
            PlaybackState::Waiting
        } else {
            PlaybackState::Playing
        };

        if new_playback_state == old_playback_state {
            return;
        }
        debug!(
            "Controller playback state {:?} -> {:?}",
            old_playback_state, new_playback_state
        );

        // A playing controller whose elements have all ended pauses itself.
        if new_playback_state == PlaybackState::Ended && !self.paused.get() && self.has_ended() {
            self.paused.set(true);
            self.schedule_event(EventType::Pause);
        }

        let event = match new_playback_state {
            PlaybackState::Waiting => {
                self.clock.stop();
                self.timeupdate_timer.stop();
                EventType::Waiting
            },
            PlaybackState::Ended => {
                self.clock.stop();
                self.timeupdate_timer.stop();
                EventType::Ended
            },
            PlaybackState::Playing => {
                self.clock.start();
                self.start_timeupdate_timer();
                EventType::Playing
            },
        };
        self.schedule_event(event);
        self.playback_state.set(new_playback_state);

        self.update_media_elements();
    }

    fn update_media_elements(&self) {
        for element in self.media_elements() {
            element.update_play_state();
        }
    }

    // https://html.spec.whatwg.org/multipage/#blocked-media-controller
    pub fn is_blocked(&self) -> bool {
        // A MediaController is a blocked media controller if the
        // MediaController is a paused media controller,
        if self.paused.get() {
            return true;
        }

        let elements = self.media_elements();
        if elements.is_empty() {
            return false;
        }

        let mut all_paused = true;
        for element in &elements {
            // or if any of its slaved media elements are blocked media elements,
            if element.is_blocked() {
                return true;
            }

            // or if any of its slaved media elements whose autoplaying flag
            // is true still have their paused attribute set to true,
            if element.is_autoplaying() && element.paused() {
                return true;
            }

            if !element.paused() {
                all_paused = false;
            }
        }

        // or if all of its slaved media elements have their paused attribute
        // set to true.
        all_paused
    }

    /// All slaved elements ended playback and the rate is not negative.
    pub fn has_ended(&self) -> bool {
        if self.clock.play_rate() < 0. {
            return false;
        }
        let elements = self.media_elements();
        !elements.is_empty() && elements.iter().all(|element| element.ended())
    }

    fn schedule_event(&self, type_: EventType) {
        self.event_queue.enqueue_event(&self.event_target, type_);
    }

    fn start_timeupdate_timer(&self) {
        if self.timeupdate_timer.is_active() {
            return;
        }
        let this = self.this.clone();
        self.timeupdate_timer
            .start_repeating(prefs::get().timeupdate_interval(), move || {
                if let Some(controller) = this.upgrade() {
                    controller.schedule_timeupdate_event();
                }
            });
    }

    fn schedule_timeupdate_event(&self) {
        let now = self.event_loop.now();
        let interval = Duration::from_millis(pref!(media_timeupdate_interval_ms));
        if let Some(previous) = self.previous_timeupdate_time.get() {
            if now.saturating_sub(previous) < interval {
                return;
            }
        }
        self.schedule_event(EventType::TimeUpdate);
        self.previous_timeupdate_time.set(Some(now));
    }

    pub fn is_live_stream(&self) -> bool {
        let elements = self.media_elements();
        !elements.is_empty() && elements.iter().all(|element| element.is_live_stream())
    }

    pub fn return_to_realtime(&self) {
        for element in self.media_elements() {
            element.return_to_realtime();
        }
    }
}

impl MediaControllerInterface for MediaController {
    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-buffered
    fn buffered(&self) -> TimeRanges {
        let elements = self.media_elements();
        let Some((first, rest)) = elements.split_first() else {
            return TimeRanges::new();
        };
        let mut ranges = first.buffered();
        for element in rest {
            ranges.intersect_with(&element.buffered());
        }
        ranges
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-seekable
    fn seekable(&self) -> TimeRanges {
        let elements = self.media_elements();
        let Some((first, rest)) = elements.split_first() else {
            return TimeRanges::new();
        };
        let mut ranges = first.seekable();
        for element in rest {
            ranges.intersect_with(&element.seekable());
        }
        ranges
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-played
    fn played(&self) -> TimeRanges {
        let mut ranges = TimeRanges::new();
        for element in self.media_elements() {
            ranges.union_with(&element.played());
        }
        ranges
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-duration
    fn duration(&self) -> f64 {
        self.media_elements()
            .iter()
            .map(|element| element.duration())
            .filter(|duration| !duration.is_nan())
            .fold(0., f64::max)
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-currenttime
    fn current_time(&self) -> f64 {
        if self.media_elements().is_empty() {
            return 0.;
        }

        if let Some(position) = self.position.get() {
            return position;
        }

        // Some clocks may return times outside the range of [0..duration].
        let position = self.clock.current_time().min(self.duration()).max(0.);
        self.position.set(Some(position));
        let cached = self.position.clone();
        self.clear_position_timer
            .start_one_shot(Duration::ZERO, move || cached.set(None));
        position
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-currenttime
    fn set_current_time(&self, time: f64) -> ErrorResult {
        // If the new playback position is less than zero, then set it to
        // zero. If it is greater than the media controller duration, then set
        // it to the media controller duration.
        let time = time.max(0.).min(self.duration());

        // Set the media controller position to the new playback position.
        self.clock.set_current_time(time);
        self.position.set(None);

        // Seek each slaved media element to the new playback position
        // relative to the media element timeline.
        let mut result = Ok(());
        for element in self.media_elements() {
            if let Err(error) = element.seek(time) {
                result = Err(error);
            }
        }

        self.schedule_timeupdate_event();
        result
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-paused
    fn paused(&self) -> bool {
        self.paused.get()
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-play
    fn play(&self) {
        // Invoke the play method of each slaved media element in turn,
        for element in self.media_elements() {
            element.play();
        }
        // and then invoke the unpause method of the MediaController.
        self.unpause();
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-pause
    fn pause(&self) {
        // If the MediaController is a playing media controller,
        if self.paused.get() {
            return;
        }
        // change the MediaController into a paused media controller,
        self.paused.set(true);
        // queue a task to fire a simple event named pause at the MediaController,
        self.schedule_event(EventType::Pause);
        // and then report the controller state of the MediaController.
        self.report_controller_state();
    }

    fn default_playback_rate(&self) -> f64 {
        self.default_playback_rate.get()
    }

    fn set_default_playback_rate(&self, rate: f64) {
        if self.default_playback_rate.get() == rate {
            return;
        }
        self.default_playback_rate.set(rate);
        self.schedule_event(EventType::RateChange);
    }

    fn playback_rate(&self) -> f64 {
        self.clock.play_rate()
    }

    fn set_playback_rate(&self, rate: f64) {
        if self.clock.play_rate() == rate {
            return;
        }
        self.clock.set_play_rate(rate);
        for element in self.media_elements() {
            element.update_playback_rate();
        }
        self.schedule_event(EventType::RateChange);
    }

    fn volume(&self) -> f64 {
        self.volume.get()
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediacontroller-volume
    fn set_volume(&self, volume: f64) -> ErrorResult {
        if self.volume.get() == volume {
            return Ok(());
        }
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::IndexSize);
        }
        self.volume.set(volume);
        self.schedule_event(EventType::VolumeChange);
        for element in self.media_elements() {
            element.update_volume();
        }
        Ok(())
    }

    fn muted(&self) -> bool {
        self.muted.get()
    }

    fn set_muted(&self, muted: bool) {
        if self.muted.get() == muted {
            return;
        }
        self.muted.set(muted);
        self.schedule_event(EventType::VolumeChange);
        for element in self.media_elements() {
            element.update_volume();
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    fn has_audio(&self) -> bool {
        self.media_elements().iter().any(|element| element.has_audio())
    }

    fn has_video(&self) -> bool {
        self.media_elements().iter().any(|element| element.has_video())
    }

    fn has_closed_captions(&self) -> bool {
        self.media_elements()
            .iter()
            .any(|element| element.has_closed_captions())
    }

    fn set_closed_captions_visible(&self, visible: bool) {
        self.closed_captions_visible.set(visible);
        for element in self.media_elements() {
            element.set_closed_captions_visible(visible);
        }
    }

    fn closed_captions_visible(&self) -> bool {
        self.closed_captions_visible.get()
    }

    fn supports_scanning(&self) -> bool {
        self.media_elements()
            .iter()
            .all(|element| element.supports_scanning())
    }

    fn begin_scrubbing(&self) {
        for element in self.media_elements() {
            element.begin_scrubbing();
        }
        if self.playback_state.get() == PlaybackState::Playing {
            self.clock.stop();
        }
    }

    fn end_scrubbing(&self) {
        for element in self.media_elements() {
            element.end_scrubbing();
        }
        if self.playback_state.get() == PlaybackState::Playing {
            self.clock.start();
        }
    }

    fn can_play(&self) -> bool {
        if self.paused.get() {
            return true;
        }
        self.media_elements().iter().all(|element| element.can_play())
    }

    fn has_current_src(&self) -> bool {
        self.media_elements()
            .iter()
            .all(|element| element.has_current_src())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use media_traits::ReadyState;

    use super::{MediaController, PlaybackState};
    use crate::dom::bindings::error::Error;
    use crate::dom::event::EventType;
    use crate::dom::mediacontrollerinterface::MediaControllerInterface;
    use crate::event_loop::EventLoop;

    fn record(controller: &MediaController, types: &[EventType]) -> Rc<RefCell<Vec<&'static str>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for type_ in types {
            let log = log.clone();
            controller
                .event_target()
                .add_event_listener(*type_, move |event| log.borrow_mut().push(event.name()));
        }
        log
    }

    #[test]
    fn empty_controller_waits_at_have_nothing() {
        let event_loop = EventLoop::new();
        let controller = MediaController::new(&event_loop);
        controller.report_controller_state();
        assert_eq!(controller.ready_state(), ReadyState::HaveNothing);
        assert_eq!(controller.playback_state(), PlaybackState::Waiting);
        assert!(!controller.is_blocked());
        assert!(!controller.has_ended());
        assert_eq!(controller.current_time(), 0.);
        assert_eq!(controller.duration(), 0.);
        assert!(controller.buffered().is_empty());
    }

    #[test]
    fn paused_controller_is_blocked() {
        let event_loop = EventLoop::new();
        let controller = MediaController::new(&event_loop);
        let log = record(&controller, &[EventType::Pause, EventType::Play]);
        controller.pause();
        controller.pause();
        assert!(controller.is_blocked());
        controller.unpause();
        assert!(!controller.is_blocked());
        event_loop.run_until_idle();
        assert_eq!(*log.borrow(), vec!["pause", "play"]);
    }

    #[test]
    fn volume_outside_unit_range_is_rejected() {
        let event_loop = EventLoop::new();
        let controller = MediaController::new(&event_loop);
        let log = record(&controller, &[EventType::VolumeChange]);
        assert_eq!(controller.set_volume(1.5), Err(Error::IndexSize));
        assert_eq!(controller.set_volume(-0.1), Err(Error::IndexSize));
        assert_eq!(controller.volume(), 1.);
        assert_eq!(controller.set_volume(0.5), Ok(()));
        controller.set_muted(true);
        event_loop.run_until_idle();
        assert_eq!(*log.borrow(), vec!["volumechange", "volumechange"]);
    }

    #[test]
    fn rate_changes_fire_once() {
        let event_loop = EventLoop::new();
        let controller = MediaController::new(&event_loop);
        let log = record(&controller, &[EventType::RateChange]);
        controller.set_playback_rate(2.);
        controller.set_playback_rate(2.);
        controller.set_default_playback_rate(0.5);
        event_loop.advance(Duration::from_millis(1));
        assert_eq!(controller.playback_rate(), 2.);
        assert_eq!(*log.borrow(), vec!["ratechange", "ratechange"]);
    }
}
