/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use bitflags::bitflags;
use euclid::default::Size2D;
use log::{debug, trace, warn};
use media_config::{pref, prefs};
use media_player::{MediaPlayer, MediaPlayerClient};
use media_traits::{
    ContentType, CueDataId, GenericCueData, InbandTextTrackInfo, InbandTrackId,
    NetworkState as PlayerNetworkState, Preload, ReadyState, SupportsType, TextTrackKind,
    TimeRanges, WebVttCueData,
};
use smallvec::SmallVec;
use strum::IntoStaticStr;
use url::Url;

use crate::dom::bindings::error::{Error, ErrorResult, Fallible};
use crate::dom::document::{Document, MediaCanStartListener};
use crate::dom::event::EventType;
use crate::dom::eventtarget::EventTarget;
use crate::dom::genericeventqueue::GenericEventQueue;
use crate::dom::htmlsourceelement::HTMLSourceElement;
use crate::dom::inbandtexttrack::InbandTextTrack;
use crate::dom::loadabletexttrack::LoadableTextTrack;
use crate::dom::mediacontroller::MediaController;
use crate::dom::mediacontrollerinterface::MediaControllerInterface;
use crate::dom::mediaerror::{MediaError, MediaErrorCode};
use crate::dom::texttrack::{
    ReadinessState, TextTrack, TextTrackClient, TextTrackMode, TextTrackType,
};
use crate::dom::texttrackcue::TextTrackCue;
use crate::dom::texttracklist::TextTrackList;
use crate::event_loop::{EventLoop, EventSource};
use crate::timers::Timer;

/// <https://html.spec.whatwg.org/multipage/#dom-media-networkstate>
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum NetworkState {
    Empty = 0,
    Idle = 1,
    Loading = 2,
    NoSource = 3,
}

/// <https://html.spec.whatwg.org/multipage/#dom-navigator-canplaytype>
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq)]
pub enum CanPlayTypeResult {
    #[strum(serialize = "")]
    Empty,
    #[strum(serialize = "maybe")]
    Maybe,
    #[strum(serialize = "probably")]
    Probably,
}

impl CanPlayTypeResult {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl From<SupportsType> for CanPlayTypeResult {
    fn from(support: SupportsType) -> CanPlayTypeResult {
        match support {
            SupportsType::IsNotSupported => CanPlayTypeResult::Empty,
            SupportsType::MayBeSupported => CanPlayTypeResult::Maybe,
            SupportsType::IsSupported => CanPlayTypeResult::Probably,
        }
    }
}

bitflags! {
    /// Gates on actions a page may only take after a user gesture or once
    /// the page allows media to start.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct BehaviorRestrictions: u8 {
        const REQUIRE_USER_GESTURE_FOR_LOAD = 1 << 0;
        const REQUIRE_USER_GESTURE_FOR_RATE_CHANGE = 1 << 1;
        const REQUIRE_USER_GESTURE_FOR_FULLSCREEN = 1 << 2;
        const REQUIRE_PAGE_CONSENT_TO_LOAD_MEDIA = 1 << 3;
    }
}

impl BehaviorRestrictions {
    fn from_prefs() -> BehaviorRestrictions {
        let preferences = prefs::get();
        let mut restrictions = BehaviorRestrictions::empty();
        restrictions.set(
            BehaviorRestrictions::REQUIRE_USER_GESTURE_FOR_LOAD,
            preferences.media_load_requires_user_gesture,
        );
        restrictions.set(
            BehaviorRestrictions::REQUIRE_USER_GESTURE_FOR_RATE_CHANGE,
            preferences.media_rate_change_requires_user_gesture,
        );
        restrictions.set(
            BehaviorRestrictions::REQUIRE_USER_GESTURE_FOR_FULLSCREEN,
            preferences.media_fullscreen_requires_user_gesture,
        );
        restrictions.set(
            BehaviorRestrictions::REQUIRE_PAGE_CONSENT_TO_LOAD_MEDIA,
            preferences.media_require_page_consent_to_load,
        );
        restrictions
    }
}

bitflags! {
    /// Work batched onto the element's zero-delay load timer.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    struct DelayedAction: u8 {
        const LOAD_MEDIA_RESOURCE = 1 << 0;
        const CONFIGURE_TEXT_TRACKS = 1 << 1;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LoadState {
    WaitingForSource,
    LoadingFromSrcAttr,
    LoadingFromSourceElement,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum InvalidUrlAction {
    DoNothing,
    Complain,
}

/// Counts nested engine notifications for as long as it lives.
struct MediaPlayerCallbackScope<'a>(&'a Cell<u32>);

impl<'a> MediaPlayerCallbackScope<'a> {
    fn new(counter: &'a Cell<u32>) -> MediaPlayerCallbackScope<'a> {
        counter.set(counter.get() + 1);
        MediaPlayerCallbackScope(counter)
    }
}

impl Drop for MediaPlayerCallbackScope<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// A source the resource selection algorithm picked, with the type it
/// advertised.
struct SourceCandidate {
    url: Url,
    content_type: ContentType,
    key_system: String,
}

/// The state machine shared by `<audio>` and `<video>`.
///
/// The element owns its `MediaPlayer` and is that player's client. Events are
/// queued on the element's own event queue and fire from the event loop.
///
/// <https://html.spec.whatwg.org/multipage/#htmlmediaelement>
pub struct HTMLMediaElement {
    this: Weak<HTMLMediaElement>,
    event_target: Rc<EventTarget>,
    document: Rc<Document>,
    event_loop: Rc<EventLoop>,
    is_video: bool,

    src: RefCell<Option<String>>,
    autoplay: Cell<bool>,
    loop_: Cell<bool>,
    controls: Cell<bool>,
    preload: Cell<Preload>,
    media_group: RefCell<Option<String>>,
    sources: RefCell<Vec<Rc<HTMLSourceElement>>>,

    player: RefCell<Option<Rc<MediaPlayer>>>,
    /// <https://html.spec.whatwg.org/multipage/#dom-media-networkstate>
    network_state: Cell<NetworkState>,
    /// <https://html.spec.whatwg.org/multipage/#dom-media-readystate>
    ready_state: Cell<ReadyState>,
    ready_state_maximum: Cell<ReadyState>,
    /// <https://html.spec.whatwg.org/multipage/#dom-media-currentsrc>
    current_src: RefCell<Option<Url>>,
    /// <https://html.spec.whatwg.org/multipage/#dom-media-error>
    error: RefCell<Option<MediaError>>,

    volume: Cell<f64>,
    muted: Cell<bool>,
    default_playback_rate: Cell<f64>,
    playback_rate: Cell<f64>,
    last_seek_time: Cell<f64>,
    cached_time: Cell<Option<f64>>,
    played_time_ranges: RefCell<TimeRanges>,
    previous_progress_time: Cell<Duration>,
    last_timeupdate_event_wall_time: Cell<Option<Duration>>,
    last_timeupdate_event_movie_time: Cell<Option<f64>>,

    load_state: Cell<LoadState>,
    current_source_node: RefCell<Option<Rc<HTMLSourceElement>>>,
    /// Where the next scan of `<source>` children starts; `None` once the
    /// end of the list is reached.
    next_child_node_to_consider: RefCell<Option<Rc<HTMLSourceElement>>>,

    restrictions: Cell<BehaviorRestrictions>,
    pending_action_flags: Cell<DelayedAction>,
    load_timer: Timer,
    progress_event_timer: Timer,
    playback_progress_timer: Timer,
    async_event_queue: GenericEventQueue,
    processing_media_player_callback: Cell<u32>,

    playing: Cell<bool>,
    paused: Cell<bool>,
    paused_internal: Cell<bool>,
    seeking: Cell<bool>,
    autoplaying: Cell<bool>,
    is_waiting_until_media_can_start: Cell<bool>,
    sent_stalled_event: Cell<bool>,
    sent_end_event: Cell<bool>,
    have_fired_loaded_data: Cell<bool>,
    completely_loaded: Cell<bool>,
    have_prepared_to_play: Cell<bool>,
    closed_captions_visible: Cell<bool>,
    is_fullscreen: Cell<bool>,

    text_tracks: Rc<TextTrackList>,
    text_tracks_when_resource_selection_began: RefCell<Vec<Rc<TextTrack>>>,
    tracks_are_ready: Cell<bool>,
    inband_tracks: RefCell<Vec<Rc<InbandTextTrack>>>,
    track_elements: RefCell<Vec<Rc<LoadableTextTrack>>>,
    /// Cues of every track that is not disabled.
    cue_tree: RefCell<Vec<Rc<TextTrackCue>>>,
    currently_active_cues: RefCell<Vec<Rc<TextTrackCue>>>,
    last_text_track_update_time: Cell<Option<f64>>,

    media_controller: RefCell<Option<Rc<MediaController>>>,
}

impl HTMLMediaElement {
    pub fn new(document: &Rc<Document>, is_video: bool) -> Rc<HTMLMediaElement> {
        let event_loop = document.event_loop().clone();
        let element = Rc::new_cyclic(|this| HTMLMediaElement {
            this: this.clone(),
            event_target: EventTarget::new(),
            document: document.clone(),
            event_loop: event_loop.clone(),
            is_video,
            src: RefCell::new(None),
            autoplay: Cell::new(false),
            loop_: Cell::new(false),
            controls: Cell::new(false),
            preload: Cell::new(Preload::Auto),
            media_group: RefCell::new(None),
            sources: RefCell::new(Vec::new()),
            player: RefCell::new(None),
            network_state: Cell::new(NetworkState::Empty),
            ready_state: Cell::new(ReadyState::HaveNothing),
            ready_state_maximum: Cell::new(ReadyState::HaveNothing),
            current_src: RefCell::new(None),
            error: RefCell::new(None),
            volume: Cell::new(1.),
            muted: Cell::new(false),
            default_playback_rate: Cell::new(1.),
            playback_rate: Cell::new(1.),
            last_seek_time: Cell::new(0.),
            cached_time: Cell::new(None),
            played_time_ranges: RefCell::new(TimeRanges::new()),
            previous_progress_time: Cell::new(Duration::ZERO),
            last_timeupdate_event_wall_time: Cell::new(None),
            last_timeupdate_event_movie_time: Cell::new(None),
            load_state: Cell::new(LoadState::WaitingForSource),
            current_source_node: RefCell::new(None),
            next_child_node_to_consider: RefCell::new(None),
            restrictions: Cell::new(BehaviorRestrictions::from_prefs()),
            pending_action_flags: Cell::new(DelayedAction::empty()),
            load_timer: Timer::new(&event_loop),
            progress_event_timer: Timer::new(&event_loop),
            playback_progress_timer: Timer::new(&event_loop),
            async_event_queue: GenericEventQueue::new(&event_loop),
            processing_media_player_callback: Cell::new(0),
            playing: Cell::new(false),
            paused: Cell::new(true),
            paused_internal: Cell::new(false),
            seeking: Cell::new(false),
            autoplaying: Cell::new(true),
            is_waiting_until_media_can_start: Cell::new(false),
            sent_stalled_event: Cell::new(false),
            sent_end_event: Cell::new(false),
            have_fired_loaded_data: Cell::new(false),
            completely_loaded: Cell::new(false),
            have_prepared_to_play: Cell::new(false),
            closed_captions_visible: Cell::new(false),
            is_fullscreen: Cell::new(false),
            text_tracks: TextTrackList::new(&event_loop),
            text_tracks_when_resource_selection_began: RefCell::new(Vec::new()),
            tracks_are_ready: Cell::new(true),
            inband_tracks: RefCell::new(Vec::new()),
            track_elements: RefCell::new(Vec::new()),
            cue_tree: RefCell::new(Vec::new()),
            currently_active_cues: RefCell::new(Vec::new()),
            last_text_track_update_time: Cell::new(None),
            media_controller: RefCell::new(None),
        });
        document.register_media_element(Rc::downgrade(&element));
        let source: Weak<dyn EventSource> = Rc::downgrade(&element) as Weak<dyn EventSource>;
        event_loop.register_event_source(source);
        element
    }

    pub fn event_target(&self) -> &Rc<EventTarget> {
        &self.event_target
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn is_video(&self) -> bool {
        self.is_video
    }

    fn player(&self) -> Option<Rc<MediaPlayer>> {
        self.player.borrow().clone()
    }

    fn schedule_event(&self, type_: EventType) {
        trace!("Scheduling {} on media element", type_.name());
        self.async_event_queue
            .enqueue_event(&self.event_target, type_);
    }

    /// Types of the events queued on the element and not yet fired.
    pub fn pending_event_types(&self) -> Vec<EventType> {
        self.async_event_queue.pending_event_types()
    }

    // Attributes

    // https://html.spec.whatwg.org/multipage/#dom-media-src
    pub fn src(&self) -> Option<String> {
        self.src.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-src
    pub fn set_src(&self, src: Option<&str>) {
        *self.src.borrow_mut() = src.map(str::to_owned);
        // Trigger a reload, as long as the 'src' attribute is present.
        if src.is_some() {
            self.schedule_delayed_action(DelayedAction::LOAD_MEDIA_RESOURCE);
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-autoplay
    pub fn autoplay(&self) -> bool {
        self.autoplay.get()
    }

    pub fn set_autoplay(&self, autoplay: bool) {
        self.autoplay.set(autoplay);
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-loop
    pub fn loop_(&self) -> bool {
        self.loop_.get()
    }

    pub fn set_loop(&self, loop_: bool) {
        self.loop_.set(loop_);
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-controls
    pub fn controls(&self) -> bool {
        self.controls.get()
    }

    pub fn set_controls(&self, controls: bool) {
        self.controls.set(controls);
    }

    // https://html.spec.whatwg.org/multipage/#attr-media-preload
    pub fn preload(&self) -> Preload {
        self.preload.get()
    }

    pub fn set_preload(&self, value: Option<&str>) {
        self.preload.set(Preload::from_attribute(value));
        // The attribute must be ignored if the autoplay attribute is present.
        if !self.autoplay.get() {
            if let Some(player) = self.player() {
                player.set_preload(self.preload.get());
            }
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-mediagroup
    pub fn media_group(&self) -> Option<String> {
        self.media_group.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#attr-media-mediagroup
    pub fn set_media_group(&self, group: Option<&str>) {
        if self.media_group.borrow().as_deref() == group {
            return;
        }
        *self.media_group.borrow_mut() = group.map(str::to_owned);

        // Step 2. Let m have no current media controller, if it currently has one.
        self.set_controller_internal(None);

        // Step 3. If m's mediagroup attribute is being removed, then abort these steps.
        let Some(group) = group.filter(|group| !group.is_empty()) else {
            return;
        };

        // Step 4. If there is another media element whose Document is the same as
        // m's Document, and which also has a mediagroup attribute with the same
        // value, then let controller be that media element's current media
        // controller.
        let existing = self
            .document
            .media_elements()
            .into_iter()
            .filter(|element| !std::ptr::eq(element.as_ref(), self))
            .find(|element| element.media_group().as_deref() == Some(group));
        if let Some(element) = existing {
            self.set_controller_internal(element.controller());
            return;
        }

        // Step 5. Otherwise, let controller be a newly created MediaController.
        self.set_controller_internal(Some(self.document.create_media_controller()));
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-controller
    pub fn controller(&self) -> Option<Rc<MediaController>> {
        self.media_controller.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-controller
    pub fn set_controller(&self, controller: Option<Rc<MediaController>>) {
        // On setting, it must first remove the element's mediagroup attribute, if any,
        *self.media_group.borrow_mut() = None;
        // and then set the current media controller to the given value.
        self.set_controller_internal(controller);
    }

    fn set_controller_internal(&self, controller: Option<Rc<MediaController>>) {
        let previous = self.media_controller.replace(controller.clone());
        if let Some(previous) = previous {
            previous.remove_media_element(self);
        }
        if let (Some(controller), Some(this)) = (controller, self.this.upgrade()) {
            controller.add_media_element(&this);
        }
    }

    fn update_media_controller(&self) {
        if let Some(controller) = self.controller() {
            controller.report_controller_state();
        }
    }

    // Source children

    pub fn sources(&self) -> Vec<Rc<HTMLSourceElement>> {
        self.sources.borrow().clone()
    }

    fn next_source_sibling(&self, source: &HTMLSourceElement) -> Option<Rc<HTMLSourceElement>> {
        let sources = self.sources.borrow();
        let index = sources
            .iter()
            .position(|existing| std::ptr::eq(existing.as_ref(), source))?;
        sources.get(index + 1).cloned()
    }

    /// Inserts a `<source>` child at the end of the element.
    pub fn append_source(&self, source: &Rc<HTMLSourceElement>) {
        self.sources.borrow_mut().push(source.clone());
        self.source_was_added(source);
    }

    // https://html.spec.whatwg.org/multipage/#the-source-element:the-source-element-15
    fn source_was_added(&self, source: &Rc<HTMLSourceElement>) {
        // We should only consider a <source> element when there is not src attribute at all.
        if self.src.borrow().is_some() {
            return;
        }

        // If a source element is inserted as a child of a media element that has no
        // src attribute and whose networkState has the value NETWORK_EMPTY, the
        // user agent must invoke the media element's resource selection algorithm.
        if self.network_state.get() == NetworkState::Empty {
            self.schedule_delayed_action(DelayedAction::LOAD_MEDIA_RESOURCE);
            *self.next_child_node_to_consider.borrow_mut() = Some(source.clone());
            return;
        }

        let current = self.current_source_node.borrow().clone();
        if let Some(current) = current {
            let follows_current = self
                .next_source_sibling(&current)
                .is_some_and(|next| Rc::ptr_eq(&next, source));
            if follows_current {
                debug!("<source> inserted immediately after current source");
                *self.next_child_node_to_consider.borrow_mut() = Some(source.clone());
                return;
            }
        }

        if self.next_child_node_to_consider.borrow().is_some() {
            return;
        }

        // Wait until the node after pointer is a node other than the end of the
        // list, then set the networkState back to NETWORK_LOADING and jump back
        // to the find next candidate step.
        self.network_state.set(NetworkState::Loading);
        self.load_state.set(LoadState::LoadingFromSourceElement);
        *self.next_child_node_to_consider.borrow_mut() = Some(source.clone());
        self.schedule_next_source_child();
    }

    /// Removes a `<source>` child. Returns whether it was a child.
    pub fn remove_source(&self, source: &HTMLSourceElement) -> bool {
        let next = self.next_source_sibling(source);
        let removed = {
            let mut sources = self.sources.borrow_mut();
            let before = sources.len();
            sources.retain(|existing| !std::ptr::eq(existing.as_ref(), source));
            before != sources.len()
        };
        if removed {
            self.source_was_removed(source, next);
        }
        removed
    }

    fn source_was_removed(&self, source: &HTMLSourceElement, next: Option<Rc<HTMLSourceElement>>) {
        source.cancel_pending_error_event();

        let is_next_to_consider = self
            .next_child_node_to_consider
            .borrow()
            .as_ref()
            .is_some_and(|node| std::ptr::eq(node.as_ref(), source));
        if is_next_to_consider {
            *self.next_child_node_to_consider.borrow_mut() = next;
            return;
        }

        let is_current = self
            .current_source_node
            .borrow()
            .as_ref()
            .is_some_and(|node| std::ptr::eq(node.as_ref(), source));
        if is_current {
            // Clear the current source node pointer, but don't change the movie as the
            // spec says: "Dynamically modifying a source element and its attribute when
            // the element is already inserted in a video or audio element will have no
            // effect."
            *self.current_source_node.borrow_mut() = None;
        }
    }

    // Loading

    fn schedule_delayed_action(&self, action: DelayedAction) {
        let mut flags = self.pending_action_flags.get();
        if action.contains(DelayedAction::LOAD_MEDIA_RESOURCE) &&
            !flags.contains(DelayedAction::LOAD_MEDIA_RESOURCE)
        {
            self.prepare_for_load();
            flags = self.pending_action_flags.get();
            flags.insert(DelayedAction::LOAD_MEDIA_RESOURCE);
        }
        if action.contains(DelayedAction::CONFIGURE_TEXT_TRACKS) {
            flags.insert(DelayedAction::CONFIGURE_TEXT_TRACKS);
        }
        self.pending_action_flags.set(flags);
        self.start_load_timer();
    }

    fn schedule_next_source_child(&self) {
        // Schedule the timer to try the next <source> element WITHOUT resetting state
        // ala prepare_for_load.
        let mut flags = self.pending_action_flags.get();
        flags.insert(DelayedAction::LOAD_MEDIA_RESOURCE);
        self.pending_action_flags.set(flags);
        self.start_load_timer();
    }

    fn start_load_timer(&self) {
        if self.load_timer.is_active() {
            return;
        }
        let this = self.this.clone();
        self.load_timer.start_one_shot(Duration::ZERO, move || {
            if let Some(element) = this.upgrade() {
                element.load_timer_fired();
            }
        });
    }

    fn load_timer_fired(&self) {
        // Failures while loading can schedule the next source synchronously.
        let flags = self.pending_action_flags.replace(DelayedAction::empty());
        if flags.contains(DelayedAction::LOAD_MEDIA_RESOURCE) {
            if self.load_state.get() == LoadState::LoadingFromSourceElement {
                self.load_next_source_child();
            } else {
                self.load_internal();
            }
        }
        if flags.contains(DelayedAction::CONFIGURE_TEXT_TRACKS) {
            self.configure_text_tracks();
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-load
    pub fn load(&self) {
        let processing_user_gesture = self.document.host().processing_user_gesture();
        if self.user_gesture_required_for_load() && !processing_user_gesture {
            debug!("Ignoring load() outside of a user gesture");
            return;
        }
        if processing_user_gesture {
            self.remove_behavior_restrictions_after_first_user_gesture();
        }

        self.prepare_for_load();
        self.load_internal();
        self.prepare_to_play();
    }

    // https://html.spec.whatwg.org/multipage/#media-element-load-algorithm
    fn prepare_for_load(&self) {
        // Perform the cleanup required for the resource load algorithm to run.
        self.stop_periodic_timers();
        self.load_timer.stop();
        self.sent_end_event.set(false);
        self.sent_stalled_event.set(false);
        self.have_fired_loaded_data.set(false);
        self.completely_loaded.set(false);
        self.have_prepared_to_play.set(false);

        // Step 1. Abort any already-running instance of the resource selection algorithm.
        self.load_state.set(LoadState::WaitingForSource);
        *self.current_source_node.borrow_mut() = None;

        // Step 2. Remove any queued tasks of the media element event task source.
        self.cancel_pending_events_and_callbacks();

        // Step 3. If networkState is NETWORK_LOADING or NETWORK_IDLE, queue a task
        // to fire a simple event named abort at the media element.
        let network_state = self.network_state.get();
        if network_state == NetworkState::Loading || network_state == NetworkState::Idle {
            self.schedule_event(EventType::Abort);
        }

        self.create_media_player();

        // Step 4. If networkState is not NETWORK_EMPTY,
        if network_state != NetworkState::Empty {
            self.network_state.set(NetworkState::Empty);
            self.ready_state.set(ReadyState::HaveNothing);
            self.ready_state_maximum.set(ReadyState::HaveNothing);
            self.refresh_cached_time();
            self.paused.set(true);
            self.seeking.set(false);
            self.invalidate_cached_time();
            self.schedule_event(EventType::Emptied);
            self.update_media_controller();
            self.update_active_text_track_cues(0.);
        }

        // Step 5. Set the playbackRate attribute to the value of the
        // defaultPlaybackRate attribute.
        self.set_playback_rate(self.default_playback_rate.get());

        // Step 6. Set the error attribute to null and the autoplaying flag to true.
        *self.error.borrow_mut() = None;
        self.autoplaying.set(true);

        // The resource selection algorithm, step 1. Set the networkState to
        // NETWORK_NO_SOURCE.
        self.network_state.set(NetworkState::NoSource);

        *self.played_time_ranges.borrow_mut() = TimeRanges::new();
        self.last_seek_time.set(0.);
    }

    fn create_media_player(&self) {
        let client: Weak<dyn MediaPlayerClient> = self.this.clone() as Weak<dyn MediaPlayerClient>;
        let player = Rc::new(MediaPlayer::new(self.document.registry().clone(), client));
        let previous = self.player.replace(Some(player));
        if let Some(previous) = previous {
            previous.cancel_load();
        }
    }

    fn load_internal(&self) {
        // If we can't start a load right away, start it later.
        if self.page_consent_required_for_load() && !self.document.can_start_media() {
            if self.is_waiting_until_media_can_start.get() {
                return;
            }
            debug!("Media element waiting until the page can start media");
            let listener: Weak<dyn MediaCanStartListener> =
                self.this.clone() as Weak<dyn MediaCanStartListener>;
            self.document.add_media_can_start_listener(listener);
            self.is_waiting_until_media_can_start.set(true);
            return;
        }

        let mut flags = self.pending_action_flags.get();
        flags.remove(DelayedAction::LOAD_MEDIA_RESOURCE);
        self.pending_action_flags.set(flags);

        // Once the page has allowed an element to load media, it is free to load at will.
        self.remove_behavior_restriction(BehaviorRestrictions::REQUIRE_PAGE_CONSENT_TO_LOAD_MEDIA);

        // Remember the text tracks whose mode was not disabled when resource
        // selection started; the ready state waits on them.
        let enabled_tracks = self
            .text_tracks
            .tracks()
            .into_iter()
            .filter(|track| track.mode() != TextTrackMode::Disabled)
            .collect();
        *self.text_tracks_when_resource_selection_began.borrow_mut() = enabled_tracks;

        self.select_media_resource();
    }

    // https://html.spec.whatwg.org/multipage/#concept-media-load-algorithm
    fn select_media_resource(&self) {
        let src = self.src.borrow().clone();

        // Step 3. If the media element has a src attribute, then let mode be attribute.
        let from_attribute = match src {
            Some(_) => true,
            None => {
                // Otherwise, if the media element does not have a src attribute but has a
                // source element child, then let mode be children and let candidate be the
                // first such source element child in tree order.
                let first = self.sources.borrow().first().cloned();
                match first {
                    Some(first) => {
                        *self.next_child_node_to_consider.borrow_mut() = Some(first);
                        *self.current_source_node.borrow_mut() = None;
                        false
                    },
                    None => {
                        // Otherwise the media element has neither a src attribute nor a
                        // source element child: set the networkState to NETWORK_EMPTY, and
                        // abort these steps.
                        self.load_state.set(LoadState::WaitingForSource);
                        self.network_state.set(NetworkState::Empty);
                        debug!("Nothing to load");
                        return;
                    },
                }
            },
        };

        // Step 4. Set the networkState to NETWORK_LOADING.
        self.network_state.set(NetworkState::Loading);

        // Step 5. Queue a task to fire a simple event named loadstart at the media element.
        self.schedule_event(EventType::LoadStart);

        // Step 6. If mode is attribute, then run these substeps.
        if from_attribute {
            self.load_state.set(LoadState::LoadingFromSrcAttr);

            // If the src attribute's value is the empty string, jump down to the
            // failed step below.
            let url = src
                .filter(|src| !src.is_empty())
                .and_then(|src| self.document.url_for(&src));
            let Some(url) = url else {
                debug!("Empty or invalid 'src'");
                self.media_loading_failed(PlayerNetworkState::FormatError);
                return;
            };

            if !self.is_safe_to_load_url(&url, InvalidUrlAction::Complain) {
                self.media_loading_failed(PlayerNetworkState::FormatError);
                return;
            }

            // No type or key system information is available when the url comes from
            // the 'src' attribute so the player will have to pick an engine based on
            // the file extension.
            self.load_resource(&url, &ContentType::new(""), "");
            return;
        }

        // Otherwise, the source elements will be used.
        self.load_next_source_child();
    }

    fn load_next_source_child(&self) {
        let Some(candidate) = self.select_next_source_child(InvalidUrlAction::Complain) else {
            self.wait_for_source_change();
            return;
        };

        // Recreate the media player for the new url.
        self.create_media_player();

        self.load_state.set(LoadState::LoadingFromSourceElement);
        self.load_resource(&candidate.url, &candidate.content_type, &candidate.key_system);
    }

    // https://html.spec.whatwg.org/multipage/#concept-media-load-resource
    fn load_resource(&self, url: &Url, content_type: &ContentType, key_system: &str) {
        debug!(
            "Loading media resource {} (type {:?}, key system {:?})",
            url,
            content_type.raw(),
            key_system
        );

        let Some(player) = self.player() else {
            self.media_loading_failed(PlayerNetworkState::FormatError);
            return;
        };

        // The resource fetch algorithm
        self.network_state.set(NetworkState::Loading);
        *self.current_src.borrow_mut() = Some(url.clone());

        self.start_progress_event_timer();

        player.set_private_browsing_mode(self.document.host().private_browsing);
        if !self.autoplay.get() {
            player.set_preload(self.preload.get());
        }
        self.update_volume();

        if !player.load(url, content_type, key_system) {
            self.media_loading_failed(PlayerNetworkState::FormatError);
        }
    }

    fn is_safe_to_load_url(&self, url: &Url, action_if_invalid: InvalidUrlAction) -> bool {
        if self.document.host().load_policy.is_safe_to_load_url(url) {
            return true;
        }
        if action_if_invalid == InvalidUrlAction::Complain {
            warn!("Not allowed to load media from {}", url);
        }
        false
    }

    fn have_potential_source_child(&self) -> bool {
        // Stash the current <source> node and next nodes so we can restore them
        // after checking to see there is another potential.
        let current_source_node = self.current_source_node.borrow().clone();
        let next_node = self.next_child_node_to_consider.borrow().clone();

        let candidate = self.select_next_source_child(InvalidUrlAction::DoNothing);

        *self.current_source_node.borrow_mut() = current_source_node;
        *self.next_child_node_to_consider.borrow_mut() = next_node;

        candidate.is_some()
    }

    // https://html.spec.whatwg.org/multipage/#concept-media-load-algorithm
    fn select_next_source_child(&self, action_if_invalid: InvalidUrlAction) -> Option<SourceCandidate> {
        let start = self.next_child_node_to_consider.borrow().clone();
        let Some(start) = start else {
            trace!("No <source> left to consider");
            return None;
        };

        let sources = self.sources();
        let start_index = sources
            .iter()
            .position(|source| Rc::ptr_eq(source, &start))
            .unwrap_or(sources.len());

        let mut selected = None;
        for (index, source) in sources.iter().enumerate().skip(start_index) {
            match self.evaluate_source(source, action_if_invalid) {
                Some(candidate) => {
                    selected = Some((index, candidate));
                    break;
                },
                None => {
                    if action_if_invalid == InvalidUrlAction::Complain {
                        source.schedule_error_event();
                    }
                },
            }
        }

        match selected {
            Some((index, candidate)) => {
                *self.current_source_node.borrow_mut() = Some(sources[index].clone());
                *self.next_child_node_to_consider.borrow_mut() = sources.get(index + 1).cloned();
                Some(candidate)
            },
            None => {
                *self.current_source_node.borrow_mut() = None;
                *self.next_child_node_to_consider.borrow_mut() = None;
                None
            },
        }
    }

    fn evaluate_source(
        &self,
        source: &HTMLSourceElement,
        action_if_invalid: InvalidUrlAction,
    ) -> Option<SourceCandidate> {
        // If candidate does not have a src attribute, or if its src attribute's value
        // is the empty string, the candidate fails.
        let url = source
            .src()
            .filter(|src| !src.is_empty())
            .and_then(|src| self.document.url_for(&src))?;

        if let Some(media) = source.media() {
            if !self.document.host().media_queries.matches(&media) {
                return None;
            }
        }

        let content_type = ContentType::new(&source.type_());
        let key_system = String::new();
        if !content_type.is_empty() || !key_system.is_empty() {
            let support = self
                .document
                .registry()
                .supports_type(&content_type, &key_system, Some(&url));
            if support == SupportsType::IsNotSupported {
                trace!("Skipping <source> of unsupported type {:?}", content_type.raw());
                return None;
            }
        }

        if !self.is_safe_to_load_url(&url, action_if_invalid) {
            return None;
        }

        Some(SourceCandidate {
            url,
            content_type,
            key_system,
        })
    }

    fn wait_for_source_change(&self) {
        debug!("Waiting for a new <source>");
        self.stop_periodic_timers();
        self.load_state.set(LoadState::WaitingForSource);
        *self.current_source_node.borrow_mut() = None;

        // Set the element's networkState attribute to the NETWORK_NO_SOURCE value.
        self.network_state.set(NetworkState::NoSource);
    }

    // https://html.spec.whatwg.org/multipage/#dedicated-media-source-failure-steps
    fn none_supported(&self) {
        debug!("No supported media source");
        self.stop_periodic_timers();
        self.load_state.set(LoadState::WaitingForSource);
        *self.current_source_node.borrow_mut() = None;

        // Step 1. Set the error attribute to a new MediaError object whose code
        // attribute is set to MEDIA_ERR_SRC_NOT_SUPPORTED.
        *self.error.borrow_mut() = Some(MediaError::new(MediaErrorCode::SrcNotSupported));

        // Step 2. Forget the media element's media-resource-specific text tracks.
        self.forget_resource_specific_tracks();

        // Step 3. Set the element's networkState attribute to the NETWORK_NO_SOURCE value.
        self.network_state.set(NetworkState::NoSource);

        // Step 4. Queue a task to fire a simple event named error at the media element.
        self.schedule_event(EventType::Error);
    }

    fn media_engine_error(&self, error: MediaError) {
        debug!("Media engine error {:?}", error.error_code());

        // Step 1. The user agent should cancel the fetching process.
        self.stop_periodic_timers();
        self.load_state.set(LoadState::WaitingForSource);

        // Step 2. Set the error attribute to a new MediaError object.
        *self.error.borrow_mut() = Some(error);

        // Step 3. Queue a task to fire a simple event named error at the media element.
        self.schedule_event(EventType::Error);

        // Step 4. Set the element's networkState attribute to the NETWORK_EMPTY value
        // and queue a task to fire a simple event called emptied at the element.
        self.network_state.set(NetworkState::Empty);
        self.schedule_event(EventType::Emptied);

        // Step 6. Abort the overall resource selection algorithm.
        *self.current_source_node.borrow_mut() = None;
    }

    fn cancel_pending_events_and_callbacks(&self) {
        self.async_event_queue.cancel_all_events();
        for source in self.sources() {
            source.cancel_pending_error_event();
        }
    }

    fn media_loading_failed(&self, error: PlayerNetworkState) {
        self.stop_periodic_timers();

        // If we failed while trying to load a <source> element, the movie was never
        // parsed, and there are more <source> children, schedule the next one.
        if self.ready_state.get() < ReadyState::HaveMetadata &&
            self.load_state.get() == LoadState::LoadingFromSourceElement
        {
            let current = self.current_source_node.borrow().clone();
            match current {
                Some(source) => source.schedule_error_event(),
                None => debug!("Error event not sent, <source> was removed"),
            }

            if self.have_potential_source_child() {
                debug!("Scheduling next <source>");
                self.schedule_next_source_child();
            } else {
                debug!("No more <source> elements, waiting");
                self.wait_for_source_change();
            }
            return;
        }

        match error {
            PlayerNetworkState::NetworkError if self.ready_state.get() >= ReadyState::HaveMetadata => {
                self.media_engine_error(MediaError::new(MediaErrorCode::Network))
            },
            PlayerNetworkState::DecodeError => {
                self.media_engine_error(MediaError::new(MediaErrorCode::Decode))
            },
            PlayerNetworkState::FormatError | PlayerNetworkState::NetworkError
                if self.load_state.get() == LoadState::LoadingFromSrcAttr =>
            {
                self.none_supported()
            },
            _ => {},
        }
    }

    fn set_network_state(&self, state: PlayerNetworkState) {
        debug!(
            "Network state {:?} (element {:?})",
            state,
            self.network_state.get()
        );

        match state {
            PlayerNetworkState::Empty => {
                // Just update the cached state and leave, we can't do anything.
                self.network_state.set(NetworkState::Empty);
            },
            PlayerNetworkState::FormatError |
            PlayerNetworkState::NetworkError |
            PlayerNetworkState::DecodeError => self.media_loading_failed(state),
            PlayerNetworkState::Idle => {
                if self.network_state.get() > NetworkState::Idle {
                    self.change_network_state_from_loading_to_idle();
                } else {
                    self.network_state.set(NetworkState::Idle);
                }
            },
            PlayerNetworkState::Loading => {
                let network_state = self.network_state.get();
                if network_state < NetworkState::Loading || network_state == NetworkState::NoSource {
                    self.start_progress_event_timer();
                }
                self.network_state.set(NetworkState::Loading);
            },
            PlayerNetworkState::Loaded => {
                if self.network_state.get() != NetworkState::Idle {
                    self.change_network_state_from_loading_to_idle();
                }
                self.completely_loaded.set(true);
            },
        }
    }

    fn change_network_state_from_loading_to_idle(&self) {
        self.progress_event_timer.stop();

        // Schedule one last progress event so we guarantee that at least one is
        // fired for files that load very quickly.
        self.schedule_event(EventType::Progress);
        self.schedule_event(EventType::Suspend);
        self.network_state.set(NetworkState::Idle);
    }

    // https://html.spec.whatwg.org/multipage/#ready-states
    fn set_ready_state(&self, state: ReadyState) {
        // Set "was_potentially_playing" BEFORE updating the ready state,
        // potentially_playing() uses it.
        let was_potentially_playing = self.potentially_playing();

        let old_state = self.ready_state.get();
        let tracks_are_ready = self.text_tracks_are_ready();

        if state == old_state && self.tracks_are_ready.get() == tracks_are_ready {
            return;
        }
        self.tracks_are_ready.set(tracks_are_ready);

        if tracks_are_ready || state <= ReadyState::HaveMetadata {
            self.ready_state.set(state);
        } else {
            // If a media file has text tracks the readyState may not progress beyond
            // HAVE_FUTURE_DATA until the text tracks are ready.
            self.ready_state.set(ReadyState::HaveCurrentData);
        }
        let ready_state = self.ready_state.get();
        debug!("Ready state {:?} -> {:?}", old_state, ready_state);

        if old_state > self.ready_state_maximum.get() {
            self.ready_state_maximum.set(old_state);
        }

        if self.network_state.get() == NetworkState::Empty {
            return;
        }

        if self.seeking.get() {
            if was_potentially_playing && ready_state < ReadyState::HaveFutureData {
                self.schedule_event(EventType::Waiting);
            }
            if ready_state >= ReadyState::HaveCurrentData {
                self.finish_seek();
            }
        } else if was_potentially_playing && ready_state < ReadyState::HaveFutureData {
            self.schedule_timeupdate_event(false);
            self.schedule_event(EventType::Waiting);
        }

        if ready_state >= ReadyState::HaveMetadata && old_state < ReadyState::HaveMetadata {
            self.schedule_event(EventType::DurationChange);
            self.schedule_event(EventType::LoadedMetadata);
        }

        if ready_state >= ReadyState::HaveCurrentData &&
            old_state < ReadyState::HaveCurrentData &&
            !self.have_fired_loaded_data.get()
        {
            self.have_fired_loaded_data.set(true);
            self.schedule_event(EventType::LoadedData);
        }

        let is_potentially_playing = self.potentially_playing();
        if ready_state == ReadyState::HaveFutureData &&
            old_state <= ReadyState::HaveCurrentData &&
            tracks_are_ready
        {
            self.schedule_event(EventType::CanPlay);
            if is_potentially_playing {
                self.schedule_event(EventType::Playing);
            }
        }

        if ready_state == ReadyState::HaveEnoughData &&
            old_state < ReadyState::HaveEnoughData &&
            tracks_are_ready
        {
            if old_state <= ReadyState::HaveCurrentData {
                self.schedule_event(EventType::CanPlay);
            }

            self.schedule_event(EventType::CanPlayThrough);

            if is_potentially_playing && old_state <= ReadyState::HaveCurrentData {
                self.schedule_event(EventType::Playing);
            }

            if self.autoplaying.get() &&
                self.paused.get() &&
                self.autoplay.get() &&
                !self.user_gesture_required_for_rate_change()
            {
                self.paused.set(false);
                self.invalidate_cached_time();
                self.schedule_event(EventType::Play);
                self.schedule_event(EventType::Playing);
            }
        }

        self.update_play_state();
        self.update_media_controller();
        self.update_active_text_track_cues(self.current_time());
    }

    fn text_tracks_are_ready(&self) -> bool {
        // The text tracks of a media element are ready if all the text tracks whose
        // mode was not in the disabled state when the element's resource selection
        // algorithm last started now have a text track readiness state of loaded or
        // failed to load.
        self.text_tracks_when_resource_selection_began
            .borrow()
            .iter()
            .all(|track| {
                !matches!(
                    track.readiness_state(),
                    ReadinessState::NotLoaded | ReadinessState::Loading
                )
            })
    }

    fn prepare_to_play(&self) {
        if self.have_prepared_to_play.get() {
            return;
        }
        self.have_prepared_to_play.set(true);
        if let Some(player) = self.player() {
            player.prepare_to_play();
        }
    }

    // Timers

    fn start_progress_event_timer(&self) {
        if self.progress_event_timer.is_active() {
            return;
        }
        self.previous_progress_time.set(self.event_loop.now());
        let this = self.this.clone();
        self.progress_event_timer
            .start_repeating(prefs::get().progress_interval(), move || {
                if let Some(element) = this.upgrade() {
                    element.progress_event_timer_fired();
                }
            });
    }

    fn start_playback_progress_timer(&self) {
        self.playback_progress_timer.stop();
        let this = self.this.clone();
        self.playback_progress_timer
            .start_repeating(prefs::get().timeupdate_interval(), move || {
                if let Some(element) = this.upgrade() {
                    element.playback_progress_timer_fired();
                }
            });
    }

    fn stop_periodic_timers(&self) {
        self.progress_event_timer.stop();
        self.playback_progress_timer.stop();
    }

    fn progress_event_timer_fired(&self) {
        let Some(player) = self.player() else {
            return;
        };
        if self.network_state.get() != NetworkState::Loading {
            return;
        }

        let now = self.event_loop.now();
        let elapsed = now.saturating_sub(self.previous_progress_time.get());

        if player.did_loading_progress() {
            self.schedule_event(EventType::Progress);
            self.previous_progress_time.set(now);
            self.sent_stalled_event.set(false);
        } else if elapsed > prefs::get().stalled_timeout() && !self.sent_stalled_event.get() {
            self.schedule_event(EventType::Stalled);
            self.sent_stalled_event.set(true);
        }
    }

    fn playback_progress_timer_fired(&self) {
        self.schedule_timeupdate_event(true);
        if self.playback_rate.get() == 0. {
            return;
        }
        self.update_active_text_track_cues(self.current_time());
    }

    fn schedule_timeupdate_event(&self, periodic_event: bool) {
        let now = self.event_loop.now();

        // Throttle the periodic events.
        if periodic_event {
            if let Some(last) = self.last_timeupdate_event_wall_time.get() {
                let interval = Duration::from_millis(pref!(media_timeupdate_interval_ms));
                if now.saturating_sub(last) < interval {
                    return;
                }
            }
        }

        // Some media engines make multiple "time changed" callbacks at the same
        // time, but we only want one event at a given time so filter here.
        let movie_time = self.current_time();
        if self.last_timeupdate_event_movie_time.get() != Some(movie_time) {
            self.schedule_event(EventType::TimeUpdate);
            self.last_timeupdate_event_wall_time.set(Some(now));
            self.last_timeupdate_event_movie_time.set(Some(movie_time));
        }
    }

    // Time

    fn refresh_cached_time(&self) {
        if let Some(player) = self.player() {
            self.cached_time.set(Some(player.current_time()));
        }
    }

    fn invalidate_cached_time(&self) {
        self.cached_time.set(None);
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-seeking
    pub fn seeking(&self) -> bool {
        self.seeking.get()
    }

    /// <https://html.spec.whatwg.org/multipage/#dom-media-seek>
    pub fn seek(&self, time: f64) -> ErrorResult {
        // Step 1. If the media element's readyState is HAVE_NOTHING, then raise an
        // INVALID_STATE_ERR exception.
        let player = match self.player() {
            Some(player) if self.ready_state.get() != ReadyState::HaveNothing => player,
            _ => return Err(Error::InvalidState),
        };

        // If the media engine has been told to postpone loading data, let it go
        // ahead now.
        if self.preload.get() != Preload::Auto && self.ready_state.get() < ReadyState::HaveFutureData {
            self.prepare_to_play();
        }

        // Get the current time before setting seeking, last_seek_time is returned
        // once it is set.
        self.refresh_cached_time();
        let now = self.current_time();

        // Step 3. Set the seeking IDL attribute to true.
        self.seeking.set(true);

        // Step 5. If the new playback position is later than the end of the media
        // resource, then let it be the end of the media resource instead.
        let mut time = time.min(self.duration());

        // Step 6. If the new playback position is less than the earliest possible
        // position, let it be that position instead.
        time = time.max(player.start_time());

        // Ask the media engine for the time value in the movie's time scale before
        // comparing with current time.
        time = player.media_time_for_time_value(time);

        // Step 7. If the new playback position is not in one of the ranges given in
        // the seekable attribute, then let it be the nearest position in them. If
        // there are no ranges given in the seekable attribute then set the seeking
        // IDL attribute to false and abort these steps.
        let seekable = self.seekable();
        let no_seek_required = seekable.is_empty() || time == now;
        if no_seek_required {
            if time == now {
                self.schedule_event(EventType::Seeking);
                self.schedule_timeupdate_event(false);
                self.schedule_event(EventType::Seeked);
            }
            self.seeking.set(false);
            return Ok(());
        }
        let time = seekable.nearest(time);

        if self.playing.get() && self.last_seek_time.get() < now {
            self.add_played_range(self.last_seek_time.get(), now);
        }
        self.last_seek_time.set(time);
        self.sent_end_event.set(false);
        debug!("Seeking to {}", time);

        // Step 8. Set the current playback position to the given new playback position.
        player.seek(time);

        // Step 9. Queue a task to fire a simple event named seeking at the element.
        self.schedule_event(EventType::Seeking);

        // Step 10. Queue a task to fire a simple event named timeupdate at the element.
        self.schedule_timeupdate_event(false);

        // The remaining steps run when the engine reports the seek is done.
        Ok(())
    }

    fn finish_seek(&self) {
        self.seeking.set(false);
        self.schedule_event(EventType::Seeked);
    }

    fn add_played_range(&self, start: f64, end: f64) {
        if let Err(error) = self.played_time_ranges.borrow_mut().add(start, end) {
            warn!("Could not record played range {}..{}: {:?}", start, end, error);
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-starttime
    pub fn start_time(&self) -> f64 {
        self.player().map_or(0., |player| player.start_time())
    }

    fn max_time_seekable(&self) -> f64 {
        self.player().map_or(0., |player| player.max_time_seekable())
    }

    pub fn is_live_stream(&self) -> bool {
        self.duration() == f64::INFINITY
    }

    pub fn return_to_realtime(&self) {
        let _ = self.set_current_time(self.max_time_seekable());
    }

    // Playback state

    // https://html.spec.whatwg.org/multipage/#dom-media-ended
    pub fn ended(&self) -> bool {
        // The ended attribute must return true if the media element has ended
        // playback and the direction of playback is forwards, and false otherwise.
        self.ended_playback() && self.playback_rate.get() > 0.
    }

    // https://html.spec.whatwg.org/multipage/#ended-playback
    fn ended_playback(&self) -> bool {
        let duration = self.duration();
        if self.player.borrow().is_none() || duration.is_nan() {
            return false;
        }

        // A media element is said to have ended playback when the element's
        // readyState attribute is HAVE_METADATA or greater,
        if self.ready_state.get() < ReadyState::HaveMetadata {
            return false;
        }

        // and the current playback position is the end of the media resource and the
        // direction of playback is forwards, and the media element does not have a
        // loop attribute specified or has a current media controller.
        let now = self.current_time();
        let rate = self.playback_rate.get();
        if rate > 0. {
            return duration > 0. &&
                now >= duration &&
                (!self.loop_.get() || self.media_controller.borrow().is_some());
        }

        // or the current playback position is the earliest possible position and
        // the direction of playback is backwards.
        if rate < 0. {
            return now <= 0.;
        }

        false
    }

    // https://html.spec.whatwg.org/multipage/#potentially-playing
    fn potentially_playing(&self) -> bool {
        // "paused to buffer" means the media engine's rate is 0, but only because it
        // had to stop playing when it ran out of buffered data.
        let paused_to_buffer = self.ready_state_maximum.get() >= ReadyState::HaveFutureData &&
            self.ready_state.get() < ReadyState::HaveFutureData;
        (paused_to_buffer || self.ready_state.get() >= ReadyState::HaveFutureData) &&
            self.could_play_if_enough_data() &&
            !self.is_blocked_on_media_controller()
    }

    fn could_play_if_enough_data(&self) -> bool {
        !self.paused.get() &&
            !self.ended_playback() &&
            !self.stopped_due_to_errors() &&
            !self.paused_for_user_interaction()
    }

    // https://html.spec.whatwg.org/multipage/#stopped-due-to-errors
    fn stopped_due_to_errors(&self) -> bool {
        self.ready_state.get() >= ReadyState::HaveMetadata &&
            self.error.borrow().is_some() &&
            !self.seekable().contain(self.current_time())
    }

    // https://html.spec.whatwg.org/multipage/#paused-for-user-interaction
    fn paused_for_user_interaction(&self) -> bool {
        self.is_waiting_until_media_can_start.get()
    }

    // https://html.spec.whatwg.org/multipage/#blocked-media-element
    pub fn is_blocked(&self) -> bool {
        // A media element is a blocked media element if its readyState attribute is
        // in the HAVE_NOTHING state, the HAVE_METADATA state, or the
        // HAVE_CURRENT_DATA state,
        if self.ready_state.get() <= ReadyState::HaveCurrentData {
            return true;
        }
        // or if the element has paused for user interaction.
        self.paused_for_user_interaction()
    }

    fn is_blocked_on_media_controller(&self) -> bool {
        let Some(controller) = self.controller() else {
            return false;
        };

        // A media element is blocked on its media controller if the MediaController
        // is a blocked media controller,
        if controller.is_blocked() {
            return true;
        }

        // or if its media controller position is either before the media resource's
        // earliest possible position relative to the MediaController's timeline or
        // after the end of the media resource relative to the MediaController's
        // timeline.
        let position = controller.current_time();
        let start_time = self.start_time();
        position < start_time || position > start_time + self.duration()
    }

    /// Whether the element started playing because of the autoplay attribute and
    /// has not been played or paused by script since.
    pub fn is_autoplaying(&self) -> bool {
        self.autoplaying.get()
    }

    pub fn update_play_state(&self) {
        let Some(player) = self.player() else {
            return;
        };

        if self.paused_internal.get() {
            if !player.paused() {
                player.pause();
            }
            self.refresh_cached_time();
            self.playback_progress_timer.stop();
            return;
        }

        let should_be_playing = self.potentially_playing();
        let player_paused = player.paused();

        if should_be_playing {
            self.invalidate_cached_time();

            if player_paused {
                // Set rate, muted before calling play in case they were set before the
                // media engine was set up.
                player.set_rate(self.effective_playback_rate());
                self.update_volume();
                player.play();
            }

            self.start_playback_progress_timer();
            self.playing.set(true);
        } else {
            if !player_paused {
                player.pause();
            }
            self.refresh_cached_time();

            self.playback_progress_timer.stop();
            self.playing.set(false);
            let time = self.current_time();
            if time > self.last_seek_time.get() {
                self.add_played_range(self.last_seek_time.get(), time);
            }

            if self.could_play_if_enough_data() {
                self.prepare_to_play();
            }
        }

        self.update_media_controller();
    }

    fn set_paused_internal(&self, paused: bool) {
        self.paused_internal.set(paused);
        self.update_play_state();
    }

    // https://html.spec.whatwg.org/multipage/#internal-play-steps
    fn play_internal(&self) {
        // Step 1. If the media element's networkState attribute has the value
        // NETWORK_EMPTY, invoke the media element's resource selection algorithm.
        if self.player.borrow().is_none() || self.network_state.get() == NetworkState::Empty {
            self.schedule_delayed_action(DelayedAction::LOAD_MEDIA_RESOURCE);
        }

        // Step 2. If the playback has ended and the direction of playback is forwards,
        // seek to the earliest possible position of the media resource.
        if self.ended_playback() {
            let _ = self.seek(0.);
        }

        if let Some(controller) = self.controller() {
            controller.bring_element_up_to_speed(self);
        }

        // Step 3. If the media element's paused attribute is true,
        if self.paused.get() {
            self.paused.set(false);
            self.invalidate_cached_time();
            self.schedule_event(EventType::Play);

            if self.ready_state.get() <= ReadyState::HaveCurrentData {
                self.schedule_event(EventType::Waiting);
            } else {
                self.schedule_event(EventType::Playing);
            }
        }
        self.autoplaying.set(false);

        self.update_play_state();
        self.update_media_controller();
    }

    // https://html.spec.whatwg.org/multipage/#internal-pause-steps
    fn pause_internal(&self) {
        if self.player.borrow().is_none() || self.network_state.get() == NetworkState::Empty {
            self.schedule_delayed_action(DelayedAction::LOAD_MEDIA_RESOURCE);
        }

        // Step 1. Set the media element's autoplaying flag to false.
        self.autoplaying.set(false);

        // Step 2. If the media element's paused attribute is false,
        if !self.paused.get() {
            self.paused.set(true);
            self.schedule_timeupdate_event(false);
            self.schedule_event(EventType::Pause);
        }

        self.update_play_state();
    }

    fn effective_playback_rate(&self) -> f64 {
        match self.controller() {
            Some(controller) => controller.playback_rate(),
            None => self.playback_rate.get(),
        }
    }

    fn effective_muted(&self) -> bool {
        match self.controller() {
            Some(controller) => controller.muted(),
            None => self.muted.get(),
        }
    }

    /// Pushes the rate in effect to the engine while playing.
    pub fn update_playback_rate(&self) {
        let rate = self.effective_playback_rate();
        if let Some(player) = self.player() {
            if self.potentially_playing() && player.rate() != rate {
                player.set_rate(rate);
            }
        }
    }

    /// Pushes the volume in effect to the engine: the element volume scaled by the
    /// page volume and, when controlled, by the controller volume.
    pub fn update_volume(&self) {
        let Some(player) = self.player() else {
            return;
        };

        // Avoid recursion when the player reports volume changes.
        if self.processing_media_player_callback.get() > 0 {
            return;
        }

        let mut volume_multiplier = self.document.media_volume();
        let mut should_mute = self.muted.get();
        if let Some(controller) = self.controller() {
            volume_multiplier *= controller.volume();
            should_mute = controller.muted();
        }

        player.set_muted(should_mute);
        player.set_volume(self.volume.get() * volume_multiplier);
    }

    pub fn media_volume_did_change(&self) {
        self.update_volume();
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-played
    fn played_ranges(&self) -> TimeRanges {
        if self.playing.get() {
            let time = self.current_time();
            if time > self.last_seek_time.get() {
                self.add_played_range(self.last_seek_time.get(), time);
            }
        }
        self.played_time_ranges.borrow().clone()
    }

    /// Abandons the current fetch as if the user had stopped it.
    pub fn user_cancelled_load(&self) {
        if self.network_state.get() == NetworkState::Empty || self.completely_loaded.get() {
            return;
        }
        debug!("User cancelled media load");

        // Step 1. The user agent should cancel the fetching process.
        self.clear_media_player();

        // Step 2. Set the error attribute to a new MediaError object whose code
        // attribute is set to MEDIA_ERR_ABORTED.
        *self.error.borrow_mut() = Some(MediaError::new(MediaErrorCode::Aborted));

        // Step 3. Queue a task to fire a simple event named abort at the media element.
        self.schedule_event(EventType::Abort);

        // Step 4. If the media element's readyState attribute has a value equal to
        // HAVE_NOTHING, set the element's networkState attribute to the NETWORK_EMPTY
        // value and queue a task to fire a simple event named emptied at the element.
        // Otherwise, set the element's networkState attribute to the NETWORK_IDLE value.
        if self.ready_state.get() == ReadyState::HaveNothing {
            self.network_state.set(NetworkState::Empty);
            self.schedule_event(EventType::Emptied);
        } else {
            self.network_state.set(NetworkState::Idle);
        }

        // Step 6. Abort the overall resource selection algorithm.
        *self.current_source_node.borrow_mut() = None;

        // Reset the ready state since the player is gone.
        self.ready_state.set(ReadyState::HaveNothing);
        self.update_media_controller();
        self.update_active_text_track_cues(0.);
    }

    fn clear_media_player(&self) {
        if let Some(player) = self.player.take() {
            player.cancel_load();
        }
        self.stop_periodic_timers();
        self.load_timer.stop();
        self.pending_action_flags.set(DelayedAction::empty());
        self.load_state.set(LoadState::WaitingForSource);
    }

    // Behavior restrictions

    pub fn behavior_restrictions(&self) -> BehaviorRestrictions {
        self.restrictions.get()
    }

    pub fn add_behavior_restriction(&self, restriction: BehaviorRestrictions) {
        self.restrictions.set(self.restrictions.get() | restriction);
    }

    pub fn remove_behavior_restriction(&self, restriction: BehaviorRestrictions) {
        self.restrictions.set(self.restrictions.get() - restriction);
    }

    fn user_gesture_required_for_load(&self) -> bool {
        self.restrictions
            .get()
            .contains(BehaviorRestrictions::REQUIRE_USER_GESTURE_FOR_LOAD)
    }

    fn user_gesture_required_for_rate_change(&self) -> bool {
        self.restrictions
            .get()
            .contains(BehaviorRestrictions::REQUIRE_USER_GESTURE_FOR_RATE_CHANGE)
    }

    fn user_gesture_required_for_fullscreen(&self) -> bool {
        self.restrictions
            .get()
            .contains(BehaviorRestrictions::REQUIRE_USER_GESTURE_FOR_FULLSCREEN)
    }

    fn page_consent_required_for_load(&self) -> bool {
        self.restrictions
            .get()
            .contains(BehaviorRestrictions::REQUIRE_PAGE_CONSENT_TO_LOAD_MEDIA)
    }

    fn remove_behavior_restrictions_after_first_user_gesture(&self) {
        self.restrictions.set(BehaviorRestrictions::empty());
    }

    // Misc. IDL attributes

    // https://html.spec.whatwg.org/multipage/#dom-media-networkstate
    pub fn network_state(&self) -> NetworkState {
        self.network_state.get()
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-currentsrc
    pub fn current_src(&self) -> String {
        self.current_src
            .borrow()
            .as_ref()
            .map_or_else(String::new, |url| url.as_str().to_owned())
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-error
    pub fn error(&self) -> Option<MediaError> {
        self.error.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#dom-navigator-canplaytype
    pub fn can_play_type(&self, type_: &str) -> CanPlayTypeResult {
        self.document
            .registry()
            .supports_type(&ContentType::new(type_), "", None)
            .into()
    }

    /// Name of the engine playing the current resource, if any.
    pub fn current_engine_name(&self) -> Option<String> {
        self.player().and_then(|player| player.current_engine_name())
    }

    // https://html.spec.whatwg.org/multipage/#dom-video-videowidth
    pub fn video_width(&self) -> u32 {
        self.natural_size().width
    }

    // https://html.spec.whatwg.org/multipage/#dom-video-videoheight
    pub fn video_height(&self) -> u32 {
        self.natural_size().height
    }

    fn natural_size(&self) -> Size2D<u32> {
        match self.player() {
            Some(player) if self.is_video => player.natural_size().max(Size2D::zero()).to_u32(),
            _ => Size2D::zero(),
        }
    }

    // Fullscreen

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen.get()
    }

    /// Enters fullscreen on behalf of script. Only allowed during a user gesture
    /// unless the restriction was lifted, and only when the engine supports it.
    pub fn enter_fullscreen(&self) -> ErrorResult {
        if self.is_fullscreen.get() {
            return Ok(());
        }

        if (self.user_gesture_required_for_fullscreen() &&
            !self.document.host().processing_user_gesture()) ||
            !self.supports_fullscreen()
        {
            return Err(Error::InvalidState);
        }

        self.is_fullscreen.set(true);
        self.schedule_event(EventType::BeginFullscreen);
        Ok(())
    }

    pub fn exit_fullscreen(&self) {
        if !self.is_fullscreen.get() {
            return;
        }
        self.is_fullscreen.set(false);
        self.schedule_event(EventType::EndFullscreen);
    }

    // Text tracks

    // https://html.spec.whatwg.org/multipage/#dom-media-texttracks
    pub fn text_tracks(&self) -> &Rc<TextTrackList> {
        &self.text_tracks
    }

    fn text_track_client(&self) -> Weak<dyn TextTrackClient> {
        self.this.clone() as Weak<dyn TextTrackClient>
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-addtexttrack
    pub fn add_text_track(&self, kind: &str, label: &str, language: &str) -> Fallible<Rc<TextTrack>> {
        // Step 1. If kind is not one of the following strings, then throw a
        // SyntaxError exception and abort these steps.
        let Some(kind) = TextTrackKind::from_keyword(kind) else {
            return Err(Error::Syntax);
        };

        // Steps 2-4. Create a new text track with the given kind, label and language.
        let track = TextTrack::new(kind, label, language, "", TextTrackType::AddTrack);
        track.set_client(Some(self.text_track_client()));

        // Step 6. Add the new text track to the media element's list of text tracks.
        self.add_track(track.clone());

        // Its readiness state is loaded and its mode is hidden.
        track.set_readiness_state(ReadinessState::Loaded);
        track.set_mode(TextTrackMode::Hidden);

        Ok(track)
    }

    /// Adds the track of a `<track>` child.
    pub fn add_track_element(&self, track: &Rc<LoadableTextTrack>) {
        track.track().set_client(Some(self.text_track_client()));
        self.track_elements.borrow_mut().push(track.clone());
        self.add_track(track.track().clone());
        self.schedule_delayed_action(DelayedAction::CONFIGURE_TEXT_TRACKS);
    }

    /// Removes the track of a `<track>` child that left the element.
    pub fn remove_track_element(&self, track: &LoadableTextTrack) {
        let text_track = track.track().clone();
        text_track.set_has_been_configured(false);
        self.track_elements
            .borrow_mut()
            .retain(|existing| !std::ptr::eq(existing.as_ref(), track));
        self.remove_track(&text_track);
        self.text_tracks_when_resource_selection_began
            .borrow_mut()
            .retain(|existing| !Rc::ptr_eq(existing, &text_track));
    }

    fn add_track(&self, track: Rc<TextTrack>) {
        self.text_tracks.append(track);
    }

    fn remove_track(&self, track: &TextTrack) {
        if let Some(cues) = track.cues() {
            self.text_track_remove_cues(track, &cues.cues());
        }
        track.set_client(None);
        self.text_tracks.remove(track);
    }

    fn forget_resource_specific_tracks(&self) {
        let inband_tracks = std::mem::take(&mut *self.inband_tracks.borrow_mut());
        for track in inband_tracks {
            self.remove_track(track.track());
        }
    }

    fn inband_track(&self, id: InbandTrackId) -> Option<Rc<InbandTextTrack>> {
        self.inband_tracks
            .borrow()
            .iter()
            .find(|track| track.id() == id)
            .cloned()
    }

    fn configure_text_tracks(&self) {
        #[derive(Default)]
        struct TrackGroup {
            tracks: Vec<Rc<TextTrack>>,
            visible_track: Option<Rc<TextTrack>>,
            default_track: Option<Rc<TextTrack>>,
        }

        let mut captions_and_subtitles = TrackGroup::default();
        let mut descriptions = TrackGroup::default();
        let mut chapters = TrackGroup::default();
        let mut metadata = TrackGroup::default();

        for track in self.text_tracks.tracks() {
            let group = match track.kind() {
                TextTrackKind::Subtitles | TextTrackKind::Captions => &mut captions_and_subtitles,
                TextTrackKind::Descriptions => &mut descriptions,
                TextTrackKind::Chapters => &mut chapters,
                TextTrackKind::Metadata => &mut metadata,
            };

            if group.visible_track.is_none() && track.mode() == TextTrackMode::Showing {
                group.visible_track = Some(track.clone());
            }
            if group.default_track.is_none() && track.is_default() {
                group.default_track = Some(track.clone());
            }

            // Only configure a track once, so adding another track after the initial
            // configuration doesn't reconfigure every track.
            if track.has_been_configured() {
                continue;
            }
            group.tracks.push(track);
        }

        for group in [captions_and_subtitles, descriptions, chapters, metadata] {
            if !group.tracks.is_empty() {
                self.configure_text_track_group(&group.tracks, group.visible_track.is_some());
            }
        }
    }

    fn configure_text_track_group(&self, tracks: &[Rc<TextTrack>], has_visible_track: bool) {
        let captions_wanted =
            self.closed_captions_visible.get() || pref!(media_captions_enabled_by_default);

        // First, find the track in the group that should be enabled (if any).
        let mut default_track = None;
        let mut fallback_track = None;
        for track in tracks {
            let wanted = captions_wanted &&
                matches!(track.kind(), TextTrackKind::Captions | TextTrackKind::Subtitles);
            if wanted {
                // The user asked for captions: a default track wins, otherwise the
                // first one.
                if default_track.is_none() && track.is_default() {
                    default_track = Some(track.clone());
                }
                if fallback_track.is_none() {
                    fallback_track = Some(track.clone());
                }
            } else if !has_visible_track && default_track.is_none() && track.is_default() {
                // If the track has a default attribute specified, and there is no other
                // text track whose mode is showing, enable it.
                default_track = Some(track.clone());
            }
        }
        let track_to_enable = default_track.or(fallback_track);

        for track in tracks {
            let enable = track_to_enable
                .as_ref()
                .is_some_and(|enabled| Rc::ptr_eq(enabled, track));
            if enable {
                let mode = if track.kind() == TextTrackKind::Metadata {
                    TextTrackMode::Hidden
                } else {
                    TextTrackMode::Showing
                };
                debug!("Enabling text track {:?} as {:?}", track.label(), mode);
                track.set_mode(mode);
            }
            track.set_has_been_configured(true);
        }

        if track_to_enable.is_some() {
            self.last_text_track_update_time.set(None);
            self.update_active_text_track_cues(self.current_time());
        }
    }

    /// Cues whose interval contains `time`. Intervals are closed and a cue
    /// with a negative duration covers only its start time.
    fn cues_overlapping(&self, start: f64, end: f64) -> Vec<Rc<TextTrackCue>> {
        self.cue_tree
            .borrow()
            .iter()
            .filter(|cue| {
                let low = cue.start_time();
                let high = low.max(cue.end_time());
                low <= end && high >= start
            })
            .cloned()
            .collect()
    }

    // https://html.spec.whatwg.org/multipage/#time-marches-on
    fn update_active_text_track_cues(&self, movie_time: f64) {
        fn contains(cues: &[Rc<TextTrackCue>], cue: &Rc<TextTrackCue>) -> bool {
            cues.iter().any(|existing| Rc::ptr_eq(existing, cue))
        }

        // Step 1. Let current cues be a list of cues, initialized to contain all the
        // cues of all the hidden or showing text tracks of the media element whose
        // start times are less than or equal to the current playback position and
        // whose end times are greater than the current playback position.
        let current_cues = if self.ready_state.get() != ReadyState::HaveNothing &&
            self.player.borrow().is_some()
        {
            self.cues_overlapping(movie_time, movie_time)
        } else {
            // The active flag is unset whenever the readyState goes back to HAVE_NOTHING.
            Vec::new()
        };

        // Step 2. Let other cues be the cues that are not present in current cues.
        let previous_cues = self.currently_active_cues.borrow().clone();

        // Step 3. Let last time be the current playback position at the time this
        // algorithm was last run for this media element.
        let last_time = self.last_text_track_update_time.get();
        let last_seek_time = self.last_seek_time.get();

        // Step 4. If the current playback position has only changed through its usual
        // monotonic increase during normal playback, then let missed cues be the cues
        // in other cues whose start times are greater than or equal to last time and
        // whose end times are less than or equal to the current playback position.
        let mut missed_cues = Vec::new();
        if let Some(last_time) = last_time.filter(|_| last_seek_time < movie_time) {
            for cue in self.cues_overlapping(last_time, movie_time) {
                let cue_start_time = cue.start_time();
                let cue_end_time = cue_start_time.max(cue.end_time());
                // Consider cues that may have been missed since the last seek time.
                if cue_start_time > last_seek_time.max(last_time) && cue_end_time < movie_time {
                    missed_cues.push(cue);
                }
            }
        }

        self.last_text_track_update_time.set(Some(movie_time));

        // Step 5. If the time was reached through the usual monotonic increase of the
        // current playback position during normal playback, queue a timeupdate.
        if !self.paused.get() && last_time.is_some_and(|last_time| last_seek_time <= last_time) {
            self.schedule_timeupdate_event(false);
        }

        // Step 6. If all of the cues in current cues have their active flag set, none
        // of the cues in other cues have their active flag set, and missed cues is
        // empty, then abort these steps.
        let mut active_set_changed = !missed_cues.is_empty();
        for cue in &previous_cues {
            if !contains(&current_cues, cue) && cue.is_active() {
                active_set_changed = true;
            }
        }
        for cue in &current_cues {
            cue.update_display_tree();
            if !cue.is_active() {
                active_set_changed = true;
            }
        }
        if !active_set_changed {
            return;
        }

        // Step 7. If there are cues in other cues that have their pause-on-exit flag
        // set and that either have their active flag set or are also in missed cues,
        // then immediately pause the media element.
        for cue in &previous_cues {
            if self.paused.get() {
                break;
            }
            if cue.pause_on_exit() && cue.is_active() && !contains(&current_cues, cue) {
                self.pause();
            }
        }
        for cue in &missed_cues {
            if self.paused.get() {
                break;
            }
            if cue.pause_on_exit() {
                self.pause();
            }
        }

        // Step 8. Let events be a list of tasks, each associated with a text track
        // cue and a time, used to sort the list before the tasks are queued.
        let mut event_tasks: Vec<(f64, Rc<TextTrackCue>)> = Vec::new();

        for cue in &missed_cues {
            // Step 9. For each cue in missed cues, prepare an event named enter with
            // the cue's start time.
            event_tasks.push((cue.start_time(), cue.clone()));

            // Step 10. and an event named exit with its end time. Zero and negative
            // length cues get both events from the single task below.
            if cue.start_time() < cue.end_time() {
                event_tasks.push((cue.end_time(), cue.clone()));
            }
        }

        for cue in &previous_cues {
            // Step 10. For each cue in other cues that has its active flag set,
            // prepare an event named exit with the cue's end time.
            if !contains(&current_cues, cue) {
                event_tasks.push((cue.end_time(), cue.clone()));
            }
        }

        for cue in &current_cues {
            // Step 11. For each cue in current cues that does not have its active flag
            // set, prepare an event named enter with the cue's start time.
            if !contains(&previous_cues, cue) {
                event_tasks.push((cue.start_time(), cue.clone()));
            }
        }

        // Step 12. Sort the tasks in events in ascending time order, then by text
        // track order, then by text track cue order.
        let tracks = self.text_tracks.tracks();
        let track_index = |cue: &Rc<TextTrackCue>| {
            cue.track()
                .and_then(|track| tracks.iter().position(|existing| Rc::ptr_eq(existing, &track)))
                .unwrap_or(usize::MAX)
        };
        let cue_index = |cue: &Rc<TextTrackCue>| {
            cue.track()
                .and_then(|track| {
                    track
                        .cue_list()
                        .cues()
                        .iter()
                        .position(|existing| Rc::ptr_eq(existing, cue))
                })
                .unwrap_or(usize::MAX)
        };
        event_tasks.sort_by(|(a_time, a_cue), (b_time, b_cue)| {
            a_time
                .total_cmp(b_time)
                .then_with(|| track_index(a_cue).cmp(&track_index(b_cue)))
                .then_with(|| cue_index(a_cue).cmp(&cue_index(b_cue)))
        });

        // Step 13. Queue each task in events, in list order.
        let mut affected_tracks: SmallVec<[Rc<TextTrack>; 4]> = SmallVec::new();
        for (time, cue) in &event_tasks {
            if let Some(track) = cue.track() {
                if !affected_tracks.iter().any(|existing| Rc::ptr_eq(existing, &track)) {
                    affected_tracks.push(track);
                }
            }

            if cue.start_time() >= cue.end_time() {
                self.async_event_queue
                    .enqueue_event(cue.event_target(), EventType::Enter);
                self.async_event_queue
                    .enqueue_event(cue.event_target(), EventType::Exit);
            } else {
                let type_ = if *time == cue.start_time() {
                    EventType::Enter
                } else {
                    EventType::Exit
                };
                self.async_event_queue.enqueue_event(cue.event_target(), type_);
            }
        }

        // Step 14. Sort affected tracks in the same order as the text tracks appear
        // in the media element's list of text tracks.
        affected_tracks.sort_by_key(|track| {
            tracks
                .iter()
                .position(|existing| Rc::ptr_eq(existing, track))
                .unwrap_or(usize::MAX)
        });

        // Step 15. For each text track in affected tracks, in the list order, queue a
        // task to fire a simple event named cuechange at the TextTrack object.
        for track in &affected_tracks {
            self.async_event_queue
                .enqueue_event(track.event_target(), EventType::CueChange);
        }

        // Step 16. Set the active flag of all the cues in the current cues, and unset
        // the active flag of all the cues in the other cues.
        for cue in &current_cues {
            cue.set_is_active(true);
        }
        for cue in &previous_cues {
            if !contains(&current_cues, cue) {
                cue.set_is_active(false);
            }
        }

        *self.currently_active_cues.borrow_mut() = current_cues;
    }

    /// Cues currently active on any enabled track, in the order they became active.
    pub fn active_cues(&self) -> Vec<Rc<TextTrackCue>> {
        self.currently_active_cues.borrow().clone()
    }
}

impl MediaControllerInterface for HTMLMediaElement {
    // https://html.spec.whatwg.org/multipage/#dom-media-buffered
    fn buffered(&self) -> TimeRanges {
        self.player()
            .map_or_else(TimeRanges::new, |player| player.buffered())
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-seekable
    fn seekable(&self) -> TimeRanges {
        self.player()
            .map_or_else(TimeRanges::new, |player| player.seekable())
    }

    fn played(&self) -> TimeRanges {
        self.played_ranges()
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-duration
    fn duration(&self) -> f64 {
        match self.player() {
            Some(player) if self.ready_state.get() >= ReadyState::HaveMetadata => player.duration(),
            _ => f64::NAN,
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-currenttime
    fn current_time(&self) -> f64 {
        let Some(player) = self.player() else {
            return 0.;
        };

        if self.seeking.get() {
            return self.last_seek_time.get();
        }

        if let Some(time) = self.cached_time.get().filter(|_| self.paused.get()) {
            return time;
        }

        let time = player.current_time();
        self.cached_time.set(Some(time));
        time
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-currenttime
    fn set_current_time(&self, time: f64) -> ErrorResult {
        // A slaved element follows its controller's position.
        if self.media_controller.borrow().is_some() {
            return Err(Error::InvalidState);
        }
        self.seek(time)
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-paused
    fn paused(&self) -> bool {
        self.paused.get()
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-play
    fn play(&self) {
        let processing_user_gesture = self.document.host().processing_user_gesture();
        if self.user_gesture_required_for_rate_change() && !processing_user_gesture {
            debug!("Ignoring play() outside of a user gesture");
            return;
        }
        if processing_user_gesture {
            self.remove_behavior_restrictions_after_first_user_gesture();
        }
        self.play_internal();
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-pause
    fn pause(&self) {
        if self.user_gesture_required_for_rate_change() &&
            !self.document.host().processing_user_gesture()
        {
            debug!("Ignoring pause() outside of a user gesture");
            return;
        }
        self.pause_internal();
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-defaultplaybackrate
    fn default_playback_rate(&self) -> f64 {
        self.default_playback_rate.get()
    }

    fn set_default_playback_rate(&self, rate: f64) {
        if self.default_playback_rate.get() != rate {
            self.default_playback_rate.set(rate);
            self.schedule_event(EventType::RateChange);
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-playbackrate
    fn playback_rate(&self) -> f64 {
        self.playback_rate.get()
    }

    fn set_playback_rate(&self, rate: f64) {
        if self.playback_rate.get() != rate {
            self.playback_rate.set(rate);
            self.invalidate_cached_time();
            self.schedule_event(EventType::RateChange);
        }

        if let Some(player) = self.player() {
            if self.potentially_playing() &&
                player.rate() != rate &&
                self.media_controller.borrow().is_none()
            {
                player.set_rate(rate);
            }
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-volume
    fn volume(&self) -> f64 {
        self.volume.get()
    }

    fn set_volume(&self, volume: f64) -> ErrorResult {
        // If the new value is outside the range 0.0 to 1.0 inclusive, then, on
        // setting, an "IndexSizeError" DOMException must be thrown instead.
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::IndexSize);
        }
        if self.volume.get() != volume {
            self.volume.set(volume);
            self.update_volume();
            self.schedule_event(EventType::VolumeChange);
        }
        Ok(())
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-muted
    fn muted(&self) -> bool {
        self.muted.get()
    }

    fn set_muted(&self, muted: bool) {
        if self.muted.get() == muted {
            return;
        }
        self.muted.set(muted);
        // Avoid recursion when the player reports volume changes.
        if self.processing_media_player_callback.get() == 0 {
            if let Some(player) = self.player() {
                player.set_muted(self.effective_muted());
            }
        }
        self.schedule_event(EventType::VolumeChange);
    }

    // https://html.spec.whatwg.org/multipage/#dom-media-readystate
    fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    fn supports_fullscreen(&self) -> bool {
        self.is_video &&
            self.player()
                .is_some_and(|player| player.supports_fullscreen())
    }

    fn has_audio(&self) -> bool {
        self.player().is_some_and(|player| player.has_audio())
    }

    fn has_video(&self) -> bool {
        self.is_video && self.player().is_some_and(|player| player.has_video())
    }

    fn has_closed_captions(&self) -> bool {
        if self.player().is_some_and(|player| player.has_closed_captions()) {
            return true;
        }
        self.text_tracks.tracks().iter().any(|track| {
            matches!(
                track.kind(),
                TextTrackKind::Captions | TextTrackKind::Subtitles
            )
        })
    }

    fn set_closed_captions_visible(&self, visible: bool) {
        let Some(player) = self.player() else {
            return;
        };
        if !self.has_closed_captions() {
            return;
        }

        self.closed_captions_visible.set(visible);
        player.set_closed_captions_visible(visible);

        // Mark all track element captions as not configured so track configuration
        // reconsiders which tracks to display in light of the new preference.
        for track in self.text_tracks.tracks() {
            if track.track_type() == TextTrackType::TrackElement &&
                matches!(
                    track.kind(),
                    TextTrackKind::Captions | TextTrackKind::Subtitles
                )
            {
                track.set_has_been_configured(false);
            }
        }
        self.configure_text_tracks();
    }

    fn closed_captions_visible(&self) -> bool {
        self.closed_captions_visible.get()
    }

    fn supports_scanning(&self) -> bool {
        self.player().is_some_and(|player| player.supports_scanning())
    }

    fn begin_scrubbing(&self) {
        if self.paused.get() {
            return;
        }
        if self.ended() {
            // A media element stays in the non-paused state when it reaches the end,
            // so playback would resume when scrubbing moves away from it unless it is
            // paused for real first.
            self.pause();
        } else {
            // Stop the engine without generating an event; playback resumes once
            // scrubbing ends.
            self.set_paused_internal(true);
        }
    }

    fn end_scrubbing(&self) {
        if self.paused_internal.get() {
            self.set_paused_internal(false);
        }
    }

    fn can_play(&self) -> bool {
        self.paused.get() || self.ended() || self.ready_state.get() < ReadyState::HaveMetadata
    }

    fn has_current_src(&self) -> bool {
        self.current_src.borrow().is_some()
    }
}

impl MediaPlayerClient for HTMLMediaElement {
    fn media_player_network_state_changed(&self) {
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        if let Some(player) = self.player() {
            self.set_network_state(player.network_state());
        }
    }

    fn media_player_ready_state_changed(&self) {
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        if let Some(player) = self.player() {
            self.set_ready_state(player.ready_state());
        }
    }

    fn media_player_time_changed(&self) {
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        let Some(player) = self.player() else {
            return;
        };

        self.invalidate_cached_time();
        self.update_active_text_track_cues(self.current_time());

        // Needed if no ReadyState change is associated with the seek.
        if self.seeking.get() &&
            self.ready_state.get() >= ReadyState::HaveCurrentData &&
            !player.seeking()
        {
            self.finish_seek();
        }

        // Always call schedule_timeupdate_event when the media engine reports a time
        // discontinuity, it will only queue a 'timeupdate' event if we haven't
        // already posted one at the current movie time.
        self.schedule_timeupdate_event(false);

        let now = self.current_time();
        let duration = self.duration();

        // When the current playback position reaches the end of the media resource
        // when the direction of playback is forwards, then the user agent must follow
        // these steps:
        if !duration.is_nan() && duration != 0. && now >= duration && self.playback_rate.get() > 0. {
            let controlled = self.media_controller.borrow().is_some();
            // If the media element has a loop attribute specified and does not have a
            // current media controller,
            if self.loop_.get() && !controlled {
                self.sent_end_event.set(false);
                // then seek to the earliest possible position of the media resource and
                // abort these steps.
                let _ = self.seek(self.start_time());
            } else {
                // If the media element does not have a current media controller, and
                // paused is false, change paused to true and fire pause.
                if !controlled && !self.paused.get() {
                    self.paused.set(true);
                    self.schedule_event(EventType::Pause);
                }
                // Queue a task to fire a simple event named ended at the media element.
                if !self.sent_end_event.get() {
                    self.sent_end_event.set(true);
                    self.schedule_event(EventType::Ended);
                }
                // If the media element has a current media controller, then report the
                // controller state for the media element's current media controller.
                self.update_media_controller();
            }
        } else {
            self.sent_end_event.set(false);
        }

        self.update_play_state();
    }

    fn media_player_duration_changed(&self) {
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        self.schedule_event(EventType::DurationChange);

        let now = self.current_time();
        let duration = self.duration();
        if now > duration {
            let _ = self.seek(duration);
        }
    }

    fn media_player_rate_changed(&self) {
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        // Stash the rate in case the one we tried to set isn't what the engine is
        // using.
        if let Some(player) = self.player() {
            self.playback_rate.set(player.rate());
        }
        if self.playing.get() {
            self.invalidate_cached_time();
        }
    }

    fn media_player_playback_state_changed(&self) {
        let Some(player) = self.player() else {
            return;
        };
        if self.paused_internal.get() {
            return;
        }
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        if player.paused() {
            self.pause_internal();
        } else {
            self.play_internal();
        }
    }

    fn media_player_volume_changed(&self) {
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        if let Some(player) = self.player() {
            let volume = player.volume();
            if volume != self.volume.get() {
                self.volume.set(volume);
                self.update_volume();
                self.schedule_event(EventType::VolumeChange);
            }
        }
    }

    fn media_player_mute_changed(&self) {
        let _scope = MediaPlayerCallbackScope::new(&self.processing_media_player_callback);
        if let Some(player) = self.player() {
            self.set_muted(player.muted());
        }
    }

    fn media_player_size_changed(&self) {
        let size = self.natural_size();
        debug!("Media size changed to {}x{}", size.width, size.height);
    }

    fn media_player_engine_updated(&self) {
        debug!("Media engine is now {:?}", self.current_engine_name());
    }

    fn media_player_resource_not_supported(&self) {
        debug!("No media engine supports {}", self.current_src());
    }

    fn media_player_did_add_text_track(&self, info: InbandTextTrackInfo) {
        // https://html.spec.whatwg.org/multipage/#sourcing-in-band-text-tracks
        // Step 1. Associate the relevant data with a new text track and its
        // corresponding new TextTrack object. Its readiness state is loaded.
        let inband = InbandTextTrack::new(&info);
        inband.track().set_client(Some(self.text_track_client()));
        self.inband_tracks.borrow_mut().push(inband.clone());

        // Step 7. Set the new text track's mode to the mode consistent with the
        // user's preferences.
        self.schedule_delayed_action(DelayedAction::CONFIGURE_TEXT_TRACKS);

        // Steps 8-9. Add the new text track to the media element's list of text
        // tracks, firing addtrack.
        self.add_track(inband.track().clone());
    }

    fn media_player_did_remove_text_track(&self, id: InbandTrackId) {
        let Some(inband) = self.inband_track(id) else {
            return;
        };
        self.inband_tracks
            .borrow_mut()
            .retain(|track| track.id() != id);
        self.remove_track(inband.track());
    }

    fn media_player_generic_cue_added(&self, track: InbandTrackId, cue: GenericCueData) {
        if let Some(inband) = self.inband_track(track) {
            inband.add_generic_cue(&cue);
        }
    }

    fn media_player_generic_cue_updated(&self, track: InbandTrackId, cue: GenericCueData) {
        if let Some(inband) = self.inband_track(track) {
            inband.update_generic_cue(&cue);
        }
    }

    fn media_player_generic_cue_removed(&self, track: InbandTrackId, cue: CueDataId) {
        if let Some(inband) = self.inband_track(track) {
            inband.remove_generic_cue(cue);
        }
    }

    fn media_player_webvtt_cue_added(&self, track: InbandTrackId, cue: WebVttCueData) {
        if let Some(inband) = self.inband_track(track) {
            inband.add_webvtt_cue(&cue);
        }
    }
}

impl TextTrackClient for HTMLMediaElement {
    fn text_track_kind_changed(&self, track: &TextTrack) {
        if !matches!(
            track.kind(),
            TextTrackKind::Captions | TextTrackKind::Subtitles
        ) && track.mode() == TextTrackMode::Showing
        {
            track.set_mode(TextTrackMode::Hidden);
        }
    }

    fn text_track_mode_changed(&self, track: &TextTrack) {
        let mut track_is_loaded = true;
        if track.track_type() == TextTrackType::TrackElement {
            let element = self
                .track_elements
                .borrow()
                .iter()
                .find(|element| std::ptr::eq(element.track().as_ref(), track))
                .cloned();
            if let Some(element) = &element {
                if track.mode() != TextTrackMode::Disabled {
                    element.schedule_load();
                }
            }
            track_is_loaded = matches!(
                track.readiness_state(),
                ReadinessState::Loading | ReadinessState::Loaded
            );
        }

        // Mark this track as configured so track configuration won't change the
        // mode again.
        track.set_has_been_configured(true);

        if track.mode() != TextTrackMode::Disabled && track_is_loaded {
            self.text_track_add_cues(track, &track.cue_list().cues());
        }

        if self.text_tracks.contains(track) {
            self.text_tracks.schedule_change_event();
        }
    }

    fn text_track_ready_state_changed(&self, track: &TextTrack) {
        if self.player.borrow().is_none() {
            return;
        }
        let tracked = self
            .text_tracks_when_resource_selection_began
            .borrow()
            .iter()
            .any(|existing| std::ptr::eq(existing.as_ref(), track));
        if tracked && track.readiness_state() != ReadinessState::Loading {
            if let Some(player) = self.player() {
                self.set_ready_state(player.ready_state());
            }
        }
    }

    fn text_track_add_cues(&self, track: &TextTrack, cues: &[Rc<TextTrackCue>]) {
        for cue in cues {
            self.text_track_add_cue(track, cue);
        }
    }

    fn text_track_remove_cues(&self, track: &TextTrack, cues: &[Rc<TextTrackCue>]) {
        for cue in cues {
            self.text_track_remove_cue(track, cue);
        }
    }

    fn text_track_add_cue(&self, track: &TextTrack, cue: &Rc<TextTrackCue>) {
        if track.mode() == TextTrackMode::Disabled {
            return;
        }
        {
            let mut cue_tree = self.cue_tree.borrow_mut();
            if !cue_tree.iter().any(|existing| Rc::ptr_eq(existing, cue)) {
                cue_tree.push(cue.clone());
            }
        }
        self.update_active_text_track_cues(self.current_time());
    }

    fn text_track_remove_cue(&self, _track: &TextTrack, cue: &TextTrackCue) {
        self.cue_tree
            .borrow_mut()
            .retain(|existing| !std::ptr::eq(existing.as_ref(), cue));

        let was_active = {
            let mut active = self.currently_active_cues.borrow_mut();
            let before = active.len();
            active.retain(|existing| !std::ptr::eq(existing.as_ref(), cue));
            before != active.len()
        };
        if was_active {
            cue.set_is_active(false);
        }
        cue.remove_display_tree();
    }
}

impl MediaCanStartListener for HTMLMediaElement {
    fn media_can_start(&self) {
        debug!("Page allows media to start");
        self.is_waiting_until_media_can_start.set(false);
        self.load_internal();
    }
}

impl EventSource for HTMLMediaElement {
    fn poll_events(&self) -> bool {
        match self.player() {
            Some(player) => player.process_engine_events(),
            None => false,
        }
    }
}

impl Drop for HTMLMediaElement {
    fn drop(&mut self) {
        if self.is_waiting_until_media_can_start.get() {
            let listener: Weak<dyn MediaCanStartListener> =
                self.this.clone() as Weak<dyn MediaCanStartListener>;
            self.document.remove_media_can_start_listener(&listener);
        }
        let controller = self.media_controller.borrow_mut().take();
        if let Some(controller) = controller {
            controller.remove_media_element(self);
        }
    }
}
