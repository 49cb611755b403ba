/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::debug;
use media_traits::TextTrackKind;
use strum::IntoStaticStr;

use crate::dom::bindings::error::{Error, ErrorResult};
use crate::dom::eventtarget::EventTarget;
use crate::dom::texttrackcue::{CueMatchRules, TextTrackCue};
use crate::dom::texttrackcuelist::TextTrackCueList;

/// <https://html.spec.whatwg.org/multipage/#text-track-mode>
#[derive(Clone, Copy, Debug, Eq, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum TextTrackMode {
    Disabled,
    Hidden,
    Showing,
}

impl TextTrackMode {
    pub fn from_keyword(keyword: &str) -> Option<TextTrackMode> {
        match keyword {
            "disabled" => Some(TextTrackMode::Disabled),
            "hidden" => Some(TextTrackMode::Hidden),
            "showing" => Some(TextTrackMode::Showing),
            _ => None,
        }
    }
}

/// Where a track came from. Track lists order tracks by this first.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum TextTrackType {
    TrackElement,
    AddTrack,
    InBand,
}

/// <https://html.spec.whatwg.org/multipage/#text-track-readiness-state>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadinessState {
    NotLoaded,
    Loading,
    Loaded,
    FailedToLoad,
}

/// The media element side of a text track.
pub trait TextTrackClient {
    fn text_track_kind_changed(&self, track: &TextTrack);
    fn text_track_mode_changed(&self, track: &TextTrack);
    fn text_track_ready_state_changed(&self, track: &TextTrack);
    fn text_track_add_cues(&self, track: &TextTrack, cues: &[Rc<TextTrackCue>]);
    fn text_track_remove_cues(&self, track: &TextTrack, cues: &[Rc<TextTrackCue>]);
    fn text_track_add_cue(&self, track: &TextTrack, cue: &Rc<TextTrackCue>);
    fn text_track_remove_cue(&self, track: &TextTrack, cue: &TextTrackCue);
}

/// <https://html.spec.whatwg.org/multipage/#texttrack>
pub struct TextTrack {
    event_target: Rc<EventTarget>,
    this: Weak<TextTrack>,
    track_type: TextTrackType,
    kind: Cell<TextTrackKind>,
    label: String,
    language: String,
    id: String,
    mode: Cell<TextTrackMode>,
    cues: TextTrackCueList,
    readiness_state: Cell<ReadinessState>,
    has_been_configured: Cell<bool>,
    is_default: Cell<bool>,
    client: RefCell<Option<Weak<dyn TextTrackClient>>>,
}

impl TextTrack {
    pub fn new(
        kind: TextTrackKind,
        label: &str,
        language: &str,
        id: &str,
        track_type: TextTrackType,
    ) -> Rc<TextTrack> {
        Rc::new_cyclic(|this| TextTrack {
            event_target: EventTarget::new(),
            this: this.clone(),
            track_type,
            kind: Cell::new(kind),
            label: label.to_owned(),
            language: language.to_owned(),
            id: id.to_owned(),
            mode: Cell::new(TextTrackMode::Disabled),
            cues: TextTrackCueList::new(),
            readiness_state: Cell::new(ReadinessState::NotLoaded),
            has_been_configured: Cell::new(false),
            is_default: Cell::new(false),
            client: RefCell::new(None),
        })
    }

    pub fn event_target(&self) -> &Rc<EventTarget> {
        &self.event_target
    }

    fn client(&self) -> Option<Rc<dyn TextTrackClient>> {
        self.client.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_client(&self, client: Option<Weak<dyn TextTrackClient>>) {
        *self.client.borrow_mut() = client;
    }

    pub fn track_type(&self) -> TextTrackType {
        self.track_type
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-kind
    pub fn kind(&self) -> TextTrackKind {
        self.kind.get()
    }

    pub fn set_kind(&self, kind: TextTrackKind) {
        if kind == self.kind.get() {
            return;
        }
        self.kind.set(kind);
        if let Some(client) = self.client() {
            client.text_track_kind_changed(self);
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-label
    pub fn label(&self) -> &str {
        &self.label
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-language
    pub fn language(&self) -> &str {
        &self.language
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-id
    pub fn id(&self) -> &str {
        &self.id
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-mode
    pub fn mode(&self) -> TextTrackMode {
        self.mode.get()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-mode
    pub fn set_mode(&self, mode: TextTrackMode) {
        if mode == self.mode.get() {
            return;
        }
        debug!("Text track {:?} mode {:?} -> {:?}", self.label, self.mode.get(), mode);

        // A disabled track's cues are no longer reachable through `cues`, so
        // the element stops tracking them.
        if mode == TextTrackMode::Disabled && !self.cues.is_empty() {
            if let Some(client) = self.client() {
                client.text_track_remove_cues(self, &self.cues.cues());
            }
        }

        if mode != TextTrackMode::Showing {
            for cue in self.cues.cues() {
                cue.remove_display_tree();
            }
        }

        self.mode.set(mode);
        if let Some(client) = self.client() {
            client.text_track_mode_changed(self);
        }
    }

    /// Sets the mode from its string form, ignoring unknown keywords.
    pub fn set_mode_keyword(&self, keyword: &str) {
        if let Some(mode) = TextTrackMode::from_keyword(keyword) {
            self.set_mode(mode);
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-cues
    pub fn cues(&self) -> Option<&TextTrackCueList> {
        (self.mode.get() != TextTrackMode::Disabled).then_some(&self.cues)
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-activecues
    pub fn active_cues(&self) -> Option<Vec<Rc<TextTrackCue>>> {
        self.cues().map(TextTrackCueList::active_cues)
    }

    /// The full cue list regardless of mode.
    pub(crate) fn cue_list(&self) -> &TextTrackCueList {
        &self.cues
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-addcue
    pub fn add_cue(&self, cue: Rc<TextTrackCue>) {
        if cue.start_time().is_nan() ||
            cue.end_time().is_nan() ||
            cue.start_time() < 0. ||
            cue.end_time() < 0.
        {
            return;
        }

        // Step 1. If the given cue is in a text track list of cues, then
        // remove cue from that text track list of cues.
        if let Some(previous) = cue.track() {
            let _ = previous.remove_cue(&cue);
        }

        // Step 2. Add cue to the text track list of cues.
        cue.set_track(self.this.clone());
        self.cues.add(cue.clone());
        if let Some(client) = self.client() {
            client.text_track_add_cue(self, &cue);
        }
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrack-removecue
    pub fn remove_cue(&self, cue: &TextTrackCue) -> ErrorResult {
        // Step 1. If the given cue is not in the text track list of cues,
        // then throw a "NotFoundError" DOMException.
        if !cue.is_in_track(self) {
            return Err(Error::NotFound);
        }

        // Step 2. Remove cue from the text track list of cues.
        if !self.cues.remove(cue) {
            return Err(Error::InvalidState);
        }
        cue.set_track(Weak::new());
        cue.set_is_active(false);
        if let Some(client) = self.client() {
            client.text_track_remove_cue(self, cue);
        }
        Ok(())
    }

    pub(crate) fn cue_will_change(&self, cue: &TextTrackCue) {
        if let Some(client) = self.client() {
            client.text_track_remove_cue(self, cue);
        }
    }

    pub(crate) fn cue_did_change(&self, cue: &TextTrackCue) {
        let Some(cue) = self.cues.find(cue) else {
            return;
        };
        self.cues.update_cue_index(&cue);
        if let Some(client) = self.client() {
            client.text_track_add_cue(self, &cue);
        }
    }

    pub fn has_cue(&self, cue: &TextTrackCue, match_rules: CueMatchRules) -> bool {
        self.cues.has_cue(cue, match_rules)
    }

    pub fn readiness_state(&self) -> ReadinessState {
        self.readiness_state.get()
    }

    pub fn set_readiness_state(&self, state: ReadinessState) {
        if state == self.readiness_state.get() {
            return;
        }
        self.readiness_state.set(state);
        if let Some(client) = self.client() {
            client.text_track_ready_state_changed(self);
        }
    }

    pub fn has_been_configured(&self) -> bool {
        self.has_been_configured.get()
    }

    pub fn set_has_been_configured(&self, configured: bool) {
        self.has_been_configured.set(configured);
    }

    pub fn is_default(&self) -> bool {
        self.is_default.get()
    }

    pub fn set_is_default(&self, is_default: bool) {
        self.is_default.set(is_default);
    }

    /// Whether the track is one a user would see as captions or subtitles.
    pub fn is_rendered(&self) -> bool {
        matches!(
            self.kind.get(),
            TextTrackKind::Captions | TextTrackKind::Subtitles
        ) && self.mode.get() == TextTrackMode::Showing
    }
}
