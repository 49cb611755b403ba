/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use media_traits::TextTrackKind;

use crate::dom::event::{Event, EventType};
use crate::dom::texttrack::{ReadinessState, TextTrack, TextTrackMode, TextTrackType};
use crate::dom::texttrackcue::TextTrackCue;

/// The text track of a `<track>` element.
///
/// Fetching and parsing the cue file belongs to the embedder: the track only
/// asks for a load once it is needed, and is then handed the parsed cues and
/// the outcome.
///
/// <https://html.spec.whatwg.org/multipage/#the-track-element>
pub struct LoadableTextTrack {
    track: Rc<TextTrack>,
    src: RefCell<Option<String>>,
}

impl LoadableTextTrack {
    pub fn new(
        kind: TextTrackKind,
        label: &str,
        language: &str,
        src: Option<&str>,
        is_default: bool,
    ) -> Rc<LoadableTextTrack> {
        let track = TextTrack::new(kind, label, language, "", TextTrackType::TrackElement);
        track.set_is_default(is_default);
        Rc::new(LoadableTextTrack {
            track,
            src: RefCell::new(src.map(str::to_owned)),
        })
    }

    pub fn track(&self) -> &Rc<TextTrack> {
        &self.track
    }

    // https://html.spec.whatwg.org/multipage/#dom-track-src
    pub fn src(&self) -> Option<String> {
        self.src.borrow().clone()
    }

    /// Changing the source forgets the cues of the previous one.
    pub fn set_src(&self, src: Option<&str>) {
        *self.src.borrow_mut() = src.map(str::to_owned);
        for cue in self.track.cue_list().cues() {
            let _ = self.track.remove_cue(&cue);
        }
        self.track.set_readiness_state(ReadinessState::NotLoaded);
        if self.track.mode() != TextTrackMode::Disabled {
            self.schedule_load();
        }
    }

    /// Whether the embedder should start fetching the cue file.
    pub fn needs_load(&self) -> bool {
        self.track.readiness_state() == ReadinessState::Loading
    }

    // https://html.spec.whatwg.org/multipage/#start-the-track-processing-model
    pub fn schedule_load(&self) {
        if self.track.readiness_state() != ReadinessState::NotLoaded {
            return;
        }
        match self.src.borrow().as_deref() {
            Some(src) if !src.is_empty() => {
                debug!("Loading text track {:?} from {}", self.track.label(), src);
                self.track.set_readiness_state(ReadinessState::Loading);
            },
            _ => self.track.set_readiness_state(ReadinessState::FailedToLoad),
        }
    }

    /// Adds cues parsed so far. Cues arriving after a failed load are dropped.
    pub fn new_cues_available(&self, cues: Vec<Rc<TextTrackCue>>) {
        if self.track.readiness_state() == ReadinessState::FailedToLoad {
            return;
        }
        for cue in cues {
            self.track.add_cue(cue);
        }
    }

    pub fn did_complete_load(&self, success: bool, now: f64) {
        let (state, type_) = if success {
            (ReadinessState::Loaded, EventType::Load)
        } else {
            (ReadinessState::FailedToLoad, EventType::Error)
        };
        self.track.set_readiness_state(state);
        self.track
            .event_target()
            .dispatch_event(&Event::new(type_, now));
    }
}
