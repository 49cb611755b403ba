/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use media_traits::{
    CueDataId, GenericCueData, GenericCueStatus, InbandTextTrackInfo, InbandTrackId, WebVttCueData,
};

use crate::dom::bindings::error::ErrorResult;
use crate::dom::texttrack::{ReadinessState, TextTrack, TextTrackType};
use crate::dom::texttrackcue::{CueMatchRules, TextTrackCue};

/// Two-way association between engine cue ids and the cues built from them.
#[derive(Default)]
struct CueMap {
    entries: Vec<(CueDataId, Rc<TextTrackCue>)>,
}

impl CueMap {
    fn add(&mut self, data: CueDataId, cue: Rc<TextTrackCue>) {
        self.entries.push((data, cue));
    }

    fn find(&self, data: CueDataId) -> Option<Rc<TextTrackCue>> {
        self.entries
            .iter()
            .find(|(id, _)| *id == data)
            .map(|(_, cue)| cue.clone())
    }

    fn remove_data(&mut self, data: CueDataId) {
        self.entries.retain(|(id, _)| *id != data);
    }

    fn remove_cue(&mut self, cue: &TextTrackCue) {
        self.entries
            .retain(|(_, existing)| !std::ptr::eq(existing.as_ref(), cue));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A text track whose cues are produced by the media engine.
///
/// Generic cues stay mapped to their engine data only while the engine may
/// still update them; WebVTT cues stay mapped for the life of the track.
pub struct InbandTextTrack {
    track: Rc<TextTrack>,
    id: InbandTrackId,
    generic_cues: RefCell<CueMap>,
    webvtt_cues: RefCell<CueMap>,
}

impl InbandTextTrack {
    pub fn new(info: &InbandTextTrackInfo) -> Rc<InbandTextTrack> {
        let track = TextTrack::new(
            info.kind,
            &info.label,
            &info.language,
            &info.id.0.to_string(),
            TextTrackType::InBand,
        );
        track.set_is_default(info.is_default);
        track.set_readiness_state(ReadinessState::Loaded);
        Rc::new(InbandTextTrack {
            track,
            id: info.id,
            generic_cues: RefCell::new(CueMap::default()),
            webvtt_cues: RefCell::new(CueMap::default()),
        })
    }

    pub fn track(&self) -> &Rc<TextTrack> {
        &self.track
    }

    pub fn id(&self) -> InbandTrackId {
        self.id
    }

    pub fn add_generic_cue(&self, data: &GenericCueData) {
        if self.generic_cues.borrow().find(data.id).is_some() {
            return;
        }

        let cue = TextTrackCue::new_generic(data);
        if self.track.has_cue(&cue, CueMatchRules::IgnoreDuration) {
            debug!(
                "Ignoring already added cue: start={:.2}, end={:.2}, content={:?}",
                data.start_time, data.end_time, data.content
            );
            return;
        }

        if data.status != GenericCueStatus::Complete {
            self.generic_cues.borrow_mut().add(data.id, cue.clone());
        }
        self.track.add_cue(cue);
    }

    pub fn update_generic_cue(&self, data: &GenericCueData) {
        let Some(cue) = self.generic_cues.borrow().find(data.id) else {
            return;
        };
        cue.update_from_generic_data(data);
        if data.status == GenericCueStatus::Complete {
            self.generic_cues.borrow_mut().remove_data(data.id);
        }
    }

    pub fn remove_generic_cue(&self, data: CueDataId) {
        let cue = self.generic_cues.borrow().find(data);
        match cue {
            Some(cue) => {
                debug!("Removing generic cue {:?}", data);
                let _ = self.remove_cue(&cue);
            },
            None => debug!("Asked to remove unknown generic cue {:?}", data),
        }
    }

    pub fn add_webvtt_cue(&self, data: &WebVttCueData) {
        if self.webvtt_cues.borrow().find(data.id).is_some() {
            return;
        }

        let cue = TextTrackCue::new(data.start_time, data.end_time, &data.content);
        cue.set_id(&data.cue_id);
        cue.set_cue_settings(&data.settings);
        self.webvtt_cues.borrow_mut().add(data.id, cue.clone());
        self.track.add_cue(cue);
    }

    pub fn remove_cue(&self, cue: &TextTrackCue) -> ErrorResult {
        self.generic_cues.borrow_mut().remove_cue(cue);
        self.webvtt_cues.borrow_mut().remove_cue(cue);
        self.track.remove_cue(cue)
    }

    /// Number of cues the engine can still refer to.
    pub fn mapped_cue_count(&self) -> usize {
        self.generic_cues.borrow().len() + self.webvtt_cues.borrow().len()
    }
}
