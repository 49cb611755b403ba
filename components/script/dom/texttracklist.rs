/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::event::EventType;
use crate::dom::eventtarget::EventTarget;
use crate::dom::genericeventqueue::GenericEventQueue;
use crate::dom::texttrack::TextTrack;
use crate::event_loop::EventLoop;

/// <https://html.spec.whatwg.org/multipage/#texttracklist>
pub struct TextTrackList {
    event_target: Rc<EventTarget>,
    tracks: RefCell<Vec<Rc<TextTrack>>>,
    event_queue: GenericEventQueue,
}

impl TextTrackList {
    pub fn new(event_loop: &Rc<EventLoop>) -> Rc<TextTrackList> {
        Rc::new(TextTrackList {
            event_target: EventTarget::new(),
            tracks: RefCell::new(Vec::new()),
            event_queue: GenericEventQueue::new(event_loop),
        })
    }

    pub fn event_target(&self) -> &Rc<EventTarget> {
        &self.event_target
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttracklist-length
    pub fn length(&self) -> usize {
        self.tracks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.borrow().is_empty()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttracklist-item
    pub fn item(&self, index: usize) -> Option<Rc<TextTrack>> {
        self.tracks.borrow().get(index).cloned()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttracklist-gettrackbyid
    pub fn get_track_by_id(&self, id: &str) -> Option<Rc<TextTrack>> {
        self.tracks
            .borrow()
            .iter()
            .find(|track| track.id() == id)
            .cloned()
    }

    pub fn tracks(&self) -> Vec<Rc<TextTrack>> {
        self.tracks.borrow().clone()
    }

    pub fn contains(&self, track: &TextTrack) -> bool {
        self.index_of(track).is_some()
    }

    pub fn index_of(&self, track: &TextTrack) -> Option<usize> {
        self.tracks
            .borrow()
            .iter()
            .position(|existing| std::ptr::eq(existing.as_ref(), track))
    }

    /// Track element tracks come first, then script-added ones, then in-band
    /// ones; each group keeps insertion order.
    pub fn append(&self, track: Rc<TextTrack>) {
        {
            let mut tracks = self.tracks.borrow_mut();
            let index = tracks.partition_point(|existing| existing.track_type() <= track.track_type());
            tracks.insert(index, track);
        }
        self.event_queue
            .enqueue_event(&self.event_target, EventType::AddTrack);
    }

    pub fn remove(&self, track: &TextTrack) -> bool {
        let Some(index) = self.index_of(track) else {
            return false;
        };
        self.tracks.borrow_mut().remove(index);
        self.event_queue
            .enqueue_event(&self.event_target, EventType::RemoveTrack);
        true
    }

    pub fn schedule_change_event(&self) {
        self.event_queue
            .enqueue_event(&self.event_target, EventType::Change);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use media_traits::TextTrackKind;

    use super::TextTrackList;
    use crate::dom::event::EventType;
    use crate::dom::texttrack::{TextTrack, TextTrackType};
    use crate::event_loop::EventLoop;

    fn track(label: &str, track_type: TextTrackType) -> Rc<TextTrack> {
        TextTrack::new(TextTrackKind::Captions, label, "", label, track_type)
    }

    #[test]
    fn orders_tracks_by_origin() {
        let event_loop = EventLoop::new();
        let list = TextTrackList::new(&event_loop);
        list.append(track("inband", TextTrackType::InBand));
        list.append(track("script", TextTrackType::AddTrack));
        list.append(track("element", TextTrackType::TrackElement));
        list.append(track("script2", TextTrackType::AddTrack));
        let labels: Vec<String> = list.tracks().iter().map(|t| t.label().to_owned()).collect();
        assert_eq!(labels, vec!["element", "script", "script2", "inband"]);
        assert_eq!(list.get_track_by_id("script2").unwrap().label(), "script2");
    }

    #[test]
    fn fires_addtrack_and_removetrack_asynchronously() {
        let event_loop = EventLoop::new();
        let list = TextTrackList::new(&event_loop);
        let log = Rc::new(RefCell::new(Vec::new()));
        for type_ in [EventType::AddTrack, EventType::RemoveTrack] {
            let log = log.clone();
            list.event_target()
                .add_event_listener(type_, move |event| log.borrow_mut().push(event.name()));
        }
        let added = track("a", TextTrackType::AddTrack);
        list.append(added.clone());
        assert!(list.remove(&added));
        assert!(!list.remove(&added));
        assert!(log.borrow().is_empty());
        event_loop.run_until_idle();
        assert_eq!(*log.borrow(), vec!["addtrack", "removetrack"]);
    }
}
