/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::texttrackcue::{CueMatchRules, TextTrackCue};

/// A track's cues, kept in text track cue order.
///
/// <https://html.spec.whatwg.org/multipage/#texttrackcuelist>
#[derive(Default)]
pub struct TextTrackCueList {
    list: RefCell<Vec<Rc<TextTrackCue>>>,
}

impl TextTrackCueList {
    pub fn new() -> TextTrackCueList {
        TextTrackCueList::default()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcuelist-length
    pub fn length(&self) -> usize {
        self.list.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.borrow().is_empty()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcuelist-item
    pub fn item(&self, index: usize) -> Option<Rc<TextTrackCue>> {
        self.list.borrow().get(index).cloned()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcuelist-getcuebyid
    pub fn get_cue_by_id(&self, id: &str) -> Option<Rc<TextTrackCue>> {
        if id.is_empty() {
            return None;
        }
        self.list.borrow().iter().find(|cue| cue.id() == id).cloned()
    }

    pub fn cues(&self) -> Vec<Rc<TextTrackCue>> {
        self.list.borrow().clone()
    }

    pub fn active_cues(&self) -> Vec<Rc<TextTrackCue>> {
        self.list
            .borrow()
            .iter()
            .filter(|cue| cue.is_active())
            .cloned()
            .collect()
    }

    pub fn contains(&self, cue: &TextTrackCue) -> bool {
        self.find(cue).is_some()
    }

    pub(crate) fn find(&self, cue: &TextTrackCue) -> Option<Rc<TextTrackCue>> {
        self.list
            .borrow()
            .iter()
            .find(|existing| std::ptr::eq(existing.as_ref(), cue))
            .cloned()
    }

    /// Inserts `cue` after every cue that is not ordered after it. Returns
    /// false if that very cue is already in the list at that position.
    pub fn add(&self, cue: Rc<TextTrackCue>) -> bool {
        let mut list = self.list.borrow_mut();
        let index = list.partition_point(|existing| !cue.is_ordered_before(existing));

        let mut previous = index;
        while previous > 0 && !list[previous - 1].is_ordered_before(&cue) {
            if Rc::ptr_eq(&list[previous - 1], &cue) {
                return false;
            }
            previous -= 1;
        }
        list.insert(index, cue);
        true
    }

    pub fn remove(&self, cue: &TextTrackCue) -> bool {
        let mut list = self.list.borrow_mut();
        match list
            .iter()
            .position(|existing| std::ptr::eq(existing.as_ref(), cue))
        {
            Some(index) => {
                list.remove(index);
                true
            },
            None => false,
        }
    }

    /// Moves a cue whose times changed back to its ordered position.
    pub fn update_cue_index(&self, cue: &Rc<TextTrackCue>) {
        if self.remove(cue) {
            self.add(cue.clone());
        }
    }

    pub fn clear(&self) {
        self.list.borrow_mut().clear();
    }

    /// Whether a cue equal to `cue` is in the list.
    pub fn has_cue(&self, cue: &TextTrackCue, match_rules: CueMatchRules) -> bool {
        if cue.start_time() < 0. || cue.end_time() < 0. {
            return false;
        }
        let list = self.list.borrow();
        let first = list.partition_point(|existing| existing.start_time() < cue.start_time());
        list[first..]
            .iter()
            .take_while(|existing| existing.start_time() == cue.start_time())
            .any(|existing| existing.is_equal(cue, match_rules))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use media_traits::{CueDataId, GenericCueData};

    use super::TextTrackCueList;
    use crate::dom::texttrackcue::{CueMatchRules, TextTrackCue};

    fn texts(list: &TextTrackCueList) -> Vec<String> {
        list.cues().iter().map(|cue| cue.text()).collect()
    }

    #[test]
    fn keeps_cues_in_cue_order() {
        let list = TextTrackCueList::new();
        list.add(TextTrackCue::new(5., 6., "c"));
        list.add(TextTrackCue::new(1., 2., "b"));
        list.add(TextTrackCue::new(1., 3., "a"));
        list.add(TextTrackCue::new(5., 6., "d"));
        assert_eq!(texts(&list), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn rejects_the_same_cue_twice() {
        let list = TextTrackCueList::new();
        let cue = TextTrackCue::new(1., 2., "once");
        assert!(list.add(cue.clone()));
        list.add(TextTrackCue::new(1., 2., "tie"));
        assert!(!list.add(cue.clone()));
        assert_eq!(list.length(), 2);
        assert!(list.remove(&cue));
        assert!(!list.remove(&cue));
    }

    #[test]
    fn moved_cues_are_reordered() {
        let list = TextTrackCueList::new();
        let moving = TextTrackCue::new(1., 2., "moving");
        list.add(moving.clone());
        list.add(TextTrackCue::new(3., 4., "fixed"));
        moving.set_start_time(5.);
        moving.set_end_time(6.);
        list.update_cue_index(&moving);
        assert_eq!(texts(&list), vec!["fixed", "moving"]);
        assert!(Rc::ptr_eq(&list.item(1).unwrap(), &moving));
    }

    #[test]
    fn has_cue_can_ignore_duration() {
        let list = TextTrackCueList::new();
        list.add(TextTrackCue::new(1., 2., "same"));
        list.add(TextTrackCue::new(1., 4., "other"));
        let probe = TextTrackCue::new(1., 9., "same");
        assert!(!list.has_cue(&probe, CueMatchRules::MatchAllFields));
        assert!(list.has_cue(&probe, CueMatchRules::IgnoreDuration));
        assert!(!list.has_cue(&TextTrackCue::new(2., 9., "same"), CueMatchRules::IgnoreDuration));
    }

    #[test]
    fn insertion_order_does_not_change_cue_order() {
        let generic = |id, line, position| {
            let mut data = GenericCueData::new(CueDataId(id), 2., 3., "generic");
            data.line = Some(line);
            data.position = Some(position);
            TextTrackCue::new_generic(&data)
        };
        let sorted = vec![
            TextTrackCue::new(0., 1., "a"),
            TextTrackCue::new(1., 4., "b"),
            TextTrackCue::new(1., 2., "c"),
            // Same interval: lowest on screen first, then left to right.
            generic(1, 80., 50.),
            generic(2, 40., 20.),
            generic(3, 40., 60.),
            TextTrackCue::new(5., 6., "d"),
        ];

        let in_order = TextTrackCueList::new();
        for cue in &sorted {
            assert!(in_order.add(cue.clone()));
        }
        let shuffled = TextTrackCueList::new();
        for index in [5, 3, 6, 1, 4, 0, 2] {
            assert!(shuffled.add(sorted[index].clone()));
        }

        for list in [&in_order, &shuffled] {
            let cues = list.cues();
            assert_eq!(cues.len(), sorted.len());
            for (cue, expected) in cues.iter().zip(&sorted) {
                assert!(Rc::ptr_eq(cue, expected));
            }
        }
    }
}
