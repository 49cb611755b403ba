/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use log::trace;

use crate::dom::event::{Event, EventType};
use crate::dom::eventtarget::EventTarget;
use crate::event_loop::EventLoop;
use crate::timers::Timer;

type PendingEvents = Rc<RefCell<Vec<(Rc<EventTarget>, Event)>>>;

/// Fires queued events from a single zero-delay task, in the order they were
/// enqueued. Events still pending when the queue is cancelled are dropped.
pub struct GenericEventQueue {
    event_loop: Rc<EventLoop>,
    pending_events: PendingEvents,
    timer: Timer,
}

impl GenericEventQueue {
    pub fn new(event_loop: &Rc<EventLoop>) -> GenericEventQueue {
        GenericEventQueue {
            event_loop: event_loop.clone(),
            pending_events: Rc::new(RefCell::new(Vec::new())),
            timer: Timer::new(event_loop),
        }
    }

    pub fn enqueue_event(&self, target: &Rc<EventTarget>, type_: EventType) {
        trace!("Queueing {}", type_.name());
        let event = Event::new(type_, self.event_loop.now_secs());
        self.pending_events
            .borrow_mut()
            .push((target.clone(), event));
        if self.timer.is_active() {
            return;
        }
        let pending_events = self.pending_events.clone();
        self.timer.start_one_shot(Duration::ZERO, move || {
            let events = std::mem::take(&mut *pending_events.borrow_mut());
            for (target, event) in events {
                target.dispatch_event(&event);
            }
        });
    }

    pub fn cancel_all_events(&self) {
        self.timer.stop();
        self.pending_events.borrow_mut().clear();
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.borrow().is_empty()
    }

    pub fn pending_event_types(&self) -> Vec<EventType> {
        self.pending_events
            .borrow()
            .iter()
            .map(|(_, event)| event.type_())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::GenericEventQueue;
    use crate::dom::event::EventType;
    use crate::dom::eventtarget::EventTarget;
    use crate::event_loop::EventLoop;

    fn recording_target(log: &Rc<RefCell<Vec<&'static str>>>) -> Rc<EventTarget> {
        let target = EventTarget::new();
        for type_ in [EventType::Play, EventType::Pause, EventType::Ended] {
            let log = log.clone();
            target.add_event_listener(type_, move |event| log.borrow_mut().push(event.name()));
        }
        target
    }

    #[test]
    fn events_fire_asynchronously_in_order() {
        let event_loop = EventLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let target = recording_target(&log);
        let queue = GenericEventQueue::new(&event_loop);

        queue.enqueue_event(&target, EventType::Play);
        queue.enqueue_event(&target, EventType::Pause);
        assert!(log.borrow().is_empty());
        event_loop.run_until_idle();
        assert_eq!(*log.borrow(), vec!["play", "pause"]);
    }

    #[test]
    fn cancelled_events_never_fire() {
        let event_loop = EventLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let target = recording_target(&log);
        let queue = GenericEventQueue::new(&event_loop);

        queue.enqueue_event(&target, EventType::Play);
        queue.cancel_all_events();
        queue.enqueue_event(&target, EventType::Ended);
        event_loop.run_until_idle();
        assert_eq!(*log.borrow(), vec!["ended"]);
    }
}
