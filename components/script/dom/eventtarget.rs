/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::dom::event::{Event, EventType};

pub type EventListener = Rc<dyn Fn(&Event)>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ListenerId(u64);

/// Holds the listeners registered on one DOM object.
///
/// Listeners run synchronously from `dispatch_event`, in registration order,
/// and may add or remove listeners while they run.
#[derive(Default)]
pub struct EventTarget {
    handlers: RefCell<HashMap<EventType, Vec<(ListenerId, EventListener)>>>,
    next_listener_id: Cell<u64>,
}

impl EventTarget {
    pub fn new() -> Rc<EventTarget> {
        Rc::new(EventTarget::default())
    }

    pub fn add_event_listener(
        &self,
        type_: EventType,
        listener: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id.get());
        self.next_listener_id.set(id.0 + 1);
        self.handlers
            .borrow_mut()
            .entry(type_)
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_event_listener(&self, type_: EventType, id: ListenerId) {
        if let Some(entries) = self.handlers.borrow_mut().get_mut(&type_) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    pub fn has_listeners_for(&self, type_: EventType) -> bool {
        self.handlers
            .borrow()
            .get(&type_)
            .is_some_and(|entries| !entries.is_empty())
    }

    pub fn dispatch_event(&self, event: &Event) {
        trace!("Dispatching {}", event.name());
        let listeners: Vec<EventListener> = self
            .handlers
            .borrow()
            .get(&event.type_())
            .map(|entries| entries.iter().map(|(_, listener)| listener.clone()).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(event);
        }
    }
}
