/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::dom::event::{Event, EventType};
use crate::dom::eventtarget::EventTarget;
use crate::event_loop::EventLoop;
use crate::timers::Timer;

/// A `<source>` child of a media element: one candidate resource.
pub struct HTMLSourceElement {
    event_target: Rc<EventTarget>,
    event_loop: Rc<EventLoop>,
    src: RefCell<Option<String>>,
    type_: RefCell<String>,
    media: RefCell<Option<String>>,
    error_event_timer: Timer,
}

impl HTMLSourceElement {
    pub fn new(event_loop: &Rc<EventLoop>, src: &str, type_: &str) -> Rc<HTMLSourceElement> {
        Rc::new(HTMLSourceElement {
            event_target: EventTarget::new(),
            event_loop: event_loop.clone(),
            src: RefCell::new(Some(src.to_owned())),
            type_: RefCell::new(type_.to_owned()),
            media: RefCell::new(None),
            error_event_timer: Timer::new(event_loop),
        })
    }

    pub fn event_target(&self) -> &Rc<EventTarget> {
        &self.event_target
    }

    // https://html.spec.whatwg.org/multipage/#dom-source-src
    pub fn src(&self) -> Option<String> {
        self.src.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#dom-source-src
    pub fn set_src(&self, src: Option<&str>) {
        *self.src.borrow_mut() = src.map(str::to_owned);
    }

    // https://html.spec.whatwg.org/multipage/#dom-source-type
    pub fn type_(&self) -> String {
        self.type_.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#dom-source-type
    pub fn set_type(&self, type_: &str) {
        *self.type_.borrow_mut() = type_.to_owned();
    }

    // https://html.spec.whatwg.org/multipage/#dom-source-media
    pub fn media(&self) -> Option<String> {
        self.media.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#dom-source-media
    pub fn set_media(&self, media: Option<&str>) {
        *self.media.borrow_mut() = media.map(str::to_owned);
    }

    /// Queues an `error` event at this element. A pending one is replaced.
    pub fn schedule_error_event(&self) {
        let target = self.event_target.clone();
        let event_loop = self.event_loop.clone();
        self.error_event_timer.start_one_shot(Duration::ZERO, move || {
            target.dispatch_event(&Event::new(EventType::Error, event_loop.now_secs()));
        });
    }

    pub fn cancel_pending_error_event(&self) {
        self.error_event_timer.stop();
    }
}
