/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::Cell;
use std::rc::Rc;

use crate::event_loop::EventLoop;

/// A media timeline that advances at some rate while running.
pub trait Clock {
    fn set_current_time(&self, time: f64);
    fn current_time(&self) -> f64;
    fn set_play_rate(&self, rate: f64);
    fn play_rate(&self) -> f64;
    fn start(&self);
    fn stop(&self);
    fn is_running(&self) -> bool;
}

/// A clock driven by the event loop's virtual time.
pub struct PlatformClock {
    event_loop: Rc<EventLoop>,
    running: Cell<bool>,
    rate: Cell<f64>,
    offset: Cell<f64>,
    start_time: Cell<f64>,
}

impl PlatformClock {
    pub fn new(event_loop: &Rc<EventLoop>) -> PlatformClock {
        PlatformClock {
            event_loop: event_loop.clone(),
            running: Cell::new(false),
            rate: Cell::new(1.),
            offset: Cell::new(0.),
            start_time: Cell::new(0.),
        }
    }

    fn now(&self) -> f64 {
        self.event_loop.now_secs()
    }
}

impl Clock for PlatformClock {
    fn set_current_time(&self, time: f64) {
        if self.running.get() {
            self.start_time.set(self.now());
        }
        self.offset.set(time);
    }

    fn current_time(&self) -> f64 {
        if !self.running.get() {
            return self.offset.get();
        }
        (self.now() - self.start_time.get()) * self.rate.get() + self.offset.get()
    }

    fn set_play_rate(&self, rate: f64) {
        if self.running.get() {
            self.offset.set(self.current_time());
            self.start_time.set(self.now());
        }
        self.rate.set(rate);
    }

    fn play_rate(&self) -> f64 {
        self.rate.get()
    }

    fn start(&self) {
        if self.running.get() {
            return;
        }
        self.start_time.set(self.now());
        self.running.set(true);
    }

    fn stop(&self) {
        if !self.running.get() {
            return;
        }
        self.offset.set(self.current_time());
        self.running.set(false);
    }

    fn is_running(&self) -> bool {
        self.running.get()
    }
}
