/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A single-threaded task queue with a virtual clock.
//!
//! Everything the media elements do asynchronously goes through here: queued
//! tasks, timers, and polling of the engines' event channels. Time only moves
//! when the embedder calls [`EventLoop::advance`], which keeps playback
//! deterministic under test.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::trace;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerHandle(u64);

/// Something outside the task queue that can produce work, such as a media
/// player's engine channel. Sources are polled whenever the queue runs dry.
pub trait EventSource {
    /// Processes whatever is pending. Returns whether anything was.
    fn poll_events(&self) -> bool;
}

type Task = Box<dyn FnOnce()>;

struct ScheduledTimer {
    handle: TimerHandle,
    deadline: Duration,
    interval: Option<Duration>,
    callback: Rc<dyn Fn()>,
}

pub struct EventLoop {
    now: Cell<Duration>,
    tasks: RefCell<VecDeque<Task>>,
    timers: RefCell<Vec<ScheduledTimer>>,
    next_timer_handle: Cell<u64>,
    sources: RefCell<Vec<Weak<dyn EventSource>>>,
}

impl EventLoop {
    pub fn new() -> Rc<EventLoop> {
        Rc::new(EventLoop {
            now: Cell::new(Duration::ZERO),
            tasks: RefCell::new(VecDeque::new()),
            timers: RefCell::new(Vec::new()),
            next_timer_handle: Cell::new(1),
            sources: RefCell::new(Vec::new()),
        })
    }

    /// Virtual time elapsed since the loop was created.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn now_secs(&self) -> f64 {
        self.now.get().as_secs_f64()
    }

    pub fn queue_task(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.borrow().is_empty()
    }

    pub fn register_event_source(&self, source: Weak<dyn EventSource>) {
        self.sources.borrow_mut().push(source);
    }

    pub(crate) fn new_timer_handle(&self) -> TimerHandle {
        let handle = TimerHandle(self.next_timer_handle.get());
        self.next_timer_handle.set(handle.0 + 1);
        handle
    }

    pub(crate) fn schedule_timer(
        &self,
        handle: TimerHandle,
        delay: Duration,
        interval: Option<Duration>,
        callback: Rc<dyn Fn()>,
    ) {
        self.timers.borrow_mut().push(ScheduledTimer {
            handle,
            deadline: self.now.get() + delay,
            interval,
            callback,
        });
    }

    pub(crate) fn cancel_timer(&self, handle: TimerHandle) {
        self.timers.borrow_mut().retain(|timer| timer.handle != handle);
    }

    pub fn is_timer_scheduled(&self, handle: TimerHandle) -> bool {
        self.timers
            .borrow()
            .iter()
            .any(|timer| timer.handle == handle)
    }

    fn poll_sources(&self) -> bool {
        let sources: Vec<Rc<dyn EventSource>> = {
            let mut sources = self.sources.borrow_mut();
            sources.retain(|source| source.strong_count() > 0);
            sources.iter().filter_map(Weak::upgrade).collect()
        };
        let mut processed = false;
        for source in sources {
            processed |= source.poll_events();
        }
        processed
    }

    /// Runs queued tasks and polls event sources until neither produces
    /// anything. Virtual time does not move.
    pub fn run_until_idle(&self) {
        loop {
            let mut progressed = false;
            loop {
                let task = self.tasks.borrow_mut().pop_front();
                let Some(task) = task else {
                    break;
                };
                progressed = true;
                task();
            }
            if self.poll_sources() {
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    /// Moves virtual time forward by `duration`, firing every timer that
    /// comes due on the way in deadline order.
    pub fn advance(&self, duration: Duration) {
        let target = self.now.get() + duration;
        self.run_until_idle();
        while let Some(callback) = self.take_next_due_timer(target) {
            callback();
            self.run_until_idle();
        }
        self.now.set(target);
        self.run_until_idle();
    }

    fn take_next_due_timer(&self, target: Duration) -> Option<Rc<dyn Fn()>> {
        let mut timers = self.timers.borrow_mut();
        let index = timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.deadline <= target)
            .min_by_key(|(_, timer)| (timer.deadline, timer.handle))
            .map(|(index, _)| index)?;

        let deadline = timers[index].deadline;
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
        trace!("Firing timer {:?} at {:?}", timers[index].handle, deadline);
        match timers[index].interval {
            Some(interval) => {
                timers[index].deadline = deadline + interval;
                Some(timers[index].callback.clone())
            },
            None => Some(timers.remove(index).callback),
        }
    }
}
