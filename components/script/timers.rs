/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::event_loop::{EventLoop, TimerHandle};

/// Shortest interval a repeating timer may use.
const MIN_REPEAT_INTERVAL: Duration = Duration::from_millis(1);

/// A restartable timer owned by a DOM object.
///
/// Starting the timer again replaces whatever was scheduled before, and
/// dropping it cancels it. A zero delay one-shot runs as a queued task, but
/// can still be stopped before that task runs.
pub struct Timer {
    event_loop: Rc<EventLoop>,
    active: Rc<Cell<Option<TimerHandle>>>,
}

impl Timer {
    pub fn new(event_loop: &Rc<EventLoop>) -> Timer {
        Timer {
            event_loop: event_loop.clone(),
            active: Rc::new(Cell::new(None)),
        }
    }

    pub fn start_one_shot(&self, delay: Duration, callback: impl Fn() + 'static) {
        self.stop();
        let handle = self.event_loop.new_timer_handle();
        self.active.set(Some(handle));

        let active = self.active.clone();
        let fire = move || {
            if active.get() != Some(handle) {
                return;
            }
            active.set(None);
            callback();
        };
        if delay.is_zero() {
            self.event_loop.queue_task(fire);
        } else {
            self.event_loop
                .schedule_timer(handle, delay, None, Rc::new(fire));
        }
    }

    pub fn start_repeating(&self, interval: Duration, callback: impl Fn() + 'static) {
        self.stop();
        let interval = interval.max(MIN_REPEAT_INTERVAL);
        let handle = self.event_loop.new_timer_handle();
        self.active.set(Some(handle));

        let active = self.active.clone();
        self.event_loop.schedule_timer(
            handle,
            interval,
            Some(interval),
            Rc::new(move || {
                if active.get() == Some(handle) {
                    callback();
                }
            }),
        );
    }

    pub fn stop(&self) {
        if let Some(handle) = self.active.take() {
            self.event_loop.cancel_timer(handle);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get().is_some()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::Timer;
    use crate::event_loop::EventLoop;

    #[test]
    fn zero_delay_one_shot_is_a_cancellable_task() {
        let event_loop = EventLoop::new();
        let fired = Rc::new(Cell::new(0));
        let timer = Timer::new(&event_loop);

        let counter = fired.clone();
        timer.start_one_shot(Duration::ZERO, move || counter.set(counter.get() + 1));
        assert!(timer.is_active());
        timer.stop();
        event_loop.run_until_idle();
        assert_eq!(fired.get(), 0);

        let counter = fired.clone();
        timer.start_one_shot(Duration::ZERO, move || counter.set(counter.get() + 1));
        event_loop.run_until_idle();
        assert_eq!(fired.get(), 1);
        assert!(!timer.is_active());
    }

    #[test]
    fn restarting_replaces_the_previous_schedule() {
        let event_loop = EventLoop::new();
        let fired = Rc::new(Cell::new(0));
        let timer = Timer::new(&event_loop);
        for _ in 0..3 {
            let counter = fired.clone();
            timer.start_one_shot(Duration::from_millis(10), move || {
                counter.set(counter.get() + 1)
            });
        }
        event_loop.advance(Duration::from_millis(50));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn dropping_the_timer_cancels_it() {
        let event_loop = EventLoop::new();
        let fired = Rc::new(Cell::new(0));
        {
            let timer = Timer::new(&event_loop);
            let counter = fired.clone();
            timer.start_repeating(Duration::from_millis(100), move || {
                counter.set(counter.get() + 1)
            });
            event_loop.advance(Duration::from_millis(250));
        }
        event_loop.advance(Duration::from_secs(1));
        assert_eq!(fired.get(), 2);
    }
}
