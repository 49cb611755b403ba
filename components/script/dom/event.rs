/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use strum::IntoStaticStr;

/// Names of the simple events fired by media elements, media controllers,
/// text tracks, cues and track lists.
#[derive(Clone, Copy, Debug, Eq, Hash, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
    Abort,
    CanPlay,
    CanPlayThrough,
    DurationChange,
    Emptied,
    Ended,
    Error,
    LoadedData,
    LoadedMetadata,
    LoadStart,
    Pause,
    Play,
    Playing,
    Progress,
    RateChange,
    Seeked,
    Seeking,
    Stalled,
    Suspend,
    TimeUpdate,
    VolumeChange,
    Waiting,
    #[strum(serialize = "webkitbeginfullscreen")]
    BeginFullscreen,
    #[strum(serialize = "webkitendfullscreen")]
    EndFullscreen,
    Load,
    CueChange,
    Enter,
    Exit,
    AddTrack,
    RemoveTrack,
    Change,
}

impl EventType {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A simple event: it does not bubble and carries no payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    type_: EventType,
    time_stamp: f64,
}

impl Event {
    pub fn new(type_: EventType, time_stamp: f64) -> Event {
        Event { type_, time_stamp }
    }

    pub fn type_(&self) -> EventType {
        self.type_
    }

    pub fn name(&self) -> &'static str {
        self.type_.name()
    }

    /// Virtual time, in seconds, at which the event was queued.
    pub fn time_stamp(&self) -> f64 {
        self.time_stamp
    }
}
