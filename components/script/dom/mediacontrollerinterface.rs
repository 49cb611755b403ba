/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use media_traits::{ReadyState, TimeRanges};

use crate::dom::bindings::error::ErrorResult;

/// The transport surface shared by a single media element and a
/// `MediaController`, so media controls can drive either one.
pub trait MediaControllerInterface {
    fn buffered(&self) -> TimeRanges;
    fn seekable(&self) -> TimeRanges;
    fn played(&self) -> TimeRanges;

    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn set_current_time(&self, time: f64) -> ErrorResult;

    fn paused(&self) -> bool;
    fn play(&self);
    fn pause(&self);

    fn default_playback_rate(&self) -> f64;
    fn set_default_playback_rate(&self, rate: f64);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);

    fn volume(&self) -> f64;
    fn set_volume(&self, volume: f64) -> ErrorResult;
    fn muted(&self) -> bool;
    fn set_muted(&self, muted: bool);

    fn ready_state(&self) -> ReadyState;

    fn supports_fullscreen(&self) -> bool {
        false
    }
    fn has_audio(&self) -> bool;
    fn has_video(&self) -> bool;
    fn has_closed_captions(&self) -> bool;
    fn set_closed_captions_visible(&self, visible: bool);
    fn closed_captions_visible(&self) -> bool;

    fn supports_scanning(&self) -> bool;
    fn begin_scrubbing(&self);
    fn end_scrubbing(&self);

    fn can_play(&self) -> bool;
    fn has_current_src(&self) -> bool;
}
