/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Types shared between media engines, the `MediaPlayer` that drives them and
//! the DOM objects that sit on top.

#![deny(unsafe_code)]

mod content_type;
mod engine;
mod time_ranges;
mod track;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

pub use crate::content_type::ContentType;
pub use crate::engine::{
    EngineEventSender, EngineInstanceId, EngineMessage, MediaEngine, MediaEngineFactory,
    MediaEngineSupportParameters, NullMediaEngine, PlayerError, PlayerEvent,
};
pub use crate::time_ranges::{TimeRange, TimeRanges, TimeRangesError};
pub use crate::track::{
    CueDataId, GenericCueData, GenericCueStatus, InbandTextTrackInfo, InbandTrackId,
    TextTrackKind, WebVttCueData,
};

/// The state of the resource fetch as reported by an engine.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum NetworkState {
    Empty,
    Idle,
    Loading,
    Loaded,
    FormatError,
    NetworkError,
    DecodeError,
}

impl NetworkState {
    pub fn is_error(self) -> bool {
        self >= NetworkState::FormatError
    }
}

/// <https://html.spec.whatwg.org/multipage/#ready-states>
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, IntoStaticStr, Ord, PartialEq, PartialOrd, Serialize,
)]
#[repr(u8)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    pub const ALL: [ReadyState; 5] = [
        ReadyState::HaveNothing,
        ReadyState::HaveMetadata,
        ReadyState::HaveCurrentData,
        ReadyState::HaveFutureData,
        ReadyState::HaveEnoughData,
    ];

    pub fn from_u8(value: u8) -> Option<ReadyState> {
        ReadyState::ALL.get(value as usize).copied()
    }
}

/// <https://html.spec.whatwg.org/multipage/#attr-media-preload>
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Preload {
    None,
    MetaData,
    #[default]
    Auto,
}

impl Preload {
    /// Parses the attribute value. Missing and invalid values map to `Auto`.
    pub fn from_attribute(value: Option<&str>) -> Preload {
        match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("none") => Preload::None,
            Some("metadata") => Preload::MetaData,
            _ => Preload::Auto,
        }
    }
}

/// How confident an engine is that it can play a given type. The ordering is
/// meaningful: engine selection keeps the strictly highest level.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SupportsType {
    IsNotSupported,
    MayBeSupported,
    IsSupported,
}
