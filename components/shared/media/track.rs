/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// <https://html.spec.whatwg.org/multipage/#attr-track-kind>
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, IntoStaticStr, PartialEq, Serialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum TextTrackKind {
    #[default]
    Subtitles,
    Captions,
    Descriptions,
    Chapters,
    Metadata,
}

impl TextTrackKind {
    /// Parses a keyword. Unknown keywords yield `None`.
    pub fn from_keyword(keyword: &str) -> Option<TextTrackKind> {
        match keyword {
            "subtitles" => Some(TextTrackKind::Subtitles),
            "captions" => Some(TextTrackKind::Captions),
            "descriptions" => Some(TextTrackKind::Descriptions),
            "chapters" => Some(TextTrackKind::Chapters),
            "metadata" => Some(TextTrackKind::Metadata),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Engine-side identity of an in-band text track.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct InbandTrackId(pub u64);

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct InbandTextTrackInfo {
    pub id: InbandTrackId,
    pub kind: TextTrackKind,
    pub label: String,
    pub language: String,
    pub is_default: bool,
}

/// Engine-side identity of a cue. Updates and removals refer to the cue
/// through this value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CueDataId(pub u64);

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum GenericCueStatus {
    #[default]
    Uninitialized,
    Partial,
    Complete,
}

/// A cue described by the engine in format-neutral terms.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GenericCueData {
    pub id: CueDataId,
    pub start_time: f64,
    pub end_time: f64,
    pub content: String,
    /// Line position as a percentage of the video height.
    pub line: Option<f64>,
    /// Text position as a percentage of the video width.
    pub position: Option<f64>,
    pub size: Option<f64>,
    pub status: GenericCueStatus,
}

impl GenericCueData {
    pub fn new(id: CueDataId, start_time: f64, end_time: f64, content: &str) -> GenericCueData {
        GenericCueData {
            id,
            start_time,
            end_time,
            content: content.to_owned(),
            line: None,
            position: None,
            size: None,
            status: GenericCueStatus::Complete,
        }
    }
}

/// A WebVTT cue delivered in-band, with its settings still unparsed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WebVttCueData {
    pub id: CueDataId,
    pub start_time: f64,
    pub end_time: f64,
    pub cue_id: String,
    pub content: String,
    pub settings: String,
}
