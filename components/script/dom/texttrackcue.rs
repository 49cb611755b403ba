/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use media_traits::GenericCueData;
use strum::IntoStaticStr;

use crate::dom::bindings::error::{Error, ErrorResult};
use crate::dom::eventtarget::EventTarget;
use crate::dom::texttrack::TextTrack;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CueType {
    WebVtt,
    /// Cues produced by a media engine from an in-band format.
    Generic,
}

/// Whether `has_cue` compares end times.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CueMatchRules {
    MatchAllFields,
    IgnoreDuration,
}

#[derive(Clone, Copy, Debug, Default, Eq, IntoStaticStr, PartialEq)]
pub enum WritingDirection {
    #[default]
    #[strum(serialize = "")]
    Horizontal,
    #[strum(serialize = "rl")]
    VerticalGrowingLeft,
    #[strum(serialize = "lr")]
    VerticalGrowingRight,
}

#[derive(Clone, Copy, Debug, Default, Eq, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum CueAlignment {
    Start,
    #[default]
    Middle,
    End,
}

/// <https://w3c.github.io/webvtt/#webvtt-cue-settings>
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CueSettings {
    pub writing_direction: WritingDirection,
    /// `None` is the "auto" line position.
    pub line_position: Option<f64>,
    pub snap_to_lines: bool,
    pub text_position: f64,
    pub size: f64,
    pub alignment: CueAlignment,
}

impl Default for CueSettings {
    fn default() -> CueSettings {
        CueSettings {
            writing_direction: WritingDirection::Horizontal,
            line_position: None,
            snap_to_lines: true,
            text_position: 50.,
            size: 100.,
            alignment: CueAlignment::Middle,
        }
    }
}

impl CueSettings {
    /// Parses a WebVTT settings string. Unknown or malformed settings are
    /// skipped and the rest still apply.
    pub fn parse(input: &str) -> CueSettings {
        let mut settings = CueSettings::default();
        for setting in input.split_ascii_whitespace() {
            let Some((name, value)) = setting.split_once(':') else {
                continue;
            };
            match name {
                "vertical" => match value {
                    "rl" => settings.writing_direction = WritingDirection::VerticalGrowingLeft,
                    "lr" => settings.writing_direction = WritingDirection::VerticalGrowingRight,
                    _ => {},
                },
                "line" => {
                    if let Some((line, snap_to_lines)) = parse_line(value) {
                        settings.line_position = Some(line);
                        settings.snap_to_lines = snap_to_lines;
                    }
                },
                "position" => {
                    if let Some(position) = parse_percentage(value) {
                        settings.text_position = position;
                    }
                },
                "size" => {
                    if let Some(size) = parse_percentage(value) {
                        settings.size = size;
                    }
                },
                "align" => match value {
                    "start" => settings.alignment = CueAlignment::Start,
                    "middle" => settings.alignment = CueAlignment::Middle,
                    "end" => settings.alignment = CueAlignment::End,
                    _ => {},
                },
                _ => {},
            }
        }
        settings
    }
}

fn is_ascii_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

fn parse_percentage(value: &str) -> Option<f64> {
    let number = value.strip_suffix('%')?;
    if !is_ascii_digits(number) {
        return None;
    }
    let number: f64 = number.parse().ok()?;
    (0. ..=100.).contains(&number).then_some(number)
}

fn parse_line(value: &str) -> Option<(f64, bool)> {
    if value.ends_with('%') {
        return parse_percentage(value).map(|line| (line, false));
    }
    if !is_ascii_digits(value.strip_prefix('-').unwrap_or(value)) {
        return None;
    }
    value.parse().ok().map(|line| (line, true))
}

/// <https://html.spec.whatwg.org/multipage/#texttrackcue>
pub struct TextTrackCue {
    event_target: Rc<EventTarget>,
    cue_type: CueType,
    id: RefCell<String>,
    start_time: Cell<f64>,
    end_time: Cell<f64>,
    text: RefCell<String>,
    settings: Cell<CueSettings>,
    pause_on_exit: Cell<bool>,
    is_active: Cell<bool>,
    has_display_tree: Cell<bool>,
    track: RefCell<Weak<TextTrack>>,
}

impl TextTrackCue {
    fn new_inherited(cue_type: CueType, start_time: f64, end_time: f64, text: &str) -> TextTrackCue {
        TextTrackCue {
            event_target: EventTarget::new(),
            cue_type,
            id: RefCell::new(String::new()),
            start_time: Cell::new(start_time),
            end_time: Cell::new(end_time),
            text: RefCell::new(text.to_owned()),
            settings: Cell::new(CueSettings::default()),
            pause_on_exit: Cell::new(false),
            is_active: Cell::new(false),
            has_display_tree: Cell::new(false),
            track: RefCell::new(Weak::new()),
        }
    }

    pub fn new(start_time: f64, end_time: f64, text: &str) -> Rc<TextTrackCue> {
        Rc::new(TextTrackCue::new_inherited(
            CueType::WebVtt,
            start_time,
            end_time,
            text,
        ))
    }

    pub fn new_generic(data: &GenericCueData) -> Rc<TextTrackCue> {
        let cue = TextTrackCue::new_inherited(
            CueType::Generic,
            data.start_time,
            data.end_time,
            &data.content,
        );
        cue.settings.set(generic_cue_settings(data));
        Rc::new(cue)
    }

    pub fn event_target(&self) -> &Rc<EventTarget> {
        &self.event_target
    }

    pub fn cue_type(&self) -> CueType {
        self.cue_type
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-track
    pub fn track(&self) -> Option<Rc<TextTrack>> {
        self.track.borrow().upgrade()
    }

    pub(crate) fn set_track(&self, track: Weak<TextTrack>) {
        *self.track.borrow_mut() = track;
    }

    pub(crate) fn is_in_track(&self, track: &TextTrack) -> bool {
        std::ptr::eq(self.track.borrow().as_ptr(), track)
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-id
    pub fn id(&self) -> String {
        self.id.borrow().clone()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-id
    pub fn set_id(&self, id: &str) {
        if *self.id.borrow() == id {
            return;
        }
        self.will_change();
        *self.id.borrow_mut() = id.to_owned();
        self.did_change();
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-starttime
    pub fn start_time(&self) -> f64 {
        self.start_time.get()
    }

    /// Non-finite and negative times are ignored.
    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-starttime
    pub fn set_start_time(&self, value: f64) {
        if !value.is_finite() || value < 0. || value == self.start_time.get() {
            return;
        }
        self.will_change();
        self.start_time.set(value);
        self.did_change();
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-endtime
    pub fn end_time(&self) -> f64 {
        self.end_time.get()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-endtime
    pub fn set_end_time(&self, value: f64) {
        if !value.is_finite() || value < 0. || value == self.end_time.get() {
            return;
        }
        self.will_change();
        self.end_time.set(value);
        self.did_change();
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-pauseonexit
    pub fn pause_on_exit(&self) -> bool {
        self.pause_on_exit.get()
    }

    // https://html.spec.whatwg.org/multipage/#dom-texttrackcue-pauseonexit
    pub fn set_pause_on_exit(&self, value: bool) {
        self.pause_on_exit.set(value);
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn set_text(&self, text: &str) {
        if *self.text.borrow() == text {
            return;
        }
        self.will_change();
        *self.text.borrow_mut() = text.to_owned();
        self.did_change();
    }

    pub fn settings(&self) -> CueSettings {
        self.settings.get()
    }

    pub fn set_cue_settings(&self, input: &str) {
        self.update_settings(|settings| *settings = CueSettings::parse(input));
    }

    pub(crate) fn update_from_generic_data(&self, data: &GenericCueData) {
        self.will_change();
        self.start_time.set(data.start_time);
        self.end_time.set(data.end_time);
        *self.text.borrow_mut() = data.content.clone();
        self.settings.set(generic_cue_settings(data));
        self.did_change();
    }

    fn update_settings(&self, update: impl FnOnce(&mut CueSettings)) {
        let mut settings = self.settings.get();
        update(&mut settings);
        if settings == self.settings.get() {
            return;
        }
        self.will_change();
        self.settings.set(settings);
        self.did_change();
    }

    pub fn vertical(&self) -> &'static str {
        self.settings.get().writing_direction.into()
    }

    pub fn set_vertical(&self, value: &str) -> ErrorResult {
        let direction = match value {
            "" => WritingDirection::Horizontal,
            "rl" => WritingDirection::VerticalGrowingLeft,
            "lr" => WritingDirection::VerticalGrowingRight,
            _ => return Err(Error::Syntax),
        };
        self.update_settings(|settings| settings.writing_direction = direction);
        Ok(())
    }

    pub fn snap_to_lines(&self) -> bool {
        self.settings.get().snap_to_lines
    }

    pub fn set_snap_to_lines(&self, value: bool) {
        self.update_settings(|settings| settings.snap_to_lines = value);
    }

    /// The line position, with `None` meaning "auto".
    pub fn line(&self) -> Option<f64> {
        self.settings.get().line_position
    }

    pub fn set_line(&self, value: f64) -> ErrorResult {
        if !self.snap_to_lines() && !(0. ..=100.).contains(&value) {
            return Err(Error::IndexSize);
        }
        self.update_settings(|settings| settings.line_position = Some(value));
        Ok(())
    }

    pub fn position(&self) -> f64 {
        self.settings.get().text_position
    }

    pub fn set_position(&self, value: f64) -> ErrorResult {
        if !(0. ..=100.).contains(&value) {
            return Err(Error::IndexSize);
        }
        self.update_settings(|settings| settings.text_position = value);
        Ok(())
    }

    pub fn size(&self) -> f64 {
        self.settings.get().size
    }

    pub fn set_size(&self, value: f64) -> ErrorResult {
        if !(0. ..=100.).contains(&value) {
            return Err(Error::IndexSize);
        }
        self.update_settings(|settings| settings.size = value);
        Ok(())
    }

    pub fn align(&self) -> &'static str {
        self.settings.get().alignment.into()
    }

    pub fn set_align(&self, value: &str) -> ErrorResult {
        let alignment = match value {
            "start" => CueAlignment::Start,
            "middle" => CueAlignment::Middle,
            "end" => CueAlignment::End,
            _ => return Err(Error::Syntax),
        };
        self.update_settings(|settings| settings.alignment = alignment);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.is_active.get()
    }

    pub(crate) fn set_is_active(&self, active: bool) {
        self.is_active.set(active);
        if !active {
            self.remove_display_tree();
        }
    }

    /// Whether the cue is currently laid out for display.
    pub fn has_display_tree(&self) -> bool {
        self.has_display_tree.get()
    }

    pub(crate) fn update_display_tree(&self) {
        self.has_display_tree.set(true);
    }

    pub(crate) fn remove_display_tree(&self) {
        self.has_display_tree.set(false);
    }

    fn will_change(&self) {
        if let Some(track) = self.track() {
            track.cue_will_change(self);
        }
    }

    fn did_change(&self) {
        if let Some(track) = self.track() {
            track.cue_did_change(self);
        }
    }

    /// Where the cue sits on the rendering area, as (text position, line).
    fn position_coordinates(&self) -> (f64, f64) {
        let settings = self.settings.get();
        (settings.text_position, settings.line_position.unwrap_or(100.))
    }

    /// <https://html.spec.whatwg.org/multipage/#text-track-cue-order>
    pub fn is_ordered_before(&self, other: &TextTrackCue) -> bool {
        if self.start_time() < other.start_time() ||
            (self.start_time() == other.start_time() && self.end_time() > other.end_time())
        {
            return true;
        }
        if self.cue_type != CueType::Generic ||
            other.cue_type != CueType::Generic ||
            self.start_time() != other.start_time() ||
            self.end_time() != other.end_time()
        {
            return false;
        }
        // Generic cues covering the same interval stack from the bottom of
        // the rendering area up, then left to right.
        let (this_x, this_y) = self.position_coordinates();
        let (other_x, other_y) = other.position_coordinates();
        this_y > other_y || (this_y == other_y && this_x < other_x)
    }

    pub fn is_equal(&self, other: &TextTrackCue, match_rules: CueMatchRules) -> bool {
        self.cue_type == other.cue_type &&
            (match_rules == CueMatchRules::IgnoreDuration || self.end_time() == other.end_time()) &&
            self.start_time() == other.start_time() &&
            *self.text.borrow() == *other.text.borrow() &&
            self.settings.get() == other.settings.get()
    }
}

fn generic_cue_settings(data: &GenericCueData) -> CueSettings {
    let mut settings = CueSettings::default();
    if let Some(line) = data.line {
        settings.line_position = Some(line);
        settings.snap_to_lines = false;
    }
    if let Some(position) = data.position {
        settings.text_position = position;
    }
    if let Some(size) = data.size {
        settings.size = size;
    }
    settings
}

#[cfg(test)]
mod tests {
    use media_traits::{CueDataId, GenericCueData};

    use super::{CueAlignment, CueSettings, TextTrackCue, WritingDirection};
    use crate::dom::bindings::error::Error;

    #[test]
    fn parses_webvtt_settings() {
        let settings = CueSettings::parse("vertical:rl line:-2 position:10% size:80% align:start");
        assert_eq!(settings.writing_direction, WritingDirection::VerticalGrowingLeft);
        assert_eq!(settings.line_position, Some(-2.));
        assert!(settings.snap_to_lines);
        assert_eq!(settings.text_position, 10.);
        assert_eq!(settings.size, 80.);
        assert_eq!(settings.alignment, CueAlignment::Start);

        let settings = CueSettings::parse("line:25% position:120% bogus align:left size");
        assert_eq!(settings.line_position, Some(25.));
        assert!(!settings.snap_to_lines);
        assert_eq!(settings.text_position, 50.);
        assert_eq!(settings.alignment, CueAlignment::Middle);
    }

    #[test]
    fn earlier_start_then_longer_cue_comes_first() {
        let early = TextTrackCue::new(1., 2., "a");
        let late = TextTrackCue::new(3., 4., "b");
        let long = TextTrackCue::new(1., 5., "c");
        assert!(early.is_ordered_before(&late));
        assert!(!late.is_ordered_before(&early));
        assert!(long.is_ordered_before(&early));
        assert!(!early.is_ordered_before(&long));
    }

    #[test]
    fn generic_cues_with_equal_times_order_by_position() {
        let mut low = GenericCueData::new(CueDataId(1), 1., 2., "low");
        low.line = Some(90.);
        let mut high = GenericCueData::new(CueDataId(2), 1., 2., "high");
        high.line = Some(10.);
        let low = TextTrackCue::new_generic(&low);
        let high = TextTrackCue::new_generic(&high);
        assert!(low.is_ordered_before(&high));
        assert!(!high.is_ordered_before(&low));
    }

    #[test]
    fn setters_validate_their_input() {
        let cue = TextTrackCue::new(0., 1., "");
        assert_eq!(cue.set_position(101.), Err(Error::IndexSize));
        assert_eq!(cue.set_vertical("up"), Err(Error::Syntax));
        assert_eq!(cue.set_align("left"), Err(Error::Syntax));
        assert!(cue.set_align("end").is_ok());
        assert_eq!(cue.align(), "end");

        cue.set_snap_to_lines(false);
        assert_eq!(cue.set_line(150.), Err(Error::IndexSize));
        cue.set_start_time(f64::NAN);
        assert_eq!(cue.start_time(), 0.);
    }
}
