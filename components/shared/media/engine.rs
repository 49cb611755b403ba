/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crossbeam_channel::Sender;
use euclid::default::Size2D;
use log::trace;
use url::Url;

use crate::{
    CueDataId, GenericCueData, InbandTextTrackInfo, InbandTrackId, NetworkState, Preload,
    ReadyState, SupportsType, TimeRanges, WebVttCueData,
};

#[derive(Debug, PartialEq)]
pub enum PlayerError {
    /// Backend specific error.
    Backend(String),
    /// The media stream is not seekable.
    NonSeekableStream,
    /// Tried to seek out of range.
    SeekOutOfRange,
    /// The player side of the event channel is gone.
    EventChannelClosed,
}

/// Notifications an engine sends to the `MediaPlayer` that owns it. State
/// changes carry no payload: the player queries the engine for the new value
/// when it handles the event.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    NetworkStateChanged,
    ReadyStateChanged,
    TimeChanged,
    DurationChanged,
    RateChanged,
    PlaybackStateChanged,
    VolumeChanged,
    MuteChanged,
    SizeChanged,
    Repaint,
    InbandTextTrackAdded(InbandTextTrackInfo),
    InbandTextTrackRemoved(InbandTrackId),
    GenericCueAdded(InbandTrackId, GenericCueData),
    GenericCueUpdated(InbandTrackId, GenericCueData),
    GenericCueRemoved(InbandTrackId, CueDataId),
    WebVttCueAdded(InbandTrackId, WebVttCueData),
}

/// Identifies one engine object created by a `MediaPlayer`. A player bumps the
/// id every time it replaces its engine, which lets it recognise events that
/// were queued by an engine it no longer owns.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EngineInstanceId(pub u64);

#[derive(Debug)]
pub struct EngineMessage {
    pub instance: EngineInstanceId,
    pub event: PlayerEvent,
}

/// The sending half handed to an engine when it is created.
#[derive(Clone, Debug)]
pub struct EngineEventSender {
    instance: EngineInstanceId,
    sender: Sender<EngineMessage>,
}

impl EngineEventSender {
    pub fn new(instance: EngineInstanceId, sender: Sender<EngineMessage>) -> EngineEventSender {
        EngineEventSender { instance, sender }
    }

    pub fn instance(&self) -> EngineInstanceId {
        self.instance
    }

    pub fn send(&self, event: PlayerEvent) -> Result<(), PlayerError> {
        trace!("Engine {:?} sending {:?}", self.instance, event);
        self.sender
            .send(EngineMessage {
                instance: self.instance,
                event,
            })
            .map_err(|_| PlayerError::EventChannelClosed)
    }
}

/// The tuple engines are asked about when a player picks one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaEngineSupportParameters {
    pub mime_type: String,
    pub codecs: String,
    pub key_system: String,
    pub url: Option<Url>,
}

/// The contract a platform decoder implements. One object exists per player
/// and per load; it reports progress through the `EngineEventSender` it was
/// created with.
pub trait MediaEngine {
    fn load(&mut self, url: &Url, key_system: &str) -> Result<(), PlayerError>;
    fn cancel_load(&mut self);
    fn prepare_to_play(&mut self) {}

    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn paused(&self) -> bool;
    fn seek(&mut self, time: f64) -> Result<(), PlayerError>;
    fn seeking(&self) -> bool;

    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn start_time(&self) -> f64 {
        0.
    }
    /// Maps a time to one the engine can represent exactly.
    fn media_time_for_time_value(&self, time: f64) -> f64 {
        time
    }

    fn set_rate(&mut self, rate: f64) -> Result<(), PlayerError>;
    fn set_volume(&mut self, volume: f64) -> Result<(), PlayerError>;
    fn set_muted(&mut self, _muted: bool) -> Result<(), PlayerError> {
        Ok(())
    }
    fn supports_muting(&self) -> bool {
        false
    }
    fn set_preload(&mut self, _preload: Preload) {}
    fn set_private_browsing_mode(&mut self, _private_browsing: bool) {}
    fn set_preserves_pitch(&mut self, _preserves_pitch: bool) {}
    fn prepare_for_rendering(&mut self) {}

    fn network_state(&self) -> NetworkState;
    fn ready_state(&self) -> ReadyState;
    fn buffered(&self) -> TimeRanges;
    fn seekable(&self) -> TimeRanges;
    /// Whether any data arrived since the previous call.
    fn did_loading_progress(&mut self) -> bool;

    fn natural_size(&self) -> Size2D<i32>;
    fn has_video(&self) -> bool;
    fn has_audio(&self) -> bool;
    fn has_closed_captions(&self) -> bool {
        false
    }
    fn set_closed_captions_visible(&mut self, _visible: bool) {}

    fn supports_fullscreen(&self) -> bool {
        false
    }
    fn supports_scanning(&self) -> bool {
        false
    }
    fn supports_save(&self) -> bool {
        false
    }
    fn has_single_security_origin(&self) -> bool {
        true
    }
}

/// An installed engine: how to construct its players and what it can play.
pub trait MediaEngineFactory {
    fn name(&self) -> &str;
    fn create(&self, sender: EngineEventSender) -> Box<dyn MediaEngine>;
    fn supports_type_and_codecs(&self, parameters: &MediaEngineSupportParameters)
    -> SupportsType;
    fn supported_types(&self) -> Vec<String>;

    fn sites_in_media_cache(&self) -> Vec<String> {
        Vec::new()
    }
    fn clear_media_cache(&self) {}
    fn clear_media_cache_for_site(&self, _site: &str) {}
}

/// Stand-in engine used when nothing can play the resource. Every operation
/// is accepted and ignored.
#[derive(Debug, Default)]
pub struct NullMediaEngine;

impl MediaEngine for NullMediaEngine {
    fn load(&mut self, _url: &Url, _key_system: &str) -> Result<(), PlayerError> {
        Ok(())
    }

    fn cancel_load(&mut self) {}

    fn play(&mut self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn paused(&self) -> bool {
        true
    }

    fn seek(&mut self, _time: f64) -> Result<(), PlayerError> {
        Ok(())
    }

    fn seeking(&self) -> bool {
        false
    }

    fn current_time(&self) -> f64 {
        0.
    }

    fn duration(&self) -> f64 {
        0.
    }

    fn set_rate(&mut self, _rate: f64) -> Result<(), PlayerError> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: f64) -> Result<(), PlayerError> {
        Ok(())
    }

    fn network_state(&self) -> NetworkState {
        NetworkState::Empty
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveNothing
    }

    fn buffered(&self) -> TimeRanges {
        TimeRanges::new()
    }

    fn seekable(&self) -> TimeRanges {
        TimeRanges::new()
    }

    fn did_loading_progress(&mut self) -> bool {
        false
    }

    fn natural_size(&self) -> Size2D<i32> {
        Size2D::zero()
    }

    fn has_video(&self) -> bool {
        false
    }

    fn has_audio(&self) -> bool {
        false
    }
}
