/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! An engine that decodes nothing. Its state only moves when the embedder
//! (usually a test) tells it to, through the `DummyPlayerHandle` of each
//! player it created.

#![deny(unsafe_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use euclid::default::Size2D;
use log::{debug, warn};
use media_traits::{
    CueDataId, EngineEventSender, GenericCueData, InbandTextTrackInfo, InbandTrackId, MediaEngine,
    MediaEngineFactory, MediaEngineSupportParameters, NetworkState, PlayerError, PlayerEvent,
    Preload, ReadyState, SupportsType, TimeRanges, WebVttCueData,
};
use url::Url;

/// Operations the player performed on a dummy engine, in call order.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    Load(Url),
    CancelLoad,
    PrepareToPlay,
    Play,
    Pause,
    Seek(f64),
    SetRate(f64),
    SetVolume(f64),
    SetMuted(bool),
    SetPreload(Preload),
}

pub struct DummyEngineFactory {
    name: String,
    types: Vec<(String, SupportsType)>,
    supports_muting: bool,
    supports_fullscreen: bool,
    cached_sites: RefCell<BTreeSet<String>>,
    players: RefCell<Vec<DummyPlayerHandle>>,
}

impl DummyEngineFactory {
    pub fn new(name: &str) -> DummyEngineFactory {
        DummyEngineFactory {
            name: name.to_owned(),
            types: Vec::new(),
            supports_muting: false,
            supports_fullscreen: false,
            cached_sites: RefCell::new(BTreeSet::new()),
            players: RefCell::new(Vec::new()),
        }
    }

    pub fn with_type(mut self, mime_type: &str, support: SupportsType) -> DummyEngineFactory {
        self.types.push((mime_type.to_ascii_lowercase(), support));
        self
    }

    pub fn with_muting(mut self) -> DummyEngineFactory {
        self.supports_muting = true;
        self
    }

    pub fn with_fullscreen(mut self) -> DummyEngineFactory {
        self.supports_fullscreen = true;
        self
    }

    pub fn with_cached_site(self, site: &str) -> DummyEngineFactory {
        self.cached_sites.borrow_mut().insert(site.to_owned());
        self
    }

    pub fn players_created(&self) -> usize {
        self.players.borrow().len()
    }

    pub fn players(&self) -> Vec<DummyPlayerHandle> {
        self.players.borrow().clone()
    }

    pub fn last_player(&self) -> Option<DummyPlayerHandle> {
        self.players.borrow().last().cloned()
    }
}

impl MediaEngineFactory for DummyEngineFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, sender: EngineEventSender) -> Box<dyn MediaEngine> {
        debug!("{} creating player {:?}", self.name, sender.instance());
        let state = Rc::new(RefCell::new(DummyPlayerState::new(
            sender,
            self.supports_muting,
            self.supports_fullscreen,
        )));
        self.players.borrow_mut().push(DummyPlayerHandle(state.clone()));
        Box::new(DummyPlayer(state))
    }

    fn supports_type_and_codecs(
        &self,
        parameters: &MediaEngineSupportParameters,
    ) -> SupportsType {
        self.types
            .iter()
            .find(|(mime_type, _)| *mime_type == parameters.mime_type)
            .map_or(SupportsType::IsNotSupported, |(_, support)| *support)
    }

    fn supported_types(&self) -> Vec<String> {
        self.types
            .iter()
            .filter(|(_, support)| *support != SupportsType::IsNotSupported)
            .map(|(mime_type, _)| mime_type.clone())
            .collect()
    }

    fn sites_in_media_cache(&self) -> Vec<String> {
        self.cached_sites.borrow().iter().cloned().collect()
    }

    fn clear_media_cache(&self) {
        self.cached_sites.borrow_mut().clear();
    }

    fn clear_media_cache_for_site(&self, site: &str) {
        self.cached_sites.borrow_mut().remove(site);
    }
}

struct DummyPlayerState {
    sender: EngineEventSender,
    calls: Vec<EngineCall>,
    network_state: NetworkState,
    ready_state: ReadyState,
    paused: bool,
    seeking: bool,
    complete_seeks: bool,
    current_time: f64,
    duration: f64,
    buffered: TimeRanges,
    seekable: TimeRanges,
    loading_progress: bool,
    natural_size: Size2D<i32>,
    has_video: bool,
    has_audio: bool,
    has_closed_captions: bool,
    closed_captions_visible: bool,
    supports_muting: bool,
    supports_fullscreen: bool,
}

impl DummyPlayerState {
    fn new(
        sender: EngineEventSender,
        supports_muting: bool,
        supports_fullscreen: bool,
    ) -> DummyPlayerState {
        DummyPlayerState {
            sender,
            calls: Vec::new(),
            network_state: NetworkState::Empty,
            ready_state: ReadyState::HaveNothing,
            paused: true,
            seeking: false,
            complete_seeks: true,
            current_time: 0.,
            duration: f64::NAN,
            buffered: TimeRanges::new(),
            seekable: TimeRanges::new(),
            loading_progress: false,
            natural_size: Size2D::zero(),
            has_video: false,
            has_audio: true,
            has_closed_captions: false,
            closed_captions_visible: false,
            supports_muting,
            supports_fullscreen,
        }
    }

    fn notify(&self, event: PlayerEvent) {
        if let Err(error) = self.sender.send(event) {
            warn!("Dummy player could not deliver event {:?}", error);
        }
    }
}

struct DummyPlayer(Rc<RefCell<DummyPlayerState>>);

impl MediaEngine for DummyPlayer {
    fn load(&mut self, url: &Url, _key_system: &str) -> Result<(), PlayerError> {
        self.0.borrow_mut().calls.push(EngineCall::Load(url.clone()));
        Ok(())
    }

    fn cancel_load(&mut self) {
        self.0.borrow_mut().calls.push(EngineCall::CancelLoad);
    }

    fn prepare_to_play(&mut self) {
        self.0.borrow_mut().calls.push(EngineCall::PrepareToPlay);
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        let mut state = self.0.borrow_mut();
        state.calls.push(EngineCall::Play);
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        let mut state = self.0.borrow_mut();
        state.calls.push(EngineCall::Pause);
        state.paused = true;
        Ok(())
    }

    fn paused(&self) -> bool {
        self.0.borrow().paused
    }

    fn seek(&mut self, time: f64) -> Result<(), PlayerError> {
        let mut state = self.0.borrow_mut();
        state.calls.push(EngineCall::Seek(time));
        state.current_time = time;
        if state.complete_seeks {
            state.seeking = false;
            state.notify(PlayerEvent::TimeChanged);
        } else {
            state.seeking = true;
        }
        Ok(())
    }

    fn seeking(&self) -> bool {
        self.0.borrow().seeking
    }

    fn current_time(&self) -> f64 {
        self.0.borrow().current_time
    }

    fn duration(&self) -> f64 {
        self.0.borrow().duration
    }

    fn set_rate(&mut self, rate: f64) -> Result<(), PlayerError> {
        self.0.borrow_mut().calls.push(EngineCall::SetRate(rate));
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> Result<(), PlayerError> {
        self.0.borrow_mut().calls.push(EngineCall::SetVolume(volume));
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<(), PlayerError> {
        self.0.borrow_mut().calls.push(EngineCall::SetMuted(muted));
        Ok(())
    }

    fn supports_muting(&self) -> bool {
        self.0.borrow().supports_muting
    }

    fn set_preload(&mut self, preload: Preload) {
        self.0.borrow_mut().calls.push(EngineCall::SetPreload(preload));
    }

    fn network_state(&self) -> NetworkState {
        self.0.borrow().network_state
    }

    fn ready_state(&self) -> ReadyState {
        self.0.borrow().ready_state
    }

    fn buffered(&self) -> TimeRanges {
        self.0.borrow().buffered.clone()
    }

    fn seekable(&self) -> TimeRanges {
        self.0.borrow().seekable.clone()
    }

    fn did_loading_progress(&mut self) -> bool {
        std::mem::take(&mut self.0.borrow_mut().loading_progress)
    }

    fn natural_size(&self) -> Size2D<i32> {
        self.0.borrow().natural_size
    }

    fn has_video(&self) -> bool {
        self.0.borrow().has_video
    }

    fn has_audio(&self) -> bool {
        self.0.borrow().has_audio
    }

    fn has_closed_captions(&self) -> bool {
        self.0.borrow().has_closed_captions
    }

    fn set_closed_captions_visible(&mut self, visible: bool) {
        self.0.borrow_mut().closed_captions_visible = visible;
    }

    fn supports_fullscreen(&self) -> bool {
        self.0.borrow().supports_fullscreen
    }
}

/// Drives one player created by a `DummyEngineFactory`. Every setter that
/// changes observable state also queues the matching notification.
#[derive(Clone)]
pub struct DummyPlayerHandle(Rc<RefCell<DummyPlayerState>>);

impl DummyPlayerHandle {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.0.borrow().calls.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.0.borrow().paused
    }

    pub fn closed_captions_visible(&self) -> bool {
        self.0.borrow().closed_captions_visible
    }

    pub fn set_network_state(&self, network_state: NetworkState) {
        let mut state = self.0.borrow_mut();
        state.network_state = network_state;
        state.notify(PlayerEvent::NetworkStateChanged);
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        let mut state = self.0.borrow_mut();
        state.ready_state = ready_state;
        state.notify(PlayerEvent::ReadyStateChanged);
    }

    pub fn set_duration(&self, duration: f64) {
        let mut state = self.0.borrow_mut();
        state.duration = duration;
        state.notify(PlayerEvent::DurationChanged);
    }

    pub fn set_current_time(&self, time: f64) {
        let mut state = self.0.borrow_mut();
        state.current_time = time;
        state.notify(PlayerEvent::TimeChanged);
    }

    /// Plays through to the end of the resource.
    pub fn reach_end(&self) {
        let mut state = self.0.borrow_mut();
        state.current_time = state.duration;
        state.notify(PlayerEvent::TimeChanged);
    }

    /// Makes later seeks stay pending until `finish_seek`.
    pub fn hold_seeks(&self) {
        self.0.borrow_mut().complete_seeks = false;
    }

    pub fn finish_seek(&self) {
        let mut state = self.0.borrow_mut();
        state.seeking = false;
        state.notify(PlayerEvent::TimeChanged);
    }

    pub fn set_buffered(&self, buffered: TimeRanges) {
        self.0.borrow_mut().buffered = buffered;
    }

    pub fn set_seekable(&self, seekable: TimeRanges) {
        self.0.borrow_mut().seekable = seekable;
    }

    /// The next progress check will see new data.
    pub fn report_loading_progress(&self) {
        self.0.borrow_mut().loading_progress = true;
    }

    pub fn set_natural_size(&self, width: i32, height: i32) {
        let mut state = self.0.borrow_mut();
        state.natural_size = Size2D::new(width, height);
        state.has_video = true;
        state.notify(PlayerEvent::SizeChanged);
    }

    pub fn set_has_audio(&self, has_audio: bool) {
        self.0.borrow_mut().has_audio = has_audio;
    }

    pub fn set_has_closed_captions(&self, has_closed_captions: bool) {
        self.0.borrow_mut().has_closed_captions = has_closed_captions;
    }

    pub fn add_text_track(&self, info: InbandTextTrackInfo) {
        self.0
            .borrow()
            .notify(PlayerEvent::InbandTextTrackAdded(info));
    }

    pub fn remove_text_track(&self, track: InbandTrackId) {
        self.0
            .borrow()
            .notify(PlayerEvent::InbandTextTrackRemoved(track));
    }

    pub fn add_generic_cue(&self, track: InbandTrackId, cue: GenericCueData) {
        self.0
            .borrow()
            .notify(PlayerEvent::GenericCueAdded(track, cue));
    }

    pub fn update_generic_cue(&self, track: InbandTrackId, cue: GenericCueData) {
        self.0
            .borrow()
            .notify(PlayerEvent::GenericCueUpdated(track, cue));
    }

    pub fn remove_generic_cue(&self, track: InbandTrackId, cue: CueDataId) {
        self.0
            .borrow()
            .notify(PlayerEvent::GenericCueRemoved(track, cue));
    }

    pub fn add_webvtt_cue(&self, track: InbandTrackId, cue: WebVttCueData) {
        self.0
            .borrow()
            .notify(PlayerEvent::WebVttCueAdded(track, cue));
    }
}
