/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crossbeam_channel::{Receiver, Sender};
use euclid::default::Size2D;
use log::{debug, trace, warn};
use media_traits::{
    ContentType, EngineEventSender, EngineInstanceId, EngineMessage, MediaEngine,
    MediaEngineSupportParameters, NetworkState, NullMediaEngine, PlayerEvent, Preload,
    ReadyState, TimeRanges,
};
use url::Url;

use crate::client::MediaPlayerClient;
use crate::mime_registry::{infer_mime_type, is_generic_mime_type};
use crate::registry::{EngineId, EngineRegistry};

/// Work the player defers to its next pump instead of doing it from inside
/// the notification that triggered it.
#[derive(Debug)]
enum PlayerTask {
    ReloadWithNextEngine(EngineInstanceId),
}

/// Owns the engine playing one media element's resource and picks which
/// installed engine that is.
///
/// The player keeps its own copy of the settings it forwards (volume, mute,
/// rate, preload...) so they survive engine replacement.
pub struct MediaPlayer {
    registry: Rc<EngineRegistry>,
    client: Weak<dyn MediaPlayerClient>,

    engine: RefCell<Box<dyn MediaEngine>>,
    current_engine: Cell<Option<EngineId>>,
    instance: Cell<EngineInstanceId>,
    next_instance: Cell<u64>,
    event_sender: Sender<EngineMessage>,
    event_receiver: Receiver<EngineMessage>,
    pending_tasks: RefCell<VecDeque<PlayerTask>>,

    url: RefCell<Option<Url>>,
    content_mime_type: RefCell<String>,
    content_type_codecs: RefCell<String>,
    key_system: RefCell<String>,
    content_mime_type_was_inferred_from_extension: Cell<bool>,

    preload: Cell<Preload>,
    private_browsing: Cell<bool>,
    preserves_pitch: Cell<bool>,
    should_prepare_to_render: Cell<bool>,
    volume: Cell<f64>,
    muted: Cell<bool>,
    rate: Cell<f64>,
}

impl MediaPlayer {
    pub fn new(registry: Rc<EngineRegistry>, client: Weak<dyn MediaPlayerClient>) -> MediaPlayer {
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        MediaPlayer {
            registry,
            client,
            engine: RefCell::new(Box::new(NullMediaEngine)),
            current_engine: Cell::new(None),
            instance: Cell::new(EngineInstanceId(0)),
            next_instance: Cell::new(1),
            event_sender,
            event_receiver,
            pending_tasks: RefCell::new(VecDeque::new()),
            url: RefCell::new(None),
            content_mime_type: RefCell::new(String::new()),
            content_type_codecs: RefCell::new(String::new()),
            key_system: RefCell::new(String::new()),
            content_mime_type_was_inferred_from_extension: Cell::new(false),
            preload: Cell::new(Preload::Auto),
            private_browsing: Cell::new(false),
            preserves_pitch: Cell::new(true),
            should_prepare_to_render: Cell::new(false),
            volume: Cell::new(1.0),
            muted: Cell::new(false),
            rate: Cell::new(1.0),
        }
    }

    pub fn registry(&self) -> &Rc<EngineRegistry> {
        &self.registry
    }

    /// Starts loading `url`. Returns whether an engine was found for it.
    pub fn load(&self, url: &Url, content_type: &ContentType, key_system: &str) -> bool {
        *self.url.borrow_mut() = Some(url.clone());
        *self.content_mime_type.borrow_mut() = content_type.mime_type().to_owned();
        *self.content_type_codecs.borrow_mut() = content_type.codecs().to_owned();
        *self.key_system.borrow_mut() = key_system.to_ascii_lowercase();
        self.content_mime_type_was_inferred_from_extension.set(false);
        self.pending_tasks.borrow_mut().clear();

        // If the MIME type is missing or is not meaningful, try to figure it out from the URL.
        let needs_inference = {
            let mime_type = self.content_mime_type.borrow();
            mime_type.is_empty() || is_generic_mime_type(&mime_type)
        };
        if needs_inference {
            if let Some(inferred) = infer_mime_type(url) {
                debug!("Inferred type {} for {}", inferred.mime_type, url);
                *self.content_mime_type.borrow_mut() = inferred.mime_type;
                self.content_mime_type_was_inferred_from_extension
                    .set(inferred.from_extension);
            }
        }

        self.load_with_next_media_engine(None);
        self.current_engine.get().is_some()
    }

    fn support_parameters(&self) -> MediaEngineSupportParameters {
        MediaEngineSupportParameters {
            mime_type: self.content_mime_type.borrow().clone(),
            codecs: self.content_type_codecs.borrow().clone(),
            key_system: self.key_system.borrow().clone(),
            url: self.url.borrow().clone(),
        }
    }

    /// The engine to try after `current`. A type guessed from the file
    /// extension is not trusted to rule engines out, so in that case, and
    /// when there is no type at all, engines are tried in order.
    fn select_engine(&self, current: Option<EngineId>) -> Option<EngineId> {
        let parameters = self.support_parameters();
        let engine = self
            .registry
            .best_media_engine_for_type_and_codecs(&parameters, current);
        if engine.is_some() {
            return engine;
        }
        if parameters.mime_type.is_empty() ||
            self.content_mime_type_was_inferred_from_extension.get()
        {
            return self.registry.next_media_engine(current);
        }
        None
    }

    fn next_instance_id(&self) -> EngineInstanceId {
        let id = self.next_instance.get();
        self.next_instance.set(id + 1);
        EngineInstanceId(id)
    }

    fn install_engine(&self, engine: Box<dyn MediaEngine>, instance: EngineInstanceId) {
        *self.engine.borrow_mut() = engine;
        self.instance.set(instance);
    }

    fn load_with_next_media_engine(&self, current: Option<EngineId>) {
        let selected = self.select_engine(current);
        let factory = selected.and_then(|engine| self.registry.factory(engine));

        let Some((selected, factory)) = selected.zip(factory) else {
            debug!(
                "No media engine can play {:?} ({:?})",
                self.content_mime_type.borrow(),
                self.url.borrow().as_ref().map(Url::as_str)
            );
            self.current_engine.set(None);
            let instance = self.next_instance_id();
            self.install_engine(Box::new(NullMediaEngine), instance);
            if let Some(client) = self.client.upgrade() {
                client.media_player_engine_updated();
                client.media_player_resource_not_supported();
            }
            return;
        };

        if self.current_engine.get() != Some(selected) {
            debug!("Switching to media engine {}", factory.name());
            self.current_engine.set(Some(selected));
            let instance = self.next_instance_id();
            let engine = factory.create(EngineEventSender::new(instance, self.event_sender.clone()));
            self.install_engine(engine, instance);
            if let Some(client) = self.client.upgrade() {
                client.media_player_engine_updated();
            }
            self.apply_cached_settings();
        }

        let url = self.url.borrow().clone();
        let key_system = self.key_system.borrow().clone();
        if let Some(url) = url {
            if let Err(error) = self.engine.borrow_mut().load(&url, &key_system) {
                warn!("Could not load media {}: {:?}", url, error);
            }
        }
    }

    fn apply_cached_settings(&self) {
        let mut engine = self.engine.borrow_mut();
        engine.set_private_browsing_mode(self.private_browsing.get());
        engine.set_preload(self.preload.get());
        engine.set_preserves_pitch(self.preserves_pitch.get());
        if self.should_prepare_to_render.get() {
            engine.prepare_for_rendering();
        }
        if let Err(error) = engine.set_rate(self.rate.get()) {
            warn!("Could not restore playback rate {:?}", error);
        }
        if engine.supports_muting() {
            if let Err(error) = engine.set_muted(self.muted.get()) {
                warn!("Could not restore mute state {:?}", error);
            }
        }
        let volume = if self.muted.get() && !engine.supports_muting() {
            0.
        } else {
            self.volume.get()
        };
        if let Err(error) = engine.set_volume(volume) {
            warn!("Could not restore volume {:?}", error);
        }
    }

    /// Drops the current engine and everything it had queued. Used when the
    /// owner starts over with a new resource.
    pub fn reset(&self) {
        self.engine.borrow_mut().cancel_load();
        self.pending_tasks.borrow_mut().clear();
        self.current_engine.set(None);
        let instance = self.next_instance_id();
        self.install_engine(Box::new(NullMediaEngine), instance);
    }

    pub fn cancel_load(&self) {
        self.pending_tasks.borrow_mut().clear();
        self.engine.borrow_mut().cancel_load();
    }

    pub fn current_engine_name(&self) -> Option<String> {
        self.current_engine
            .get()
            .and_then(|engine| self.registry.engine_name(engine))
    }

    pub fn url(&self) -> Option<Url> {
        self.url.borrow().clone()
    }

    pub fn content_mime_type(&self) -> String {
        self.content_mime_type.borrow().clone()
    }

    /// Delivers everything queued by the engine and any deferred player work.
    /// Returns whether anything was processed.
    pub fn process_engine_events(&self) -> bool {
        let mut processed = false;
        loop {
            let task = self.pending_tasks.borrow_mut().pop_front();
            if let Some(task) = task {
                processed = true;
                self.run_task(task);
                continue;
            }
            let Ok(message) = self.event_receiver.try_recv() else {
                break;
            };
            processed = true;
            if message.instance != self.instance.get() {
                trace!(
                    "Dropping {:?} from replaced engine {:?}",
                    message.event, message.instance
                );
                continue;
            }
            self.handle_player_event(message.event);
        }
        processed
    }

    fn run_task(&self, task: PlayerTask) {
        match task {
            PlayerTask::ReloadWithNextEngine(instance) => {
                if instance != self.instance.get() {
                    return;
                }
                self.engine.borrow_mut().cancel_load();
                self.load_with_next_media_engine(self.current_engine.get());
            },
        }
    }

    fn handle_player_event(&self, event: PlayerEvent) {
        trace!("Player event {:?}", event);
        if event == PlayerEvent::NetworkStateChanged && self.should_retry_with_next_engine() {
            self.pending_tasks
                .borrow_mut()
                .push_back(PlayerTask::ReloadWithNextEngine(self.instance.get()));
            return;
        }

        let Some(client) = self.client.upgrade() else {
            return;
        };
        match event {
            PlayerEvent::NetworkStateChanged => client.media_player_network_state_changed(),
            PlayerEvent::ReadyStateChanged => client.media_player_ready_state_changed(),
            PlayerEvent::TimeChanged => client.media_player_time_changed(),
            PlayerEvent::DurationChanged => client.media_player_duration_changed(),
            PlayerEvent::RateChanged => client.media_player_rate_changed(),
            PlayerEvent::PlaybackStateChanged => client.media_player_playback_state_changed(),
            PlayerEvent::VolumeChanged => client.media_player_volume_changed(),
            PlayerEvent::MuteChanged => client.media_player_mute_changed(),
            PlayerEvent::SizeChanged => client.media_player_size_changed(),
            PlayerEvent::Repaint => client.media_player_repaint(),
            PlayerEvent::InbandTextTrackAdded(info) => client.media_player_did_add_text_track(info),
            PlayerEvent::InbandTextTrackRemoved(track) => {
                client.media_player_did_remove_text_track(track)
            },
            PlayerEvent::GenericCueAdded(track, cue) => {
                client.media_player_generic_cue_added(track, cue)
            },
            PlayerEvent::GenericCueUpdated(track, cue) => {
                client.media_player_generic_cue_updated(track, cue)
            },
            PlayerEvent::GenericCueRemoved(track, cue) => {
                client.media_player_generic_cue_removed(track, cue)
            },
            PlayerEvent::WebVttCueAdded(track, cue) => {
                client.media_player_webvtt_cue_added(track, cue)
            },
        }
    }

    /// An engine that fails before it knows anything about the resource is
    /// replaced by the next candidate, if there is one, instead of reporting
    /// the failure.
    fn should_retry_with_next_engine(&self) -> bool {
        let (network_state, ready_state) = {
            let engine = self.engine.borrow();
            (engine.network_state(), engine.ready_state())
        };
        if !network_state.is_error() ||
            ready_state >= ReadyState::HaveMetadata ||
            self.registry.engine_count() <= 1
        {
            return false;
        }
        match self.select_engine(self.current_engine.get()) {
            Some(next) => {
                debug!(
                    "Media engine failed with {:?}, retrying with {:?}",
                    network_state,
                    self.registry.engine_name(next)
                );
                true
            },
            None => false,
        }
    }

    pub fn prepare_to_play(&self) {
        self.engine.borrow_mut().prepare_to_play();
    }

    pub fn play(&self) {
        if let Err(error) = self.engine.borrow_mut().play() {
            warn!("Could not play media {:?}", error);
        }
    }

    pub fn pause(&self) {
        if let Err(error) = self.engine.borrow_mut().pause() {
            warn!("Could not pause media {:?}", error);
        }
    }

    pub fn paused(&self) -> bool {
        self.engine.borrow().paused()
    }

    pub fn seek(&self, time: f64) {
        let time = self.engine.borrow().media_time_for_time_value(time);
        if let Err(error) = self.engine.borrow_mut().seek(time) {
            warn!("Seek to {} failed {:?}", time, error);
        }
    }

    pub fn seeking(&self) -> bool {
        self.engine.borrow().seeking()
    }

    pub fn current_time(&self) -> f64 {
        self.engine.borrow().current_time()
    }

    pub fn duration(&self) -> f64 {
        self.engine.borrow().duration()
    }

    pub fn start_time(&self) -> f64 {
        self.engine.borrow().start_time()
    }

    pub fn media_time_for_time_value(&self, time: f64) -> f64 {
        self.engine.borrow().media_time_for_time_value(time)
    }

    pub fn rate(&self) -> f64 {
        self.rate.get()
    }

    pub fn set_rate(&self, rate: f64) {
        self.rate.set(rate);
        if let Err(error) = self.engine.borrow_mut().set_rate(rate) {
            warn!("Could not set playback rate {:?}", error);
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume.get()
    }

    pub fn set_volume(&self, volume: f64) {
        self.volume.set(volume);
        let mut engine = self.engine.borrow_mut();
        if engine.supports_muting() || !self.muted.get() {
            if let Err(error) = engine.set_volume(volume) {
                warn!("Could not set volume {:?}", error);
            }
        }
    }

    pub fn muted(&self) -> bool {
        self.muted.get()
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
        let mut engine = self.engine.borrow_mut();
        let result = if engine.supports_muting() {
            engine.set_muted(muted)
        } else {
            engine.set_volume(if muted { 0. } else { self.volume.get() })
        };
        if let Err(error) = result {
            warn!("Could not set mute state {:?}", error);
        }
    }

    pub fn preload(&self) -> Preload {
        self.preload.get()
    }

    pub fn set_preload(&self, preload: Preload) {
        self.preload.set(preload);
        self.engine.borrow_mut().set_preload(preload);
    }

    pub fn set_private_browsing_mode(&self, private_browsing: bool) {
        self.private_browsing.set(private_browsing);
        self.engine
            .borrow_mut()
            .set_private_browsing_mode(private_browsing);
    }

    pub fn preserves_pitch(&self) -> bool {
        self.preserves_pitch.get()
    }

    pub fn set_preserves_pitch(&self, preserves_pitch: bool) {
        self.preserves_pitch.set(preserves_pitch);
        self.engine.borrow_mut().set_preserves_pitch(preserves_pitch);
    }

    pub fn prepare_for_rendering(&self) {
        self.should_prepare_to_render.set(true);
        self.engine.borrow_mut().prepare_for_rendering();
    }

    pub fn network_state(&self) -> NetworkState {
        self.engine.borrow().network_state()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.engine.borrow().ready_state()
    }

    pub fn buffered(&self) -> TimeRanges {
        self.engine.borrow().buffered()
    }

    pub fn seekable(&self) -> TimeRanges {
        self.engine.borrow().seekable()
    }

    pub fn max_time_seekable(&self) -> f64 {
        let seekable = self.seekable();
        seekable
            .length()
            .checked_sub(1)
            .and_then(|last| seekable.end(last).ok())
            .unwrap_or(0.)
    }

    pub fn did_loading_progress(&self) -> bool {
        self.engine.borrow_mut().did_loading_progress()
    }

    pub fn natural_size(&self) -> Size2D<i32> {
        self.engine.borrow().natural_size()
    }

    pub fn has_video(&self) -> bool {
        self.engine.borrow().has_video()
    }

    pub fn has_audio(&self) -> bool {
        self.engine.borrow().has_audio()
    }

    pub fn has_closed_captions(&self) -> bool {
        self.engine.borrow().has_closed_captions()
    }

    pub fn set_closed_captions_visible(&self, visible: bool) {
        self.engine.borrow_mut().set_closed_captions_visible(visible);
    }

    pub fn supports_fullscreen(&self) -> bool {
        self.engine.borrow().supports_fullscreen()
    }

    pub fn supports_scanning(&self) -> bool {
        self.engine.borrow().supports_scanning()
    }

    pub fn supports_save(&self) -> bool {
        self.engine.borrow().supports_save()
    }

    pub fn has_single_security_origin(&self) -> bool {
        self.engine.borrow().has_single_security_origin()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use media_dummy::{DummyEngineFactory, EngineCall};
    use media_traits::{ContentType, MediaEngineFactory, NetworkState, ReadyState, SupportsType};
    use url::Url;

    use super::MediaPlayer;
    use crate::client::MediaPlayerClient;
    use crate::registry::EngineRegistry;

    #[derive(Default)]
    struct RecordingClient {
        notifications: RefCell<Vec<&'static str>>,
    }

    impl MediaPlayerClient for RecordingClient {
        fn media_player_network_state_changed(&self) {
            self.notifications.borrow_mut().push("network");
        }
        fn media_player_ready_state_changed(&self) {
            self.notifications.borrow_mut().push("ready");
        }
        fn media_player_engine_updated(&self) {
            self.notifications.borrow_mut().push("engine");
        }
        fn media_player_resource_not_supported(&self) {
            self.notifications.borrow_mut().push("unsupported");
        }
    }

    fn player_with(
        engines: Vec<Rc<DummyEngineFactory>>,
    ) -> (MediaPlayer, Rc<RecordingClient>) {
        let client = Rc::new(RecordingClient::default());
        let weak: Weak<dyn MediaPlayerClient> = Rc::downgrade(&client) as Weak<RecordingClient>;
        let registry = EngineRegistry::with_engines(
            engines
                .into_iter()
                .map(|engine| engine as Rc<dyn MediaEngineFactory>)
                .collect(),
        );
        (MediaPlayer::new(Rc::new(registry), weak), client)
    }

    fn webm_engine(name: &str) -> Rc<DummyEngineFactory> {
        Rc::new(DummyEngineFactory::new(name).with_type("video/webm", SupportsType::IsSupported))
    }

    fn url(path: &str) -> Url {
        Url::parse("https://example.com/").unwrap().join(path).unwrap()
    }

    #[test]
    fn failed_engines_are_tried_once_each_in_order() {
        let engines = vec![webm_engine("a"), webm_engine("b"), webm_engine("c")];
        let (player, client) = player_with(engines.clone());
        assert!(player.load(&url("movie.webm"), &ContentType::new("video/webm"), ""));
        assert_eq!(player.current_engine_name().as_deref(), Some("a"));

        for (index, engine) in engines.iter().enumerate() {
            let handle = engine.last_player().unwrap();
            handle.set_network_state(NetworkState::FormatError);
            player.process_engine_events();
            if index + 1 < engines.len() {
                assert_eq!(
                    player.current_engine_name().as_deref(),
                    Some(engines[index + 1].name())
                );
                assert!(!client.notifications.borrow().contains(&"network"));
            }
        }

        // The last failure reaches the client, and nothing was created twice.
        assert_eq!(player.current_engine_name().as_deref(), Some("c"));
        assert_eq!(client.notifications.borrow().last(), Some(&"network"));
        for engine in &engines {
            assert_eq!(engine.players_created(), 1);
        }
    }

    #[test]
    fn failure_after_metadata_is_not_retried() {
        let engines = vec![webm_engine("a"), webm_engine("b")];
        let (player, client) = player_with(engines.clone());
        player.load(&url("movie.webm"), &ContentType::new("video/webm"), "");
        let handle = engines[0].last_player().unwrap();
        handle.set_ready_state(ReadyState::HaveMetadata);
        handle.set_network_state(NetworkState::DecodeError);
        player.process_engine_events();
        assert_eq!(player.current_engine_name().as_deref(), Some("a"));
        assert_eq!(engines[1].players_created(), 0);
        assert_eq!(*client.notifications.borrow(), vec!["engine", "ready", "network"]);
    }

    #[test]
    fn unsupported_type_falls_back_to_null_engine() {
        let (player, client) = player_with(vec![webm_engine("a")]);
        assert!(!player.load(&url("song.mp3"), &ContentType::new("audio/mpeg"), ""));
        assert_eq!(player.current_engine_name(), None);
        assert_eq!(*client.notifications.borrow(), vec!["engine", "unsupported"]);
        assert_eq!(player.network_state(), NetworkState::Empty);
        player.play();
        assert!(player.paused());
    }

    #[test]
    fn generic_type_is_inferred_from_extension() {
        let mp4 = Rc::new(DummyEngineFactory::new("mp4").with_type("video/mp4", SupportsType::IsSupported));
        let (player, _client) = player_with(vec![webm_engine("a"), mp4]);
        assert!(player.load(&url("clip.mp4"), &ContentType::new("application/octet-stream"), ""));
        assert_eq!(player.content_mime_type(), "video/mp4");
        assert_eq!(player.current_engine_name().as_deref(), Some("mp4"));
    }

    #[test]
    fn events_from_replaced_engines_are_dropped() {
        let engines = vec![webm_engine("a"), webm_engine("b")];
        let (player, client) = player_with(engines.clone());
        player.load(&url("movie.webm"), &ContentType::new("video/webm"), "");
        let old = engines[0].last_player().unwrap();
        player.reset();
        old.set_ready_state(ReadyState::HaveEnoughData);
        player.process_engine_events();
        assert_eq!(*client.notifications.borrow(), vec!["engine"]);
    }

    #[test]
    fn cached_settings_follow_engine_switches() {
        let engines = vec![webm_engine("a"), webm_engine("b")];
        let (player, _client) = player_with(engines.clone());
        player.set_volume(0.5);
        player.set_rate(2.0);
        player.load(&url("movie.webm"), &ContentType::new("video/webm"), "");
        engines[0]
            .last_player()
            .unwrap()
            .set_network_state(NetworkState::NetworkError);
        player.process_engine_events();

        let calls = engines[1].last_player().unwrap().calls();
        assert!(calls.contains(&EngineCall::SetRate(2.0)));
        assert!(calls.contains(&EngineCall::SetVolume(0.5)));
        assert_eq!(player.volume(), 0.5);
    }

    #[test]
    fn mute_without_engine_support_zeroes_volume() {
        let engines = vec![webm_engine("a")];
        let (player, _client) = player_with(engines.clone());
        player.load(&url("movie.webm"), &ContentType::new("video/webm"), "");
        player.set_volume(0.8);
        player.set_muted(true);
        player.set_volume(0.3);
        player.set_muted(false);
        let calls = engines[0].last_player().unwrap().calls();
        let volumes: Vec<_> = calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::SetVolume(volume) => Some(*volume),
                _ => None,
            })
            .collect();
        assert_eq!(volumes, vec![1.0, 0.8, 0.0, 0.3]);
    }
}
