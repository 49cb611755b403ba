/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use media_dummy::DummyEngineFactory;
use media_player::EngineRegistry;
use media_traits::{MediaEngineFactory, SupportsType};
use script::dom::document::Document;
use script::dom::event::EventType;
use script::dom::eventtarget::EventTarget;
use script::dom::htmlmediaelement::HTMLMediaElement;
use script::event_loop::EventLoop;
use script::host::{PlaybackHost, UserGestureState};
use url::Url;

/// Every event a media element fires on itself.
pub const MEDIA_EVENTS: &[EventType] = &[
    EventType::Abort,
    EventType::CanPlay,
    EventType::CanPlayThrough,
    EventType::DurationChange,
    EventType::Emptied,
    EventType::Ended,
    EventType::Error,
    EventType::LoadedData,
    EventType::LoadedMetadata,
    EventType::LoadStart,
    EventType::Pause,
    EventType::Play,
    EventType::Playing,
    EventType::Progress,
    EventType::RateChange,
    EventType::Seeked,
    EventType::Seeking,
    EventType::Stalled,
    EventType::Suspend,
    EventType::TimeUpdate,
    EventType::VolumeChange,
    EventType::Waiting,
];

/// A document on a virtual-time event loop.
pub struct Page {
    pub event_loop: Rc<EventLoop>,
    pub document: Rc<Document>,
    pub gesture: Rc<UserGestureState>,
}

impl Page {
    pub fn new(engines: &[Rc<DummyEngineFactory>]) -> Page {
        let _ = env_logger::builder().is_test(true).try_init();
        let event_loop = EventLoop::new();
        let engines = engines
            .iter()
            .map(|engine| engine.clone() as Rc<dyn MediaEngineFactory>)
            .collect();
        let gesture = Rc::new(UserGestureState::default());
        let document = Document::new(
            &event_loop,
            Rc::new(EngineRegistry::with_engines(engines)),
            PlaybackHost::new(gesture.clone()),
            Url::parse("https://example.com/media/").unwrap(),
        );
        Page {
            event_loop,
            document,
            gesture,
        }
    }

    pub fn video(&self) -> Rc<HTMLMediaElement> {
        HTMLMediaElement::new(&self.document, true)
    }

    pub fn run(&self) {
        self.event_loop.run_until_idle();
    }
}

/// An engine that can play WebM.
pub fn webm_engine(name: &str) -> Rc<DummyEngineFactory> {
    Rc::new(DummyEngineFactory::new(name).with_type("video/webm", SupportsType::MayBeSupported))
}

/// Records dispatched events as `label:name`, or just `name` without a label.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn listen(&self, target: &EventTarget, label: &str, types: &[EventType]) {
        for type_ in types {
            let log = self.0.clone();
            let label = label.to_owned();
            target.add_event_listener(*type_, move |event| {
                let entry = if label.is_empty() {
                    event.name().to_owned()
                } else {
                    format!("{}:{}", label, event.name())
                };
                log.borrow_mut().push(entry);
            });
        }
    }

    pub fn take(&self) -> Vec<String> {
        self.0.borrow_mut().drain(..).collect()
    }
}
