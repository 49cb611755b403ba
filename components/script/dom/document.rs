/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::debug;
use media_player::EngineRegistry;
use url::Url;

use crate::dom::htmlmediaelement::HTMLMediaElement;
use crate::dom::mediacontroller::MediaController;
use crate::event_loop::EventLoop;
use crate::host::PlaybackHost;

/// Something waiting for the page to allow media to start.
pub trait MediaCanStartListener {
    fn media_can_start(&self);
}

/// The part of a document its media elements interact with: where URLs
/// resolve, which engines exist, and whether media may start yet.
pub struct Document {
    event_loop: Rc<EventLoop>,
    registry: Rc<EngineRegistry>,
    host: PlaybackHost,
    base_url: Url,
    can_start_media: Cell<bool>,
    media_can_start_listeners: RefCell<Vec<Weak<dyn MediaCanStartListener>>>,
    media_elements: RefCell<Vec<Weak<HTMLMediaElement>>>,
    media_volume: Cell<f64>,
}

impl Document {
    pub fn new(
        event_loop: &Rc<EventLoop>,
        registry: Rc<EngineRegistry>,
        host: PlaybackHost,
        base_url: Url,
    ) -> Rc<Document> {
        Rc::new(Document {
            event_loop: event_loop.clone(),
            registry,
            host,
            base_url,
            can_start_media: Cell::new(true),
            media_can_start_listeners: RefCell::new(Vec::new()),
            media_elements: RefCell::new(Vec::new()),
            media_volume: Cell::new(1.),
        })
    }

    pub fn event_loop(&self) -> &Rc<EventLoop> {
        &self.event_loop
    }

    pub fn registry(&self) -> &Rc<EngineRegistry> {
        &self.registry
    }

    pub fn host(&self) -> &PlaybackHost {
        &self.host
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `value` against the document base URL.
    pub fn url_for(&self, value: &str) -> Option<Url> {
        self.base_url.join(value).ok()
    }

    pub fn can_start_media(&self) -> bool {
        self.can_start_media.get()
    }

    /// Allowing media to start wakes every waiting listener, one at a time,
    /// for as long as starting stays allowed.
    pub fn set_can_start_media(&self, can_start_media: bool) {
        if self.can_start_media.get() == can_start_media {
            return;
        }
        debug!("Document can start media: {}", can_start_media);
        self.can_start_media.set(can_start_media);
        while self.can_start_media.get() {
            let listener = {
                let mut listeners = self.media_can_start_listeners.borrow_mut();
                if listeners.is_empty() {
                    break;
                }
                listeners.remove(0)
            };
            if let Some(listener) = listener.upgrade() {
                listener.media_can_start();
            }
        }
    }

    pub fn add_media_can_start_listener(&self, listener: Weak<dyn MediaCanStartListener>) {
        self.media_can_start_listeners.borrow_mut().push(listener);
    }

    pub fn remove_media_can_start_listener(&self, listener: &Weak<dyn MediaCanStartListener>) {
        self.media_can_start_listeners
            .borrow_mut()
            .retain(|existing| !existing.ptr_eq(listener));
    }

    pub fn media_can_start_listener_count(&self) -> usize {
        self.media_can_start_listeners.borrow().len()
    }

    pub(crate) fn register_media_element(&self, element: Weak<HTMLMediaElement>) {
        self.media_elements.borrow_mut().push(element);
    }

    /// Live media elements created for this document, in creation order.
    pub fn media_elements(&self) -> Vec<Rc<HTMLMediaElement>> {
        let mut elements = self.media_elements.borrow_mut();
        elements.retain(|element| element.strong_count() > 0);
        elements.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn create_media_controller(&self) -> Rc<MediaController> {
        MediaController::new(&self.event_loop)
    }

    /// Page-wide volume multiplier applied on top of each element's volume.
    pub fn media_volume(&self) -> f64 {
        self.media_volume.get()
    }

    pub fn set_media_volume(&self, volume: f64) {
        if self.media_volume.get() == volume {
            return;
        }
        self.media_volume.set(volume);
        for element in self.media_elements() {
            element.media_volume_did_change();
        }
    }
}
