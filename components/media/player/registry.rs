/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use log::debug;
use media_traits::{ContentType, MediaEngineFactory, MediaEngineSupportParameters, SupportsType};
use url::Url;

/// Position of an engine in registration order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EngineId(usize);

impl EngineId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handed to the installer so each backend can add its engines.
#[derive(Default)]
pub struct EngineRegistrar {
    engines: Vec<Rc<dyn MediaEngineFactory>>,
}

impl EngineRegistrar {
    pub fn add_media_engine(&mut self, factory: Rc<dyn MediaEngineFactory>) {
        debug!("Registering media engine {}", factory.name());
        self.engines.push(factory);
    }
}

type EngineInstaller = Box<dyn Fn(&mut EngineRegistrar)>;

/// The set of installed media engines, in registration order.
///
/// Engines are installed lazily the first time anyone asks for them, and
/// only once, unless the registry is `reset`.
pub struct EngineRegistry {
    installer: EngineInstaller,
    engines: RefCell<Vec<Rc<dyn MediaEngineFactory>>>,
    queried: Cell<bool>,
}

impl EngineRegistry {
    pub fn new(installer: impl Fn(&mut EngineRegistrar) + 'static) -> EngineRegistry {
        EngineRegistry {
            installer: Box::new(installer),
            engines: RefCell::new(Vec::new()),
            queried: Cell::new(false),
        }
    }

    /// A registry holding exactly `engines`.
    pub fn with_engines(engines: Vec<Rc<dyn MediaEngineFactory>>) -> EngineRegistry {
        EngineRegistry::new(move |registrar| {
            for engine in &engines {
                registrar.add_media_engine(engine.clone());
            }
        })
    }

    fn installed_media_engines(&self) -> Ref<'_, Vec<Rc<dyn MediaEngineFactory>>> {
        if !self.queried.get() {
            self.queried.set(true);
            let mut registrar = EngineRegistrar::default();
            (self.installer)(&mut registrar);
            *self.engines.borrow_mut() = registrar.engines;
        }
        self.engines.borrow()
    }

    /// Forgets every installed engine. The installer runs again on next use.
    pub fn reset(&self) {
        self.engines.borrow_mut().clear();
        self.queried.set(false);
    }

    pub fn engine_count(&self) -> usize {
        self.installed_media_engines().len()
    }

    pub fn is_available(&self) -> bool {
        self.engine_count() > 0
    }

    pub fn factory(&self, id: EngineId) -> Option<Rc<dyn MediaEngineFactory>> {
        self.installed_media_engines().get(id.0).cloned()
    }

    pub fn engine_name(&self, id: EngineId) -> Option<String> {
        self.factory(id).map(|factory| factory.name().to_owned())
    }

    /// The engine after `current` in registration order, or the first one
    /// when there is no current engine.
    pub fn next_media_engine(&self, current: Option<EngineId>) -> Option<EngineId> {
        let next = current.map_or(0, |current| current.0 + 1);
        (next < self.engine_count()).then_some(EngineId(next))
    }

    /// The engine with the strictly highest support level for `parameters`,
    /// considering only engines registered after `start_after`. Ties keep the
    /// earlier engine.
    pub fn best_media_engine_for_type_and_codecs(
        &self,
        parameters: &MediaEngineSupportParameters,
        start_after: Option<EngineId>,
    ) -> Option<EngineId> {
        if parameters.mime_type.is_empty() {
            return None;
        }

        // 4.8.10.3 MIME types - In the absence of a specification to the contrary, the MIME
        // type "application/octet-stream" when used with parameters, e.g.
        // "application/octet-stream;codecs=theora", is a type that the user agent knows it
        // cannot render.
        if parameters.mime_type == "application/octet-stream" && !parameters.codecs.is_empty() {
            return None;
        }

        let first = start_after.map_or(0, |engine| engine.0 + 1);
        let engines = self.installed_media_engines();
        let mut best = None;
        let mut best_support = SupportsType::IsNotSupported;
        for (index, engine) in engines.iter().enumerate().skip(first) {
            let support = engine.supports_type_and_codecs(parameters);
            if support > best_support {
                best_support = support;
                best = Some(EngineId(index));
            }
        }
        best
    }

    /// The best support level any engine reports for `content_type`.
    ///
    /// <https://html.spec.whatwg.org/multipage/#dom-navigator-canplaytype>
    pub fn supports_type(
        &self,
        content_type: &ContentType,
        key_system: &str,
        url: Option<&Url>,
    ) -> SupportsType {
        // A user agent must not claim support for a generic type.
        if content_type.mime_type() == "application/octet-stream" {
            return SupportsType::IsNotSupported;
        }
        let parameters = MediaEngineSupportParameters {
            mime_type: content_type.mime_type().to_owned(),
            codecs: content_type.codecs().to_owned(),
            key_system: key_system.to_ascii_lowercase(),
            url: url.cloned(),
        };
        match self.best_media_engine_for_type_and_codecs(&parameters, None) {
            Some(engine) => self
                .factory(engine)
                .map_or(SupportsType::IsNotSupported, |factory| {
                    factory.supports_type_and_codecs(&parameters)
                }),
            None => SupportsType::IsNotSupported,
        }
    }

    pub fn supported_types(&self) -> BTreeSet<String> {
        self.installed_media_engines()
            .iter()
            .flat_map(|engine| engine.supported_types())
            .collect()
    }

    pub fn sites_in_media_cache(&self) -> BTreeSet<String> {
        self.installed_media_engines()
            .iter()
            .flat_map(|engine| engine.sites_in_media_cache())
            .collect()
    }

    pub fn clear_media_cache(&self) {
        for engine in self.installed_media_engines().iter() {
            engine.clear_media_cache();
        }
    }

    pub fn clear_media_cache_for_site(&self, site: &str) {
        for engine in self.installed_media_engines().iter() {
            engine.clear_media_cache_for_site(site);
        }
    }
}
