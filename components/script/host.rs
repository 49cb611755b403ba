/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Capabilities a media element needs from the page that embeds it.

use std::cell::Cell;
use std::rc::Rc;

use url::Url;

/// Decides whether a media element may fetch a URL.
pub trait LoadPolicy {
    fn is_safe_to_load_url(&self, url: &Url) -> bool;
}

/// Allows a fixed set of URL schemes.
pub struct SchemeLoadPolicy {
    schemes: Vec<String>,
}

impl SchemeLoadPolicy {
    pub fn new(schemes: &[&str]) -> SchemeLoadPolicy {
        SchemeLoadPolicy {
            schemes: schemes.iter().map(|scheme| scheme.to_ascii_lowercase()).collect(),
        }
    }
}

impl Default for SchemeLoadPolicy {
    fn default() -> SchemeLoadPolicy {
        SchemeLoadPolicy::new(&["http", "https", "data", "blob", "file"])
    }
}

impl LoadPolicy for SchemeLoadPolicy {
    fn is_safe_to_load_url(&self, url: &Url) -> bool {
        self.schemes.iter().any(|scheme| scheme == url.scheme())
    }
}

/// Reports whether script is running in response to a user action.
pub trait UserGestureIndicator {
    fn processing_user_gesture(&self) -> bool;
}

/// A gesture indicator the embedder flips by hand.
#[derive(Default)]
pub struct UserGestureState {
    processing: Cell<bool>,
}

impl UserGestureState {
    pub fn set_processing_user_gesture(&self, processing: bool) {
        self.processing.set(processing);
    }
}

impl UserGestureIndicator for UserGestureState {
    fn processing_user_gesture(&self) -> bool {
        self.processing.get()
    }
}

/// Evaluates the `media` attribute of `<source>` elements.
pub trait MediaQueryEvaluator {
    fn matches(&self, query: &str) -> bool;
}

/// Treats every query as matching.
pub struct MatchAllMediaQueries;

impl MediaQueryEvaluator for MatchAllMediaQueries {
    fn matches(&self, _query: &str) -> bool {
        true
    }
}

/// Everything a media element consults about its embedding page.
#[derive(Clone)]
pub struct PlaybackHost {
    pub load_policy: Rc<dyn LoadPolicy>,
    pub user_gesture: Rc<dyn UserGestureIndicator>,
    pub media_queries: Rc<dyn MediaQueryEvaluator>,
    pub private_browsing: bool,
}

impl PlaybackHost {
    pub fn new(user_gesture: Rc<dyn UserGestureIndicator>) -> PlaybackHost {
        PlaybackHost {
            load_policy: Rc::new(SchemeLoadPolicy::default()),
            user_gesture,
            media_queries: Rc::new(MatchAllMediaQueries),
            private_browsing: false,
        }
    }

    pub fn processing_user_gesture(&self) -> bool {
        self.user_gesture.processing_user_gesture()
    }
}

impl Default for PlaybackHost {
    fn default() -> PlaybackHost {
        PlaybackHost::new(Rc::new(UserGestureState::default()))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use url::Url;

    use super::{LoadPolicy, PlaybackHost, SchemeLoadPolicy, UserGestureState};

    #[test]
    fn scheme_policy_rejects_unknown_schemes() {
        let policy = SchemeLoadPolicy::default();
        assert!(policy.is_safe_to_load_url(&Url::parse("https://example.com/a.webm").unwrap()));
        assert!(policy.is_safe_to_load_url(&Url::parse("data:video/webm,").unwrap()));
        assert!(!policy.is_safe_to_load_url(&Url::parse("javascript:alert(1)").unwrap()));
    }

    #[test]
    fn host_reads_the_shared_gesture_state() {
        let gesture = Rc::new(UserGestureState::default());
        let host = PlaybackHost::new(gesture.clone());
        assert!(!host.processing_user_gesture());
        gesture.set_processing_user_gesture(true);
        assert!(host.processing_user_gesture());
    }
}
