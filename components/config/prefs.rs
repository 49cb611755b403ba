/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

static PREFERENCES: LazyLock<RwLock<Preferences>> =
    LazyLock::new(|| RwLock::new(Preferences::default()));

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Preferences {
    /// Minimum spacing between periodic `timeupdate` events.
    pub media_timeupdate_interval_ms: u64,
    pub media_progress_interval_ms: u64,
    /// How long a load may go without new data before `stalled` fires.
    pub media_stalled_timeout_ms: u64,
    pub media_load_requires_user_gesture: bool,
    pub media_rate_change_requires_user_gesture: bool,
    pub media_fullscreen_requires_user_gesture: bool,
    pub media_require_page_consent_to_load: bool,
    pub media_captions_enabled_by_default: bool,
}

impl Default for Preferences {
    fn default() -> Preferences {
        Preferences {
            media_timeupdate_interval_ms: 250,
            media_progress_interval_ms: 350,
            media_stalled_timeout_ms: 3000,
            media_load_requires_user_gesture: false,
            media_rate_change_requires_user_gesture: false,
            media_fullscreen_requires_user_gesture: true,
            media_require_page_consent_to_load: true,
            media_captions_enabled_by_default: false,
        }
    }
}

impl Preferences {
    pub fn timeupdate_interval(&self) -> Duration {
        Duration::from_millis(self.media_timeupdate_interval_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.media_progress_interval_ms)
    }

    pub fn stalled_timeout(&self) -> Duration {
        Duration::from_millis(self.media_stalled_timeout_ms)
    }
}

#[derive(Debug)]
pub enum PrefError {
    Json(serde_json::Error),
}

impl fmt::Display for PrefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PrefError::Json(ref error) => write!(f, "invalid preferences file: {}", error),
        }
    }
}

impl std::error::Error for PrefError {}

pub fn get() -> Preferences {
    PREFERENCES.read().clone()
}

pub fn set(preferences: Preferences) {
    *PREFERENCES.write() = preferences;
}

/// Parses a JSON object of preferences. Keys that are absent keep their
/// default value.
pub fn read_prefs_from_json(json: &str) -> Result<Preferences, PrefError> {
    serde_json::from_str(json).map_err(|error| {
        warn!("Ignoring media preferences: {}", error);
        PrefError::Json(error)
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Preferences, read_prefs_from_json};
    use crate::{pref, set_pref};

    #[test]
    fn missing_keys_keep_defaults() {
        let preferences =
            read_prefs_from_json(r#"{ "media_timeupdate_interval_ms": 100 }"#).unwrap();
        assert_eq!(preferences.timeupdate_interval(), Duration::from_millis(100));
        assert_eq!(preferences.stalled_timeout(), Duration::from_secs(3));
        assert!(preferences.media_require_page_consent_to_load);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(read_prefs_from_json("{ media_timeupdate_interval_ms").is_err());
    }

    #[test]
    fn macros_read_and_write_the_global_preferences() {
        assert_eq!(pref!(media_progress_interval_ms), 350);
        set_pref!(media_captions_enabled_by_default, true);
        assert!(pref!(media_captions_enabled_by_default));
        crate::prefs::set(Preferences::default());
        assert!(!pref!(media_captions_enabled_by_default));
    }
}
