/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

pub mod prefs;

/// Reads a media preference, e.g. `pref!(media_timeupdate_interval_ms)`.
#[macro_export]
macro_rules! pref {
    ($name:ident) => {
        $crate::prefs::get().$name
    };
}

/// Changes one media preference for the rest of the process.
#[macro_export]
macro_rules! set_pref {
    ($name:ident, $value:expr) => {{
        let mut preferences = $crate::prefs::get();
        preferences.$name = $value;
        $crate::prefs::set(preferences);
    }};
}
