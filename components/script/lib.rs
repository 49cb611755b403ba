/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]
#![doc = "The script crate contains the media elements of the DOM."]

pub mod clock;
pub mod event_loop;
pub mod host;
pub mod timers;

/// The implementation of the DOM.
pub mod dom {
    /// Glue shared by every DOM interface.
    pub mod bindings {
        pub mod error;
    }

    pub mod document;
    pub mod event;
    pub mod eventtarget;
    pub mod genericeventqueue;
    pub mod htmlmediaelement;
    pub mod htmlsourceelement;
    pub mod inbandtexttrack;
    pub mod loadabletexttrack;
    pub mod mediacontroller;
    pub mod mediacontrollerinterface;
    pub mod mediaerror;
    pub mod texttrack;
    pub mod texttrackcue;
    pub mod texttrackcuelist;
    pub mod texttracklist;
}
