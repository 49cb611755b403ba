/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

mod client;
pub mod mime_registry;
mod player;
mod registry;

pub use crate::client::MediaPlayerClient;
pub use crate::player::MediaPlayer;
pub use crate::registry::{EngineId, EngineRegistrar, EngineRegistry};
