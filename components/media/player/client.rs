/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use media_traits::{
    CueDataId, GenericCueData, InbandTextTrackInfo, InbandTrackId, WebVttCueData,
};

/// The object a `MediaPlayer` reports to. Notifications are delivered on the
/// main thread, one at a time, while the player pumps its engine channel.
pub trait MediaPlayerClient {
    fn media_player_network_state_changed(&self) {}
    fn media_player_ready_state_changed(&self) {}
    fn media_player_time_changed(&self) {}
    fn media_player_duration_changed(&self) {}
    fn media_player_rate_changed(&self) {}
    fn media_player_playback_state_changed(&self) {}
    fn media_player_volume_changed(&self) {}
    fn media_player_mute_changed(&self) {}
    fn media_player_size_changed(&self) {}
    fn media_player_repaint(&self) {}
    /// The player replaced its engine.
    fn media_player_engine_updated(&self) {}
    /// No installed engine can play the resource.
    fn media_player_resource_not_supported(&self) {}

    fn media_player_did_add_text_track(&self, _info: InbandTextTrackInfo) {}
    fn media_player_did_remove_text_track(&self, _track: InbandTrackId) {}
    fn media_player_generic_cue_added(&self, _track: InbandTrackId, _cue: GenericCueData) {}
    fn media_player_generic_cue_updated(&self, _track: InbandTrackId, _cue: GenericCueData) {}
    fn media_player_generic_cue_removed(&self, _track: InbandTrackId, _cue: CueDataId) {}
    fn media_player_webvtt_cue_added(&self, _track: InbandTrackId, _cue: WebVttCueData) {}
}
