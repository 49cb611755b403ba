/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

/// <https://html.spec.whatwg.org/multipage/#mediaerror>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum MediaErrorCode {
    Aborted = 1,
    Network = 2,
    Decode = 3,
    SrcNotSupported = 4,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MediaError {
    code: MediaErrorCode,
}

impl MediaError {
    pub const MEDIA_ERR_ABORTED: u16 = MediaErrorCode::Aborted as u16;
    pub const MEDIA_ERR_NETWORK: u16 = MediaErrorCode::Network as u16;
    pub const MEDIA_ERR_DECODE: u16 = MediaErrorCode::Decode as u16;
    pub const MEDIA_ERR_SRC_NOT_SUPPORTED: u16 = MediaErrorCode::SrcNotSupported as u16;

    pub fn new(code: MediaErrorCode) -> MediaError {
        MediaError { code }
    }

    // https://html.spec.whatwg.org/multipage/#dom-mediaerror-code
    pub fn code(&self) -> u16 {
        self.code as u16
    }

    pub fn error_code(&self) -> MediaErrorCode {
        self.code
    }
}
