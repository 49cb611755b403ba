/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use media_traits::TimeRangesError;

/// DOM exceptions raised by the media interfaces.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    IndexSize,
    NotFound,
    NotSupported,
    InvalidState,
    Syntax,
}

pub type Fallible<T> = Result<T, Error>;

pub type ErrorResult = Fallible<()>;

impl Error {
    /// The legacy `DOMException` code.
    pub fn code(self) -> u16 {
        match self {
            Error::IndexSize => 1,
            Error::NotFound => 8,
            Error::NotSupported => 9,
            Error::InvalidState => 11,
            Error::Syntax => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Error::IndexSize => "IndexSizeError",
            Error::NotFound => "NotFoundError",
            Error::NotSupported => "NotSupportedError",
            Error::InvalidState => "InvalidStateError",
            Error::Syntax => "SyntaxError",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for Error {}

impl From<TimeRangesError> for Error {
    fn from(error: TimeRangesError) -> Self {
        match error {
            TimeRangesError::EndOlderThanStart | TimeRangesError::OutOfRange => Error::IndexSize,
        }
    }
}
