/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use mime::Mime;

/// A parsed `type` attribute or `Content-Type` value, e.g.
/// `video/webm; codecs="vp8, vorbis"`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentType {
    raw: String,
    mime_type: String,
    codecs: String,
}

impl ContentType {
    pub fn new(raw: &str) -> ContentType {
        let raw = raw.trim();
        match raw.parse::<Mime>() {
            Ok(mime) => {
                let codecs = mime
                    .get_param("codecs")
                    .map(|codecs| codecs.as_str().trim_matches('"').trim().to_owned())
                    .unwrap_or_default();
                ContentType {
                    raw: raw.to_owned(),
                    mime_type: mime.essence_str().to_owned(),
                    codecs,
                }
            },
            // Not a well-formed type. Keep whatever precedes the parameters so
            // that engines still get a chance to reject it.
            Err(_) => ContentType {
                raw: raw.to_owned(),
                mime_type: raw
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase(),
                codecs: String::new(),
            },
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The lower-cased `type/subtype` without parameters.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The value of the `codecs` parameter, or the empty string.
    pub fn codecs(&self) -> &str {
        &self.codecs
    }

    pub fn codec_list(&self) -> Vec<&str> {
        self.codecs
            .split(',')
            .map(str::trim)
            .filter(|codec| !codec.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mime_type.is_empty()
    }
}
