/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Guessing a media type when the page did not give a useful one.

use data_url::DataUrl;
use url::Url;

/// Types that say nothing about the media format.
pub const GENERIC_MIME_TYPES: [&str; 2] = ["application/octet-stream", "text/plain"];

pub fn is_generic_mime_type(mime_type: &str) -> bool {
    GENERIC_MIME_TYPES.contains(&mime_type)
}

pub fn media_mime_type_for_extension(extension: &str) -> Option<&'static str> {
    mime_guess::from_ext(&extension.to_ascii_lowercase()).first_raw()
}

/// A type guessed from `url`, and whether the guess came from the file
/// extension rather than from the URL itself.
#[derive(Debug, PartialEq)]
pub struct InferredType {
    pub mime_type: String,
    pub from_extension: bool,
}

pub fn infer_mime_type(url: &Url) -> Option<InferredType> {
    if url.scheme() == "data" {
        let data_url = DataUrl::process(url.as_str()).ok()?;
        let mime = data_url.mime_type();
        return Some(InferredType {
            mime_type: format!("{}/{}", mime.type_, mime.subtype),
            from_extension: false,
        });
    }

    let last_component = url.path_segments()?.next_back()?;
    let (_, extension) = last_component.rsplit_once('.')?;
    if extension.is_empty() {
        return None;
    }
    media_mime_type_for_extension(extension).map(|mime_type| InferredType {
        mime_type: mime_type.to_owned(),
        from_extension: true,
    })
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{infer_mime_type, is_generic_mime_type};

    #[test]
    fn extension_lookup() {
        let url = Url::parse("https://example.com/media/clip.WEBM?x=1").unwrap();
        let inferred = infer_mime_type(&url).unwrap();
        assert_eq!(inferred.mime_type, "video/webm");
        assert!(inferred.from_extension);

        let url = Url::parse("https://example.com/media/").unwrap();
        assert_eq!(infer_mime_type(&url), None);
    }

    #[test]
    fn data_url_type_is_not_an_extension_guess() {
        let url = Url::parse("data:audio/ogg;base64,AAAA").unwrap();
        let inferred = infer_mime_type(&url).unwrap();
        assert_eq!(inferred.mime_type, "audio/ogg");
        assert!(!inferred.from_extension);
    }

    #[test]
    fn generic_types() {
        assert!(is_generic_mime_type("application/octet-stream"));
        assert!(is_generic_mime_type("text/plain"));
        assert!(!is_generic_mime_type("video/mp4"));
    }
}
