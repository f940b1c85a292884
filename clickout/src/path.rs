//! Translation of manifest paths into URI path segments.
//!
//! Manifests are authored on Windows, so `codebase` and `name` attributes
//! normally use `\` separators. Both separators are accepted here. Every
//! component is percent-encoded on its own so that characters such as `#`,
//! `?` or `%` inside a file name stay literal once the components are joined
//! with `/`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Characters left unescaped in a path segment (RFC 3986 unreserved set).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Split a native path into its components.
///
/// Empty components and `.` are dropped, mirroring how both Windows and
/// POSIX paths normalize repeated or current-directory separators.
pub fn split_native(native_path: &str) -> Vec<&str> {
    native_path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}

/// Translate a native path into percent-encoded URI path segments.
pub fn to_address_segments(native_path: &str) -> Vec<String> {
    split_native(native_path)
        .into_iter()
        .map(|part| utf8_percent_encode(part, SEGMENT).to_string())
        .collect()
}

/// Append already-encoded segments onto `base` as child path components.
///
/// A trailing `/` on the base path is dropped before appending, and the
/// result never carries a query or fragment.
pub fn to_address<S: AsRef<str>>(base: &Url, segments: &[S]) -> Url {
    let mut path = base.path().trim_end_matches('/').to_string();
    for segment in segments {
        path.push('/');
        path.push_str(segment.as_ref());
    }

    let mut url = base.clone();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Decode a percent-encoded segment back into its original text.
pub fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}
