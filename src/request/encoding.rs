//! Query-string and form-body encoding

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything `encodeURIComponent` escapes: all but
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Mimics Javascript's `encodeURIComponent`.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// `path?<param>=<millis>`
///
/// The epoch-millis value keeps intermediate caches from answering with a
/// stale response.
pub fn cache_busted_url(path: &str, param: &str, now_millis: u64) -> String {
    format!("{}?{}={}", path, param, now_millis)
}

/// `encode(k1)=encode(v1)&encode(k2)=encode(v2)...` in iteration order
pub fn encode_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", encode_uri_component(key), encode_uri_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}
