use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters a browser percent-encodes in a URL. `%` is not in the set, so
/// already-encoded input passes through unchanged.
const URL_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const DEFAULT_MIME: &str = "image/png";

/// Where a texture comes from, as the guest described it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// A path or URL, possibly with backslashes or unencoded characters.
    Url(String),
    /// A complete `data:` URL.
    DataUrl(String),
    /// Raw base64 without the `data:` prefix. An empty `mime` means PNG.
    Base64 { mime: String, data: String },
}

impl TextureSource {
    /// Cache key: `url:<normalized>` or `data:<data url>`.
    pub fn key(&self) -> CacheKey {
        match self.fetch() {
            Fetch::Url(url) => CacheKey(format!("url:{url}")),
            Fetch::Data(data) => CacheKey(format!("data:{data}")),
        }
    }

    /// What the loader should actually read.
    pub fn fetch(&self) -> Fetch {
        match self {
            TextureSource::Url(url) => Fetch::Url(normalize_url(url)),
            TextureSource::DataUrl(data) => Fetch::Data(data.trim().to_string()),
            TextureSource::Base64 { mime, data } => Fetch::Data(make_data_url(mime, data.trim())),
        }
    }
}

/// Normalized load target handed to an [`ImageLoader`](super::ImageLoader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    Url(String),
    Data(String),
}

/// Normalized texture source string. Two requests with equal keys share one
/// load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Data URLs can be megabytes; keep log lines readable.
        const MAX: usize = 64;
        match self.0.char_indices().nth(MAX) {
            Some((cut, _)) => write!(f, "{}…", &self.0[..cut]),
            None => f.write_str(&self.0),
        }
    }
}

/// Makes a guest-supplied path fetchable: trims whitespace, turns
/// backslashes into slashes and percent-encodes what a browser would.
///
/// Idempotent: `normalize_url(normalize_url(u)) == normalize_url(u)`.
pub fn normalize_url(raw: &str) -> String {
    let slashed = raw.trim().replace('\\', "/");
    utf8_percent_encode(&slashed, URL_ENCODE).to_string()
}

/// Builds `data:<mime>;base64,<b64>`, defaulting the mime type to PNG.
pub fn make_data_url(mime: &str, b64: &str) -> String {
    let mime = match mime.trim() {
        "" => DEFAULT_MIME,
        m => m,
    };
    format!("data:{mime};base64,{b64}")
}
