use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context as _};
use base64::Engine as _;
use percent_encoding::percent_decode_str;

use super::key::Fetch;

/// Decoded pixels, tightly packed premultiplied RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wraps already premultiplied pixels. Returns `None` when the buffer
    /// size does not match `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
        (pixels.len() == expected).then_some(Self { width, height, pixels })
    }
}

/// Failure category, mapped to the code passed to `on_texture_failed`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoadErrorKind {
    Io,
    Decode,
    MalformedData,
    UnsupportedScheme,
    TextureCreation,
}

impl LoadErrorKind {
    pub fn code(self) -> i32 {
        match self {
            LoadErrorKind::Io => -1,
            LoadErrorKind::Decode => -2,
            LoadErrorKind::MalformedData => -3,
            LoadErrorKind::UnsupportedScheme => -4,
            LoadErrorKind::TextureCreation => -5,
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadErrorKind::Io => "i/o error",
            LoadErrorKind::Decode => "image decode error",
            LoadErrorKind::MalformedData => "malformed data url",
            LoadErrorKind::UnsupportedScheme => "unsupported url scheme",
            LoadErrorKind::TextureCreation => "texture creation failed",
        })
    }
}

/// A failed texture load. Never returned to the requester; the guest only
/// sees [`code`](Self::code).
#[derive(Debug)]
pub struct LoadError {
    kind: LoadErrorKind,
    source: anyhow::Error,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> LoadErrorKind {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.kind, self.source)
    }
}

impl std::error::Error for LoadError {}

/// Reads and decodes one texture source. Blocking; runs on a loader thread.
///
/// URLs resolve as files below `root`. `file://` URLs are taken as absolute
/// paths; other schemes are rejected.
pub fn load(fetch: &Fetch, root: &Path) -> Result<DecodedImage, LoadError> {
    let bytes = match fetch {
        Fetch::Url(url) => read_url(url, root)?,
        Fetch::Data(data_url) => decode_data_url(data_url)?,
    };
    decode_image(&bytes)
}

/// Decodes PNG/JPEG/... bytes into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, LoadError> {
    let image = image::load_from_memory(bytes)
        .context("decoding image")
        .map_err(|e| LoadError::new(LoadErrorKind::Decode, e))?;

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = rgba.into_raw();
    premultiply(&mut pixels);

    Ok(DecodedImage { width, height, pixels })
}

fn read_url(url: &str, root: &Path) -> Result<Vec<u8>, LoadError> {
    let path = resolve_path(url, root)?;
    std::fs::read(&path)
        .with_context(|| format!("reading {}", path.display()))
        .map_err(|e| LoadError::new(LoadErrorKind::Io, e))
}

fn resolve_path(url: &str, root: &Path) -> Result<PathBuf, LoadError> {
    let malformed = |e: anyhow::Error| LoadError::new(LoadErrorKind::MalformedData, e);

    if let Some(rest) = url.strip_prefix("file://") {
        let decoded = percent_decode_str(rest)
            .decode_utf8()
            .with_context(|| format!("decoding {url}"))
            .map_err(malformed)?;
        return Ok(PathBuf::from(decoded.into_owned()));
    }

    if let Some((scheme, _)) = url.split_once("://") {
        return Err(LoadError::new(
            LoadErrorKind::UnsupportedScheme,
            anyhow!("{scheme}:// urls are not loaded by this host"),
        ));
    }

    let decoded = percent_decode_str(url)
        .decode_utf8()
        .with_context(|| format!("decoding {url}"))
        .map_err(malformed)?;
    let relative = Path::new(decoded.trim_start_matches('/'));

    if relative.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
        return Err(LoadError::new(
            LoadErrorKind::Io,
            anyhow!("{url} escapes the asset root"),
        ));
    }

    Ok(root.join(relative))
}

/// Decodes the payload of `data:[<mime>][;base64],<payload>`.
fn decode_data_url(data_url: &str) -> Result<Vec<u8>, LoadError> {
    let malformed = |e: anyhow::Error| LoadError::new(LoadErrorKind::MalformedData, e);

    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| malformed(anyhow!("missing data: prefix")))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| malformed(anyhow!("missing ',' in data url")))?;

    if meta.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .context("decoding base64 payload")
            .map_err(malformed)
    } else {
        Ok(percent_decode_str(payload).collect())
    }
}

fn premultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
