//! Async, request-coalescing texture loading.
//!
//! A request is keyed by its normalized source ([`CacheKey`]). The first
//! request for a key starts one background load; later requests for the same
//! key join its waiter list. Results come back through an [`ImageLoader`] and
//! are turned into notifications by `Bridge::pump`.

mod cache;
mod decode;
mod key;
mod loader;

pub use cache::{Admission, CacheEntry, TextureCache, TextureInfo};
pub use decode::{decode_image, load, DecodedImage, LoadError, LoadErrorKind};
pub use key::{make_data_url, normalize_url, CacheKey, Fetch, TextureSource};
pub use loader::{ImageLoader, LoadJob, LoadOutcome, ManualLoader, RequestId, ThreadedLoader};
