pub mod decode;
pub mod fetch;

pub use decode::{LogoFormat, NaturalSize, natural_size, rasterize_at_height, sniff_format};
pub use fetch::{FsFetcher, LogoFetcher, MemoryFetcher, is_remote, normalize_rel_path};

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
