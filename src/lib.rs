//! An infinitely scrolling strip of partner logos.
//!
//! The pipeline is:
//!
//! - [`LogoCatalog`]: the fixed list of logos and their link targets
//! - [`DimensionResolver`]: loads every image in parallel and measures it
//! - [`TileFiller`]: repeats the measured run until it overfills the viewport
//! - [`ScrollController`]: loops the strip leftwards and pauses it under the pointer
//!
//! [`CollabBar`] ties these together and produces a [`FrameLayout`] for any instant, which the
//! [`render`] module turns into HTML markup or RGBA frames.
#![forbid(unsafe_code)]

pub mod assets;
pub mod bar;
pub mod catalog;
pub mod config;
mod foundation;
pub mod render;
pub mod resolve;
pub mod scroll;
pub mod tile;
pub mod viewport;

pub use assets::{FsFetcher, LogoFetcher, MemoryFetcher, NaturalSize};
#[cfg(feature = "http")]
pub use assets::HttpFetcher;
pub use bar::{BarEvent, CollabBar, FrameLayout, PlacedLogo};
pub use catalog::{LogoCatalog, LogoEntry};
pub use config::{BarConfig, ResumeMode};
pub use foundation::core::{Affine, Point, Rect, Vec2};
pub use foundation::error::{CollabError, CollabResult};
pub use render::{LogoBitmaps, render_frame, render_html};
pub use resolve::{DimensionResolver, LoadFailure, Resolution, ResolvedLogoEntry};
pub use scroll::{ScrollController, ScrollState};
pub use tile::{TileFiller, TiledSequence};
pub use viewport::{ViewportBus, ViewportSubscription};
