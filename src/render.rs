pub mod html;
pub mod raster;

pub use html::render_html;
pub use raster::{LogoBitmaps, render_frame};
