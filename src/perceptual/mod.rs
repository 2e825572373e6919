//! Perceptual Processors: thumbnail generation, k-means
//! colour palette extraction, and the 64-bit DCT perceptual hash.

pub mod palette;
pub mod phash;
pub mod thumbnail;

pub use palette::DominantColor;
pub use thumbnail::THUMBNAIL_SIZES;
