//! Format converters. Each takes source bytes and produces PDF bytes.

pub mod html;
pub mod image;
pub mod merge;
pub mod office;
mod writer;

pub use html::HtmlConverter;
pub use image::{ImageConverter, PreparedImage};
pub use merge::merge;
pub use office::{OfficeBackend, OfficeConverter};
