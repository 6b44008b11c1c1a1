pub mod archive;
pub mod config;
pub mod cover;
pub mod error;
pub mod extract;
pub mod opf;
pub mod security;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::extract::{extract_thumbnail, ExtractOptions, ThumbnailReport};
}
