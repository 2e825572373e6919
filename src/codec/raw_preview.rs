//! Preview-only RAW backend: never attempts a full demosaic, always
//! defers to `decode_raw`'s embedded-preview fallback. For builds that
//! want to avoid pulling in a full demosaic stack.

use std::path::Path;

use image::DynamicImage;

use crate::codec::RawDecoder;
use crate::error::PipelineError;

pub struct PreviewOnlyDecoder;

impl RawDecoder for PreviewOnlyDecoder {
    fn decode_full(&self, path: &Path) -> Result<DynamicImage, PipelineError> {
        Err(PipelineError::decode(
            path,
            "raw-preview-only build: full demosaic disabled",
        ))
    }
}
