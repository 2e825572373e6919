//! Full RAW demosaic backend, wrapping the `rawler` crate. The call
//! sequence (`RawSource::new` → `get_decoder` → `RawDecodeParams`) mirrors
//! `chehlo-gemkeep`'s `import/exif.rs`, which uses the same three calls to
//! reach RAW metadata; here they're reused to reach the full raster image.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::codec::RawDecoder;
use crate::error::PipelineError;

pub struct RawlerDecoder;

impl RawDecoder for RawlerDecoder {
    fn decode_full(&self, path: &Path) -> Result<DynamicImage, PipelineError> {
        let rawfile = rawler::rawsource::RawSource::new(path)
            .map_err(|e| PipelineError::decode(path, format!("rawler: cannot open source: {e}")))?;

        let decoder = rawler::get_decoder(&rawfile)
            .map_err(|e| PipelineError::decode(path, format!("rawler: no decoder: {e:?}")))?;

        let params = rawler::decoders::RawDecodeParams { image_index: 0 };
        let raw_image = decoder
            .raw_image(&rawfile, &params, false)
            .map_err(|e| PipelineError::decode(path, format!("rawler: raw decode failed: {e:?}")))?;

        let developed = rawler::imgop::develop::develop_raw_image(
            &raw_image,
            &rawler::imgop::develop::RawDevelopParams::default(),
        )
        .map_err(|e| PipelineError::decode(path, format!("rawler: develop failed: {e:?}")))?;

        let (width, height) = (developed.width as u32, developed.height as u32);
        let rgb = RgbImage::from_raw(width, height, developed.to_rgb8())
            .ok_or_else(|| PipelineError::decode(path, "rawler: developed buffer size mismatch"))?;

        Ok(DynamicImage::ImageRgb8(rgb))
    }
}
