//! `image_to_pdf`: a raster image placed on a single PDF page.

use std::path::Path;

use async_trait::async_trait;
use image::DynamicImage;

use crate::converter::{Converter, run_blocking};
use crate::converters::pdf;
use crate::error::ConversionError;

/// Image → PDF converter. The format is sniffed from the content, so a
/// mislabelled `.jpg` that is really a PNG still converts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageToPdf;

impl ImageToPdf {
    fn convert_file(input: &Path, output: &Path) -> Result<(), ConversionError> {
        let data = std::fs::read(input)?;
        let img = image::load_from_memory(&data)
            .map_err(|e| ConversionError::InvalidInput(format!("unreadable image: {e}")))?;

        let (width, height) = (img.width(), img.height());
        pdf::write_image_pdf(output, width, height, flatten_on_white(&img))
    }
}

/// RGB samples of `img`, compositing any alpha channel over white.
fn flatten_on_white(img: &DynamicImage) -> Vec<u8> {
    if !img.color().has_alpha() {
        return img.to_rgb8().into_raw();
    }

    let rgba = img.to_rgba8();
    let mut out = Vec::with_capacity(rgba.width() as usize * rgba.height() as usize * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            out.push(((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8);
        }
    }
    out
}

#[async_trait]
impl Converter for ImageToPdf {
    fn name(&self) -> &'static str {
        "image-to-pdf"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        run_blocking(input, output, Self::convert_file).await
    }
}
