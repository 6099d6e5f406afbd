use {
    image::{
        codecs::png::{PngDecoder, PngEncoder},
        imageops::{self, FilterType},
        ColorType, DynamicImage, ImageEncoder, ImageError, RgbaImage,
    },
    std::fmt,
};

pub(crate) fn read_png(data: &[u8]) -> Result<RgbaImage, Error> {
    let decoder = PngDecoder::new(data)?;
    match DynamicImage::from_decoder(decoder)? {
        DynamicImage::ImageRgba8(im) => Ok(im),
        im @ (DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)) => Ok(im.to_rgba8()),
        _ => Err(Error::UnsupportedFormat),
    }
}

pub(crate) fn write_png(image: &RgbaImage) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::with_capacity(128);
    let encoder = PngEncoder::new(&mut buf);
    let (width, height) = image.dimensions();
    encoder.write_image(image, width, height, ColorType::Rgba8)?;
    Ok(buf)
}

/// Downscales (or upscales) the image by the factor, flooring each
/// dimension at one pixel.
pub(crate) fn scale(image: RgbaImage, factor: f32) -> RgbaImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return image;
    }

    let scaled = |side: u32| (((side as f32) * factor) as u32).max(1);
    let (width, height) = image.dimensions();
    imageops::resize(&image, scaled(width), scaled(height), FilterType::Triangle)
}

#[derive(Debug)]
pub enum Error {
    Image(ImageError),
    UnsupportedFormat,
}

impl From<ImageError> for Error {
    fn from(v: ImageError) -> Self {
        Self::Image(v)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Image(err) => write!(f, "image error: {err}"),
            Self::UnsupportedFormat => write!(f, "unsupported format"),
        }
    }
}
