use {
    crate::{
        color::Rgb,
        gradient::GradientMap,
        image::{self as im, Error as ImageError},
        session::{ColorMap, Options, ShapeMismatch},
        sparse::SparseMap,
    },
    image::{Rgba, RgbaImage},
    std::fmt,
};

/// Learns a sparse color map from pairs of (original, recolor) png
/// images, downscaling both by `scale` before tallying.
///
/// # Errors
/// See [`Error`] for details.
pub fn learn<'a, I>(pairs: I, scale: f32) -> Result<SparseMap, Error>
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut map = ColorMap::with_options(Options {
        rebuild_on_add: false,
        ..Options::default()
    });

    for (original, recolor) in pairs {
        let original = prepare(original, scale)?;
        let recolor = prepare(recolor, scale)?;
        map.add(&original, &recolor)?;
    }

    map.rebuild();
    Ok(map.into_sparse())
}

/// Recolors the png image with a learned sparse map.
///
/// # Errors
/// See [`Error`] for details.
pub fn apply(
    data: &[u8],
    sparse: SparseMap,
    options: Options,
    scale: f32,
) -> Result<Vec<u8>, Error> {
    if sparse.is_empty() {
        return Err(Error::EmptyMap);
    }

    let image = prepare(data, scale)?;
    let mut map = ColorMap::from_sparse(sparse, options);
    let png = im::write_png(&map.apply(&image))?;
    Ok(png)
}

/// Tints the png image with a gradient map built from the gradient
/// png, downscaling both by `scale`.
///
/// # Errors
/// See [`Error`] for details.
pub fn gradient(gradient_data: &[u8], data: &[u8], scale: f32) -> Result<Vec<u8>, Error> {
    let map = GradientMap::from_image(&prepare(gradient_data, scale)?);
    let image = prepare(data, scale)?;
    let png = im::write_png(&map.apply(&image))?;
    Ok(png)
}

/// Renders the sampled-versus-interpolated comparison swatch of a
/// gradient map.
///
/// # Errors
/// See [`Error`] for details.
pub fn swatch(gradient_data: &[u8], scale: f32) -> Result<Vec<u8>, Error> {
    let map = GradientMap::from_image(&prepare(gradient_data, scale)?);
    let png = im::write_png(&map.swatch())?;
    Ok(png)
}

/// Renders a sparse map as two square pngs, one of its keys and one of
/// its values, laid out row-major with the remainder transparent.
///
/// # Errors
/// See [`Error`] for details.
pub fn dump(sparse: &SparseMap) -> Result<(Vec<u8>, Vec<u8>), Error> {
    if sparse.is_empty() {
        return Err(Error::EmptyMap);
    }

    let side = (sparse.len() as f64).sqrt().ceil() as u32;
    let mut keys = RgbaImage::new(side, side);
    let mut values = RgbaImage::new(side, side);
    for (i, (key, value)) in (0..).zip(sparse.iter()) {
        let (x, y) = (i % side, i / side);
        keys.put_pixel(x, y, opaque(key));
        values.put_pixel(x, y, opaque(value));
    }

    Ok((im::write_png(&keys)?, im::write_png(&values)?))
}

fn opaque(Rgb([r, g, b]): Rgb) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

fn prepare(data: &[u8], scale: f32) -> Result<RgbaImage, Error> {
    Ok(im::scale(im::read_png(data)?, scale))
}

#[derive(Debug)]
pub enum Error {
    Image(ImageError),
    Shape(ShapeMismatch),
    EmptyMap,
}

impl From<ImageError> for Error {
    fn from(v: ImageError) -> Self {
        Self::Image(v)
    }
}

impl From<ShapeMismatch> for Error {
    fn from(v: ShapeMismatch) -> Self {
        Self::Shape(v)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Image(err) => write!(f, "{err}"),
            Self::Shape(err) => write!(f, "{err}"),
            Self::EmptyMap => write!(f, "empty color map"),
        }
    }
}
