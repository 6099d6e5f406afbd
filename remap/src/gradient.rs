use {
    crate::color::Rgb,
    image::{
        imageops::{self, FilterType},
        Pixel, Rgba, RgbaImage,
    },
    std::collections::BTreeMap,
};

/// The 1-D variant of the color map: luminance in, color out.
///
/// The key space is only 256 wide, so instead of lazy memoization the
/// whole output table is precomputed eagerly when the map is built.
pub struct GradientMap {
    sparse: BTreeMap<u8, Rgb>,
    table: Box<[Rgb; 256]>,
}

impl GradientMap {
    /// Builds a gradient map from a single reference image: every
    /// opaque pixel votes its color for its own luminance level,
    /// weighted by alpha. Unobserved levels are filled by
    /// distance-weighted interpolation over the observed ones, with a
    /// smoothing exponent that grows with the sample count (more
    /// samples, sharper interpolation).
    #[must_use]
    pub fn from_image(gradient: &RgbaImage) -> Self {
        let mut sums = [[0_u64; 4]; 256];
        for pixel in gradient.pixels() {
            let Rgba([r, g, b, a]) = *pixel;
            if a == 0 {
                continue;
            }

            let luma = pixel.to_luma().0[0];
            let weight = u64::from(a);
            let entry = &mut sums[usize::from(luma)];
            entry[0] += u64::from(r) * weight;
            entry[1] += u64::from(g) * weight;
            entry[2] += u64::from(b) * weight;
            entry[3] += weight;
        }

        let mut sparse = BTreeMap::new();
        for (luma, &[r, g, b, weight]) in sums.iter().enumerate() {
            if weight == 0 {
                continue;
            }

            let value = Rgb([(r / weight) as u8, (g / weight) as u8, (b / weight) as u8]);
            sparse.insert(luma as u8, value);
        }

        sparse.entry(0).or_insert(Rgb::MIN);
        sparse.entry(255).or_insert(Rgb::MAX);

        let power = 1.0 + sparse.len() as f64 / 4.0;
        let mut table = Box::new([Rgb::MIN; 256]);
        for (luma, slot) in table.iter_mut().enumerate() {
            let luma = luma as u8;
            *slot = match sparse.get(&luma) {
                Some(&value) => value,
                None => extend(&sparse, luma, power),
            };
        }

        Self { sparse, table }
    }

    #[must_use]
    pub fn get(&self, luma: u8) -> Rgb {
        self.table[usize::from(luma)]
    }

    /// Tints the image: every pixel's color channels are replaced by
    /// the table entry for its luminance, alpha stays unchanged.
    #[must_use]
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let Rgb(new) = self.get(pixel.to_luma().0[0]);
            pixel.0[..3].copy_from_slice(&new);
        }

        out
    }

    /// Renders a comparison swatch: observed samples on a green
    /// backdrop in the top half, the full interpolated table in the
    /// bottom half, scaled up without smoothing.
    #[must_use]
    pub fn swatch(&self) -> RgbaImage {
        const BACKDROP: Rgba<u8> = Rgba([0, 255, 0, 255]);
        const SIDE: u32 = 256;

        let mut strip = RgbaImage::from_pixel(SIDE, 2, BACKDROP);
        for (&luma, &Rgb([r, g, b])) in &self.sparse {
            strip.put_pixel(u32::from(luma), 0, Rgba([r, g, b, 255]));
        }

        for (luma, &Rgb([r, g, b])) in self.table.iter().enumerate() {
            strip.put_pixel(luma as u32, 1, Rgba([r, g, b, 255]));
        }

        imageops::resize(&strip, SIDE, SIDE, FilterType::Nearest)
    }
}

fn extend(sparse: &BTreeMap<u8, Rgb>, luma: u8, power: f64) -> Rgb {
    let mut sums = [0.0; 3];
    let mut total = 0.0;
    for (&sample, &value) in sparse {
        let weight = f64::from(255 - u16::from(sample.abs_diff(luma))).powf(power);
        for (sum, channel) in sums.iter_mut().zip(value.0) {
            *sum += f64::from(channel) * weight;
        }

        total += weight;
    }

    let total = total.max(1.0);
    let mut value = [0; 3];
    for (channel, sum) in value.iter_mut().zip(sums) {
        *channel = (sum / total).floor() as u8;
    }

    Rgb(value)
}
