use {
    crate::{
        color::Rgb,
        query::{self, Strategy},
        sparse::SparseMap,
        tally::Tally,
    },
    image::{Rgba, RgbaImage},
    std::{collections::HashMap, fmt},
};

/// Engine configuration.
#[derive(Clone, Copy)]
pub struct Options {
    /// How colors outside the sparse map are extended.
    pub strategy: Strategy,

    /// Smoothing exponent for the exponential strategies. Large values
    /// behave like a soft nearest neighbor.
    pub power: u32,

    /// Whether every [`add`](ColorMap::add) rebuilds the maps from the
    /// full cumulative tally, or rebuilding is deferred to an explicit
    /// [`rebuild`](ColorMap::rebuild).
    pub rebuild_on_add: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strategy: Strategy::Exponential,
            power: 128,
            rebuild_on_add: true,
        }
    }
}

/// One remapping session: the raw tally, the finalized sparse map and
/// the memo of every color queried so far.
pub struct ColorMap {
    tally: Tally,
    sparse: SparseMap,
    memo: HashMap<Rgb, Rgb>,
    options: Options,
}

impl ColorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self {
            tally: Tally::new(),
            sparse: SparseMap::default(),
            memo: HashMap::with_capacity(128),
            options,
        }
    }

    /// Resumes a session from an already finalized sparse map.
    #[must_use]
    pub fn from_sparse(sparse: SparseMap, options: Options) -> Self {
        Self {
            tally: Tally::new(),
            memo: sparse.iter().collect(),
            sparse,
            options,
        }
    }

    /// Tallies one training pair: for every pixel position, the
    /// original color is recorded alongside the recolored one, weighted
    /// by the smaller of the two alphas. A pixel transparent in either
    /// image contributes no evidence.
    ///
    /// # Errors
    /// Fails with [`ShapeMismatch`] before any tallying if the images
    /// differ in dimensions; earlier pairs stay tallied.
    pub fn add(&mut self, original: &RgbaImage, recolor: &RgbaImage) -> Result<(), ShapeMismatch> {
        if original.dimensions() != recolor.dimensions() {
            return Err(ShapeMismatch {
                original: original.dimensions(),
                recolor: recolor.dimensions(),
            });
        }

        for (a, b) in original.pixels().zip(recolor.pixels()) {
            let Rgba([r, g, bl, alpha_a]) = *a;
            let Rgba([t, h, n, alpha_b]) = *b;
            self.tally.record(
                Rgb([r, g, bl]),
                Rgb([t, h, n]),
                u64::from(alpha_a.min(alpha_b)),
            );
        }

        if self.options.rebuild_on_add {
            self.rebuild();
        }

        Ok(())
    }

    /// Tallies a batch of training pairs, rebuilding the maps once at
    /// the end regardless of the rebuild option.
    ///
    /// # Errors
    /// Stops at the first pair failing with [`ShapeMismatch`]; pairs
    /// tallied before it stay valid but the maps are left stale.
    pub fn add_all<'a, I>(&mut self, pairs: I) -> Result<(), ShapeMismatch>
    where
        I: IntoIterator<Item = (&'a RgbaImage, &'a RgbaImage)>,
    {
        let rebuild_on_add = self.options.rebuild_on_add;
        self.options.rebuild_on_add = false;
        let result = pairs
            .into_iter()
            .try_for_each(|(original, recolor)| self.add(original, recolor));

        self.options.rebuild_on_add = rebuild_on_add;
        result?;
        self.rebuild();
        Ok(())
    }

    /// Finalizes the tally into a fresh sparse map and reseeds the memo
    /// from it, discarding previously extended colors.
    pub fn rebuild(&mut self) {
        self.sparse = SparseMap::build(&self.tally);
        self.memo = self.sparse.iter().collect();
    }

    /// Returns the output color for any input color. Colors present in
    /// the sparse map come back exactly; anything else is computed by
    /// the configured strategy once and memoized for the lifetime of
    /// the session.
    pub fn lookup(&mut self, color: Rgb) -> Rgb {
        let Options {
            strategy, power, ..
        } = self.options;

        *self
            .memo
            .entry(color)
            .or_insert_with(|| query::extend(&self.sparse, color, strategy, power))
    }

    /// Recolors the image through [`lookup`](Self::lookup), preserving
    /// the alpha channel unchanged.
    pub fn apply(&mut self, image: &RgbaImage) -> RgbaImage {
        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let Rgba([r, g, b, _]) = *pixel;
            let Rgb(new) = self.lookup(Rgb([r, g, b]));
            pixel.0[..3].copy_from_slice(&new);
        }

        out
    }

    #[must_use]
    pub fn sparse(&self) -> &SparseMap {
        &self.sparse
    }

    #[must_use]
    pub fn into_sparse(self) -> SparseMap {
        self.sparse
    }

    #[must_use]
    pub fn tally(&self) -> &Tally {
        &self.tally
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ShapeMismatch {
    pub original: (u32, u32),
    pub recolor: (u32, u32),
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Self {
            original: (ow, oh),
            recolor: (rw, rh),
        } = self;

        write!(
            f,
            "paired images differ in size: {ow}x{oh} original vs {rw}x{rh} recolor"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(pixel))
    }

    #[test]
    fn exact_match_bypasses_extension() {
        let mut map = ColorMap::new();
        map.add(&single([10, 20, 30, 255]), &single([40, 50, 60, 255]))
            .expect("same shape");

        assert_eq!(map.lookup(Rgb([10, 20, 30])), Rgb([40, 50, 60]));
    }

    #[test]
    fn lookup_is_memoized_and_deterministic() {
        let mut map = ColorMap::new();
        map.add(&single([10, 20, 30, 255]), &single([40, 50, 60, 255]))
            .expect("same shape");

        let seeded = map.memo.len();
        let first = map.lookup(Rgb([99, 99, 99]));
        assert_eq!(map.memo.len(), seeded + 1);

        let second = map.lookup(Rgb([99, 99, 99]));
        assert_eq!(first, second);
        assert_eq!(map.memo.len(), seeded + 1);
    }

    #[test]
    fn shape_mismatch_leaves_tally_untouched() {
        let mut map = ColorMap::new();
        map.add(&single([1, 2, 3, 255]), &single([4, 5, 6, 255]))
            .expect("same shape");

        let before = map.tally().len();
        let wide = RgbaImage::from_pixel(2, 1, Rgba([7, 7, 7, 255]));
        let result = map.add(&single([7, 7, 7, 255]), &wide);
        assert!(result.is_err());
        assert_eq!(map.tally().len(), before);
        assert_eq!(map.lookup(Rgb([1, 2, 3])), Rgb([4, 5, 6]));
    }

    #[test]
    fn transparent_pixels_carry_no_evidence() {
        let mut map = ColorMap::new();
        map.add(&single([5, 5, 5, 0]), &single([9, 9, 9, 255]))
            .expect("same shape");

        // only the two boundary anchors survive
        assert_eq!(map.sparse().len(), 2);
        assert_eq!(map.sparse().get(Rgb([5, 5, 5])), None);
    }

    #[test]
    fn rebuild_is_idempotent_and_resets_memo() {
        let mut map = ColorMap::new();
        map.add(&single([10, 20, 30, 255]), &single([40, 50, 60, 255]))
            .expect("same shape");

        map.lookup(Rgb([200, 200, 200]));
        assert!(map.memo.len() > map.sparse().len());

        let before = map.sparse().clone();
        map.rebuild();
        assert!(before == *map.sparse());
        assert_eq!(map.memo.len(), map.sparse().len());

        map.rebuild();
        assert!(before == *map.sparse());
    }

    #[test]
    fn deferred_rebuild_on_batches() {
        let mut map = ColorMap::new();
        let originals = [single([10, 0, 0, 255]), single([0, 10, 0, 255])];
        let recolors = [single([1, 1, 1, 255]), single([2, 2, 2, 255])];
        map.add_all(originals.iter().zip(&recolors))
            .expect("same shapes");

        assert_eq!(map.sparse().get(Rgb([10, 0, 0])), Some(Rgb([1, 1, 1])));
        assert_eq!(map.sparse().get(Rgb([0, 10, 0])), Some(Rgb([2, 2, 2])));
    }

    #[test]
    fn apply_preserves_alpha() {
        let mut map = ColorMap::new();
        map.add(&single([10, 20, 30, 255]), &single([40, 50, 60, 255]))
            .expect("same shape");

        let out = map.apply(&single([10, 20, 30, 128]));
        assert_eq!(out.get_pixel(0, 0).0, [40, 50, 60, 128]);
    }

    #[test]
    fn weighted_average_truncates() {
        let mut map = ColorMap::with_options(Options {
            rebuild_on_add: false,
            ..Options::default()
        });

        // weight 3 toward (2,2,2) and weight 1 toward (0,0,0)
        let wide = |colors: [[u8; 4]; 2]| {
            RgbaImage::from_fn(2, 1, |x, _| Rgba(colors[usize::try_from(x).expect("index")]))
        };

        map.add(
            &wide([[1, 1, 1, 255], [1, 1, 1, 85]]),
            &wide([[2, 2, 2, 255], [0, 0, 0, 85]]),
        )
        .expect("same shape");

        map.rebuild();
        // (255 * 2 + 85 * 0) / 340 = 1.5, truncated to 1
        assert_eq!(map.lookup(Rgb([1, 1, 1])), Rgb([1, 1, 1]));
    }
}
