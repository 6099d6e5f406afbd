use {crate::color::Rgb, std::collections::HashMap};

/// Running evidence for one observed input color.
#[derive(Clone, Copy, Default)]
pub(crate) struct Accum {
    pub sums: [u64; 3],
    pub weight: u64,
}

/// Accumulates weighted (input color, output color) observations
/// from training image pairs.
#[derive(Default)]
pub struct Tally {
    entries: HashMap<Rgb, Accum>,
}

impl Tally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `input` was observed alongside `output` with
    /// confidence `weight`.
    pub fn record(&mut self, input: Rgb, output: Rgb, weight: u64) {
        let accum = self.entries.entry(input).or_default();
        for (sum, channel) in accum.sums.iter_mut().zip(output.0) {
            *sum += u64::from(channel) * weight;
        }

        accum.weight += weight;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Rgb, &Accum)> {
        self.entries.iter()
    }
}
