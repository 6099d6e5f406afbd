use {
    crate::{color::Rgb, tally::Tally},
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

/// The finalized mapping, one entry per input color observed with
/// non-zero confidence. Ordered so iteration and serialization are
/// deterministic.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SparseMap {
    entries: BTreeMap<Rgb, Rgb>,
}

impl SparseMap {
    /// Collapses a tally into one representative output color per
    /// observed input: each channel is the weighted average of all
    /// observations, truncated toward zero. Keys only ever observed
    /// with zero weight are dropped. The canonical boundary colors
    /// are anchored to identity when absent, so extension never
    /// extrapolates past the ends of the value range.
    #[must_use]
    pub fn build(tally: &Tally) -> Self {
        let mut entries = BTreeMap::new();
        for (&key, accum) in tally.iter() {
            if accum.weight == 0 {
                continue;
            }

            let mut value = [0; 3];
            for (channel, sum) in value.iter_mut().zip(accum.sums) {
                *channel = u8::try_from(sum / accum.weight).expect("average fits a channel");
            }

            entries.insert(key, Rgb(value));
        }

        entries.entry(Rgb::MIN).or_insert(Rgb::MIN);
        entries.entry(Rgb::MAX).or_insert(Rgb::MAX);
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, key: Rgb) -> Option<Rgb> {
        self.entries.get(&key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rgb, Rgb)> + Clone + '_ {
        self.entries.iter().map(|(&key, &value)| (key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncating_average() {
        let mut tally = Tally::new();
        tally.record(Rgb([1, 1, 1]), Rgb([2, 2, 2]), 3);
        tally.record(Rgb([1, 1, 1]), Rgb([0, 0, 0]), 1);

        // (3 * 2 + 1 * 0) / 4 truncates to 1, not rounds to 2
        let map = SparseMap::build(&tally);
        assert_eq!(map.get(Rgb([1, 1, 1])), Some(Rgb([1, 1, 1])));
    }

    #[test]
    fn boundaries_anchored() {
        let mut tally = Tally::new();
        tally.record(Rgb([7, 7, 7]), Rgb([9, 9, 9]), 1);

        let map = SparseMap::build(&tally);
        assert_eq!(map.get(Rgb::MIN), Some(Rgb::MIN));
        assert_eq!(map.get(Rgb::MAX), Some(Rgb::MAX));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn boundaries_not_overridden() {
        let mut tally = Tally::new();
        tally.record(Rgb::MIN, Rgb([10, 10, 10]), 2);

        let map = SparseMap::build(&tally);
        assert_eq!(map.get(Rgb::MIN), Some(Rgb([10, 10, 10])));
    }

    #[test]
    fn zero_weight_excluded() {
        let mut tally = Tally::new();
        tally.record(Rgb([5, 5, 5]), Rgb([9, 9, 9]), 0);

        let map = SparseMap::build(&tally);
        assert_eq!(map.get(Rgb([5, 5, 5])), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn ordered_iteration() {
        let mut tally = Tally::new();
        tally.record(Rgb([200, 0, 0]), Rgb([1, 1, 1]), 1);
        tally.record(Rgb([100, 0, 0]), Rgb([2, 2, 2]), 1);

        let map = SparseMap::build(&tally);
        let keys: Vec<_> = map.iter().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            [Rgb::MIN, Rgb([100, 0, 0]), Rgb([200, 0, 0]), Rgb::MAX]
        );
    }
}
