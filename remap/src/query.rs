use {
    crate::{color::Rgb, sparse::SparseMap},
    std::{error, fmt, str},
};

/// How a query color absent from the sparse map gets its output color.
///
/// Every strategy scans the full sparse map and averages some candidate
/// set; they differ in which entries qualify and how they are weighted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Soft nearest neighbor: every entry weighted by its closeness
    /// raised to a large power.
    Exponential,

    /// Unweighted average over the 16 smallest distinct distance
    /// buckets, ties included.
    Nearest,

    /// Unweighted average over the nearest 1% of entries.
    Fraction,

    /// Exponential weighting over entries closer than a fixed radius;
    /// falls back to the query color itself when none qualify.
    Bounded,

    /// Unweighted average over every entry within a fixed band of the
    /// closest distance.
    Band,
}

impl str::FromStr for Strategy {
    type Err = Unknown;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exponential" => Ok(Self::Exponential),
            "nearest" => Ok(Self::Nearest),
            "fraction" => Ok(Self::Fraction),
            "bounded" => Ok(Self::Bounded),
            "band" => Ok(Self::Band),
            _ => Err(Unknown),
        }
    }
}

#[derive(Debug)]
pub struct Unknown;

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown strategy")
    }
}

impl error::Error for Unknown {}

/// Computes the output color for a key absent from the sparse map.
pub(crate) fn extend(map: &SparseMap, key: Rgb, strategy: Strategy, power: u32) -> Rgb {
    match strategy {
        Strategy::Exponential => exponential(map, key, power),
        Strategy::Nearest => nearest(map, key),
        Strategy::Fraction => fraction(map, key),
        Strategy::Bounded => bounded(map, key, power),
        Strategy::Band => band(map, key),
    }
}

/// Per-entry closeness score: the sum of squared per-channel
/// proximities. Higher is closer; zero only for a full-range
/// mismatch on all three channels.
fn closeness(a: Rgb, b: Rgb) -> f64 {
    a.0.iter()
        .zip(b.0)
        .map(|(&x, y)| {
            let d = f64::from(255 - u16::from(x.abs_diff(y)));
            d * d
        })
        .sum()
}

fn exponential(map: &SparseMap, key: Rgb, power: u32) -> Rgb {
    soft_average(map.iter(), key, power).unwrap_or(key)
}

fn bounded(map: &SparseMap, key: Rgb, power: u32) -> Rgb {
    const RADIUS: u32 = 64;

    let candidates = map.iter().filter(|&(k, _)| k.manhattan(key) < RADIUS);
    soft_average(candidates, key, power).unwrap_or(key)
}

/// Exponentially weighted average over the candidates. Scores are
/// normalized by the best score before exponentiation, which keeps
/// every weight in [0, 1] without changing the weight ratios.
/// Returns `None` when no candidate carries any weight.
fn soft_average<I>(candidates: I, key: Rgb, power: u32) -> Option<Rgb>
where
    I: Iterator<Item = (Rgb, Rgb)> + Clone,
{
    let best = candidates
        .clone()
        .map(|(k, _)| closeness(k, key))
        .fold(0.0, f64::max);

    if best <= 0.0 {
        return None;
    }

    let mut sums = [0.0; 3];
    let mut total = 0.0;
    for (k, value) in candidates {
        let weight = (closeness(k, key) / best).powf(f64::from(power));
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

    Some(Rgb(value))
}

fn nearest(map: &SparseMap, key: Rgb) -> Rgb {
    const BUCKETS: u32 = 16;

    let mut ranked: Vec<(u32, Rgb)> = map
        .iter()
        .map(|(k, value)| (k.manhattan(key), value))
        .collect();

    ranked.sort_unstable_by_key(|&(distance, _)| distance);

    let mut sums = [0; 3];
    let mut count = 0;
    let mut buckets = 0;
    let mut last = None;
    for (distance, value) in ranked {
        if last != Some(distance) {
            buckets += 1;
            if buckets > BUCKETS {
                break;
            }

            last = Some(distance);
        }

        accumulate(&mut sums, value);
        count += 1;
    }

    plain_average(sums, count)
}

fn fraction(map: &SparseMap, key: Rgb) -> Rgb {
    const DIVISOR: usize = 100;

    let mut ranked: Vec<(u32, Rgb)> = map
        .iter()
        .map(|(k, value)| (k.manhattan(key), value))
        .collect();

    ranked.sort_unstable_by_key(|&(distance, _)| distance);

    let mut sums = [0; 3];
    let mut count = 0;
    for (_, value) in ranked.iter().take(ranked.len() / DIVISOR) {
        accumulate(&mut sums, *value);
        count += 1;
    }

    plain_average(sums, count)
}

fn band(map: &SparseMap, key: Rgb) -> Rgb {
    const WIDTH: u32 = 10;

    // two passes, so the result cannot depend on encounter order
    let closest = map
        .iter()
        .map(|(k, _)| k.manhattan(key))
        .min()
        .unwrap_or(0);

    let mut sums = [0; 3];
    let mut count = 0;
    for (k, value) in map.iter() {
        if k.manhattan(key) <= closest + WIDTH {
            accumulate(&mut sums, value);
            count += 1;
        }
    }

    plain_average(sums, count)
}

fn accumulate(sums: &mut [u64; 3], value: Rgb) {
    for (sum, channel) in sums.iter_mut().zip(value.0) {
        *sum += u64::from(channel);
    }
}

fn plain_average(sums: [u64; 3], count: u64) -> Rgb {
    let count = count.max(1);
    let mut value = [0; 3];
    for (channel, sum) in value.iter_mut().zip(sums) {
        *channel = u8::try_from(sum / count).expect("average fits a channel");
    }

    Rgb(value)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::tally::Tally};

    fn anchors_with(samples: &[(Rgb, Rgb)]) -> SparseMap {
        let mut tally = Tally::new();
        for &(input, output) in samples {
            tally.record(input, output, 1);
        }

        SparseMap::build(&tally)
    }

    #[test]
    fn parse_strategy() {
        assert!(matches!("band".parse(), Ok(Strategy::Band)));
        assert!("softmax".parse::<Strategy>().is_err());
    }

    #[test]
    fn exponential_acts_like_soft_nearest() {
        let map = anchors_with(&[
            (Rgb::MIN, Rgb([10, 10, 10])),
            (Rgb::MAX, Rgb([245, 245, 245])),
        ]);

        // at power 128 the far anchor's weight underflows to nothing
        let out = extend(&map, Rgb([1, 1, 1]), Strategy::Exponential, 128);
        assert_eq!(out, Rgb([10, 10, 10]));
    }

    #[test]
    fn bounded_passes_distant_colors_through() {
        let map = anchors_with(&[
            (Rgb::MIN, Rgb([10, 10, 10])),
            (Rgb::MAX, Rgb([245, 245, 245])),
        ]);

        // manhattan distance to both anchors is >= 64
        let query = Rgb([120, 10, 10]);
        assert_eq!(extend(&map, query, Strategy::Bounded, 128), query);
    }

    #[test]
    fn bounded_uses_close_entries() {
        let map = anchors_with(&[
            (Rgb::MIN, Rgb([10, 10, 10])),
            (Rgb::MAX, Rgb([245, 245, 245])),
        ]);

        // the dark anchor is the single candidate within the radius
        let out = extend(&map, Rgb([3, 0, 0]), Strategy::Bounded, 128);
        assert_eq!(out, Rgb([10, 10, 10]));
    }

    #[test]
    fn nearest_averages_all_when_few_buckets() {
        let map = anchors_with(&[(Rgb([100, 0, 0]), Rgb([50, 50, 50]))]);

        // three entries, three buckets: plain average of all values
        let out = extend(&map, Rgb([10, 10, 10]), Strategy::Nearest, 128);
        assert_eq!(out, Rgb([101, 101, 101]));
    }

    #[test]
    fn nearest_cuts_after_sixteen_buckets_with_ties() {
        let mut tally = Tally::new();
        for i in 0..15 {
            tally.record(Rgb([i, 0, 0]), Rgb([i, i, i]), 1);
        }

        // two ties in the sixteenth bucket, both must be included
        tally.record(Rgb([15, 0, 0]), Rgb([100, 0, 0]), 1);
        tally.record(Rgb([0, 15, 0]), Rgb([0, 100, 0]), 1);

        let map = SparseMap::build(&tally);
        let out = extend(&map, Rgb::MIN, Strategy::Nearest, 128);

        // distances 0..=14 plus the tied pair at 15; the far anchor
        // lands in a seventeenth bucket and is dropped
        let base: u64 = (0..15).sum();
        let expected = ((base + 100) / 17) as u8;
        assert_eq!(out, Rgb([expected, expected, (base / 17) as u8]));
    }

    #[test]
    fn fraction_of_tiny_map_falls_back_to_black() {
        let map = anchors_with(&[]);

        // 2 entries / 100 truncates to zero candidates
        let out = extend(&map, Rgb([7, 7, 7]), Strategy::Fraction, 128);
        assert_eq!(out, Rgb::MIN);
    }

    #[test]
    fn fraction_takes_the_nearest_percent() {
        let mut tally = Tally::new();
        for i in 0..=199 {
            tally.record(Rgb([i, 0, 0]), Rgb([i, i, i]), 1);
        }

        // 201 entries with the bright anchor, so the nearest two win
        let map = SparseMap::build(&tally);
        let out = extend(&map, Rgb::MIN, Strategy::Fraction, 128);
        assert_eq!(out, Rgb([0, 0, 0]));
    }

    #[test]
    fn band_includes_everything_near_the_closest() {
        let map = anchors_with(&[
            (Rgb([20, 0, 0]), Rgb([200, 0, 0])),
            (Rgb([25, 0, 0]), Rgb([100, 0, 0])),
            (Rgb([40, 0, 0]), Rgb([50, 0, 0])),
        ]);

        // closest is at distance 1; entries at 1 and 4 fall in the
        // band, the one at 19 does not
        let out = extend(&map, Rgb([21, 0, 0]), Strategy::Band, 128);
        assert_eq!(out, Rgb([150, 0, 0]));
    }
}
