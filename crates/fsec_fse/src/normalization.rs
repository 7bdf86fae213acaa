use crate::Error;

pub const MIN_TABLE_LOG: u8 = 5;
pub const MAX_TABLE_LOG: u8 = 15;
const DEFAULT_TABLE_LOG: u8 = 11;

/// A histogram rescaled so its probabilities sum exactly to `1 << table_log`.
///
/// `counts[s] == -1` marks a "low probability" symbol: present in the
/// source but too rare to get a real slot, represented instead by a single
/// shared reserved state (see [`crate::dtable`]/[`crate::ctable`]).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCounts {
    counts: Vec<i32>,
    table_log: u8,
}

impl NormalizedCounts {
    pub fn table_log(&self) -> u8 {
        self.table_log
    }

    pub fn counts(&self) -> &[i32] {
        &self.counts
    }

    pub fn has_low_prob(&self) -> bool {
        self.counts.iter().any(|&c| c == -1)
    }

    pub fn from_parts(counts: Vec<i32>, table_log: u8) -> Self {
        Self { counts, table_log }
    }

    /// Rescales `hist` (a raw symbol histogram) onto a table of size
    /// `1 << table_log`, following zstd's `FSE_normalizeCount`: symbols at or
    /// below `total >> table_log` get the -1 low-probability marker, the
    /// rest get a proportional share with a rounding-bias correction
    /// (`rtbTable`) applied to small probabilities, and the whole remaining
    /// slack is folded into the most frequent symbol (or, in the rare case
    /// that would invert its sign, spread across the largest few instead).
    pub fn normalize(hist: &[u32], table_log: u8) -> Result<Self, Error> {
        if !(MIN_TABLE_LOG..=MAX_TABLE_LOG).contains(&table_log) {
            return Err(Error::TableLogTooLarge(table_log));
        }

        let total: u64 = hist.iter().map(|&c| u64::from(c)).sum();
        if total == 0 {
            return Err(Error::SrcSizeWrong);
        }

        let n_nonzero = hist.iter().filter(|&&c| c > 0).count();
        if n_nonzero <= 1 {
            return Err(Error::NormalizeError);
        }

        let table_size = 1u32 << table_log;
        let low_threshold = (total >> table_log) as u32;

        const RTB_TABLE: [u64; 8] =
            [0, 473_195, 504_333, 520_860, 550_000, 700_000, 750_000, 830_000];
        let scale = 62 - u32::from(table_log);
        let step = (1u64 << 62) / total;
        let v_step = 1u64 << (scale - 20);

        let max_low_prob_slots = (1u32 << (table_log - 1)) - 1;

        let mut counts = vec![0i32; hist.len()];
        let mut still_to_distribute = table_size as i32;
        let mut largest = 0usize;
        let mut largest_p = 0i32;
        let mut low_prob_slots = 0u32;

        for (s, &c) in hist.iter().enumerate() {
            if c == 0 {
                continue;
            }

            if c <= low_threshold {
                low_prob_slots += 1;
                if low_prob_slots > max_low_prob_slots {
                    return Err(Error::NormalizeError);
                }
                counts[s] = -1;
                still_to_distribute -= 1;
                continue;
            }

            let mut proba = ((u64::from(c) * step) >> scale) as i32;
            if proba < 8 {
                let rest_to_beat = v_step * RTB_TABLE[proba as usize];
                if (u64::from(c) * step) - ((proba as u64) << scale) > rest_to_beat {
                    proba += 1;
                }
            }

            if proba > largest_p {
                largest_p = proba;
                largest = s;
            }
            counts[s] = proba;
            still_to_distribute -= proba;
        }

        if -still_to_distribute >= (counts[largest] >> 1) {
            rebalance(&mut counts, still_to_distribute);
        } else {
            counts[largest] += still_to_distribute;
        }

        Ok(Self { counts, table_log })
    }

    /// Picks a table log the way `FSE_optimalTableLog` does: as small as the
    /// data and the requested ceiling allow, never smaller than
    /// [`MIN_TABLE_LOG`] nor larger than [`MAX_TABLE_LOG`], and never larger
    /// than `log2(src_size)` (a bigger table than the source can't pay for
    /// itself).
    pub fn optimal_table_log(requested: u8, src_size: usize, max_symbol_value: usize) -> u8 {
        if src_size <= 1 {
            return 0;
        }

        let max_table_log = if requested == 0 {
            DEFAULT_TABLE_LOG
        } else {
            requested.min(MAX_TABLE_LOG)
        };

        let max_bits_src = highbit32((src_size - 1) as u32).saturating_sub(2);
        let mut table_log = highbit32(max_symbol_value as u32) + 3;

        if table_log > max_table_log {
            table_log = max_table_log;
        }
        if max_bits_src < table_log {
            table_log = max_bits_src;
        }
        table_log.clamp(MIN_TABLE_LOG, MAX_TABLE_LOG)
    }
}

fn highbit32(v: u32) -> u8 {
    if v == 0 {
        0
    } else {
        31 - v.leading_zeros() as u8
    }
}

/// Spreads a correction that would otherwise flip the largest symbol's sign
/// across the largest few buckets instead, one unit at a time.
fn rebalance(counts: &mut [i32], mut remaining: i32) {
    while remaining != 0 {
        let Some(idx) = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 1)
            .max_by_key(|&(_, &c)| c)
            .map(|(i, _)| i)
        else {
            break;
        };

        if remaining < 0 {
            counts[idx] -= 1;
            remaining += 1;
        } else {
            counts[idx] += 1;
            remaining -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_normalize_sums_to_table_size() {
        let hist = vec![10u32, 5, 3, 1, 1];
        let norm = NormalizedCounts::normalize(&hist, 6).unwrap();

        let sum: i32 = norm
            .counts()
            .iter()
            .map(|&c| if c == -1 { 1 } else { c })
            .sum();
        assert_eq!(sum, 1 << 6);
    }

    #[test]
    fn test_rejects_bad_table_log() {
        let hist = vec![1u32, 1];
        assert!(matches!(
            NormalizedCounts::normalize(&hist, 2),
            Err(Error::TableLogTooLarge(2))
        ));
        assert!(matches!(
            NormalizedCounts::normalize(&hist, 20),
            Err(Error::TableLogTooLarge(20))
        ));
    }

    #[test]
    fn test_rejects_single_symbol() {
        let hist = vec![0u32, 42];
        assert!(matches!(
            NormalizedCounts::normalize(&hist, 6),
            Err(Error::NormalizeError)
        ));
    }

    #[test]
    fn test_rejects_too_many_low_probability_slots() {
        // table_log=5 -> table_size=32, cap = 2^(5-1)-1 = 15 low-prob slots.
        // 20 rare symbols (count=1, well under low_threshold) blow past that.
        let mut hist = vec![1000u32];
        hist.extend(std::iter::repeat_n(1u32, 20));

        assert!(matches!(
            NormalizedCounts::normalize(&hist, 5),
            Err(Error::NormalizeError)
        ));
    }

    #[test]
    fn test_optimal_table_log_respects_ceiling() {
        assert_eq!(NormalizedCounts::optimal_table_log(6, 10_000, 255), 6);
        assert_eq!(NormalizedCounts::optimal_table_log(0, 1, 1), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn test_fuzz_normalize_always_sums_correctly(
            weights in proptest::collection::vec(0u32..=500, 2..64),
            table_log in 5u8..=12,
        ) {
            let nonzero = weights.iter().filter(|&&w| w > 0).count();
            prop_assume!(nonzero >= 2);

            let norm = NormalizedCounts::normalize(&weights, table_log)?;
            let sum: i32 = norm
                .counts()
                .iter()
                .map(|&c| if c == -1 { 1 } else { c })
                .sum();
            prop_assert_eq!(sum, 1 << table_log);

            for (&w, &c) in weights.iter().zip(norm.counts()) {
                if w == 0 {
                    prop_assert_eq!(c, 0);
                } else {
                    prop_assert!(c != 0);
                }
            }
        }
    }
}
