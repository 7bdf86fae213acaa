use fsec_io::{BitReader, ForwardBitWriter};

use crate::normalization::{NormalizedCounts, MAX_TABLE_LOG, MIN_TABLE_LOG};
use crate::Error;

/// Reads the bit-packed normalized-count header described in §6: a 4-bit
/// accuracy log (biased by [`MIN_TABLE_LOG`]) followed by one variable-width
/// code per symbol — a threshold-coded value for nonzero/-1 probabilities,
/// or a run of 2-bit repeat tokens (continuing while the token reads 3) for
/// consecutive zero-probability symbols.
pub fn read_ncount(
    r: &mut BitReader,
    max_symbols: usize,
    max_table_log: u8,
) -> Result<NormalizedCounts, Error> {
    let read_log = MIN_TABLE_LOG + r.read(4)? as u8;

    if read_log > MAX_TABLE_LOG {
        return Err(Error::TableLogTooLarge(read_log));
    }
    if read_log > max_table_log {
        return Err(Error::TableLogTooLarge(read_log));
    }

    let mut counts = vec![0i32; max_symbols];
    let mut symbol_idx = 0usize;
    let mut remaining: i32 = 1i32 << read_log;

    while remaining > 0 {
        if symbol_idx >= max_symbols {
            return Err(Error::TooManySymbols);
        }

        let n_bits = (remaining + 1).ilog2() as u8;
        let mut val = r.read(n_bits)? as i32;
        let threshold = (1 << (n_bits + 1)) - (remaining + 2);

        if val >= threshold {
            let extra = r.read(1)? as i32;
            val += extra * ((1 << n_bits) - threshold);
        }

        let prob = val - 1;
        let state = if prob == -1 { 1 } else { prob };

        counts[symbol_idx] = prob;
        symbol_idx += 1;

        if prob != 0 {
            remaining -= state;
        } else {
            loop {
                if symbol_idx >= max_symbols {
                    return Err(Error::TooManySymbols);
                }

                let repeat = r.read(2)? as usize;
                if symbol_idx + repeat > max_symbols {
                    return Err(Error::TooManySymbols);
                }

                symbol_idx += repeat;
                if repeat != 3 {
                    break;
                }
            }
        }
    }

    if remaining != 0 {
        return Err(Error::SumMismatch(remaining));
    }

    counts.truncate(symbol_idx.max(1));
    Ok(NormalizedCounts::from_parts(counts, read_log))
}

/// Writes the header [`read_ncount`] parses, for the normalized counts
/// produced by [`crate::normalization::NormalizedCounts::normalize`].
///
/// Uses a [`ForwardBitWriter`] rather than the tail-anchored
/// [`fsec_io::BitWriter`]: the header must be self-terminating and readable
/// byte-aligned from the front, since the decoder needs `table_log` before
/// it can even locate the payload bitstream's own end marker.
pub fn write_ncount(w: &mut ForwardBitWriter, norm: &NormalizedCounts) -> Result<(), Error> {
    let table_log = norm.table_log();
    w.add_bits(u64::from(table_log - MIN_TABLE_LOG), 4)?;

    let counts = norm.counts();
    let mut remaining: i32 = 1i32 << table_log;
    let mut idx = 0usize;

    while idx < counts.len() && remaining > 0 {
        let prob = counts[idx];
        let n_bits = (remaining + 1).ilog2() as u8;
        let threshold = (1 << (n_bits + 1)) - (remaining + 2);

        if prob == 0 {
            write_coded_value(w, 1, n_bits, threshold)?;
            idx += 1;

            let mut run = 0usize;
            while idx + run < counts.len() && counts[idx + run] == 0 {
                run += 1;
            }

            let mut left = run;
            loop {
                let chunk = left.min(3);
                w.add_bits(chunk as u64, 2)?;
                left -= chunk;
                if chunk != 3 {
                    break;
                }
            }
            idx += run;
            continue;
        }

        let state = if prob == -1 { 1 } else { prob };
        write_coded_value(w, prob + 1, n_bits, threshold)?;

        remaining -= state;
        idx += 1;
    }

    Ok(())
}

fn write_coded_value(
    w: &mut ForwardBitWriter,
    val: i32,
    n_bits: u8,
    threshold: i32,
) -> Result<(), Error> {
    if val < threshold {
        w.add_bits(val as u64, n_bits)?;
    } else {
        let low = val - ((1i32 << n_bits) - threshold);
        w.add_bits(low as u64, n_bits)?;
        w.add_bits(1, 1)?;
    }
    Ok(())
}
