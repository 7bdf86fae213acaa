use fsec_foundation::const_assert;
use fsec_io::{BitReader, ReverseBitReader};

use crate::ncount::read_ncount;
use crate::normalization::{NormalizedCounts, MAX_TABLE_LOG, MIN_TABLE_LOG};
use crate::spread::spread_symbols;
use crate::Error;

#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
struct State(u32);

pub struct Decoder<'t> {
    state: State,
    table: &'t DecodingTable,
}

impl<'t> Decoder<'t> {
    pub fn new(table: &'t DecodingTable, src: &mut ReverseBitReader) -> Result<Self, Error> {
        let state = src.read(table.accuracy_log())?;
        Ok(Self {
            table,
            state: State(state as u32),
        })
    }

    #[inline(always)]
    pub fn decode(&mut self, src: &mut ReverseBitReader) -> Result<u16, Error> {
        let entry = &self.table[self.state];

        let bits = src.read(entry.n_bits)?;
        self.state = State(u32::from(entry.baseline) + bits as u32);

        Ok(entry.symbol)
    }

    #[inline(always)]
    pub fn bits_required(&self) -> u8 {
        self.table[self.state].n_bits
    }

    #[inline(always)]
    pub fn decode_padded(&mut self, src: &mut ReverseBitReader) -> u16 {
        let entry = &self.table[self.state];

        let bits = src.read_padded(entry.n_bits);
        self.state = State(u32::from(entry.baseline) + bits as u32);

        entry.symbol
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Entry {
    symbol: u16,
    n_bits: u8,
    baseline: u16,
}

// Wider than the teacher's own 4-byte, u8-symbol `Entry` (this one carries a
// 12-bit symbol for the wide alphabet), but still a fixed, small cell size
// worth pinning down at compile time.
const_assert!(std::mem::size_of::<Entry>() == 6);
const_assert!(std::mem::align_of::<Entry>() == 2);

#[derive(Debug)]
pub struct DecodingTable {
    entries: Box<[Entry]>,
    table_log: u8,
}

impl DecodingTable {
    /// Reads the NCount header from `r` and builds the table from it,
    /// returning the exact (byte-aligned) header length alongside so the
    /// caller can locate where the payload bitstream begins.
    pub fn read(r: &mut BitReader, max_symbols: usize, byte_budget: usize) -> Result<(Self, usize), Error> {
        let dist = read_ncount(r, max_symbols, MAX_TABLE_LOG)?;
        let header_len = r.bits_consumed().div_ceil(8);
        if header_len > byte_budget {
            return Err(Error::Corruption);
        }

        Ok((Self::from_distribution(&dist)?, header_len))
    }

    pub fn from_distribution(dist: &NormalizedCounts) -> Result<Self, Error> {
        let table_log = dist.table_log();
        if !(MIN_TABLE_LOG..=MAX_TABLE_LOG).contains(&table_log) {
            return Err(Error::TableLogTooLarge(table_log));
        }

        let table_size = 1usize << table_log;
        let symbols = spread_symbols(dist.counts(), table_log)?;

        let mut next_state: Vec<u16> = dist
            .counts()
            .iter()
            .map(|&c| if c == -1 { 1 } else { c.max(0) as u16 })
            .collect();

        let mut entries = vec![
            Entry {
                symbol: 0,
                n_bits: 0,
                baseline: 0,
            };
            table_size
        ]
        .into_boxed_slice();

        for (entry, &sym) in entries.iter_mut().zip(symbols.iter()) {
            if sym == u16::MAX {
                return Err(Error::TableUnderfilled);
            }

            let sym_idx = sym as usize;
            let state = *next_state.get(sym_idx).ok_or(Error::InvalidState)?;
            if state == 0 {
                return Err(Error::InvalidState);
            }
            next_state[sym_idx] += 1;

            let n_bits = (table_log + state.leading_zeros() as u8) - 15;

            entry.symbol = sym;
            entry.n_bits = n_bits;
            entry.baseline = (state << n_bits).wrapping_sub(table_size as u16);
        }

        Ok(Self { entries, table_log })
    }

    pub const fn accuracy_log(&self) -> u8 {
        self.table_log
    }
}

impl std::ops::Index<State> for DecodingTable {
    type Output = Entry;

    #[inline(always)]
    fn index(&self, index: State) -> &Self::Output {
        &self.entries[index.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_rfc_appendix_a() {
        // RFC 8878 Appendix A: Literal Length Code, accuracy log 6 (N=64).
        let counts: [i32; 36] = [
            4, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 1, 1,
            1, 1, 1, -1, -1, -1, -1,
        ];

        let dist = NormalizedCounts::from_parts(counts.to_vec(), 6);
        let table = DecodingTable::from_distribution(&dist).expect("table construction failed");

        // State | Symbol | Number_Of_Bits | Base
        let expected = [
            (0, 0, 4, 0),
            (1, 0, 4, 16),
            (2, 1, 5, 32),
            (3, 3, 5, 0),
            (4, 4, 5, 0),
            (5, 6, 5, 0),
        ];

        for (state_idx, sym, nb, base) in expected {
            let entry = &table.entries[state_idx];
            assert_eq!(entry.symbol, sym, "State {state_idx}: symbol mismatch");
            assert_eq!(entry.n_bits, nb, "State {state_idx}: bits mismatch");
            assert_eq!(entry.baseline, base, "State {state_idx}: base mismatch");
        }

        let entry_60 = &table.entries[60];
        assert_eq!(entry_60.symbol, 35);
        assert_eq!(entry_60.n_bits, 6);
        assert_eq!(entry_60.baseline, 0);

        let entry_63 = &table.entries[63];
        assert_eq!(entry_63.symbol, 32);
        assert_eq!(entry_63.n_bits, 6);
        assert_eq!(entry_63.baseline, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn test_fuzz_distribution_256(
            weights in proptest::collection::vec(0u32..1000, 2..200)
        ) {
            let sum: u64 = weights.iter().map(|&x| x as u64).sum();
            if sum == 0 {
                return Ok(());
            }

            let norm = match NormalizedCounts::normalize(&weights, 8) {
                Ok(n) => n,
                Err(_) => return Ok(()),
            };

            let _ = DecodingTable::from_distribution(&norm)?;
        }
    }
}
