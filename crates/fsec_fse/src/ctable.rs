use fsec_io::BitWriter;

use crate::normalization::{NormalizedCounts, MAX_TABLE_LOG, MIN_TABLE_LOG};
use crate::spread::spread_symbols;
use crate::Error;

/// An FSE encoding state: always in `[tableSize, 2*tableSize)` in steady
/// operation, narrower only right after [`EncodingTable::init_state`].
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct State(u32);

/// Per-symbol packed transform: `delta_nb_bits` folds `nbBitsOut` into a
/// single value such that `(state.wrapping_add(delta_nb_bits)) >> 16`
/// yields the bit count to emit, and `delta_find_state` offsets into
/// [`EncodingTable`]'s next-state table to find the post-shift destination
/// cell. Both rely on wrapping 32-bit arithmetic exactly as the cell values
/// are computed in [`from_distribution`](EncodingTable::from_distribution) —
/// this is the mirror image of [`crate::dtable::DecodingTable`].
#[derive(Debug, Clone, Copy)]
struct SymbolTransform {
    delta_find_state: i32,
    delta_nb_bits: u32,
}

#[derive(Debug)]
pub struct EncodingTable {
    next_state_table: Box<[u16]>,
    symbol_tt: Box<[SymbolTransform]>,
    table_log: u8,
}

impl EncodingTable {
    pub fn from_distribution(dist: &NormalizedCounts) -> Result<Self, Error> {
        let table_log = dist.table_log();
        if !(MIN_TABLE_LOG..=MAX_TABLE_LOG).contains(&table_log) {
            return Err(Error::TableLogTooLarge(table_log));
        }

        let table_size = 1usize << table_log;
        let counts = dist.counts();
        let symbols = spread_symbols(counts, table_log)?;

        let mut starts = vec![0u32; counts.len()];
        let mut total = 0u32;
        for (s, &c) in counts.iter().enumerate() {
            starts[s] = total;
            total += if c == -1 { 1 } else { c.max(0) as u32 };
        }
        if total as usize != table_size {
            return Err(Error::SumMismatch(table_size as i32 - total as i32));
        }

        let mut symbol_tt = vec![
            SymbolTransform {
                delta_find_state: 0,
                delta_nb_bits: 0,
            };
            counts.len()
        ];

        for (s, &c) in counts.iter().enumerate() {
            if c == 0 {
                continue;
            }

            let count = if c == -1 { 1 } else { c as u32 };
            let delta_find_state = starts[s] as i64 - i64::from(count);

            let delta_nb_bits = if count <= 1 {
                (u32::from(table_log) << 16).wrapping_sub(1u32 << table_log)
            } else {
                let max_bits_out = table_log - highbit32(count - 1);
                let min_state_plus = count << max_bits_out;
                (u32::from(max_bits_out) << 16).wrapping_sub(min_state_plus)
            };

            symbol_tt[s] = SymbolTransform {
                delta_find_state: delta_find_state as i32,
                delta_nb_bits,
            };
        }

        let mut next_state_table = vec![0u16; table_size];
        let mut cursor = starts;
        for (u, &sym) in symbols.iter().enumerate() {
            let sym_idx = sym as usize;
            let slot = cursor.get_mut(sym_idx).ok_or(Error::InvalidState)?;
            next_state_table[*slot as usize] = (table_size + u) as u16;
            *slot += 1;
        }

        Ok(Self {
            next_state_table: next_state_table.into_boxed_slice(),
            symbol_tt: symbol_tt.into_boxed_slice(),
            table_log,
        })
    }

    #[inline(always)]
    pub const fn init_state(&self) -> State {
        State(1u32 << self.table_log)
    }

    #[inline(always)]
    pub fn encode(&self, state: State, symbol: u16, w: &mut BitWriter) -> Result<State, Error> {
        let tt = self
            .symbol_tt
            .get(symbol as usize)
            .ok_or(Error::MaxSymbolValueTooLarge(symbol as usize))?;

        let nb_bits = (state.0.wrapping_add(tt.delta_nb_bits) >> 16) as u8;
        w.add_bits(u64::from(state.0), nb_bits);

        let idx = (state.0 >> nb_bits).wrapping_add(tt.delta_find_state as u32) as usize;
        let next = *self
            .next_state_table
            .get(idx)
            .ok_or(Error::InvalidState)?;

        Ok(State(u32::from(next)))
    }

    /// Emits the final state as `table_log` bits, the last thing written
    /// before the bit stream's own end marker.
    #[inline(always)]
    pub fn flush(&self, state: State, w: &mut BitWriter) {
        w.add_bits(u64::from(state.0), self.table_log);
    }

    pub const fn table_log(&self) -> u8 {
        self.table_log
    }
}

fn highbit32(v: u32) -> u8 {
    31 - v.leading_zeros() as u8
}
