use crate::Error;

const MAX_BYTE_SYMBOL: usize = 255;
const MAX_WIDE_SYMBOL: usize = 4095;

/// Counts symbol frequencies over a byte source.
///
/// Returns the histogram (trimmed to the highest symbol actually seen) and
/// that highest symbol value. `max_symbol_value`, if given, bounds which
/// symbols are legal; a symbol above it is a caller error, not a silent
/// truncation.
pub fn count_u8(
    src: &[u8],
    max_symbol_value: Option<u8>,
) -> Result<(Vec<u32>, u8), Error> {
    if src.is_empty() {
        return Err(Error::SrcSizeWrong);
    }

    let cap = max_symbol_value.map(|v| v as usize).unwrap_or(MAX_BYTE_SYMBOL);
    if cap > MAX_BYTE_SYMBOL {
        return Err(Error::MaxSymbolValueTooLarge(cap));
    }

    let mut counts = vec![0u32; cap + 1];
    for &b in src {
        let sym = b as usize;
        if sym > cap {
            return Err(Error::MaxSymbolValueTooLarge(sym));
        }
        counts[sym] += 1;
    }

    let actual_max = counts.iter().rposition(|&c| c > 0).unwrap_or(0);
    counts.truncate(actual_max + 1);

    Ok((counts, actual_max as u8))
}

/// As [`count_u8`], but over 12-bit-wide symbol codes (the wide/u16 alphabet).
pub fn count_u16(
    src: &[u16],
    max_symbol_value: Option<u16>,
) -> Result<(Vec<u32>, u16), Error> {
    if src.is_empty() {
        return Err(Error::SrcSizeWrong);
    }

    let cap = max_symbol_value.map(|v| v as usize).unwrap_or(MAX_WIDE_SYMBOL);
    if cap > MAX_WIDE_SYMBOL {
        return Err(Error::MaxSymbolValueTooLarge(cap));
    }

    let mut counts = vec![0u32; cap + 1];
    for &s in src {
        let sym = s as usize;
        if sym > cap {
            return Err(Error::MaxSymbolValueTooLarge(sym));
        }
        counts[sym] += 1;
    }

    let actual_max = counts.iter().rposition(|&c| c > 0).unwrap_or(0);
    counts.truncate(actual_max + 1);

    Ok((counts, actual_max as u16))
}
