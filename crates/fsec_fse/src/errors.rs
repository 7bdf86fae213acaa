#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(code(fsec::fse::io))]
    IO(#[from] fsec_io::Error),

    #[error("Invalid accuracy log: {0}")]
    #[diagnostic(
        code(fsec::fse::invalid_accuracy_log),
        help("The accuracy log must be within valid bounds.")
    )]
    InvalidAccuracyLog(u8),

    #[error("FSE accuracy log mismatch. Expected <= {0}, got {1}")]
    #[diagnostic(
        code(fsec::fse::accuracy_log_mismatch),
        help("The decoded accuracy log exceeds the table's maximum capability.")
    )]
    AccuracyLogMismatch(u8, u8),

    #[error("Too many symbols")]
    #[diagnostic(
        code(fsec::fse::too_many_symbols),
        help("The number of symbols exceeds the maximum allowed.")
    )]
    TooManySymbols,

    #[error("FSE sum mismatch. Expected 0 remaining, got {0}")]
    #[diagnostic(
        code(fsec::fse::sum_mismatch),
        help("The sum of probabilities does not match the expected power of 2.")
    )]
    SumMismatch(i32),

    #[error("Spread overflow")]
    #[diagnostic(
        code(fsec::fse::spread_overflow),
        help("The spread of symbols overflowed the table size.")
    )]
    SpreadOverflow,

    #[error("Fast-spread alignment error (pos: {0})")]
    #[diagnostic(
        code(fsec::fse::fast_spread_alignment),
        help(
            "Alignment error during fast spread table construction. This usually implies the table size and steps are not coprime or distribution is invalid."
        )
    )]
    FastSpreadAlignmentError(usize),

    #[error("Table overflow")]
    #[diagnostic(
        code(fsec::fse::table_overflow),
        help(
            "The FSE table size exceeded the limit during low probability symbol spreading."
        )
    )]
    TableOverflow,

    #[error("Table underfilled")]
    #[diagnostic(
        code(fsec::fse::table_underfilled),
        help("The FSE table was not completely filled.")
    )]
    TableUnderfilled,

    #[error("Invalid state")]
    #[diagnostic(
        code(fsec::fse::invalid_state),
        help("The FSE state is invalid or out of bounds (state was 0).")
    )]
    InvalidState,

    #[error("Data corruption detected")]
    #[diagnostic(
        code(fsec::fse::corruption),
        help("The FSE encoded data appears to be corrupted.")
    )]
    Corruption,

    #[error("Destination buffer is too small")]
    #[diagnostic(
        code(fsec::fse::dst_too_small),
        help("Grow the destination buffer and retry.")
    )]
    DstTooSmall,

    #[error("Source size is wrong for this operation")]
    #[diagnostic(
        code(fsec::fse::src_size_wrong),
        help("An empty source, or a source whose declared size doesn't match its content, was passed in.")
    )]
    SrcSizeWrong,

    #[error("Requested table log {0} exceeds the maximum supported value")]
    #[diagnostic(
        code(fsec::fse::table_log_too_large),
        help("Table log must fall within the 5..=15 (byte) or 5..=16 (wide) range.")
    )]
    TableLogTooLarge(u8),

    #[error("Max symbol value {0} exceeds the maximum supported value")]
    #[diagnostic(
        code(fsec::fse::max_symbol_value_too_large),
        help("The byte alphabet is bounded to 255, the wide alphabet to 4095.")
    )]
    MaxSymbolValueTooLarge(usize),

    #[error("Failed to normalize the histogram to the requested table log")]
    #[diagnostic(
        code(fsec::fse::normalize_error),
        help("The histogram couldn't be distributed onto a table of this size; try a larger table log.")
    )]
    NormalizeError,

    #[error("{0}")]
    #[diagnostic(code(fsec::fse::generic))]
    GenericError(String),
}
