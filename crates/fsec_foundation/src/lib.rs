//! Small compile-time helpers shared across the workspace.

/// Asserts a `const` boolean expression at compile time.
///
/// Unlike `assert!`, this never costs anything at runtime: a failing
/// assertion is a build error, not a panic.
#[macro_export]
macro_rules! const_assert {
    ($cond:expr) => {
        const _: () = assert!($cond);
    };
    ($cond:expr, $msg:expr) => {
        const _: () = assert!($cond, $msg);
    };
}

#[cfg(test)]
mod tests {
    const_assert!(1 + 1 == 2);

    #[test]
    fn compiles() {}
}
