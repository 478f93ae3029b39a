//! Logging macros for the matching phases.
//!
//! They forward to `tracing` when the `tracing` feature is on, and always
//! under `cfg(test)` so unit tests can be inspected with `EUCALYPT_LOG`.
//! Otherwise every call expands to nothing and the arguments are never
//! evaluated.

/// Log a single matching or suppression decision.
#[cfg(any(test, feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "eucalypt", $($arg)*)
    };
}

/// Log a single matching or suppression decision (compiled out).
#[cfg(not(any(test, feature = "tracing")))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Log the entry or exit of a phase, with counts.
#[cfg(any(test, feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "eucalypt", $($arg)*)
    };
}

/// Log the entry or exit of a phase, with counts (compiled out).
#[cfg(not(any(test, feature = "tracing")))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
