//! Shared knobs for the crate's property tests.

/// Resolves how many proptest cases a suite should run when its
/// module-level budget is `full`.
///
/// A `PROPTEST_CASES` environment override always wins. Without one,
/// CI runs the full budget while local runs are cut to a quarter of it,
/// keeping `cargo test` quick at the keyboard without starving the
/// generators entirely.
pub fn proptest_cases(full: u32) -> u32 {
    let override_cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok());

    match override_cases {
        Some(cases) => cases.max(1),
        None if std::env::var_os("CI").is_some() => full.max(1),
        None => (full / 4).max(1),
    }
}
