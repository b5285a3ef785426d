//! Test suite for the jukebox bot
//! Unit tests live next to the code in `src/`; these drive guild sessions end to end.

pub mod integration;

// Re-export commonly used testing utilities
pub use assert_matches::assert_matches;
pub use pretty_assertions::{assert_eq, assert_ne};
pub use rstest::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_setup() {
        common::init_tracing();
        common::init_tracing();
    }
}
