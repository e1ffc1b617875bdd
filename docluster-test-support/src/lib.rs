//! Helpers shared by the docluster test suites.
//!
//! - [`tracing`]: a recording layer for asserting spans and events.
//! - [`fixtures`]: generated condensed trees for tree-extraction tests.
//! - [`proptest_profile`]: environment-tuned property-test configuration.

pub mod fixtures;
pub mod proptest_profile;
pub mod tracing;
