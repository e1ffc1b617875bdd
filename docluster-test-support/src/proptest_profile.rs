//! Environment-driven proptest tuning shared by the property suites.

use std::env;

use proptest::test_runner::Config;

/// Environment variable overriding the number of cases per property.
pub const PROPTEST_CASES_ENV_KEY: &str = "DOCLUSTER_PROPTEST_CASES";

/// Builds a proptest [`Config`] running `default_cases` cases unless
/// [`PROPTEST_CASES_ENV_KEY`] holds a positive integer.
///
/// # Examples
///
/// ```
/// use docluster_test_support::proptest_profile::proptest_config;
///
/// let config = proptest_config(64);
/// assert!(config.cases > 0);
/// ```
#[must_use]
pub fn proptest_config(default_cases: u32) -> Config {
    let cases = match env::var(PROPTEST_CASES_ENV_KEY) {
        Ok(raw) => parse_cases(&raw).unwrap_or_else(|reason| {
            tracing::warn!(
                env = PROPTEST_CASES_ENV_KEY,
                raw = %raw,
                reason = %reason,
                "invalid property-test case override; using default",
            );
            default_cases
        }),
        Err(_) => default_cases,
    };
    Config {
        cases,
        ..Config::default()
    }
}

fn parse_cases(raw: &str) -> Result<u32, String> {
    let parsed = raw
        .trim()
        .parse::<u32>()
        .map_err(|error| format!("parse error: {error}"))?;
    if parsed == 0 {
        return Err("cases must be > 0".to_owned());
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::parse_cases;

    #[rstest]
    #[case("1", 1)]
    #[case(" 250 ", 250)]
    fn accepts_positive_counts(#[case] raw: &str, #[case] expected: u32) {
        assert_eq!(parse_cases(raw), Ok(expected));
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("abc")]
    fn rejects_invalid_counts(#[case] raw: &str) {
        assert!(parse_cases(raw).is_err());
    }
}
