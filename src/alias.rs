//! Alias requests and suffix validation.

use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::config::{AliasPolicy, PublishConfig};
use crate::error::AliasError;
use crate::metrics;

/// An alias name to publish as a CNAME for this host (e.g. `foo.local`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRequest {
    name: String,
    valid: bool,
}

impl AliasRequest {
    /// Validate `name` against `suffix` and wrap it.
    ///
    /// A rejected alias is reported here; whether it is still published is
    /// decided by [`select_aliases`].
    pub fn new(name: impl Into<String>, suffix: &str) -> Self {
        let name = name.into();
        let valid = match validate(&name, suffix) {
            Ok(()) => true,
            Err(e) => {
                warn!(alias = %e.alias, suffix = %e.suffix, "{}", e);
                metrics::record_alias_rejected();
                false
            }
        };
        Self { name, valid }
    }

    /// The alias as given on the command line.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the alias passed suffix validation.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl fmt::Display for AliasRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An alias that does not end with the configured suffix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid alias {alias}, must end with {suffix}")]
pub struct InvalidAlias {
    /// The rejected alias.
    pub alias: String,
    /// The suffix it was expected to end with.
    pub suffix: String,
}

/// Check that `alias` ends with `suffix`, byte for byte.
pub fn validate(alias: &str, suffix: &str) -> Result<(), InvalidAlias> {
    if alias.len() >= suffix.len() && alias.as_bytes().ends_with(suffix.as_bytes()) {
        return Ok(());
    }
    Err(InvalidAlias {
        alias: alias.to_string(),
        suffix: suffix.to_string(),
    })
}

/// Validate every name and keep the ones `policy` allows, in input order.
pub fn select_aliases<I, S>(names: I, suffix: &str, policy: AliasPolicy) -> Vec<AliasRequest>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names
        .into_iter()
        .map(|name| AliasRequest::new(name, suffix))
        .filter(|alias| alias.is_valid() || policy == AliasPolicy::Flag)
        .collect()
}

/// Like [`select_aliases`] with the configured suffix and policy, but an
/// empty result is a usage error.
pub fn publishable_aliases<I, S>(
    names: I,
    publish: &PublishConfig,
) -> Result<Vec<AliasRequest>, AliasError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let aliases = select_aliases(names, &publish.suffix, publish.alias_policy);
    if aliases.is_empty() {
        return Err(AliasError::Usage(format!(
            "no alias ends with {}",
            publish.suffix
        )));
    }
    Ok(aliases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_suffix() {
        assert!(validate("foo.local", ".local").is_ok());
        assert!(validate("a.b.local", ".local").is_ok());
    }

    #[test]
    fn test_validate_accepts_bare_suffix() {
        assert!(validate(".local", ".local").is_ok());
    }

    #[test]
    fn test_validate_rejects_shorter_than_suffix() {
        let err = validate("local", ".local").unwrap_err();
        assert_eq!(err.alias, "local");
        assert_eq!(err.suffix, ".local");
        assert!(validate("", ".local").is_err());
    }

    #[test]
    fn test_validate_rejects_other_tail() {
        assert!(validate("foo.lan", ".local").is_err());
        assert!(validate("foo.local.", ".local").is_err());
        assert!(validate("foolocal", ".local").is_err());
    }

    #[test]
    fn test_rejection_names_alias_and_suffix() {
        let err = validate("foo.lan", ".local").unwrap_err();
        assert_eq!(err.to_string(), "Invalid alias foo.lan, must end with .local");
    }

    #[test]
    fn test_validate_is_case_sensitive() {
        assert!(validate("foo.LOCAL", ".local").is_err());
    }

    #[test]
    fn test_validate_custom_suffix() {
        assert!(validate("printer.home.arpa", ".home.arpa").is_ok());
        assert!(validate("printer.local", ".home.arpa").is_err());
    }

    #[test]
    fn test_flag_policy_keeps_rejected_aliases() {
        let aliases = select_aliases(["foo.local", "bar.lan"], ".local", AliasPolicy::Flag);
        let names: Vec<&str> = aliases.iter().map(AliasRequest::name).collect();
        assert_eq!(names, ["foo.local", "bar.lan"]);
        assert!(aliases[0].is_valid());
        assert!(!aliases[1].is_valid());
    }

    #[test]
    fn test_exclude_policy_drops_rejected_aliases() {
        let aliases = select_aliases(
            ["bar.lan", "foo.local", "baz.local"],
            ".local",
            AliasPolicy::Exclude,
        );
        let names: Vec<&str> = aliases.iter().map(AliasRequest::name).collect();
        assert_eq!(names, ["foo.local", "baz.local"]);
    }

    #[test]
    fn test_nothing_left_is_usage_error() {
        let publish = PublishConfig {
            alias_policy: AliasPolicy::Exclude,
            ..PublishConfig::default()
        };
        let err = publishable_aliases(["foo.lan", "bar.home"], &publish).unwrap_err();
        assert!(matches!(err, AliasError::Usage(_)));
        assert_eq!(
            err.to_string(),
            "No aliases to publish: no alias ends with .local"
        );
    }

    #[test]
    fn test_flag_policy_never_empties_the_list() {
        let publish = PublishConfig::default();
        let aliases = publishable_aliases(["foo.lan"], &publish).unwrap();
        assert_eq!(aliases.len(), 1);
    }
}
