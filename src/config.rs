//! Configuration loading via `ortho-config`.

use std::fmt;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::de::{Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Validated dry-run flag.
///
/// Configuration files may carry this value either as a real boolean or as
/// the string literals `"True"`/`"False"`. Both spellings are accepted at
/// load time; anything else is rejected there rather than being coerced
/// downstream. Serializes as a plain boolean.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DryRun(bool);

impl DryRun {
    /// Wraps an already-validated boolean.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self(enabled)
    }

    /// Returns the validated flag.
    #[must_use]
    pub const fn enabled(self) -> bool {
        self.0
    }
}

impl std::str::FromStr for DryRun {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("true") {
            Ok(Self(true))
        } else if value.eq_ignore_ascii_case("false") {
            Ok(Self(false))
        } else {
            Err(format!("expected \"true\" or \"false\", got {value:?}"))
        }
    }
}

impl<'de> Deserialize<'de> for DryRun {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DryRunVisitor)
    }
}

struct DryRunVisitor;

impl Visitor<'_> for DryRunVisitor {
    type Value = DryRun;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a boolean or the literals \"true\"/\"false\"")
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(DryRun(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if value.eq_ignore_ascii_case("true") {
            Ok(DryRun(true))
        } else if value.eq_ignore_ascii_case("false") {
            Ok(DryRun(false))
        } else {
            Err(E::invalid_value(Unexpected::Str(value), &self))
        }
    }
}

/// Resolved credential source for the provider client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CredentialMode {
    /// Authenticate with a token taken from a named profile in the user's
    /// credential store. `None` selects the default profile.
    Profile {
        /// Profile name, when not the default one.
        name: Option<String>,
    },
    /// Authenticate with an explicit key pair from the configuration.
    Keys {
        /// Public half of the key pair.
        access_key: String,
        /// Secret half of the key pair.
        secret_key: String,
    },
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

/// Mezha configuration derived from environment variables, configuration
/// files, and defaults.
#[derive(Clone, Debug, Deserialize, Eq, OrthoConfig, PartialEq, Serialize)]
#[ortho_config(prefix = "MEZHA")]
pub struct MezhaConfig {
    /// Default dry-run flag forwarded to every provider call unless the
    /// caller overrides it per operation.
    #[ortho_config(default = DryRun::new(false))]
    pub dry_run: DryRun,
    /// Directory receiving JSON exports.
    #[ortho_config(default = Utf8PathBuf::from("logs"))]
    pub log_path: Utf8PathBuf,
    /// Base URL of the provider's network/compute API. This value is
    /// required.
    pub api_base_url: String,
    /// When set, authenticate via the user's credential store instead of an
    /// explicit key pair.
    #[ortho_config(default = false)]
    pub use_profile: bool,
    /// Profile to select from the credential store. Ignored unless
    /// `use_profile` is set.
    pub profile_name: Option<String>,
    /// Explicit access key. Required when `use_profile` is off.
    pub access_key: Option<String>,
    /// Explicit secret key. Required when `use_profile` is off. Never
    /// serialized back out.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
}

impl MezhaConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to mezha.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("mezha")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Resolves the effective dry-run flag for one operation.
    #[must_use]
    pub const fn dry_run_or(&self, override_flag: Option<bool>) -> bool {
        match override_flag {
            Some(flag) => flag,
            None => self.dry_run.enabled(),
        }
    }

    /// Resolves how the provider client should authenticate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] when profile mode is off
    /// and the explicit key pair is absent or blank.
    pub fn credential_mode(&self) -> Result<CredentialMode, ConfigError> {
        if self.use_profile {
            let name = self
                .profile_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned);
            return Ok(CredentialMode::Profile { name });
        }

        let access_key = self.access_key.as_deref().map_or("", str::trim);
        let secret_key = self.secret_key.as_deref().map_or("", str::trim);
        if access_key.is_empty() || secret_key.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(CredentialMode::Keys {
            access_key: access_key.to_owned(),
            secret_key: secret_key.to_owned(),
        })
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::MissingCredentials`] when no credential source is
    /// configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.api_base_url,
            &FieldMetadata::new("provider API base URL", "MEZHA_API_BASE_URL", "api_base_url"),
        )?;
        Self::require_field(
            self.log_path.as_str(),
            &FieldMetadata::new("export directory", "MEZHA_LOG_PATH", "log_path"),
        )?;
        self.credential_mode().map(|_| ())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader, including rejected
    /// dry-run literals.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Neither profile mode nor an explicit key pair is configured.
    #[error("no usable credentials: enable use_profile or set both access_key and secret_key")]
    MissingCredentials,
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base_config() -> MezhaConfig {
        MezhaConfig {
            dry_run: DryRun::new(false),
            log_path: Utf8PathBuf::from("logs"),
            api_base_url: String::from("https://api.example.test/v1"),
            use_profile: false,
            profile_name: None,
            access_key: Some(String::from("AK")),
            secret_key: Some(String::from("SK")),
        }
    }

    #[rstest]
    #[case("true", true)]
    #[case("True", true)]
    #[case("FALSE", false)]
    #[case("false", false)]
    fn dry_run_accepts_boolean_literals(#[case] literal: &str, #[case] expected: bool) {
        let json = format!("\"{literal}\"");
        let parsed: DryRun = serde_json::from_str(&json)
            .unwrap_or_else(|err| panic!("literal {literal} should parse: {err}"));
        assert_eq!(parsed.enabled(), expected);
    }

    #[test]
    fn dry_run_accepts_real_booleans() {
        let parsed: DryRun = serde_json::from_str("true")
            .unwrap_or_else(|err| panic!("boolean should parse: {err}"));
        assert!(parsed.enabled());
    }

    #[rstest]
    #[case("\"maybe\"")]
    #[case("\"yes\"")]
    #[case("1")]
    fn dry_run_rejects_unrecognized_input(#[case] json: &str) {
        let parsed = serde_json::from_str::<DryRun>(json);
        assert!(parsed.is_err(), "{json} should be rejected");
    }

    #[test]
    fn credential_mode_prefers_explicit_keys() {
        let config = base_config();
        let mode = config
            .credential_mode()
            .unwrap_or_else(|err| panic!("keys should resolve: {err}"));
        assert_eq!(
            mode,
            CredentialMode::Keys {
                access_key: String::from("AK"),
                secret_key: String::from("SK"),
            }
        );
    }

    #[test]
    fn credential_mode_profile_trims_blank_name() {
        let config = MezhaConfig {
            use_profile: true,
            profile_name: Some(String::from("   ")),
            ..base_config()
        };
        let mode = config
            .credential_mode()
            .unwrap_or_else(|err| panic!("profile mode should resolve: {err}"));
        assert_eq!(mode, CredentialMode::Profile { name: None });
    }

    #[test]
    fn credential_mode_requires_some_source() {
        let config = MezhaConfig {
            access_key: None,
            secret_key: None,
            ..base_config()
        };
        assert_eq!(
            config.credential_mode(),
            Err(ConfigError::MissingCredentials)
        );
    }

    #[test]
    fn validate_rejects_blank_base_url() {
        let config = MezhaConfig {
            api_base_url: String::from("  "),
            ..base_config()
        };
        let Err(ConfigError::MissingField(message)) = config.validate() else {
            panic!("blank base URL should fail validation");
        };
        assert!(message.contains("MEZHA_API_BASE_URL"));
    }

    #[test]
    fn secret_key_is_not_serialized() {
        let value = serde_json::to_value(base_config())
            .unwrap_or_else(|err| panic!("config should serialize: {err}"));
        let object = value
            .as_object()
            .unwrap_or_else(|| panic!("expected a JSON object"));
        assert!(object.contains_key("access_key"));
        assert!(!object.contains_key("secret_key"));
    }
}
