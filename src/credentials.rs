//! API key lookup.
//!
//! Providers are tried in order and the first non-blank key wins:
//! 1. the environment variable named by `api_key_env` (after `.env` is loaded)
//! 2. `api_key` in the config file
//! 3. the same key name inside each configured TOML secrets file

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::CredentialError;

/// A resolved API key and where it came from
#[derive(Clone, PartialEq)]
pub struct Credential {
    pub api_key: String,
    pub source: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// A single place an API key may come from.
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> String;

    /// `Ok(None)` when this provider simply has no key.
    fn fetch(&self) -> Result<Option<String>, CredentialError>;
}

/// Reads the key from an environment variable
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn name(&self) -> String {
        format!("env:{}", self.var)
    }

    fn fetch(&self) -> Result<Option<String>, CredentialError> {
        match std::env::var(&self.var) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(CredentialError::Provider {
                provider: self.name(),
                message: "value is not valid unicode".to_string(),
            }),
        }
    }
}

/// Key stored in the config file by `chingu set-key`
pub struct ConfigCredentialProvider {
    api_key: Option<String>,
}

impl ConfigCredentialProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

impl CredentialProvider for ConfigCredentialProvider {
    fn name(&self) -> String {
        "config".to_string()
    }

    fn fetch(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.api_key.clone())
    }
}

/// Reads `KEY = "..."` from a flat TOML secrets file
pub struct SecretsFileProvider {
    path: PathBuf,
    key: String,
}

impl SecretsFileProvider {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }
}

impl CredentialProvider for SecretsFileProvider {
    fn name(&self) -> String {
        format!("secrets:{}", self.path.display())
    }

    fn fetch(&self) -> Result<Option<String>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let provider_error = |message: String| CredentialError::Provider {
            provider: self.name(),
            message,
        };

        let content = fs::read_to_string(&self.path).map_err(|e| provider_error(e.to_string()))?;
        let table: toml::Table = toml::from_str(&content).map_err(|e| provider_error(e.to_string()))?;

        match table.get(&self.key) {
            None => Ok(None),
            Some(toml::Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(provider_error(format!("{} is not a string", self.key))),
        }
    }
}

/// The default lookup order for a configuration
pub fn default_chain(config: &Config) -> Vec<Box<dyn CredentialProvider>> {
    let mut chain: Vec<Box<dyn CredentialProvider>> = vec![
        Box::new(EnvCredentialProvider::new(&config.api_key_env)),
        Box::new(ConfigCredentialProvider::new(config.api_key.clone())),
    ];

    for path in &config.secrets_files {
        chain.push(Box::new(SecretsFileProvider::new(path, &config.api_key_env)));
    }

    chain
}

/// Walk the chain; first non-blank key wins.
///
/// A provider that fails is logged and skipped.
pub fn resolve(chain: &[Box<dyn CredentialProvider>]) -> Result<Credential, CredentialError> {
    for provider in chain {
        match provider.fetch() {
            Ok(Some(key)) if !key.trim().is_empty() => {
                debug!(source = %provider.name(), "API key resolved");
                return Ok(Credential {
                    api_key: key.trim().to_string(),
                    source: provider.name(),
                });
            }
            Ok(_) => debug!(source = %provider.name(), "no API key"),
            Err(e) => warn!(error = %e, "credential provider failed"),
        }
    }

    Err(CredentialError::NoCredentialFound {
        tried: chain
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl CredentialProvider for Fixed {
        fn name(&self) -> String {
            format!("fixed:{:?}", self.0)
        }

        fn fetch(&self) -> Result<Option<String>, CredentialError> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct Broken;

    impl CredentialProvider for Broken {
        fn name(&self) -> String {
            "broken".to_string()
        }

        fn fetch(&self) -> Result<Option<String>, CredentialError> {
            Err(CredentialError::Provider {
                provider: self.name(),
                message: "boom".to_string(),
            })
        }
    }

    #[test]
    fn test_first_success_wins() {
        let chain: Vec<Box<dyn CredentialProvider>> = vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some("first"))),
            Box::new(Fixed(Some("second"))),
        ];
        let credential = resolve(&chain).unwrap();
        assert_eq!(credential.api_key, "first");
        assert_eq!(credential.source, "fixed:Some(\"first\")");
    }

    #[test]
    fn test_blank_values_and_failures_are_skipped() {
        let chain: Vec<Box<dyn CredentialProvider>> = vec![
            Box::new(Fixed(Some("   "))),
            Box::new(Broken),
            Box::new(Fixed(Some(" key \n"))),
        ];
        assert_eq!(resolve(&chain).unwrap().api_key, "key");
    }

    #[test]
    fn test_exhausted_chain_reports_no_credential() {
        let chain: Vec<Box<dyn CredentialProvider>> = vec![Box::new(Fixed(None)), Box::new(Broken)];
        match resolve(&chain) {
            Err(CredentialError::NoCredentialFound { tried }) => {
                assert_eq!(tried, "fixed:None, broken");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_env_provider() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("CHINGU_TEST_ENV_PROVIDER_KEY", "from-env") };
        let provider = EnvCredentialProvider::new("CHINGU_TEST_ENV_PROVIDER_KEY");
        assert_eq!(provider.fetch().unwrap(), Some("from-env".to_string()));
        // SAFETY: see above.
        unsafe { std::env::remove_var("CHINGU_TEST_ENV_PROVIDER_KEY") };

        let missing = EnvCredentialProvider::new("CHINGU_TEST_ENV_PROVIDER_MISSING");
        assert_eq!(missing.fetch().unwrap(), None);
    }

    #[test]
    fn test_secrets_file_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "MISTRAL_API_KEY = \"from-file\"\nOTHER = 3\n").unwrap();

        let provider = SecretsFileProvider::new(&path, "MISTRAL_API_KEY");
        assert_eq!(provider.fetch().unwrap(), Some("from-file".to_string()));

        let wrong_type = SecretsFileProvider::new(&path, "OTHER");
        assert!(wrong_type.fetch().is_err());

        let absent_key = SecretsFileProvider::new(&path, "NOPE");
        assert_eq!(absent_key.fetch().unwrap(), None);

        let absent_file = SecretsFileProvider::new(dir.path().join("missing.toml"), "MISTRAL_API_KEY");
        assert_eq!(absent_file.fetch().unwrap(), None);
    }

    #[test]
    fn test_malformed_secrets_file_is_a_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        fs::write(&path, "MISTRAL_API_KEY = ").unwrap();
        assert!(matches!(
            SecretsFileProvider::new(&path, "MISTRAL_API_KEY").fetch(),
            Err(CredentialError::Provider { .. })
        ));
    }

    #[test]
    fn test_default_chain_order() {
        let mut config = Config::default();
        config.api_key_env = "CHINGU_TEST_DEFAULT_CHAIN_UNSET".to_string();
        config.api_key = Some("from-config".to_string());
        config.secrets_files = vec![PathBuf::from("/nonexistent/secrets.toml")];

        let chain = default_chain(&config);
        let names: Vec<_> = chain.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec![
                "env:CHINGU_TEST_DEFAULT_CHAIN_UNSET".to_string(),
                "config".to_string(),
                "secrets:/nonexistent/secrets.toml".to_string(),
            ]
        );

        let credential = resolve(&chain).unwrap();
        assert_eq!(credential.api_key, "from-config");
        assert_eq!(credential.source, "config");
    }
}
