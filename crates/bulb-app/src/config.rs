use std::path::PathBuf;

use bulb_core::CreatePolicy;
use bulb_core::chat::DEFAULT_MAX_INPUT_CHARS;

use crate::{Error, Result};

pub const CHAT_URL_VAR: &str = "BULB_CHAT_URL";
pub const AUTH_TOKEN_VAR: &str = "BULB_AUTH_TOKEN";
pub const MAX_INPUT_CHARS_VAR: &str = "BULB_MAX_INPUT_CHARS";
pub const CREATE_POLICY_VAR: &str = "BULB_CREATE_POLICY";
pub const DB_PATH_VAR: &str = "BULB_DB_PATH";

/// Runtime settings, read from `BULB_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub chat_url: Option<String>,
    pub auth_token: Option<String>,
    pub max_input_chars: usize,
    pub create_policy: CreatePolicy,
    pub db_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_url: None,
            auth_token: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            create_policy: CreatePolicy::default(),
            db_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self {
            chat_url: var(CHAT_URL_VAR),
            auth_token: var(AUTH_TOKEN_VAR),
            db_path: var(DB_PATH_VAR).map(PathBuf::from),
            ..Self::default()
        };

        if let Some(value) = var(MAX_INPUT_CHARS_VAR) {
            config.max_input_chars = match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) => return Err(invalid(MAX_INPUT_CHARS_VAR, value, "must be positive")),
                Err(e) => return Err(invalid(MAX_INPUT_CHARS_VAR, value, e.to_string())),
            };
        }
        if let Some(value) = var(CREATE_POLICY_VAR) {
            config.create_policy = value
                .parse()
                .map_err(|e: String| invalid(CREATE_POLICY_VAR, value.clone(), e))?;
        }

        Ok(config)
    }

    pub fn chat_url(&self) -> Result<&str> {
        self.chat_url
            .as_deref()
            .ok_or(Error::MissingVar(CHAT_URL_VAR))
    }

    /// `BULB_DB_PATH`, or the file in the user data directory.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => crate::default_db_path(),
        }
    }
}

fn invalid(name: &'static str, value: String, reason: impl Into<String>) -> Error {
    Error::InvalidVar {
        name,
        value,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_input_chars, 10_000);
        assert_eq!(config.create_policy, CreatePolicy::Overwrite);
        assert!(matches!(config.chat_url(), Err(Error::MissingVar(CHAT_URL_VAR))));
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            (CHAT_URL_VAR, "https://example.test/chat"),
            (AUTH_TOKEN_VAR, "secret"),
            (MAX_INPUT_CHARS_VAR, " 500 "),
            (CREATE_POLICY_VAR, "Reject"),
            (DB_PATH_VAR, "/tmp/bulb.sqlite3"),
        ])
        .unwrap();

        assert_eq!(config.chat_url().unwrap(), "https://example.test/chat");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.max_input_chars, 500);
        assert_eq!(config.create_policy, CreatePolicy::Reject);
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/tmp/bulb.sqlite3"));
    }

    #[test]
    fn empty_values_are_unset() {
        let config = config(&[(AUTH_TOKEN_VAR, "  "), (CHAT_URL_VAR, "")]).unwrap();
        assert_eq!(config.auth_token, None);
        assert_eq!(config.chat_url, None);
    }

    #[test]
    fn invalid_values_are_errors() {
        for vars in [
            [(MAX_INPUT_CHARS_VAR, "lots")],
            [(MAX_INPUT_CHARS_VAR, "0")],
            [(CREATE_POLICY_VAR, "merge")],
        ] {
            let err = config(&vars).unwrap_err();
            assert!(matches!(err, Error::InvalidVar { .. }), "{vars:?}: {err}");
        }
    }
}
