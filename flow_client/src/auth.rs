use std::env;
use std::fmt;

use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::Error;

/// Environment variable holding the flow service key.
pub const API_KEY_VAR: &str = "API_KEY";
/// Header the flow service reads the key from.
pub const AUTH_HEADER: &str = "MiraAuthorization";

/// Credential for the flow service. The key is read once at startup and
/// handed to the client; nothing below this type touches the environment.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<ApiKey, Error> {
        let key: String = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(Error::MissingApiKey);
        }
        Ok(ApiKey(String::from(trimmed)))
    }

    /// Loads a `.env` file if one exists, then reads `API_KEY`.
    pub fn from_env() -> Result<ApiKey, Error> {
        match dotenv::dotenv() {
            Ok(path) => debug!("Loaded environment file: {}", path.display()),
            Err(e) => debug!("No environment file loaded: {}", e),
        }
        let key = Self::from_var(env::var(API_KEY_VAR).ok())?;
        info!("Found {} in environment", API_KEY_VAR);
        Ok(key)
    }

    fn from_var(value: Option<String>) -> Result<ApiKey, Error> {
        match value {
            Some(key) => ApiKey::new(key),
            None => Err(Error::MissingApiKey),
        }
    }

    pub(crate) fn headers(&self) -> Result<HeaderMap, Error> {
        let mut auth = HeaderValue::from_str(&self.0).map_err(|_| Error::InvalidApiKey)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTH_HEADER, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_missing() {
        assert!(matches!(ApiKey::new("   "), Err(Error::MissingApiKey)));
        assert!(matches!(ApiKey::from_var(None), Err(Error::MissingApiKey)));
        assert!(matches!(
            ApiKey::from_var(Some(String::new())),
            Err(Error::MissingApiKey)
        ));
    }

    #[test]
    fn debug_output_hides_key() {
        let key = ApiKey::new("super-secret").unwrap();
        let printed = format!("{:?}", key);
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn headers_carry_trimmed_key() {
        let key = ApiKey::from_var(Some(String::from(" abc123 \n"))).unwrap();
        let headers = key.headers().unwrap();
        assert_eq!(headers.get(AUTH_HEADER).unwrap(), "abc123");
        assert!(headers.get(AUTH_HEADER).unwrap().is_sensitive());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn control_characters_are_rejected() {
        let key = ApiKey::new("bad\nkey").unwrap();
        assert!(matches!(key.headers(), Err(Error::InvalidApiKey)));
    }
}
