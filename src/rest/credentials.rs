//! Credential resolution for the REST-backed provider client.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::toml;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::config::CredentialMode;

use super::error::RestApiError;

const ACCESS_KEY_HEADER: &str = "x-mezha-access-key";
const SECRET_KEY_HEADER: &str = "x-mezha-secret-key";
const CREDENTIALS_DIR_ENV: &str = "MEZHA_CREDENTIALS_DIR";
const CREDENTIALS_FILE_NAME: &str = "credentials.toml";
const DEFAULT_PROFILE: &str = "default";
const TOKEN_KEY: &str = "token";

/// Builds the default header set carrying authentication for `mode`.
pub(super) fn auth_headers(mode: &CredentialMode) -> Result<HeaderMap, RestApiError> {
    let mut headers = HeaderMap::new();
    match mode {
        CredentialMode::Keys {
            access_key,
            secret_key,
        } => {
            headers.insert(ACCESS_KEY_HEADER, header_value(access_key)?);
            headers.insert(SECRET_KEY_HEADER, sensitive_value(secret_key)?);
        }
        CredentialMode::Profile { name } => {
            let dir = credentials_dir()?;
            let token = profile_token_from(&dir, name.as_deref())?;
            headers.insert(AUTHORIZATION, sensitive_value(&format!("Bearer {token}"))?);
        }
    }
    Ok(headers)
}

/// Reads the bearer token for `name` (or the default profile) from the
/// credential store at `dir`.
pub(super) fn profile_token_from(
    dir: &Utf8Path,
    name: Option<&str>,
) -> Result<String, RestApiError> {
    let profile = name.unwrap_or(DEFAULT_PROFILE);
    let store = Dir::open_ambient_dir(dir, ambient_authority()).map_err(|err| {
        RestApiError::Credentials {
            message: format!("cannot open credential store {dir}: {err}"),
        }
    })?;
    let contents =
        store
            .read_to_string(CREDENTIALS_FILE_NAME)
            .map_err(|err| RestApiError::Credentials {
                message: format!("cannot read {dir}/{CREDENTIALS_FILE_NAME}: {err}"),
            })?;
    let value: toml::Value =
        toml::from_str(&contents).map_err(|err| RestApiError::Credentials {
            message: format!("malformed {CREDENTIALS_FILE_NAME}: {err}"),
        })?;

    value
        .get(profile)
        .and_then(|section| section.get(TOKEN_KEY))
        .and_then(toml::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RestApiError::Credentials {
            message: format!("profile {profile} has no {TOKEN_KEY} in {CREDENTIALS_FILE_NAME}"),
        })
}

fn credentials_dir() -> Result<Utf8PathBuf, RestApiError> {
    if let Ok(dir) = std::env::var(CREDENTIALS_DIR_ENV) {
        return Ok(Utf8PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| RestApiError::Credentials {
        message: format!("neither {CREDENTIALS_DIR_ENV} nor HOME is set"),
    })?;
    Ok(Utf8PathBuf::from(home).join(".config").join("mezha"))
}

fn header_value(value: &str) -> Result<HeaderValue, RestApiError> {
    HeaderValue::from_str(value).map_err(|err| RestApiError::Credentials {
        message: format!("credential is not a valid header value: {err}"),
    })
}

fn sensitive_value(value: &str) -> Result<HeaderValue, RestApiError> {
    let mut header = header_value(value)?;
    header.set_sensitive(true);
    Ok(header)
}
