use crate::consts::API_URI;

use super::{ApiError, ItchApi};
use super::schema::LoginResponse;

/// Exchange username and password for an API key
///
/// Response bodies are never logged since they contain the key
#[tracing::instrument(level = "debug", skip(password))]
pub fn login(username: &str, password: &str) -> Result<String, ApiError> {
    login_at(API_URI, username, password)
}

pub(crate) fn login_at(api_uri: &str, username: &str, password: &str) -> Result<String, ApiError> {
    tracing::debug!("Logging in");

    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("username", username)
        .append_pair("password", password)
        .append_pair("source", "desktop")
        .finish();

    let request = minreq::post(format!("{api_uri}/login"))
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body(body)
        .with_timeout(crate::DEFAULT_REQUESTS_TIMEOUT.as_secs());

    let response = ItchApi::send(request)?;
    let response = match super::decode_json::<LoginResponse>(&response) {
        Ok(response) => response,

        Err(ApiError::Rejected(errors)) => LoginResponse {
            success: false,
            key: None,
            errors
        },

        Err(err) => return Err(err)
    };

    parse_login_response(response)
}

fn parse_login_response(response: LoginResponse) -> Result<String, ApiError> {
    if !response.success {
        let reason = if response.errors.is_empty() {
            String::from("success flag is not set")
        } else {
            response.errors.join(", ")
        };

        tracing::error!("Login rejected: {reason}");

        return Err(ApiError::LoginRejected(reason));
    }

    match response.key {
        Some(key) => Ok(key.key),
        None => Err(ApiError::InvalidResponse(String::from("login response has no key")))
    }
}
