use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{SessionStatus, LOGIN_PATH, LOGOUT_PATH};
use crate::api::{parse_tokens, ApiClient, ApiError, ApiRequest, ApiResponse, HttpClient};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

// Session lifecycle methods
impl<H: HttpClient> ApiClient<H> {
    /// Exchanges admin credentials for a token pair
    ///
    /// A rejected login is returned as an ordinary failure; it never triggers
    /// a refresh.
    pub async fn login(&self, email: &str, password: &str) -> ApiResponse {
        let body = LoginRequest { email, password };
        let request = match ApiRequest::new(Method::POST, LOGIN_PATH).with_json(&body) {
            Ok(request) => request,
            Err(err) => return ApiResponse::failure(err),
        };

        debug!(email = %email, "Logging in");

        let response = match self.send_once(&request, None, None, None).await {
            Ok(response) => response,
            Err(err) => {
                warn!("Login request failed: {}", err);
                return ApiResponse::failure(err);
            }
        };

        let envelope = ApiResponse::from_http(&response);
        if !envelope.success {
            warn!(status = response.status, "Login rejected");
            return envelope;
        }

        let Some(tokens) = parse_tokens(&response) else {
            return ApiResponse::failure(ApiError::Decode(
                "login response did not contain an access token".to_string(),
            ));
        };

        self.session().update(tokens).await;
        info!(email = %email, "Logged in");

        envelope
    }

    /// Ends the session on the server and locally
    ///
    /// Local credentials are cleared whatever the server answers.
    pub async fn logout(&self) -> ApiResponse {
        let token = self.session().access_token().await;

        let response = match token {
            Some(ref token) => {
                let request = ApiRequest::post(LOGOUT_PATH, serde_json::json!({}));
                match self.send_once(&request, None, None, Some(token)).await {
                    Ok(response) => ApiResponse::from_http(&response),
                    Err(err) => ApiResponse::failure(err),
                }
            }
            None => ApiResponse::ok(200, serde_json::json!({})),
        };

        if !response.success {
            debug!("Server-side logout failed: {:?}", response.error);
        }

        self.session().clear(SessionStatus::LoggedOut).await;
        info!("Logged out");

        response
    }

    /// True when an access token is held
    pub async fn is_authenticated(&self) -> bool {
        self.session().is_authenticated().await
    }
}
