use actix_web::{error, http::StatusCode, HttpResponse, HttpResponseBuilder};
use derive_more::{Display, Error};

/// Reasons a request or a login attempt is turned away.
///
/// Every variant renders as a short, non-revealing message: bad e-mail and
/// bad password are both reported as `BadCredentials`.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[display("unauthorized")]
    Unauthorized,
    #[display("forbidden")]
    Forbidden,
    #[display("bad credentials")]
    BadCredentials,
    #[display("account disabled")]
    AccountDisabled,
    #[display("missing CSRF token")]
    MissingCsrfToken,
    #[display("invalid CSRF token")]
    InvalidCsrfToken,
    #[display("authentication service unavailable")]
    AuthenticationService,
    #[display("request rejected")]
    RejectedRequest,
}

impl AuthError {
    /// True for the CSRF rejections raised before authorization runs.
    pub fn is_csrf(&self) -> bool {
        matches!(self, AuthError::MissingCsrfToken | AuthError::InvalidCsrfToken)
    }
}

impl error::ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match *self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::BadCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::MissingCsrfToken => StatusCode::FORBIDDEN,
            AuthError::InvalidCsrfToken => StatusCode::FORBIDDEN,
            AuthError::AuthenticationService => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::RejectedRequest => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status_code()).body(self.to_string())
    }
}
