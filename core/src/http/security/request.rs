//! Security-relevant view of an inbound request.

use actix_web::dev::ServiceRequest;
use actix_web::http::header;
use actix_web::HttpRequest;

use crate::http::error::AuthError;

/// Encoded sequences the router leaves encoded, so matchers and handlers
/// could disagree on what the path is.
const REJECTED_ENCODINGS: [&str; 3] = ["%2f", "%25", "%5c"];

/// The path as the router sees it: percent-decoded, without the query.
/// Every security matcher must use this, never the raw URI path.
pub fn matching_path(req: &HttpRequest) -> &str {
    req.match_info().as_str()
}

/// Turns away paths that cannot be matched unambiguously: encoded `/`, `%`
/// or `\`, and `.` / `..` segments.
///
/// # Spring Equivalent
/// `StrictHttpFirewall`
pub fn check_path(req: &HttpRequest) -> Result<(), AuthError> {
    let raw = req.uri().path().to_ascii_lowercase();
    if REJECTED_ENCODINGS.iter().any(|encoded| raw.contains(encoded)) {
        return Err(AuthError::RejectedRequest);
    }
    if matching_path(req)
        .split('/')
        .any(|segment| segment == "." || segment == "..")
    {
        return Err(AuthError::RejectedRequest);
    }
    Ok(())
}

/// Path, method and `Referer` of a request, as the matchers see them.
///
/// The method is kept as sent; comparisons against it are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: String,
    referer: Option<String>,
}

impl RequestDescriptor {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        RequestDescriptor {
            path: path.into(),
            method: method.into(),
            referer: None,
        }
    }

    /// Sets the `Referer` header value (builder pattern).
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref()
    }

    pub fn from_http_request(req: &HttpRequest) -> Self {
        RequestDescriptor {
            path: matching_path(req).to_string(),
            method: req.method().as_str().to_string(),
            // A non-UTF-8 referer cannot contain the allowlisted text.
            referer: req
                .headers()
                .get(header::REFERER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        }
    }
}

impl From<&ServiceRequest> for RequestDescriptor {
    fn from(req: &ServiceRequest) -> Self {
        RequestDescriptor::from_http_request(req.request())
    }
}
