//! Not-found classification
//!
//! Only a confirmed absence counts. Access denied, timeouts and throttling
//! must stay errors, otherwise a real failure would read as "does not exist".

use crate::aws::error::ApiError;
use crate::error::ProbeError;
use std::error::Error;

/// Substrings that mark an error message as a not-found signal
const NOT_FOUND_MARKERS: &[&str] = &["404", "NotFound", "NoSuchBucket", "ResourceNotFoundException"];

/// Classify an error by its message text
pub fn is_not_found_message(message: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|m| message.contains(m))
}

/// Classify an error, preferring structured vendor detail over its text.
///
/// Walks the source chain; the first [`ApiError`] or [`ProbeError`] found
/// decides. Errors with neither fall back to [`is_not_found_message`].
pub fn is_not_found(err: &(dyn Error + 'static)) -> bool {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            return api.is_not_found();
        }
        if let Some(probe) = e.downcast_ref::<ProbeError>() {
            // Anything but a vendor response is never absence, whatever its text says
            return match probe {
                ProbeError::Api(api) => api.is_not_found(),
                _ => false,
            };
        }
        current = e.source();
    }

    is_not_found_message(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str, message: &str) -> ApiError {
        ApiError {
            service: "s3",
            operation: "HeadBucket",
            status,
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Plain(String);

    fn plain(msg: &str) -> Plain {
        Plain(msg.to_string())
    }

    #[test]
    fn test_message_markers() {
        assert!(is_not_found(&plain("api error: 404 bucket not found")));
        assert!(is_not_found(&plain("operation error: NotFound")));
        assert!(is_not_found(&plain(
            "NoSuchBucket: The specified bucket does not exist"
        )));
        assert!(is_not_found(&plain("ResourceNotFoundException: table")));
    }

    #[test]
    fn test_generic_errors_are_not_absence() {
        assert!(!is_not_found(&plain("access denied")));
        assert!(!is_not_found(&plain("connection timeout")));
        assert!(!is_not_found(&plain("403 Forbidden")));
    }

    #[test]
    fn test_structured_errors() {
        assert!(is_not_found(&api(404, "NotFound", "")));
        assert!(is_not_found(&api(400, "ResourceNotFoundException", "")));
        assert!(is_not_found(&api(404, "NoSuchBucket", "")));
        assert!(!is_not_found(&api(403, "AccessDenied", "Access Denied")));
        assert!(!is_not_found(&api(503, "SlowDown", "")));
    }

    #[test]
    fn test_structured_detail_wins_over_message() {
        // The message mentions a missing thing but the status says forbidden
        let err = api(403, "AccessDenied", "NotFound in policy evaluation");
        assert!(!is_not_found(&err));
    }

    /// Adds context whose text looks like absence around a structured cause
    #[derive(Debug, thiserror::Error)]
    #[error("HTTP 404 handler chain: {context}")]
    struct Wrapped {
        context: String,
        #[source]
        source: ProbeError,
    }

    #[test]
    fn test_source_chain_structured_cause_wins() {
        let err = Wrapped {
            context: "probing bucket".to_string(),
            source: ProbeError::from(api(403, "AccessDenied", "Access Denied")),
        };
        assert!(!is_not_found(&err));

        let err = Wrapped {
            context: "probing bucket".to_string(),
            source: ProbeError::from(api(404, "NoSuchBucket", "")),
        };
        assert!(is_not_found(&err));
    }

    #[test]
    fn test_source_chain_through_anyhow() {
        let err = anyhow::Error::new(api(403, "AccessDenied", "denied"))
            .context("request returned 404 NotFound upstream");
        let err: &(dyn Error + 'static) = err.as_ref();
        assert!(!is_not_found(err));

        let err = anyhow::Error::new(api(400, "ResourceNotFoundException", ""))
            .context("describe failed");
        let err: &(dyn Error + 'static) = err.as_ref();
        assert!(is_not_found(err));
    }

    #[test]
    fn test_probe_error_wrapping() {
        let err = ProbeError::from(api(404, "NotFound", ""));
        assert!(is_not_found(&err));
        assert!(!is_not_found(&ProbeError::Cancelled));
        assert!(!is_not_found(&ProbeError::UnsupportedType(
            "aws_NotFound_thing".to_string()
        )));
        assert!(!is_not_found(&ProbeError::malformed("s3", "HTTP 404 page")));
    }
}
