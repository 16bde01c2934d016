//! Response negotiation: maps an operation result onto a response shape.
//!
//! The channel decision is made from the request alone. Ajax requests get a
//! named fragment; normal requests get a full page or a redirect back to the
//! edit form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::controller::Operation;
use crate::error::ControllerError;

pub const HEADER_STATUS: &str = "X-Status";
pub const HEADER_PJAX: &str = "X-Pjax";
pub const HEADER_CONTROLLER_URL: &str = "X-ControllerURL";
pub const HEADER_LOCATION: &str = "Location";

/// What the incoming request expects back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub is_ajax: bool,
    /// Fragment names requested through `X-Pjax`.
    pub pjax: Option<String>,
}

impl RequestContext {
    /// `requested_with` is the `X-Requested-With` header, `ajax_param` the
    /// `ajax` query parameter.
    pub fn detect(
        requested_with: Option<&str>,
        ajax_param: Option<&str>,
        pjax: Option<&str>,
    ) -> Self {
        let is_ajax = requested_with.is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
            || ajax_param == Some("1");
        Self {
            is_ajax,
            pjax: pjax.map(str::to_string),
        }
    }

    /// First known fragment named in `X-Pjax`, which may list several
    /// comma-separated names.
    pub fn requested_fragment(&self) -> Option<Fragment> {
        self.pjax
            .as_deref()?
            .split(',')
            .find_map(|name| Fragment::from_name(name.trim()))
    }
}

/// Named render fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fragment {
    CurrentForm,
    Content,
    Default,
}

impl Fragment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fragment::CurrentForm => "CurrentForm",
            Fragment::Content => "Content",
            Fragment::Default => "Default",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CurrentForm" => Some(Fragment::CurrentForm),
            "Content" => Some(Fragment::Content),
            "Default" => Some(Fragment::Default),
            _ => None,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// Render the whole edit page.
    FullPage,
    /// Render only the named fragment.
    Fragment { fragment: Fragment },
    /// Send the browser back to the edit form.
    RedirectBack { location: String },
    /// Render the empty read-only edit surface.
    ReadOnly,
    AccessDenied,
    /// Render an error body.
    Error,
}

/// The chosen response shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub status: u16,
    pub disposition: Disposition,
    pub headers: Vec<(&'static str, String)>,
    pub message: String,
}

impl Negotiated {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Choose the response for `result`.
///
/// `Ok` carries the status message of the successful operation (empty for
/// plain views). `edit_url` is where redirects and `X-ControllerURL` point.
pub fn negotiate(
    ctx: &RequestContext,
    operation: Operation,
    result: Result<&str, &ControllerError>,
    edit_url: &str,
) -> Negotiated {
    let mut headers = Vec::new();

    let (status, disposition, message) = match result {
        Ok(message) if operation == Operation::Rollback => {
            headers.push((HEADER_PJAX, Fragment::Content.to_string()));
            headers.push((HEADER_CONTROLLER_URL, edit_url.to_string()));
            let disposition = if ctx.is_ajax {
                Disposition::Fragment {
                    fragment: Fragment::Content,
                }
            } else {
                Disposition::FullPage
            };
            (200, disposition, message.to_string())
        }
        Ok(message) => {
            let disposition = if ctx.is_ajax {
                Disposition::Fragment {
                    fragment: ctx.requested_fragment().unwrap_or(Fragment::Content),
                }
            } else {
                Disposition::FullPage
            };
            (200, disposition, message.to_string())
        }
        Err(ControllerError::ValidationFailed(_)) if ctx.is_ajax => {
            headers.push((HEADER_PJAX, Fragment::CurrentForm.to_string()));
            (
                400,
                Disposition::Fragment {
                    fragment: Fragment::CurrentForm,
                },
                "Validation failed".to_string(),
            )
        }
        Err(ControllerError::ValidationFailed(_)) => {
            headers.push((HEADER_LOCATION, edit_url.to_string()));
            (
                303,
                Disposition::RedirectBack {
                    location: edit_url.to_string(),
                },
                "Validation failed".to_string(),
            )
        }
        Err(err @ ControllerError::PermissionDenied { .. }) => {
            (403, Disposition::AccessDenied, err.to_string())
        }
        Err(err @ ControllerError::RecordUnavailable { .. }) => {
            (200, Disposition::ReadOnly, err.to_string())
        }
        Err(err @ ControllerError::VersionNotFound { .. }) => (404, Disposition::Error, err.to_string()),
        Err(err @ ControllerError::WriteConflict { .. }) => (409, Disposition::Error, err.to_string()),
        Err(err @ ControllerError::Storage(_)) => (500, Disposition::Error, err.to_string()),
    };

    if !message.is_empty() {
        headers.push((HEADER_STATUS, urlencoding::encode(&message).into_owned()));
    }

    Negotiated {
        status,
        disposition,
        headers,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::ValidationErrors;
    use solo_storage::StorageError;

    const EDIT: &str = "/admin/homepage";

    fn ajax() -> RequestContext {
        RequestContext::detect(Some("XMLHttpRequest"), None, None)
    }

    fn plain() -> RequestContext {
        RequestContext::default()
    }

    fn invalid() -> ControllerError {
        let mut errors = ValidationErrors::default();
        errors.push("Title", "is required");
        ControllerError::ValidationFailed(errors)
    }

    #[test]
    fn detects_ajax_from_header_or_param() {
        assert!(RequestContext::detect(Some("xmlhttprequest"), None, None).is_ajax);
        assert!(RequestContext::detect(None, Some("1"), None).is_ajax);
        assert!(!RequestContext::detect(None, Some("0"), Some("Content")).is_ajax);
    }

    #[test]
    fn success_renders_content_fragment_for_ajax() {
        let n = negotiate(&ajax(), Operation::Save, Ok("Saved 'Home' successfully."), EDIT);
        assert_eq!(n.status, 200);
        assert_eq!(
            n.disposition,
            Disposition::Fragment {
                fragment: Fragment::Content
            }
        );
        assert_eq!(n.header(HEADER_STATUS), Some("Saved%20%27Home%27%20successfully."));
    }

    #[test]
    fn ajax_success_honours_requested_fragment() {
        let ctx = RequestContext::detect(Some("XMLHttpRequest"), None, Some("Unknown, CurrentForm"));
        assert_eq!(ctx.requested_fragment(), Some(Fragment::CurrentForm));
        let n = negotiate(&ctx, Operation::Edit, Ok(""), EDIT);
        assert_eq!(
            n.disposition,
            Disposition::Fragment {
                fragment: Fragment::CurrentForm
            }
        );

        let ctx = RequestContext::detect(Some("XMLHttpRequest"), None, Some("Sidebar"));
        assert_eq!(ctx.requested_fragment(), None);
        let n = negotiate(&ctx, Operation::Save, Ok("Saved 'Home' successfully."), EDIT);
        assert_eq!(
            n.disposition,
            Disposition::Fragment {
                fragment: Fragment::Content
            }
        );
    }

    #[test]
    fn rollback_ignores_requested_fragment() {
        let ctx = RequestContext::detect(Some("XMLHttpRequest"), None, Some("CurrentForm"));
        let n = negotiate(&ctx, Operation::Rollback, Ok("Rolled back to published version."), EDIT);
        assert_eq!(
            n.disposition,
            Disposition::Fragment {
                fragment: Fragment::Content
            }
        );
    }

    #[test]
    fn success_renders_full_page_otherwise() {
        let n = negotiate(&plain(), Operation::Publish, Ok("Published 'Home' successfully."), EDIT);
        assert_eq!(n.disposition, Disposition::FullPage);
        assert_eq!(n.message, "Published 'Home' successfully.");
    }

    #[test]
    fn validation_failure_routes_by_channel() {
        let err = invalid();

        let n = negotiate(&ajax(), Operation::Save, Err(&err), EDIT);
        assert_eq!(n.status, 400);
        assert_eq!(
            n.disposition,
            Disposition::Fragment {
                fragment: Fragment::CurrentForm
            }
        );
        assert_eq!(n.header(HEADER_PJAX), Some("CurrentForm"));

        let n = negotiate(&plain(), Operation::Save, Err(&err), EDIT);
        assert_eq!(n.status, 303);
        assert_eq!(
            n.disposition,
            Disposition::RedirectBack {
                location: EDIT.to_string()
            }
        );
        assert_eq!(n.header(HEADER_LOCATION), Some(EDIT));
    }

    #[test]
    fn rollback_forces_content_and_controller_url() {
        let n = negotiate(&plain(), Operation::Rollback, Ok("Rolled back to version #3."), EDIT);
        assert_eq!(n.header(HEADER_PJAX), Some("Content"));
        assert_eq!(n.header(HEADER_CONTROLLER_URL), Some(EDIT));
        assert_eq!(n.header(HEADER_STATUS), Some("Rolled%20back%20to%20version%20%233."));
    }

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (
                ControllerError::PermissionDenied {
                    action: Operation::Publish,
                    caller: "editor".into(),
                },
                403,
                Disposition::AccessDenied,
            ),
            (
                ControllerError::RecordUnavailable {
                    record_type: "HomePage".into(),
                },
                200,
                Disposition::ReadOnly,
            ),
            (ControllerError::VersionNotFound { version: 9 }, 404, Disposition::Error),
            (
                ControllerError::WriteConflict {
                    expected: 1,
                    actual: Some(2),
                },
                409,
                Disposition::Error,
            ),
            (
                ControllerError::Storage(StorageError::Backend("io".into())),
                500,
                Disposition::Error,
            ),
        ];
        for (err, status, disposition) in cases {
            let n = negotiate(&ajax(), Operation::Save, Err(&err), EDIT);
            assert_eq!(n.status, status, "{err}");
            assert_eq!(n.disposition, disposition, "{err}");
            assert!(n.header(HEADER_STATUS).is_some());
        }
    }

    #[test]
    fn plain_view_has_no_status_header() {
        let n = negotiate(&plain(), Operation::Edit, Ok(""), EDIT);
        assert_eq!(n.header(HEADER_STATUS), None);
    }
}
