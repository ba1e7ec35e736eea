use reqwest::header::{COOKIE, REFERER};
use reqwest::Method;
use std::time::Duration;

use crate::http::{FetchError, FetchRequest, RequestBody};
use crate::modules::forms::{describe_fields, FormTemplate};

/// Places in a request where a payload is planted.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectionPoint {
    /// Appended to the URL as an extra path segment
    Path,
    /// Sent as the whole `Cookie` header
    Cookie,
    /// Sent as the `Referer` header
    Referer,
    /// Every fuzzable input of a form carries the payload
    FormField(FormTemplate),
}

/// A URL paired with the point being probed on it.
#[derive(Debug, Clone)]
pub struct TargetSurface {
    pub url: String,
    pub point: InjectionPoint,
}

impl TargetSurface {
    pub fn new(url: impl Into<String>, point: InjectionPoint) -> Self {
        Self { url: url.into(), point }
    }

    /// Where the payload ends up being sent.
    pub fn request_url(&self, payload: &str) -> String {
        match &self.point {
            InjectionPoint::Path => format!("{}/{}", self.url, payload),
            InjectionPoint::Cookie | InjectionPoint::Referer => self.url.clone(),
            InjectionPoint::FormField(form) => form.action.clone(),
        }
    }

    /// Builds the request that plants `payload` at this surface.
    pub fn mutate(&self, payload: &str, timeout: Option<Duration>) -> Result<FetchRequest, FetchError> {
        let base = FetchRequest::get(self.request_url(payload)).with_timeout(timeout);
        match &self.point {
            InjectionPoint::Path => Ok(base),
            InjectionPoint::Cookie => base.with_header(COOKIE, payload),
            InjectionPoint::Referer => base.with_header(REFERER, payload),
            InjectionPoint::FormField(form) => {
                let method = Method::from_bytes(form.method.as_bytes())
                    .map_err(|e| FetchError::InvalidRequest(format!("method {}: {}", form.method, e)))?;
                Ok(FetchRequest {
                    method,
                    body: RequestBody::Form(form.fill(payload)),
                    ..base
                })
            }
        }
    }

    /// Human-readable finding for a confirmed hit.
    pub fn describe_hit(&self, label: &str, payload: &str) -> String {
        match &self.point {
            InjectionPoint::Path => format!("{} in url: {}/{}", label, self.url, payload),
            InjectionPoint::Cookie => format!("{} in cookie ({}): {}", label, payload, self.url),
            InjectionPoint::Referer => format!("{} in referer ({}): {}", label, payload, self.url),
            InjectionPoint::FormField(form) => format!(
                "{} in forms: {} | {}",
                label,
                form.action,
                describe_fields(&form.fill(payload))
            ),
        }
    }
}
