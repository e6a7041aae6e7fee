//! Request types and validation for the Lambda proxy integration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ErrorBody;

/// Name of the query parameter that selects the endpoint.
pub const ACTION_PARAM: &str = "action";

/// Inbound API Gateway proxy event, reduced to the members the handler reads.
///
/// API Gateway sends `null` for `headers` and `queryStringParameters` when the
/// request carried none; both are treated as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Request headers.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Query string parameters.
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl ProxyRequest {
    /// Look up a header by name, ignoring ASCII case.
    ///
    /// A key spelled exactly as `name` wins. Otherwise, when several keys differ
    /// only in case, the lexicographically smallest key is used.
    pub fn header(&self, name: &str) -> Option<&str> {
        let headers = self.headers.as_ref()?;
        if let Some(value) = headers.get(name) {
            return Some(value.as_str());
        }
        headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, value)| value.as_str())
    }

    /// Look up a query string parameter by exact name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }

    /// Add a header. Used to build requests in tests and local tooling.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add a query string parameter.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Endpoints selectable through the `action` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Echo the viewer geography attached by CloudFront.
    Location,
    /// Count WAF-blocked requests over the trailing hour.
    Waf,
}

impl Action {
    /// Every accepted action, in the order reported to clients.
    pub const ALL: [Action; 2] = [Action::Location, Action::Waf];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Location => "location",
            Action::Waf => "waf",
        }
    }

    /// Parse an action value. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == value)
    }

    /// Resolve the action requested by a proxy request.
    ///
    /// Missing, empty and unrecognized values all produce the same validation
    /// error listing the accepted actions.
    pub fn from_request(request: &ProxyRequest) -> Result<Self, Box<ErrorBody>> {
        request
            .query_param(ACTION_PARAM)
            .and_then(Self::parse)
            .ok_or_else(|| {
                Box::new(
                    ErrorBody::new("Missing or invalid action parameter.")
                        .with_valid_actions(Self::ALL.iter().map(|a| a.as_str())),
                )
            })
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_proxy_event_with_nulls() {
        let request: ProxyRequest = serde_json::from_value(json!({
            "headers": null,
            "queryStringParameters": null,
            "httpMethod": "GET"
        }))
        .unwrap();

        assert!(request.header("cloudfront-viewer-city").is_none());
        assert!(request.query_param(ACTION_PARAM).is_none());
    }

    #[test]
    fn test_parse_proxy_event_without_members() {
        let request: ProxyRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.headers.is_none());
        assert!(request.query_string_parameters.is_none());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let request = ProxyRequest::default().with_header("CloudFront-Viewer-City", "Toronto");
        assert_eq!(request.header("cloudfront-viewer-city"), Some("Toronto"));
        assert_eq!(request.header("CLOUDFRONT-VIEWER-CITY"), Some("Toronto"));
    }

    #[test]
    fn test_header_lookup_with_duplicate_casings() {
        let pairs = [
            ("X-Amz-Cf-Pop", "FRA56-P1"),
            ("x-amz-cf-pop", "LHR61-C2"),
            ("X-AMZ-CF-POP", "IAD89-C3"),
        ];

        // Each map gets its own hash seed; the winner must not depend on it.
        for rotation in 0..pairs.len() * 4 {
            let mut request = ProxyRequest::default();
            for i in 0..pairs.len() {
                let (name, value) = pairs[(i + rotation) % pairs.len()];
                request = request.with_header(name, value);
            }

            assert_eq!(request.header("x-amz-cf-pop"), Some("LHR61-C2"));
            assert_eq!(request.header("X-Amz-Cf-Pop"), Some("FRA56-P1"));
            assert_eq!(request.header("x-amz-CF-pop"), Some("IAD89-C3"));
        }
    }

    #[test]
    fn test_action_from_request() {
        let request = ProxyRequest::default().with_query_param("action", "waf");
        assert_eq!(Action::from_request(&request).unwrap(), Action::Waf);

        let request = ProxyRequest::default().with_query_param("action", "location");
        assert_eq!(Action::from_request(&request).unwrap(), Action::Location);
    }

    #[test]
    fn test_action_rejects_missing_empty_and_unknown() {
        let requests = [
            ProxyRequest::default(),
            ProxyRequest::default().with_query_param("action", ""),
            ProxyRequest::default().with_query_param("action", "LOCATION"),
            ProxyRequest::default().with_query_param("action", "reboot"),
            ProxyRequest::default().with_query_param("other", "waf"),
        ];

        for request in requests {
            let err = Action::from_request(&request).unwrap_err();
            assert_eq!(
                err.valid_actions,
                Some(vec!["location".to_string(), "waf".to_string()])
            );
        }
    }
}
