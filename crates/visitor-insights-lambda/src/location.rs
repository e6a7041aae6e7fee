//! Viewer geography from CloudFront request headers.
//!
//! CloudFront attaches the viewer's city and region to requests it forwards
//! (API Gateway lowercases the header names). Values are passed through
//! verbatim; a missing or empty header becomes [`UNKNOWN`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use visitor_insights_lambda_shared::{EdgeLocationStrategy, ProxyRequest, ProxyResponse};

/// Placeholder reported for any value the request did not carry.
pub const UNKNOWN: &str = "Unknown";

pub const CITY_HEADER: &str = "cloudfront-viewer-city";
pub const REGION_HEADER: &str = "cloudfront-viewer-country-region";
pub const POP_HEADER: &str = "x-amz-cf-pop";
pub const CF_ID_HEADER: &str = "x-amz-cf-id";

/// Geography reported by the `location` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoInfo {
    pub city: String,
    /// Region, state or province code (e.g. `ON`, `CA`).
    pub region: String,
    /// CloudFront point of presence that served the request.
    pub edge_location: String,
}

impl GeoInfo {
    /// Extract viewer geography from request headers.
    pub fn from_request(request: &ProxyRequest, strategy: EdgeLocationStrategy) -> Self {
        Self {
            city: header_or_unknown(request, CITY_HEADER),
            region: header_or_unknown(request, REGION_HEADER),
            edge_location: edge_location(request, strategy),
        }
    }
}

fn header_or_unknown(request: &ProxyRequest, name: &str) -> String {
    request
        .header(name)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn edge_location(request: &ProxyRequest, strategy: EdgeLocationStrategy) -> String {
    match strategy {
        EdgeLocationStrategy::PopHeader => header_or_unknown(request, POP_HEADER),
        // The request id looks like `<POP>-<opaque>`.
        EdgeLocationStrategy::CorrelationIdPrefix => match request.header(CF_ID_HEADER) {
            Some(id) if !id.is_empty() => id.split('-').next().unwrap_or(id).to_string(),
            _ => UNKNOWN.to_string(),
        },
    }
}

/// Handle the `location` action. Never fails.
pub fn visitor_location(request: &ProxyRequest, strategy: EdgeLocationStrategy) -> ProxyResponse {
    debug!(headers = ?request.headers, "received headers");

    let geo = GeoInfo::from_request(request, strategy);

    debug!(
        city = %geo.city,
        region = %geo.region,
        edge_location = %geo.edge_location,
        strategy = ?strategy,
        "extracted viewer location"
    );

    ProxyResponse::ok(&geo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo_request() -> ProxyRequest {
        ProxyRequest::default()
            .with_header(CITY_HEADER, "Toronto")
            .with_header(REGION_HEADER, "ON")
            .with_header(POP_HEADER, "YTO50-C1")
            .with_header(CF_ID_HEADER, "YTO50-abcdEFGH123==")
    }

    #[test]
    fn test_all_headers_missing_reports_unknown() {
        for strategy in [
            EdgeLocationStrategy::PopHeader,
            EdgeLocationStrategy::CorrelationIdPrefix,
        ] {
            let geo = GeoInfo::from_request(&ProxyRequest::default(), strategy);
            assert_eq!(geo.city, UNKNOWN);
            assert_eq!(geo.region, UNKNOWN);
            assert_eq!(geo.edge_location, UNKNOWN);
        }
    }

    #[test]
    fn test_values_pass_through_verbatim() {
        let geo = GeoInfo::from_request(&geo_request(), EdgeLocationStrategy::PopHeader);
        assert_eq!(geo.city, "Toronto");
        assert_eq!(geo.region, "ON");
        assert_eq!(geo.edge_location, "YTO50-C1");
    }

    #[test]
    fn test_unusual_values_are_not_altered() {
        let long_city = "S".repeat(4096);
        let request = ProxyRequest::default()
            .with_header(CITY_HEADER, long_city.as_str())
            .with_header(REGION_HEADER, " <b>odd</b> ");
        let geo = GeoInfo::from_request(&request, EdgeLocationStrategy::PopHeader);
        assert_eq!(geo.city, long_city);
        assert_eq!(geo.region, " <b>odd</b> ");
    }

    #[test]
    fn test_empty_header_reports_unknown() {
        let request = ProxyRequest::default().with_header(CITY_HEADER, "");
        let geo = GeoInfo::from_request(&request, EdgeLocationStrategy::PopHeader);
        assert_eq!(geo.city, UNKNOWN);
    }

    #[test]
    fn test_correlation_id_prefix_strategy() {
        let geo = GeoInfo::from_request(&geo_request(), EdgeLocationStrategy::CorrelationIdPrefix);
        assert_eq!(geo.edge_location, "YTO50");
    }

    #[test]
    fn test_correlation_id_without_hyphen_is_used_whole() {
        let request = ProxyRequest::default().with_header(CF_ID_HEADER, "IAD89");
        let geo = GeoInfo::from_request(&request, EdgeLocationStrategy::CorrelationIdPrefix);
        assert_eq!(geo.edge_location, "IAD89");
    }

    #[test]
    fn test_correlation_id_strategy_ignores_pop_header() {
        let request = ProxyRequest::default().with_header(POP_HEADER, "YTO50-C1");
        let geo = GeoInfo::from_request(&request, EdgeLocationStrategy::CorrelationIdPrefix);
        assert_eq!(geo.edge_location, UNKNOWN);
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let request = ProxyRequest::default()
            .with_header("CloudFront-Viewer-City", "Lisbon")
            .with_header("X-Amz-Cf-Pop", "LIS50-P1");
        let geo = GeoInfo::from_request(&request, EdgeLocationStrategy::PopHeader);
        assert_eq!(geo.city, "Lisbon");
        assert_eq!(geo.edge_location, "LIS50-P1");
    }

    #[test]
    fn test_visitor_location_response() {
        let response = visitor_location(&geo_request(), EdgeLocationStrategy::PopHeader);
        assert_eq!(response.status_code, 200);

        let body = response.body_json().unwrap();
        assert_eq!(body["city"], "Toronto");
        assert_eq!(body["region"], "ON");
        assert_eq!(body["edgeLocation"], "YTO50-C1");
        assert!(body.get("country").is_none());
    }
}
