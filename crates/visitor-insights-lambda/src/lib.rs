//! AWS Lambda function behind API Gateway serving two read-only actions,
//! selected by the `action` query parameter:
//!
//! - `location`: the viewer geography CloudFront attached to the request
//! - `waf`: the number of requests the WAF blocked in the last hour
//!
//! Every outcome, including failures, is returned as a well-formed proxy
//! response carrying the standard CORS headers.

pub mod block_count;
pub mod location;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{info, warn};

use visitor_insights_lambda_shared::{
    init_runtime, init_tracing, Action, LambdaRuntime, ProxyRequest, ProxyResponse, ACTION_PARAM,
};

pub use block_count::{waf_block_count, BlockCountError, BlockCountQuery, BlockCountResult};
pub use location::{visitor_location, GeoInfo};

/// Entry point used by the Lambda runtime.
pub async fn run() -> Result<(), Error> {
    init_tracing();

    let runtime = init_runtime().await;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        handler(event, runtime)
    }))
    .await
}

/// Lambda handler invoked per request.
///
/// Always resolves to `Ok`; errors are reported inside the response.
pub async fn handler(
    event: LambdaEvent<Value>,
    runtime: &LambdaRuntime,
) -> Result<ProxyResponse, Error> {
    let request_id = event.context.request_id.clone();

    let request: ProxyRequest = match serde_json::from_value(event.payload) {
        Ok(req) => req,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "payload is not a proxy event");
            ProxyRequest::default()
        }
    };

    Ok(route(&request, runtime, &request_id).await)
}

/// Dispatch a request to the action it names.
pub async fn route(
    request: &ProxyRequest,
    runtime: &LambdaRuntime,
    request_id: &str,
) -> ProxyResponse {
    let action = match Action::from_request(request) {
        Ok(action) => action,
        Err(body) => {
            warn!(
                request_id = %request_id,
                action = request.query_param(ACTION_PARAM).unwrap_or_default(),
                "missing or invalid action"
            );
            return ProxyResponse::bad_request(&body);
        }
    };

    info!(request_id = %request_id, action = %action, "handling request");

    let response = match action {
        Action::Location => visitor_location(request, runtime.config().edge_location),
        Action::Waf => waf_block_count(runtime).await,
    };

    info!(
        request_id = %request_id,
        action = %action,
        status = response.status_code,
        "request complete"
    );

    response
}
