//! AWS Lambda function reporting visitor location and WAF block counts.

use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    visitor_insights_lambda::run().await
}
