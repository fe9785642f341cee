use http::StatusCode;
use serde::{Deserialize, Serialize};
use turbo_lambda::errors::GeneralError;
use turbo_lambda::handlers::{gateway_handler, request_fn, run};
use turbo_lambda::schemas::{ApiGatewayResponse, GatewayEventPathParameters};

#[derive(Debug, Serialize, Deserialize)]
struct EchoPath {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct EchoRequest {
    #[serde(flatten)]
    path: GatewayEventPathParameters<EchoPath>,
    #[serde(default)]
    body: Option<String>,
}

async fn echo(request: EchoRequest) -> Result<ApiGatewayResponse, turbo_lambda::Error> {
    if request.path.path_parameters.name.is_empty() {
        return Err(GeneralError::new(StatusCode::NOT_FOUND, "Name not found").into());
    }

    let response = ApiGatewayResponse::json(&serde_json::json!({
        "name": request.path.path_parameters.name,
        "body": request.body,
    }))?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    turbo_lambda::setup_logging();
    run(gateway_handler(request_fn(echo))).await
}
