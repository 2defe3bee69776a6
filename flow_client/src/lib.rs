use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde_json::{json, Map, Value};

mod auth;

pub use crate::auth::{ApiKey, API_KEY_VAR, AUTH_HEADER};

/// Key/value text payload handed to a flow.
pub type FlowInput = HashMap<String, String>;

const RESULT_KEY: &str = "result";
const LOGGED_BODY_LIMIT: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("API_KEY not found in environment variables")]
    MissingApiKey,
    #[error("API key cannot be sent as a header value")]
    InvalidApiKey,
    #[error("flow service unreachable: {0}")]
    Communication(String),
    #[error("flow service rejected the request (HTTP {status}): {body}")]
    Request { status: u16, body: String },
    #[error("flow service internal error (HTTP {status})")]
    InternalServer { status: u16 },
    #[error("incorrect flow service response: {0}")]
    Response(String),
}

type Result<T> = std::result::Result<T, Error>;

/// Basic interface required to run a flow. Implemented by [`FlowClient`] and
/// mocked in tests of anything that sits on top of it.
#[mockall::automock]
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    async fn execute(&self, flow_name: &str, input: &FlowInput) -> Result<FlowResponse>;
}

/// Response object returned by a flow. Only the `result` text is guaranteed;
/// anything else the service sends is kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowResponse {
    body: Map<String, Value>,
}

impl FlowResponse {
    pub fn from_value(value: Value) -> Result<FlowResponse> {
        match value {
            Value::Object(body) => match body.get(RESULT_KEY) {
                Some(Value::String(_)) => Ok(FlowResponse { body }),
                Some(other) => Err(Error::Response(format!(
                    "'{}' field is not text: {}",
                    RESULT_KEY, other
                ))),
                None => Err(Error::Response(format!("missing '{}' field", RESULT_KEY))),
            },
            other => Err(Error::Response(format!(
                "expected a JSON object, got: {}",
                other
            ))),
        }
    }

    pub fn from_text(text: &str) -> Result<FlowResponse> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::Response(e.to_string()))?;
        Self::from_value(value)
    }

    /// The generated text.
    pub fn result(&self) -> &str {
        self.body
            .get(RESULT_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

/// Where the flow service lives. Routes are joined with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEndpoint {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
    pub route: String,
}

impl Default for FlowEndpoint {
    fn default() -> FlowEndpoint {
        FlowEndpoint {
            protocol: String::from("https"),
            host: String::from("flow-api.mira.network"),
            port: None,
            route: String::from("v1/flows"),
        }
    }
}

/// This struct knows how to reach the flow service and authenticate with an
/// API key. Each call to `execute()` is a single POST; there is no retry and
/// no timeout beyond what reqwest does by default.
pub struct FlowClient {
    client: Client,
    endpoint: FlowEndpoint,
    api_key: ApiKey,
}

impl FlowClient {
    pub fn new(api_key: ApiKey, endpoint: FlowEndpoint) -> FlowClient {
        FlowClient::with_client(api_key, endpoint, Client::new())
    }

    /// Same as `new()` but with a caller-configured reqwest client.
    pub fn with_client(api_key: ApiKey, endpoint: FlowEndpoint, client: Client) -> FlowClient {
        FlowClient {
            client,
            endpoint,
            api_key,
        }
    }

    pub fn build_flow_url(&self, flow_name: &str) -> String {
        let mut ub = url_builder::URLBuilder::new();
        ub.set_protocol(&self.endpoint.protocol)
            .set_host(&self.endpoint.host);
        if let Some(port) = self.endpoint.port {
            ub.set_port(port);
        }
        for route in self.endpoint.route.split('/').filter(|r| !r.is_empty()) {
            ub.add_route(route);
        }
        ub.add_route(flow_name).add_route("execute");
        ub.build()
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Flow service rejected request with {}: {}", status, body);
            Err(Error::Request {
                status: status.as_u16(),
                body,
            })
        } else if status.is_server_error() {
            warn!("Flow service failed with {}", status);
            Err(Error::InternalServer {
                status: status.as_u16(),
            })
        } else {
            Ok(response)
        }
    }
}

#[async_trait]
impl FlowExecutor for FlowClient {
    async fn execute(&self, flow_name: &str, input: &FlowInput) -> Result<FlowResponse> {
        let url = self.build_flow_url(flow_name);
        info!("Executing flow '{}'", flow_name);
        debug!("Flow request url: {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.api_key.headers()?)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;

        let text = Self::check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| Error::Communication(e.to_string()))?;

        debug!(
            "Got flow response: {}",
            text.chars().take(LOGGED_BODY_LIMIT).collect::<String>()
        );
        FlowResponse::from_text(&text)
    }
}
