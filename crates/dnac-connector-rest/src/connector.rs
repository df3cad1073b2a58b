//! Controller REST client implementation
//!
//! Implements the inventory capability traits against the controller's
//! intent API.

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use dnac_connector::config::ConnectorConfig;
use dnac_connector::error::{ConnectorError, ConnectorResult};
use dnac_connector::ids::{EntityId, ExecutionId};
use dnac_connector::operation::{
    ExecutionAccepted, ExecutionDetails, Lookup, LookupFilter, MembershipUpdate, PageRequest,
    TagMemberQuery,
};
use dnac_connector::traits::{
    DeviceInsightOp, ExecutionStatusOp, InventoryConnector, LookupOp, MutateOp, TagMemberOp,
};
use dnac_connector::types::{EntityFamily, ExecutionStatus, HandleKind};

use crate::config::{DnacConfig, HttpMethod};
use crate::retry::parse_retry_after;

/// Header carrying the session token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// REST client for the controller's intent API.
pub struct DnacRestClient {
    /// Configuration.
    config: DnacConfig,

    /// Display name for this client instance.
    display_name: String,

    /// HTTP client.
    client: Arc<Client>,

    /// Cached session token.
    token: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for DnacRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnacRestClient")
            .field("config", &self.config.redacted())
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl DnacRestClient {
    /// Create a new client with the given configuration.
    pub fn new(config: DnacConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = format!("DNAC: {}", config.base_url());

        let client = Self::build_client(&config)?;

        Ok(Self {
            config,
            display_name,
            client: Arc::new(client),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DnacConfig {
        &self.config
    }

    /// Build the reqwest client with configuration.
    fn build_client(config: &DnacConfig) -> ConnectorResult<Client> {
        let mut builder = Client::builder()
            .timeout(config.connection.read_timeout())
            .connect_timeout(config.connection.connection_timeout());

        if !config.tls.verify_certificate {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref path) = config.tls.ca_cert_path {
            let pem = std::fs::read(path).map_err(|e| ConnectorError::InvalidConfiguration {
                message: format!("failed to read CA certificate {path}: {e}"),
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                ConnectorError::InvalidConfiguration {
                    message: format!("invalid CA certificate {path}: {e}"),
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }

        builder
            .build()
            .map_err(|e| ConnectorError::InvalidConfiguration {
                message: format!("Failed to build HTTP client: {e}"),
            })
    }

    /// Get the session token, authenticating if none is cached.
    async fn auth_token(&self) -> ConnectorResult<String> {
        {
            let token_guard = self.token.read().await;
            if let Some(ref token) = *token_guard {
                return Ok(token.clone());
            }
        }

        let token = self.fetch_token().await?;

        {
            let mut token_guard = self.token.write().await;
            *token_guard = Some(token.clone());
        }

        Ok(token)
    }

    /// Drop the cached token so the next request re-authenticates.
    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Request a session token with basic credentials.
    #[instrument(skip(self), fields(host = %self.config.host))]
    async fn fetch_token(&self) -> ConnectorResult<String> {
        let url = self.config.url(&self.config.endpoints.auth_token);
        let credentials = format!("{}:{}", self.config.username, self.config.password);

        let response = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", base64_encode(&credentials)),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("Failed to reach controller at {url}"),
                    e,
                )
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConnectorError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.handle_response_error(status, &body));
        }

        let body: Value = response.json().await.map_err(|e| {
            ConnectorError::connection_failed_with_source("Failed to parse token response", e)
        })?;

        let token = body
            .get("Token")
            .and_then(|v| v.as_str())
            .map(std::string::ToString::to_string)
            .ok_or_else(|| ConnectorError::invalid_response("token response has no 'Token'"))?;

        debug!("Obtained controller session token");
        Ok(token)
    }

    /// Build a request with the session token and JSON headers.
    async fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        query: &[(String, String)],
    ) -> ConnectorResult<reqwest::RequestBuilder> {
        let builder = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        let token = self.auth_token().await?;

        let mut builder = builder
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header(AUTH_TOKEN_HEADER, token);

        if !query.is_empty() {
            builder = builder.query(query);
        }

        Ok(builder)
    }

    /// Send a request with retry logic.
    ///
    /// This method handles:
    /// 1. Request logging based on verbosity
    /// 2. Automatic retry with exponential backoff for transient errors
    /// 3. Retry-After header parsing for 429 responses
    /// 4. A single re-authentication when the token is rejected
    async fn send_with_retry(
        &self,
        method: HttpMethod,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ConnectorResult<Response> {
        let retry_config = &self.config.retry;
        let verbosity = &self.config.log_verbosity;
        let mut attempt = 0;
        let mut reauthenticated = false;

        loop {
            attempt += 1;

            let mut request = self.build_request(method, url, query).await?;
            if let Some(json_body) = body {
                request = request.json(json_body);
            }

            if verbosity.is_enabled() {
                debug!(
                    url = %url,
                    method = %method.as_str(),
                    attempt = attempt,
                    "Sending controller request"
                );
            }
            if verbosity.log_bodies() {
                if let Some(json_body) = body {
                    trace!(body = %json_body, "Request body");
                }
            }

            let response = request.send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if verbosity.is_enabled() {
                        debug!(
                            url = %url,
                            status = %status,
                            attempt = attempt,
                            "Received controller response"
                        );
                    }
                    if verbosity.log_headers() {
                        trace!(headers = ?resp.headers(), "Response headers");
                    }

                    // Tokens expire server-side; get a fresh one once
                    if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                        warn!(url = %url, "Session token rejected, re-authenticating");
                        self.invalidate_token().await;
                        reauthenticated = true;
                        attempt -= 1;
                        continue;
                    }

                    if retry_config.should_retry(status.as_u16())
                        && attempt <= retry_config.max_retries
                    {
                        if status == StatusCode::TOO_MANY_REQUESTS {
                            let retry_after = resp
                                .headers()
                                .get(header::RETRY_AFTER)
                                .and_then(|v| v.to_str().ok())
                                .and_then(parse_retry_after);

                            let wait = retry_after
                                .unwrap_or_else(|| retry_config.calculate_backoff(attempt));

                            warn!(
                                url = %url,
                                attempt = attempt,
                                wait_ms = wait.as_millis(),
                                "Rate limited (429), waiting before retry"
                            );

                            tokio::time::sleep(wait).await;
                            continue;
                        }

                        let backoff = retry_config.calculate_backoff(attempt);
                        warn!(
                            url = %url,
                            status = %status,
                            attempt = attempt,
                            wait_ms = backoff.as_millis(),
                            "Transient error, retrying with backoff"
                        );

                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    if attempt <= retry_config.max_retries {
                        let backoff = retry_config.calculate_backoff(attempt);
                        warn!(
                            url = %url,
                            error = %e,
                            attempt = attempt,
                            wait_ms = backoff.as_millis(),
                            "Request failed, retrying with backoff"
                        );

                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if e.is_timeout() {
                        return Err(ConnectorError::ConnectionTimeout {
                            timeout_secs: self.config.connection.read_timeout_secs,
                        });
                    }

                    return Err(ConnectorError::connection_failed_with_source(
                        format!("Request failed after {attempt} attempts: {url}"),
                        e,
                    ));
                }
            }
        }
    }

    /// Send a request and decode a successful JSON answer.
    ///
    /// Returns `Ok(None)` on 404 so lookups can report `NotFound`.
    async fn send_json(
        &self,
        method: HttpMethod,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ConnectorResult<Option<Value>> {
        let response = self.send_with_retry(method, url, query, body).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.handle_response_error(status, &text));
        }

        let text = response.text().await.map_err(|e| {
            ConnectorError::network_with_source("Failed to read response body", e)
        })?;

        if self.config.log_verbosity.log_bodies() {
            trace!(body = %text, "Response body");
        }

        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ConnectorError::invalid_response(format!("malformed JSON from {url}: {e}")))
    }

    /// Like `send_json`, but a 404 is an error naming `identifier`.
    async fn send_json_expecting(
        &self,
        method: HttpMethod,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        identifier: &str,
    ) -> ConnectorResult<Value> {
        self.send_json(method, url, query, body)
            .await?
            .ok_or_else(|| ConnectorError::ObjectNotFound {
                identifier: identifier.to_string(),
            })
    }

    /// Handle API response errors.
    fn handle_response_error(&self, status: StatusCode, body: &str) -> ConnectorError {
        let error_message = extract_error_message(body);

        match status {
            StatusCode::UNAUTHORIZED => ConnectorError::TokenExpired,
            StatusCode::FORBIDDEN => ConnectorError::AuthorizationFailed {
                operation: "API call".to_string(),
            },
            StatusCode::NOT_FOUND => ConnectorError::ObjectNotFound {
                identifier: "unknown".to_string(),
            },
            StatusCode::CONFLICT => ConnectorError::ObjectAlreadyExists {
                identifier: error_message,
            },
            StatusCode::TOO_MANY_REQUESTS => ConnectorError::TargetUnavailable {
                message: format!("Rate limited: {error_message}"),
            },
            StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::BAD_GATEWAY
            | StatusCode::GATEWAY_TIMEOUT => ConnectorError::TargetUnavailable {
                message: error_message,
            },
            _ => ConnectorError::operation_failed(format!("HTTP {status}: {error_message}")),
        }
    }

    /// Path of the collection endpoint for a family.
    fn collection_endpoint(&self, family: EntityFamily, operation: &str) -> ConnectorResult<&str> {
        match family {
            EntityFamily::Site => Ok(self.config.endpoints.sites.as_str()),
            EntityFamily::Tag => Ok(self.config.endpoints.tags.as_str()),
            EntityFamily::TagMember => Err(unsupported(operation, family)),
        }
    }

    /// Path of the single-entity endpoint for a family.
    fn entity_endpoint(
        &self,
        family: EntityFamily,
        id: &str,
        operation: &str,
    ) -> ConnectorResult<String> {
        let endpoints = &self.config.endpoints;
        match family {
            EntityFamily::Site => Ok(endpoints.endpoint_for_id(&endpoints.site, id)),
            EntityFamily::Tag => Ok(endpoints.endpoint_for_id(&endpoints.tag, id)),
            EntityFamily::TagMember => Err(unsupported(operation, family)),
        }
    }
}

fn unsupported(operation: &str, family: EntityFamily) -> ConnectorError {
    ConnectorError::UnsupportedOperation {
        operation: operation.to_string(),
        family: family.to_string(),
    }
}

/// Base64 encode bytes to string.
fn base64_encode(data: impl AsRef<[u8]>) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine};
    STANDARD.encode(data)
}

/// Pull a readable message out of a controller error body.
fn extract_error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    let candidates = [
        json.pointer("/response/detail"),
        json.pointer("/response/message"),
        json.get("detail"),
        json.get("message"),
        json.get("error"),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Some(message) = candidate.as_str() {
            return message.to_string();
        }
    }
    body.to_string()
}

/// First element of the `response` list, or `NotFound` when empty.
fn first_record(body: Value) -> ConnectorResult<Lookup> {
    match body.get("response") {
        Some(Value::Array(items)) => Ok(items
            .first()
            .cloned()
            .map_or(Lookup::NotFound, Lookup::Found)),
        Some(Value::Object(record)) if record.contains_key("id") => {
            Ok(Lookup::Found(Value::Object(record.clone())))
        }
        Some(Value::Object(record))
            if record.contains_key("errorCode") || record.contains_key("detail") =>
        {
            Ok(Lookup::NotFound)
        }
        Some(Value::Null) | None => Ok(Lookup::NotFound),
        Some(other) => Err(ConnectorError::invalid_response(format!(
            "unexpected lookup response: {other}"
        ))),
    }
}

/// `response` list of a list query.
fn response_list(body: Value) -> ConnectorResult<Vec<Value>> {
    match body {
        Value::Object(mut map) => match map.remove("response") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(ConnectorError::invalid_response(format!(
                "expected a list in 'response', got {other}"
            ))),
        },
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(ConnectorError::invalid_response(format!(
            "expected an object with 'response', got {other}"
        ))),
    }
}

/// Parse the acknowledgement of a business API mutation.
fn parse_execution_accepted(body: &Value) -> ConnectorResult<ExecutionAccepted> {
    let execution_id = body
        .get("executionId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ConnectorError::invalid_response("mutation response has no executionId"))?;

    let mut accepted = ExecutionAccepted::execution(execution_id);
    if let Some(url) = body.get("executionStatusUrl").and_then(|v| v.as_str()) {
        accepted = accepted.with_status_url(url);
    }
    if let Some(message) = body.get("message").and_then(|v| v.as_str()) {
        accepted = accepted.with_message(message);
    }
    Ok(accepted)
}

/// Parse the acknowledgement of a task API mutation.
fn parse_task_accepted(body: &Value) -> ConnectorResult<ExecutionAccepted> {
    let response = body.get("response").unwrap_or(body);
    let task_id = response
        .get("taskId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ConnectorError::invalid_response("mutation response has no taskId"))?;

    let mut accepted = ExecutionAccepted::task(task_id);
    if let Some(url) = response.get("url").and_then(|v| v.as_str()) {
        accepted = accepted.with_status_url(url);
    }
    Ok(accepted)
}

/// Acknowledgement for whichever handle the controller returned.
fn parse_accepted(body: &Value) -> ConnectorResult<ExecutionAccepted> {
    if body.get("executionId").is_some() {
        parse_execution_accepted(body)
    } else {
        parse_task_accepted(body)
    }
}

/// Map a business API execution-status payload.
fn parse_execution_details(body: Value) -> ExecutionDetails {
    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .map_or(ExecutionStatus::Pending, ExecutionStatus::from_controller);
    let bapi_error = body
        .get("bapiError")
        .and_then(|v| v.as_str())
        .map(std::string::ToString::to_string);

    ExecutionDetails::new(status, body).with_bapi_error(bapi_error)
}

/// Map a task payload onto the same shape as an execution.
fn parse_task_details(body: Value) -> ExecutionDetails {
    let task = body.get("response").unwrap_or(&body);

    let is_error = task
        .get("isError")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let finished = task.get("endTime").is_some_and(|v| !v.is_null());

    let failure = if is_error {
        Some(
            task.get("failureReason")
                .or_else(|| task.get("progress"))
                .and_then(|v| v.as_str())
                .unwrap_or("task failed without a reason")
                .to_string(),
        )
    } else {
        None
    };

    let status = if is_error {
        ExecutionStatus::Failed
    } else if finished {
        ExecutionStatus::Success
    } else {
        ExecutionStatus::Pending
    };

    let raw = task.clone();
    ExecutionDetails::new(status, raw).with_bapi_error(failure)
}

#[async_trait]
impl InventoryConnector for DnacRestClient {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        self.invalidate_token().await;
        self.auth_token().await?;

        info!(
            base_url = %self.config.base_url(),
            "Controller connection test successful"
        );

        Ok(())
    }
}

#[async_trait]
impl LookupOp for DnacRestClient {
    #[instrument(skip(self), fields(key = %filter.describe()))]
    async fn lookup(
        &self,
        family: EntityFamily,
        filter: &LookupFilter,
    ) -> ConnectorResult<Lookup> {
        let (url, query) = match (family, &filter.id, &filter.name) {
            (EntityFamily::Site, _, Some(name)) => (
                self.config.url(&self.config.endpoints.sites),
                vec![("name".to_string(), name.clone())],
            ),
            (EntityFamily::Site, Some(id), None) => (
                self.config.url(&self.config.endpoints.sites),
                vec![("siteId".to_string(), id.clone())],
            ),
            (EntityFamily::Tag, Some(id), _) => (
                self.config.url(&self.entity_endpoint(family, id, "lookup")?),
                Vec::new(),
            ),
            (EntityFamily::Tag, None, Some(name)) => (
                self.config.url(&self.config.endpoints.tags),
                vec![("name".to_string(), name.clone())],
            ),
            (EntityFamily::TagMember, _, _) => return Err(unsupported("lookup", family)),
            (_, None, None) => {
                return Err(ConnectorError::InvalidData {
                    message: "lookup filter needs a name or an id".to_string(),
                })
            }
        };

        debug!(url = %url, family = %family, "Looking up entity");

        match self.send_json(HttpMethod::Get, &url, &query, None).await? {
            Some(body) => first_record(body),
            None => Ok(Lookup::NotFound),
        }
    }
}

#[async_trait]
impl MutateOp for DnacRestClient {
    #[instrument(skip(self, payload))]
    async fn create(
        &self,
        family: EntityFamily,
        payload: &Value,
    ) -> ConnectorResult<ExecutionAccepted> {
        let url = self.config.url(self.collection_endpoint(family, "create")?);

        debug!(url = %url, family = %family, "Creating entity");

        let body = self
            .send_json_expecting(HttpMethod::Post, &url, &[], Some(payload), &url)
            .await?;
        let accepted = parse_accepted(&body)?;

        info!(
            family = %family,
            execution_id = %accepted.execution_id,
            "Create accepted"
        );
        Ok(accepted)
    }

    #[instrument(skip(self, payload))]
    async fn update(
        &self,
        family: EntityFamily,
        id: &EntityId,
        payload: &Value,
    ) -> ConnectorResult<ExecutionAccepted> {
        let (url, body) = match family {
            EntityFamily::Site => (
                self.config
                    .url(&self.entity_endpoint(family, id.as_str(), "update")?),
                payload.clone(),
            ),
            // Tags are updated on the collection with the id in the body
            EntityFamily::Tag => {
                let mut body = payload.clone();
                if let Value::Object(ref mut map) = body {
                    map.insert("id".to_string(), json!(id.as_str()));
                }
                (self.config.url(&self.config.endpoints.tags), body)
            }
            EntityFamily::TagMember => return Err(unsupported("update", family)),
        };

        debug!(url = %url, family = %family, id = %id, "Updating entity");

        let response = self
            .send_json_expecting(HttpMethod::Put, &url, &[], Some(&body), id.as_str())
            .await?;
        let accepted = parse_accepted(&response)?;

        info!(
            family = %family,
            id = %id,
            execution_id = %accepted.execution_id,
            "Update accepted"
        );
        Ok(accepted)
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        family: EntityFamily,
        id: &EntityId,
    ) -> ConnectorResult<ExecutionAccepted> {
        let url = self
            .config
            .url(&self.entity_endpoint(family, id.as_str(), "delete")?);

        debug!(url = %url, family = %family, id = %id, "Deleting entity");

        let response = self
            .send_json_expecting(HttpMethod::Delete, &url, &[], None, id.as_str())
            .await?;
        let accepted = parse_accepted(&response)?;

        info!(
            family = %family,
            id = %id,
            execution_id = %accepted.execution_id,
            "Delete accepted"
        );
        Ok(accepted)
    }
}

#[async_trait]
impl ExecutionStatusOp for DnacRestClient {
    #[instrument(skip(self))]
    async fn execution_status(
        &self,
        kind: HandleKind,
        execution_id: &ExecutionId,
    ) -> ConnectorResult<ExecutionDetails> {
        let endpoints = &self.config.endpoints;
        let template = match kind {
            HandleKind::Execution => &endpoints.execution_status,
            HandleKind::Task => &endpoints.task,
        };
        let url = self
            .config
            .url(&endpoints.endpoint_for_id(template, execution_id.as_str()));

        let body = self
            .send_json(HttpMethod::Get, &url, &[], None)
            .await?
            .ok_or_else(|| ConnectorError::ExecutionNotFound {
                execution_id: execution_id.clone(),
            })?;

        let details = match kind {
            HandleKind::Execution => parse_execution_details(body),
            HandleKind::Task => parse_task_details(body),
        };

        debug!(
            execution_id = %execution_id,
            status = %details.status,
            "Fetched execution status"
        );
        Ok(details)
    }
}

#[async_trait]
impl TagMemberOp for DnacRestClient {
    #[instrument(skip(self, member_ids), fields(count = member_ids.len()))]
    async fn add_members(
        &self,
        tag_id: &EntityId,
        member_type: &str,
        member_ids: &[String],
    ) -> ConnectorResult<ExecutionAccepted> {
        let endpoints = &self.config.endpoints;
        let url = self
            .config
            .url(&endpoints.endpoint_for_id(&endpoints.tag_members, tag_id.as_str()));
        let mut members = serde_json::Map::new();
        members.insert(member_type.to_string(), json!(member_ids));
        let body = Value::Object(members);

        let response = self
            .send_json_expecting(HttpMethod::Post, &url, &[], Some(&body), tag_id.as_str())
            .await?;
        let accepted = parse_task_accepted(&response)?;

        info!(tag_id = %tag_id, task_id = %accepted.execution_id, "Member addition accepted");
        Ok(accepted)
    }

    #[instrument(skip(self))]
    async fn remove_member(
        &self,
        tag_id: &EntityId,
        member_id: &str,
    ) -> ConnectorResult<ExecutionAccepted> {
        let endpoints = &self.config.endpoints;
        let url = self.config.url(&endpoints.endpoint_for_member(
            &endpoints.tag_member,
            tag_id.as_str(),
            member_id,
        ));

        let response = self
            .send_json_expecting(HttpMethod::Delete, &url, &[], None, member_id)
            .await?;
        let accepted = parse_task_accepted(&response)?;

        info!(
            tag_id = %tag_id,
            member_id = %member_id,
            task_id = %accepted.execution_id,
            "Member removal accepted"
        );
        Ok(accepted)
    }

    #[instrument(skip(self))]
    async fn list_members(
        &self,
        tag_id: &EntityId,
        query: &TagMemberQuery,
    ) -> ConnectorResult<Vec<Value>> {
        let endpoints = &self.config.endpoints;
        let url = self
            .config
            .url(&endpoints.endpoint_for_id(&endpoints.tag_members, tag_id.as_str()));

        let body = self
            .send_json_expecting(
                HttpMethod::Get,
                &url,
                &query.to_query_params(),
                None,
                tag_id.as_str(),
            )
            .await?;
        response_list(body)
    }

    #[instrument(skip(self))]
    async fn count_members(
        &self,
        tag_id: &EntityId,
        query: &TagMemberQuery,
    ) -> ConnectorResult<u64> {
        let endpoints = &self.config.endpoints;
        let url = self
            .config
            .url(&endpoints.endpoint_for_id(&endpoints.tag_member_count, tag_id.as_str()));

        // The count endpoint ignores paging
        let mut params = query.to_query_params();
        params.retain(|(key, _)| key != "offset" && key != "limit");

        let body = self
            .send_json_expecting(HttpMethod::Get, &url, &params, None, tag_id.as_str())
            .await?;

        body.get("response")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| ConnectorError::invalid_response("member count is not a number"))
    }

    #[instrument(skip(self))]
    async fn member_types(&self) -> ConnectorResult<Vec<String>> {
        let url = self.config.url(&self.config.endpoints.tag_member_types);

        let body = self
            .send_json_expecting(HttpMethod::Get, &url, &[], None, "member types")
            .await?;

        Ok(response_list(body)?
            .into_iter()
            .filter_map(|v| v.as_str().map(std::string::ToString::to_string))
            .collect())
    }

    #[instrument(skip(self, update), fields(member_type = %update.member_type))]
    async fn update_membership(
        &self,
        update: &MembershipUpdate,
    ) -> ConnectorResult<ExecutionAccepted> {
        if update.is_empty() {
            return Err(ConnectorError::InvalidData {
                message: "membership update lists no members".to_string(),
            });
        }

        let url = self.config.url(&self.config.endpoints.tag_membership);
        let body = serde_json::to_value(update)?;

        let response = self
            .send_json_expecting(HttpMethod::Put, &url, &[], Some(&body), "tag membership")
            .await?;
        let accepted = parse_task_accepted(&response)?;

        info!(task_id = %accepted.execution_id, "Membership update accepted");
        Ok(accepted)
    }
}

#[async_trait]
impl DeviceInsightOp for DnacRestClient {
    #[instrument(skip(self))]
    async fn devices_with_snmp_v3_des(
        &self,
        site_id: &EntityId,
        page: &PageRequest,
    ) -> ConnectorResult<Vec<Value>> {
        let endpoints = &self.config.endpoints;
        let url = self
            .config
            .url(&endpoints.endpoint_for_id(&endpoints.snmp_v3_des_devices, site_id.as_str()));

        let body = self
            .send_json_expecting(
                HttpMethod::Get,
                &url,
                &page.to_query_params(),
                None,
                site_id.as_str(),
            )
            .await?;
        response_list(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_new() {
        let config = DnacConfig::new("dnac.example.net", "admin", "secret");
        let client = DnacRestClient::new(config).unwrap();
        assert_eq!(client.display_name(), "DNAC: https://dnac.example.net:443");
    }

    #[test]
    fn test_client_invalid_config() {
        let config = DnacConfig::new("", "admin", "secret");
        assert!(DnacRestClient::new(config).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DnacConfig::new("dnac", "admin", "hunter2");
        let client = DnacRestClient::new(config).unwrap();
        assert!(!format!("{client:?}").contains("hunter2"));
    }

    #[test]
    fn test_first_record() {
        let found = first_record(json!({"response": [{"id": "a"}, {"id": "b"}]})).unwrap();
        assert_eq!(found, Lookup::Found(json!({"id": "a"})));

        let empty = first_record(json!({"response": []})).unwrap();
        assert_eq!(empty, Lookup::NotFound);

        let single = first_record(json!({"response": {"id": "t1", "name": "x"}})).unwrap();
        assert!(single.exists());

        let error_shape = first_record(json!({
            "response": {"errorCode": "NCGR10008", "detail": "Site not found"}
        }))
        .unwrap();
        assert_eq!(error_shape, Lookup::NotFound);

        assert!(first_record(json!({"response": "odd"})).is_err());
    }

    #[test]
    fn test_parse_execution_accepted() {
        let accepted = parse_accepted(&json!({
            "executionId": "e-1",
            "executionStatusUrl": "/dna/intent/api/v1/dnacaap/management/execution-status/e-1",
            "message": "The request has been accepted for execution"
        }))
        .unwrap();
        assert_eq!(accepted.kind, HandleKind::Execution);
        assert_eq!(accepted.execution_id.as_str(), "e-1");
        assert!(accepted.status_url.is_some());
    }

    #[test]
    fn test_parse_task_accepted() {
        let accepted = parse_accepted(&json!({
            "version": "1.0",
            "response": {"taskId": "t-9", "url": "/api/v1/task/t-9"}
        }))
        .unwrap();
        assert_eq!(accepted.kind, HandleKind::Task);
        assert_eq!(accepted.execution_id.as_str(), "t-9");

        assert!(parse_accepted(&json!({"response": {}})).is_err());
    }

    #[test]
    fn test_parse_execution_details() {
        let success = parse_execution_details(json!({"status": "SUCCESS", "bapiError": null}));
        assert!(success.is_success());

        let failed = parse_execution_details(json!({
            "status": "FAILURE",
            "bapiError": "Invalid parent"
        }));
        assert_eq!(failed.error_message(), Some("Invalid parent"));

        let running = parse_execution_details(json!({"status": "IN_PROGRESS"}));
        assert!(!running.is_terminal());
    }

    #[test]
    fn test_parse_task_details() {
        let done = parse_task_details(json!({
            "response": {"taskId": "t", "isError": false, "endTime": 1700000000000_u64}
        }));
        assert!(done.is_success());

        let failed = parse_task_details(json!({
            "response": {"taskId": "t", "isError": true, "failureReason": "Tag in use"}
        }));
        assert_eq!(failed.status, ExecutionStatus::Failed);
        assert_eq!(failed.error_message(), Some("Tag in use"));

        let running = parse_task_details(json!({"response": {"taskId": "t", "isError": false}}));
        assert_eq!(running.status, ExecutionStatus::Pending);
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"response": {"detail": "Site name exists"}}"#),
            "Site name exists"
        );
        assert_eq!(extract_error_message(r#"{"message": "bad"}"#), "bad");
        assert_eq!(extract_error_message("plain text"), "plain text");
        assert_eq!(
            extract_error_message(r#"{"response": {"detail": 42}, "error": "Unauthorized"}"#),
            "Unauthorized"
        );
        assert_eq!(extract_error_message(r#"{"code": 7}"#), r#"{"code": 7}"#);
    }

    #[test]
    fn test_response_list() {
        assert_eq!(
            response_list(json!({"response": ["a", "b"]})).unwrap().len(),
            2
        );
        assert!(response_list(json!({"version": "1.0"})).unwrap().is_empty());
        assert!(response_list(json!("nope")).is_err());
    }
}
