use reqwest::blocking::multipart;
use reqwest::blocking::{Client, RequestBuilder};

use crate::opencast::bridge::config::BridgeConfig;
use crate::opencast::bridge::error::{BridgeError, Result};
use crate::opencast::bridge::io::client::{Form, FormValue, Query, RemoteResponse, ResourceClient};
use tracing::{debug, instrument};

/// Header asking the platform to evaluate a request with the given roles.
pub const RUN_WITH_ROLES_HEADER: &str = "X-RUN-WITH-ROLES";

/// Blocking HTTP client authenticating with basic credentials.
///
/// Each call issues exactly one request; failures are returned unchanged.
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    base_url: String,
    username: String,
    password: String,
    http_client: Client,
}

impl HttpResourceClient {
    /// Builds a client from validated configuration.
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent("opencast-bridge/0.1");
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let http_client = builder.build().map_err(|err| {
            BridgeError::Configuration(format!("failed to build HTTP client: {err}"))
        })?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            username: config.api_username.clone(),
            password: config.api_password.clone(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, builder: RequestBuilder) -> Result<RemoteResponse> {
        let response = builder
            .basic_auth(&self.username, Some(&self.password))
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        debug!(status, body_len = body.len(), "received response");
        Ok(RemoteResponse::new(status, body))
    }

    fn with_form(builder: RequestBuilder, form: &Form) -> Result<RequestBuilder> {
        if !form.has_files() {
            let pairs: Vec<(&str, &str)> = form
                .fields()
                .iter()
                .filter_map(|field| match &field.value {
                    FormValue::Text(value) => Some((field.name.as_str(), value.as_str())),
                    FormValue::File(_) => None,
                })
                .collect();
            return Ok(builder.form(&pairs));
        }

        let mut multipart_form = multipart::Form::new();
        for field in form.fields() {
            multipart_form = match &field.value {
                FormValue::Text(value) => multipart_form.text(field.name.clone(), value.clone()),
                FormValue::File(path) => multipart_form.file(field.name.clone(), path)?,
            };
        }
        Ok(builder.multipart(multipart_form))
    }
}

impl ResourceClient for HttpResourceClient {
    #[instrument(level = "debug", skip(self, query, run_as_roles), fields(method = "GET"))]
    fn get(
        &self,
        path: &str,
        query: &Query<'_>,
        run_as_roles: &[String],
    ) -> Result<RemoteResponse> {
        let mut builder = self.http_client.get(self.url(path)).query(query);
        if !run_as_roles.is_empty() {
            builder = builder.header(RUN_WITH_ROLES_HEADER, run_as_roles.join(", "));
        }
        self.send(builder)
    }

    #[instrument(level = "debug", skip(self, form), fields(method = "POST"))]
    fn post(&self, path: &str, form: &Form) -> Result<RemoteResponse> {
        let builder = Self::with_form(self.http_client.post(self.url(path)), form)?;
        self.send(builder)
    }

    #[instrument(level = "debug", skip(self, query, form), fields(method = "PUT"))]
    fn put(&self, path: &str, query: &Query<'_>, form: &Form) -> Result<RemoteResponse> {
        let builder = self.http_client.put(self.url(path)).query(query);
        let builder = Self::with_form(builder, form)?;
        self.send(builder)
    }
}
