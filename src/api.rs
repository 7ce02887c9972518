// API client module: the `CapApi` contract every command talks to, and a
// blocking reqwest implementation of it for the Analysis Preservation REST
// API. Commands only ever see the trait, so tests swap in a mock.

use crate::config::Settings;
use crate::error::ApiError;
use anyhow::Context;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::path::Path;

/// Operations offered by the remote service. Each method performs exactly
/// one logical call and never retries.
#[cfg_attr(test, mockall::automock)]
pub trait CapApi {
    /// Health check.
    fn ping(&self) -> Result<Value, ApiError>;
    /// Current user info.
    fn me(&self) -> Result<Value, ApiError>;
    /// One analysis by pid, or every accessible analysis when `all` is set.
    fn get(&self, pid: Option<String>, all: bool) -> Result<Value, ApiError>;
    fn create(
        &self,
        data: &Value,
        ana_type: Option<String>,
        version: Option<String>,
    ) -> Result<Value, ApiError>;
    /// Returns either the server's JSON or a plain confirmation string.
    fn delete(&self, pid: &str) -> Result<Value, ApiError>;
    fn update(&self, pid: &str, data: &Value) -> Result<Value, ApiError>;
    /// `data` is a JSON Patch document.
    fn patch(&self, pid: &str, data: &Value) -> Result<Value, ApiError>;
    /// Attach a local file to an analysis under `output_filename`.
    fn upload(&self, pid: &str, filepath: &Path, output_filename: &str)
        -> Result<Value, ApiError>;
    /// Analysis type names, in the order the server lists them.
    fn types(&self) -> Result<Vec<String>, ApiError>;
}

/// Blocking HTTP client holding the server URL and an optional access token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    server: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct Deposit {
    #[serde(default)]
    links: DepositLinks,
}

#[derive(Deserialize, Default)]
struct DepositLinks {
    bucket: Option<String>,
}

#[derive(Deserialize)]
struct UserInfo {
    #[serde(default)]
    deposit_groups: Vec<DepositGroup>,
}

#[derive(Deserialize)]
struct DepositGroup {
    deposit_group: String,
}

impl ApiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.insecure)
            .build()
            .context("Failed to build HTTP client")?;
        let base = Url::parse(&settings.server)
            .with_context(|| format!("Invalid server URL {}", settings.server))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid server URL {}", settings.server);
        }
        Ok(ApiClient {
            client,
            base,
            server: settings.server.clone(),
            token: settings.token.clone(),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// `<server>/api/<segments...>`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        push_segments(self.base.clone(), std::iter::once("api").chain(segments.iter().copied()))
            .ok_or_else(|| ApiError::Invalid(format!("cannot build a URL on {}", self.base)))
    }

    fn deposit_url(&self, pid: &str) -> Result<Url, ApiError> {
        self.url(&["deposits", pid])
    }

    /// Authorization header map when a token is set.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(t) = &self.token {
            match HeaderValue::from_str(&format!("Bearer {}", t)) {
                Ok(val) => {
                    headers.insert(AUTHORIZATION, val);
                }
                Err(_) => tracing::warn!("access token contains invalid header characters; sending without it"),
            }
        }
        headers
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let res = req.headers(self.auth_headers()).send()?;
        let status = res.status();
        tracing::debug!(status = status.as_u16(), url = %res.url(), "response");
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }

    /// Response body as JSON; an empty body becomes `Value::Null`.
    fn json(res: Response) -> Result<Value, ApiError> {
        let text = res.text()?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Response(format!("body is not JSON: {}", e)))
    }

    /// Body sent on create: `$ana_type` and `$schema` are filled in from
    /// the type and version when given.
    fn create_body(
        &self,
        data: &Value,
        ana_type: Option<&str>,
        version: Option<&str>,
    ) -> Result<Value, ApiError> {
        let Some(ana_type) = ana_type else {
            return Ok(data.clone());
        };
        let mut body = data.clone();
        let obj = body.as_object_mut().ok_or_else(|| {
            ApiError::Invalid("analysis data must be a JSON object to set its type".into())
        })?;
        obj.insert("$ana_type".into(), Value::String(ana_type.to_string()));
        if let Some(version) = version {
            obj.insert(
                "$schema".into(),
                Value::String(format!(
                    "{}/schemas/deposits/records/{}-v{}.json",
                    self.server, ana_type, version
                )),
            );
        }
        Ok(body)
    }
}

/// Append path segments to `url`; `None` if it cannot have a path.
fn push_segments<'a>(mut url: Url, segments: impl IntoIterator<Item = &'a str>) -> Option<Url> {
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    Some(url)
}

impl CapApi for ApiClient {
    fn ping(&self) -> Result<Value, ApiError> {
        let res = self.send(self.client.get(self.url(&["ping"])?))?;
        Self::json(res)
    }

    fn me(&self) -> Result<Value, ApiError> {
        let res = self.send(self.client.get(self.url(&["me"])?))?;
        Self::json(res)
    }

    fn get(&self, pid: Option<String>, all: bool) -> Result<Value, ApiError> {
        let url = match (pid, all) {
            (_, true) => self.url(&["deposits", ""])?,
            (Some(pid), false) => self.deposit_url(&pid)?,
            (None, false) => {
                return Err(ApiError::Invalid("either a pid or `all` is required".into()))
            }
        };
        let res = self.send(self.client.get(url))?;
        Self::json(res)
    }

    fn create(
        &self,
        data: &Value,
        ana_type: Option<String>,
        version: Option<String>,
    ) -> Result<Value, ApiError> {
        let body = self.create_body(data, ana_type.as_deref(), version.as_deref())?;
        let res = self.send(self.client.post(self.url(&["deposits", ""])?).json(&body))?;
        Self::json(res)
    }

    fn delete(&self, pid: &str) -> Result<Value, ApiError> {
        let res = self.send(self.client.delete(self.deposit_url(pid)?))?;
        match Self::json(res)? {
            Value::Null => Ok(Value::String(format!("Analysis {} deleted.", pid))),
            other => Ok(other),
        }
    }

    fn update(&self, pid: &str, data: &Value) -> Result<Value, ApiError> {
        let res = self.send(self.client.put(self.deposit_url(pid)?).json(data))?;
        Self::json(res)
    }

    fn patch(&self, pid: &str, data: &Value) -> Result<Value, ApiError> {
        let body = serde_json::to_vec(data)
            .map_err(|e| ApiError::Invalid(format!("cannot encode patch: {}", e)))?;
        let req = self
            .client
            .patch(self.deposit_url(pid)?)
            .header(CONTENT_TYPE, "application/json-patch+json")
            .body(body);
        let res = self.send(req)?;
        Self::json(res)
    }

    fn upload(
        &self,
        pid: &str,
        filepath: &Path,
        output_filename: &str,
    ) -> Result<Value, ApiError> {
        let res = self.send(self.client.get(self.deposit_url(pid)?))?;
        let deposit: Deposit = res
            .json()
            .map_err(|e| ApiError::Response(format!("cannot read analysis {}: {}", pid, e)))?;
        let bucket = deposit
            .links
            .bucket
            .ok_or_else(|| ApiError::Response(format!("analysis {} has no file bucket", pid)))?;

        let file = File::open(filepath).map_err(|source| ApiError::File {
            path: filepath.to_path_buf(),
            source,
        })?;
        // the name is one path segment, so `#`, `?` and `%` stay part of it
        let url = Url::parse(&bucket)
            .ok()
            .and_then(|u| push_segments(u, [output_filename]))
            .ok_or_else(|| ApiError::Response(format!("bad file bucket URL {}", bucket)))?;
        tracing::info!(%url, "uploading file");
        let res = self.send(self.client.put(url).body(file))?;
        Self::json(res)
    }

    fn types(&self) -> Result<Vec<String>, ApiError> {
        let res = self.send(self.client.get(self.url(&["me"])?))?;
        let info: UserInfo = res
            .json()
            .map_err(|e| ApiError::Response(format!("cannot read user info: {}", e)))?;
        Ok(info
            .deposit_groups
            .into_iter()
            .map(|g| g.deposit_group)
            .collect())
    }
}
