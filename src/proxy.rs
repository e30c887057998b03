//! Forwarding passthrough that relays a request record to an upstream host.
//!
//! The forwarder builds `http://{host}{path}?{query}` (or keeps an explicit `https://` host),
//! encodes the body according to the request's `Content-Type`, and returns the upstream status,
//! headers, and body stream. Every suspension point races the caller's [`CallContext`]; dropping
//! a [`ForwardResponse`] releases the underlying connection.

// crates.io
use reqwest::{Method, Response as ReqwestResponse, header::CONTENT_TYPE};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	context::CallContext,
	error::{TransportError, ValidationError},
	validate::require,
};

/// Upstream call described by a generic record.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForwardRequest {
	/// Upstream authority (`api.internal:8080`), optionally with an `http(s)://` scheme.
	#[serde(default)]
	pub host: Option<String>,
	/// HTTP method; defaults to `GET`.
	#[serde(default)]
	pub method: Option<String>,
	/// Request path.
	#[serde(default)]
	pub path: String,
	/// Query parameters.
	#[serde(default)]
	pub query: BTreeMap<String, String>,
	/// Request headers.
	#[serde(default, alias = "headers")]
	pub header: BTreeMap<String, String>,
	/// Body; always JSON-encoded under `application/json`, otherwise sent verbatim when it is a
	/// string and dropped when it is not.
	#[serde(default)]
	pub body: Option<Value>,
}
impl ForwardRequest {
	/// Creates a `GET` request for `host` and `path`.
	pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
		Self { host: Some(host.into()), path: path.into(), ..Default::default() }
	}

	/// Sets the HTTP method.
	pub fn with_method(mut self, method: impl Into<String>) -> Self {
		self.method = Some(method.into());

		self
	}

	/// Adds a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(name.into(), value.into());

		self
	}

	/// Adds a request header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.header.insert(name.into(), value.into());

		self
	}

	/// Sets the body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	fn target_url(&self) -> Result<Url, ValidationError> {
		let host = require("host", self.host.as_deref())?;
		let base = if host.starts_with("http://") || host.starts_with("https://") {
			host.to_owned()
		} else {
			format!("http://{host}")
		};
		let mut url = Url::parse(&base)
			.map_err(|e| ValidationError::Malformed { field: "host", reason: e.to_string() })?;

		let (path, inline_query) = match self.path.split_once('?') {
			Some((path, query)) => (path, Some(query)),
			None => (self.path.as_str(), None),
		};

		if !path.is_empty() {
			url.set_path(path);
		}

		url.set_query(inline_query);

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.query);
		}

		Ok(url)
	}

	fn method(&self) -> Result<Method, ValidationError> {
		match self.method.as_deref() {
			Some(method) if !method.is_empty() =>
				Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|e| {
					ValidationError::Malformed { field: "method", reason: e.to_string() }
				}),
			_ => Ok(Method::GET),
		}
	}

	fn encoded_body(&self) -> Result<Option<Vec<u8>>, ValidationError> {
		let Some(body) = &self.body else {
			return Ok(None);
		};
		let is_json = self.header.iter().any(|(name, value)| {
			name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) && value.contains("application/json")
		});

		match body {
			body if is_json => serde_json::to_vec(body)
				.map(Some)
				.map_err(|e| ValidationError::Malformed { field: "body", reason: e.to_string() }),
			Value::String(raw) => Ok(Some(raw.clone().into_bytes())),
			_ => Ok(None),
		}
	}
}

/// Reqwest-backed forwarder.
#[derive(Clone, Debug, Default)]
pub struct HttpForwarder {
	client: ReqwestClient,
}
impl HttpForwarder {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client }
	}

	/// Sends `request` upstream and returns once the response head arrives.
	pub async fn forward(&self, ctx: &CallContext, request: ForwardRequest) -> Result<ForwardResponse> {
		ctx.ensure_active()?;

		let url = request.target_url()?;
		let method = request.method()?;
		let body = request.encoded_body()?;

		#[cfg(feature = "tracing")]
		tracing::debug!(
			%method,
			host = url.host_str().unwrap_or_default(),
			path = url.path(),
			"forwarding request"
		);

		let mut builder = self.client.request(method, url);

		for (name, value) in &request.header {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = body {
			builder = builder.body(body);
		}

		let inner = race(ctx, builder.send()).await?.map_err(TransportError::from)?;

		Ok(ForwardResponse { inner })
	}
}

/// Upstream response whose body is read on demand.
#[derive(Debug)]
pub struct ForwardResponse {
	inner: ReqwestResponse,
}
impl ForwardResponse {
	/// HTTP status code.
	pub fn status(&self) -> u16 {
		self.inner.status().as_u16()
	}

	/// Response headers, keeping the first value of repeated names.
	pub fn headers(&self) -> BTreeMap<String, String> {
		let mut headers = BTreeMap::new();

		for (name, value) in self.inner.headers() {
			if let Ok(value) = value.to_str() {
				headers.entry(name.as_str().to_owned()).or_insert_with(|| value.to_owned());
			}
		}

		headers
	}

	/// First value of header `name`, if present and printable.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.inner.headers().get(name).and_then(|value| value.to_str().ok())
	}

	/// Reads the next body chunk; `None` once the body is exhausted.
	pub async fn chunk(&mut self, ctx: &CallContext) -> Result<Option<Vec<u8>>> {
		let chunk = race(ctx, self.inner.chunk()).await?.map_err(TransportError::from)?;

		Ok(chunk.map(|bytes| bytes.to_vec()))
	}

	/// Reads the remaining body.
	pub async fn bytes(self, ctx: &CallContext) -> Result<Vec<u8>> {
		let bytes = race(ctx, self.inner.bytes()).await?.map_err(TransportError::from)?;

		Ok(bytes.to_vec())
	}

	/// Reads the remaining body as text, decoding per the response charset.
	pub async fn text(self, ctx: &CallContext) -> Result<String> {
		Ok(race(ctx, self.inner.text()).await?.map_err(TransportError::from)?)
	}
}

async fn race<F>(ctx: &CallContext, fut: F) -> Result<F::Output>
where
	F: Future,
{
	tokio::select! {
		biased;
		reason = ctx.done() => Err(Error::Canceled { reason }),
		output = fut => Ok(output),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn target_url_joins_host_path_and_query() {
		let request = ForwardRequest::new("api.internal:8080", "/v1/items")
			.with_query("page", "2")
			.with_query("q", "a b");
		let url = request.target_url().expect("URL should build.");

		assert_eq!(url.as_str(), "http://api.internal:8080/v1/items?page=2&q=a+b");

		let inline = ForwardRequest::new("api.internal", "/search?lang=en").with_query("q", "x");

		assert_eq!(
			inline.target_url().expect("Inline queries are kept.").as_str(),
			"http://api.internal/search?lang=en&q=x"
		);

		let secure = ForwardRequest::new("https://api.internal", "/health");

		assert_eq!(
			secure.target_url().expect("Explicit schemes are kept.").as_str(),
			"https://api.internal/health"
		);
		assert_eq!(
			ForwardRequest::default().target_url(),
			Err(ValidationError::Missing { field: "host" })
		);
	}

	#[test]
	fn body_encoding_follows_content_type() {
		let json = ForwardRequest::new("h", "/")
			.with_header("Content-Type", "application/json; charset=utf-8")
			.with_body(serde_json::json!({ "a": 1 }));

		assert_eq!(json.encoded_body(), Ok(Some(br#"{"a":1}"#.to_vec())));

		let json_string = ForwardRequest::new("h", "/")
			.with_header("content-type", "application/json")
			.with_body(Value::String("plain".into()));

		assert_eq!(json_string.encoded_body(), Ok(Some(br#""plain""#.to_vec())));

		let raw = ForwardRequest::new("h", "/").with_body(Value::String("plain".into()));

		assert_eq!(raw.encoded_body(), Ok(Some(b"plain".to_vec())));

		let unknown = ForwardRequest::new("h", "/").with_body(serde_json::json!([1, 2]));

		assert_eq!(unknown.encoded_body(), Ok(None));
	}

	#[test]
	fn method_defaults_to_get_and_is_normalized() {
		assert_eq!(ForwardRequest::new("h", "/").method(), Ok(Method::GET));
		assert_eq!(ForwardRequest::new("h", "/").with_method("post").method(), Ok(Method::POST));
		assert!(ForwardRequest::new("h", "/").with_method("BAD METHOD").method().is_err());
	}
}
