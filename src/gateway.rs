//! Operation dispatcher tying the signature codec, token issuer, and admission limiter together.
//!
//! [`Gateway`] is the process-wide service object. Callers either invoke the typed operations
//! directly or hand [`Gateway::run`] / [`Gateway::run_value`] a tagged [`Request`]; the dispatcher
//! path wraps every operation in an [`OperationSpan`] and records attempt/success/failure
//! outcomes.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::Claims,
	config::GatewayConfig,
	context::CallContext,
	error::ValidationError,
	limiter::{AdmissionLimiter, AdmissionRequest},
	obs::{self, OperationKind, OperationSpan},
	signature::{MessageSignature, SignRequest, VerifyRequest},
	token::{IssueRequest, IssuedToken, ValidateRequest},
};

/// Generic request record, tagged by the `operation` field.
#[derive(Clone, Debug)]
pub enum Request {
	/// Sign a payload.
	SignMessage(SignRequest),
	/// Verify a signed payload.
	VerifyMessage(VerifyRequest),
	/// Issue a bearer token.
	IssueToken(IssueRequest),
	/// Validate a bearer token.
	ValidateToken(ValidateRequest),
	/// Decide admission for a key.
	Admit(AdmissionRequest),
}
impl Request {
	/// Decodes a generic record whose `operation` field names the request type.
	///
	/// Field failures surface as [`ValidationError::Decode`] naming the offending path.
	pub fn from_value(mut value: Value) -> Result<Self, ValidationError> {
		let operation = match value.as_object_mut().and_then(|record| record.remove("operation")) {
			Some(Value::String(operation)) => operation,
			Some(_) =>
				return Err(ValidationError::Malformed {
					field: "operation",
					reason: "expected a string".into(),
				}),
			None => return Err(ValidationError::Missing { field: "operation" }),
		};

		match operation.as_str() {
			"sign_message" => decode(value).map(Self::SignMessage),
			"verify_message" => decode(value).map(Self::VerifyMessage),
			"issue_token" => decode(value).map(Self::IssueToken),
			"validate_token" => decode(value).map(Self::ValidateToken),
			"admit" => decode(value).map(Self::Admit),
			other => Err(ValidationError::Malformed {
				field: "operation",
				reason: format!("unknown operation `{other}`"),
			}),
		}
	}

	/// Operation label used for spans and metrics.
	pub fn kind(&self) -> OperationKind {
		match self {
			Self::SignMessage(_) => OperationKind::SignMessage,
			Self::VerifyMessage(_) => OperationKind::VerifyMessage,
			Self::IssueToken(_) => OperationKind::IssueToken,
			Self::ValidateToken(_) => OperationKind::ValidateToken,
			Self::Admit(_) => OperationKind::Admission,
		}
	}
}

/// Successful result of a dispatched [`Request`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Response {
	/// Signature plus the bound timestamp.
	Signed(MessageSignature),
	/// Signature matched inside the replay window.
	Verified,
	/// Freshly issued token.
	Issued(IssuedToken),
	/// Claims of a valid token.
	Validated(Claims),
	/// Call admitted.
	Admitted,
}

/// Process-wide gateway service.
#[derive(Debug)]
pub struct Gateway {
	config: GatewayConfig,
	replay_window: Duration,
	limiter: Arc<AdmissionLimiter>,
}
impl Gateway {
	/// Builds a gateway with a fresh admission cache sized from `config`.
	pub fn new(config: GatewayConfig) -> Result<Self> {
		let limiter = Arc::new(AdmissionLimiter::new(config.cache_capacity()?));

		Self::with_limiter(config, limiter)
	}

	/// Builds a gateway that shares an existing limiter.
	pub fn with_limiter(config: GatewayConfig, limiter: Arc<AdmissionLimiter>) -> Result<Self> {
		config.validate()?;

		let replay_window = config.replay_window()?;

		Ok(Self { config, replay_window, limiter })
	}

	/// Active configuration.
	pub fn config(&self) -> &GatewayConfig {
		&self.config
	}

	/// Shared admission limiter.
	pub fn limiter(&self) -> &Arc<AdmissionLimiter> {
		&self.limiter
	}

	/// Signs a payload bound to the current time.
	pub fn sign_message(&self, request: SignRequest) -> Result<MessageSignature> {
		request.sign_at(OffsetDateTime::now_utc())
	}

	/// Verifies a signed payload against the current time.
	pub fn verify_message(&self, request: VerifyRequest) -> Result<()> {
		request.verify_at(self.replay_window, OffsetDateTime::now_utc())
	}

	/// Issues a bearer token valid from now.
	pub fn issue_token(&self, request: IssueRequest) -> Result<IssuedToken> {
		request.issue_at(
			self.config.default_token_algorithm,
			&self.config.default_issuer,
			OffsetDateTime::now_utc(),
		)
	}

	/// Validates a bearer token against the current time.
	pub fn validate_token(&self, request: ValidateRequest) -> Result<Claims> {
		request.validate_at(OffsetDateTime::now_utc())
	}

	/// Decides admission for a key, suspending in waiting mode.
	pub async fn admit(&self, ctx: &CallContext, request: AdmissionRequest) -> Result<()> {
		self.limiter.check(ctx, request).await
	}

	/// Dispatches a typed request.
	pub async fn run(&self, ctx: &CallContext, request: Request) -> Result<Response> {
		let kind = request.kind();
		let span = OperationSpan::new(kind);

		obs::record_operation_attempt(kind);

		let result = span.instrument(self.dispatch(ctx, request)).await;

		obs::record_operation_result(kind, &result);

		#[cfg(feature = "tracing")]
		if let Err(e) = &result {
			tracing::debug!(operation = kind.as_str(), error_kind = %e.kind(), "operation failed");
		}

		result
	}

	/// Decodes a generic record with [`Request::from_value`] and dispatches it.
	pub async fn run_value(&self, ctx: &CallContext, value: Value) -> Result<Response> {
		let request = Request::from_value(value)?;

		self.run(ctx, request).await
	}

	async fn dispatch(&self, ctx: &CallContext, request: Request) -> Result<Response> {
		ctx.ensure_active()?;

		match request {
			Request::SignMessage(request) => self.sign_message(request).map(Response::Signed),
			Request::VerifyMessage(request) =>
				self.verify_message(request).map(|()| Response::Verified),
			Request::IssueToken(request) => self.issue_token(request).map(Response::Issued),
			Request::ValidateToken(request) => self.validate_token(request).map(Response::Validated),
			Request::Admit(request) => self.admit(ctx, request).await.map(|()| Response::Admitted),
		}
	}
}

fn decode<T>(value: Value) -> Result<T, ValidationError>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|e| ValidationError::Decode {
		path: e.path().to_string(),
		reason: e.inner().to_string(),
	})
}
