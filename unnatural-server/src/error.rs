use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use unnatural_core::CorpusError;

/// Errors returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
	#[error(transparent)]
	Corpus(#[from] CorpusError),

	/// The request carried no usable text.
	#[error("{0}")]
	BadRequest(String),

	/// The blocking worker running a model operation went away.
	#[error("model operation was abandoned")]
	Abandoned,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
	error: &'a str,
	message: String,
}

impl ApiError {
	fn category(&self) -> &'static str {
		match self {
			ApiError::Corpus(e) => e.category(),
			ApiError::BadRequest(_) => "bad_request",
			ApiError::Abandoned => "abandoned",
		}
	}
}

impl ResponseError for ApiError {
	fn status_code(&self) -> StatusCode {
		match self {
			ApiError::Corpus(e) => match e {
				CorpusError::NotFound(_) => StatusCode::NOT_FOUND,
				CorpusError::Tokenization(_) => StatusCode::BAD_REQUEST,
				CorpusError::Scoring(_) => StatusCode::UNPROCESSABLE_ENTITY,
				CorpusError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
				CorpusError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
				CorpusError::Training(_) | CorpusError::Prediction(_) | CorpusError::InvalidOrder => {
					StatusCode::INTERNAL_SERVER_ERROR
				}
			},
			ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ApiError::Abandoned => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn error_response(&self) -> HttpResponse {
		HttpResponse::build(self.status_code()).json(ErrorBody { error: self.category(), message: self.to_string() })
	}
}

impl From<actix_web::error::BlockingError> for ApiError {
	fn from(_: actix_web::error::BlockingError) -> Self {
		ApiError::Abandoned
	}
}
