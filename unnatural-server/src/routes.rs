use actix_web::{HttpResponse, Responder, delete, get, post, route, routes, web};
use serde::Deserialize;
use serde_json::json;
use unnatural_core::{CorpusRegistry, Token};

use crate::error::ApiError;

type Registry = web::Data<CorpusRegistry>;

/// Default cap, in bytes, on request bodies (training uploads included).
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// Query parameters accepted wherever a request carries text.
#[derive(Deserialize)]
struct ContentQuery {
	/// Text to use when the request body is empty.
	s: Option<String>,
}

/// Returns the request text: the body if present, otherwise `?s=`.
fn string_content(query: &ContentQuery, body: &web::Bytes) -> Result<String, ApiError> {
	if !body.is_empty() {
		return String::from_utf8(body.to_vec()).map_err(|_| ApiError::BadRequest("body is not valid UTF-8".to_owned()));
	}
	match &query.s {
		Some(s) => Ok(s.clone()),
		None => Err(ApiError::BadRequest("missing text: send a body or `?s=`".to_owned())),
	}
}

/// Parses tokens given in the URL: lexemes separated by `/` or whitespace.
fn parse_tokens(token_str: &str) -> Vec<Token> {
	token_str
		.split(|c: char| c == '/' || c.is_whitespace())
		.filter(|lexeme| !lexeme.is_empty())
		.map(Token::from_lexeme)
		.collect()
}

/// HTTP GET endpoint `/`
///
/// Lists the registered corpus identifiers.
#[get("/")]
async fn list_corpora(registry: Registry) -> impl Responder {
	HttpResponse::Ok().json(json!({ "corpora": registry.identifiers() }))
}

/// HTTP GET endpoint `/{corpus}/`
///
/// Retrieves a summary of the corpus.
#[get("/{corpus}/")]
async fn corpus_info(registry: Registry, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
	let corpus = registry.lookup(&path)?;
	Ok(HttpResponse::Ok().json(corpus.summary()))
}

/// HTTP POST endpoint `/{corpus}/`
///
/// Trains the corpus on the uploaded text. Answers `202 Accepted` with the
/// number of tokens consumed.
#[post("/{corpus}/")]
async fn train(
	registry: Registry,
	path: web::Path<String>,
	query: web::Query<ContentQuery>,
	body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
	let corpus = registry.lookup(&path)?;
	let text = string_content(&query, &body)?;

	let result = web::block(move || {
		let tokens = corpus.tokenize(&text, true)?;
		corpus.train(&tokens)
	})
	.await??;
	Ok(HttpResponse::Accepted().json(result))
}

/// HTTP DELETE endpoint `/{corpus}/`
///
/// Wipes the corpus statistics. Answers `204 No Content`.
#[delete("/{corpus}/")]
async fn delete_corpus(registry: Registry, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
	let corpus = registry.lookup(&path)?;
	web::block(move || corpus.reset()).await??;
	Ok(HttpResponse::NoContent().finish())
}

/// HTTP GET/POST endpoint `/{corpus}/tokenize`
///
/// Tokenizes the given text for the corpus's language.
#[route("/{corpus}/tokenize", method = "GET", method = "POST")]
async fn tokenize(
	registry: Registry,
	path: web::Path<String>,
	query: web::Query<ContentQuery>,
	body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
	let corpus = registry.lookup(&path)?;
	let text = string_content(&query, &body)?;

	let tokens = web::block(move || corpus.tokenize(&text, false)).await??;
	Ok(HttpResponse::Ok().json(json!({ "tokens": tokens })))
}

/// HTTP POST endpoint `/{corpus}/predict/`
///
/// Tokenizes the uploaded text and suggests the next token.
#[post("/{corpus}/predict/")]
async fn predict_text(
	registry: Registry,
	path: web::Path<String>,
	query: web::Query<ContentQuery>,
	body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
	let corpus = registry.lookup(&path)?;
	let text = string_content(&query, &body)?;

	let prediction = web::block(move || {
		let tokens = corpus.tokenize(&text, true)?;
		corpus.predict(&tokens)
	})
	.await??;
	Ok(HttpResponse::Ok().json(prediction))
}

/// HTTP GET endpoint `/{corpus}/predict/{tokens*}`
///
/// Suggests the next token after the lexemes given in the path.
#[get("/{corpus}/predict/{tokens:.*}")]
async fn predict_tokens(registry: Registry, path: web::Path<(String, String)>) -> Result<HttpResponse, ApiError> {
	let (corpus, token_str) = path.into_inner();
	let corpus = registry.lookup(&corpus)?;
	let tokens = parse_tokens(&token_str);

	let prediction = web::block(move || corpus.predict(&tokens)).await??;
	Ok(HttpResponse::Ok().json(prediction))
}

/// HTTP GET/POST endpoint `/{corpus}/xentropy`
///
/// Cross-entropy of the uploaded text with respect to the corpus.
#[routes]
#[get("/{corpus}/cross-entropy")]
#[get("/{corpus}/xentropy")]
#[post("/{corpus}/xentropy")]
async fn cross_entropy(
	registry: Registry,
	path: web::Path<String>,
	query: web::Query<ContentQuery>,
	body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
	let corpus = registry.lookup(&path)?;
	let text = string_content(&query, &body)?;

	let value = web::block(move || {
		let tokens = corpus.tokenize(&text, true)?;
		corpus.cross_entropy(&tokens)
	})
	.await??;
	Ok(HttpResponse::Ok().json(json!({ "cross_entropy": value })))
}

/// HTTP GET/POST endpoint `/{corpus}/wxentropy`
///
/// Windowed cross-entropy (worst window) of the uploaded text.
#[routes]
#[get("/{corpus}/windowed-cross-entropy")]
#[get("/{corpus}/wxentropy")]
#[post("/{corpus}/wxentropy")]
async fn windowed_cross_entropy(
	registry: Registry,
	path: web::Path<String>,
	query: web::Query<ContentQuery>,
	body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
	let corpus = registry.lookup(&path)?;
	let text = string_content(&query, &body)?;

	let value = web::block(move || {
		let tokens = corpus.tokenize(&text, true)?;
		corpus.windowed_cross_entropy(&tokens)
	})
	.await??;
	Ok(HttpResponse::Ok().json(json!({ "windowed_cross_entropy": value })))
}

/// Registers every corpus endpoint, accepting bodies up to `max_payload` bytes.
pub fn configure(cfg: &mut web::ServiceConfig, max_payload: usize) {
	cfg.app_data(web::PayloadConfig::new(max_payload))
		.service(list_corpora)
		.service(corpus_info)
		.service(train)
		.service(delete_corpus)
		.service(tokenize)
		.service(predict_text)
		.service(predict_tokens)
		.service(cross_entropy)
		.service(windowed_cross_entropy);
}

#[cfg(test)]
mod tests {
	use actix_web::http::StatusCode;
	use actix_web::{App, test};
	use serde_json::Value;
	use unnatural_core::RegistryConfig;

	use super::*;

	fn registry(dir: &tempfile::TempDir) -> Registry {
		web::Data::new(CorpusRegistry::with_defaults(&RegistryConfig::new(dir.path())).unwrap())
	}

	#[actix_web::test]
	async fn test_parse_tokens() {
		let tokens = parse_tokens("for/i in//range");
		let lexemes: Vec<&str> = tokens.iter().map(|token| token.lexeme.as_str()).collect();
		assert_eq!(lexemes, vec!["for", "i", "in", "range"]);
	}

	#[actix_web::test]
	async fn test_summary_and_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(
			App::new().app_data(registry(&dir)).configure(|cfg| configure(cfg, DEFAULT_MAX_PAYLOAD)),
		)
		.await;

		let summary: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/py/").to_request()).await;
		assert_eq!(summary["language"], "Python");
		assert_eq!(summary["order"], 4);
		assert!(summary["last_updated"].is_null());

		let response = test::call_service(&app, test::TestRequest::get().uri("/cobol/").to_request()).await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
		let body: Value = test::read_body_json(response).await;
		assert_eq!(body["error"], "not_found");
	}

	#[actix_web::test]
	async fn test_train_predict_reset() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(
			App::new().app_data(registry(&dir)).configure(|cfg| configure(cfg, DEFAULT_MAX_PAYLOAD)),
		)
		.await;

		let source = "import os\nimport sys\nimport os\n";
		let response = test::call_service(&app, test::TestRequest::post().uri("/py/").set_payload(source).to_request()).await;
		assert_eq!(response.status(), StatusCode::ACCEPTED);
		let body: Value = test::read_body_json(response).await;
		assert!(body["tokens"].as_u64().unwrap() > 0);

		let prediction: Value =
			test::call_and_read_body_json(&app, test::TestRequest::get().uri("/py/predict/import").to_request()).await;
		assert_eq!(prediction["tokens"].as_array().unwrap().len(), 4);
		assert_eq!(prediction["tokens"][0], json!([null, null, null, null, "<unk>"]));
		assert_eq!(prediction["suggestions"][0]["lexeme"], "os");

		let summary: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/py/").to_request()).await;
		assert!(summary["last_updated"].is_string());

		let response = test::call_service(&app, test::TestRequest::delete().uri("/py/").to_request()).await;
		assert_eq!(response.status(), StatusCode::NO_CONTENT);
		let summary: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/py/").to_request()).await;
		assert!(summary["last_updated"].is_null());
	}

	#[actix_web::test]
	async fn test_predict_from_text() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(
			App::new().app_data(registry(&dir)).configure(|cfg| configure(cfg, DEFAULT_MAX_PAYLOAD)),
		)
		.await;

		let response = test::call_service(
			&app,
			test::TestRequest::post().uri("/py/").set_payload("import os\nimport os\n").to_request(),
		)
		.await;
		assert_eq!(response.status(), StatusCode::ACCEPTED);

		// The trailing partial line is tokenized without closing it
		let prediction: Value = test::call_and_read_body_json(
			&app,
			test::TestRequest::post().uri("/py/predict/").set_payload("x = 1\nimport ").to_request(),
		)
		.await;
		let lexemes: Vec<&str> =
			prediction["tokens"].as_array().unwrap().iter().map(|t| t[4].as_str().unwrap()).collect();
		assert_eq!(lexemes, vec!["=", "1", "<NEWLINE>", "import"]);
		assert_eq!(prediction["suggestions"][0]["lexeme"], "os");
	}

	#[actix_web::test]
	async fn test_large_training_upload() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(
			App::new().app_data(registry(&dir)).configure(|cfg| configure(cfg, DEFAULT_MAX_PAYLOAD)),
		)
		.await;

		let source = "import os\n".repeat(30_000);
		assert!(source.len() > 256 * 1024);
		let response = test::call_service(&app, test::TestRequest::post().uri("/py/").set_payload(source).to_request()).await;
		assert_eq!(response.status(), StatusCode::ACCEPTED);
		let body: Value = test::read_body_json(response).await;
		assert_eq!(body["tokens"], 90_000);

		let response = test::call_service(
			&app,
			test::TestRequest::post().uri("/py/").set_payload("import os\n".repeat(8)).to_request(),
		)
		.await;
		assert_eq!(response.status(), StatusCode::ACCEPTED);
	}

	#[actix_web::test]
	async fn test_payload_limit_is_configurable() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(App::new().app_data(registry(&dir)).configure(|cfg| configure(cfg, 16))).await;

		let response = test::call_service(
			&app,
			test::TestRequest::post().uri("/py/").set_payload("import os\n".repeat(8)).to_request(),
		)
		.await;
		assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
	}

	#[actix_web::test]
	async fn test_tokenize_and_entropy() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(
			App::new().app_data(registry(&dir)).configure(|cfg| configure(cfg, DEFAULT_MAX_PAYLOAD)),
		)
		.await;

		let body: Value =
			test::call_and_read_body_json(&app, test::TestRequest::get().uri("/py/tokenize?s=x%20%3D%201").to_request())
				.await;
		let lexemes: Vec<&str> = body["tokens"].as_array().unwrap().iter().map(|t| t[4].as_str().unwrap()).collect();
		assert_eq!(lexemes, vec!["x", "=", "1", "<NEWLINE>", "<ENDMARKER>"]);

		// An untrained corpus gives every lexeme probability one
		let body: Value = test::call_and_read_body_json(
			&app,
			test::TestRequest::post().uri("/py/xentropy").set_payload("x = 1\n").to_request(),
		)
		.await;
		assert_eq!(body["cross_entropy"].as_f64().unwrap(), 0.0);

		let response =
			test::call_service(&app, test::TestRequest::post().uri("/py/?s=import%20os").to_request()).await;
		assert_eq!(response.status(), StatusCode::ACCEPTED);
		let body: Value = test::call_and_read_body_json(
			&app,
			test::TestRequest::post().uri("/py/xentropy").set_payload("x = 1\n").to_request(),
		)
		.await;
		assert!(body["cross_entropy"].as_f64().unwrap() > 0.0);

		let body: Value = test::call_and_read_body_json(
			&app,
			test::TestRequest::get().uri("/generic/windowed-cross-entropy?s=%5B%22a%22%5D").to_request(),
		)
		.await;
		assert!(body["windowed_cross_entropy"].is_number());
	}

	#[actix_web::test]
	async fn test_error_categories() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(
			App::new().app_data(registry(&dir)).configure(|cfg| configure(cfg, DEFAULT_MAX_PAYLOAD)),
		)
		.await;

		let response =
			test::call_service(&app, test::TestRequest::post().uri("/generic/xentropy").set_payload("[]").to_request())
				.await;
		assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
		let body: Value = test::read_body_json(response).await;
		assert_eq!(body["error"], "scoring");

		let response =
			test::call_service(&app, test::TestRequest::post().uri("/generic/tokenize").set_payload("not json").to_request())
				.await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let response = test::call_service(&app, test::TestRequest::post().uri("/py/").to_request()).await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		let body: Value = test::read_body_json(response).await;
		assert_eq!(body["error"], "bad_request");
	}
}
