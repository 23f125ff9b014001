use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use serde::Deserialize;

use rs_synth_core::{GenerationInput, SynthesisError, Synthesizer};

/// Command line configuration of the server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	/// Address to bind
	#[arg(long, default_value = "127.0.0.1")]
	host: String,

	/// Port to bind
	#[arg(long, default_value_t = 5000)]
	port: u16,

	/// Root directory holding the training corpora
	#[arg(long, default_value = "./data")]
	data: PathBuf,

	/// Quantization grid step used at startup
	#[arg(long, default_value_t = 0.001)]
	step: f64,

	/// Tree bucket width used at startup
	#[arg(long, default_value_t = 0.1)]
	train_step: f64,
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	max_length: Option<usize>,
	max_sub_run: Option<usize>,
	max_restarts: Option<usize>,
	settle_on_leaves: Option<bool>,
	count: Option<usize>,
	seed: Option<u64>,
}

/// Struct representing query parameters for the `/v1/train` endpoint
#[derive(Deserialize)]
struct TrainParams {
	dir: Option<String>,
	step: Option<f64>,
	train_step: Option<f64>,
	allow_repeats: Option<bool>,
}

struct SharedData {
	model: RwLock<Synthesizer>,
	data_root: PathBuf,
}

impl GenerateParams {
	/// Builds the generation input, falling back to defaults for missing values.
	fn generation_input(&self) -> Result<GenerationInput, SynthesisError> {
		let mut input = GenerationInput::new(self.max_length.unwrap_or(30))?;
		if let Some(max_sub_run) = self.max_sub_run {
			input.set_max_sub_run(max_sub_run)?;
		}
		if let Some(max_restarts) = self.max_restarts {
			input.max_restarts = max_restarts;
		}
		if let Some(settle) = self.settle_on_leaves {
			input.settle_on_leaves = settle;
		}
		Ok(input)
	}
}

impl TrainParams {
	/// Resolves the corpus directory below `root`.
	///
	/// Only relative paths without `..` are accepted.
	fn corpus_dir(&self, root: &Path) -> Result<PathBuf, String> {
		match &self.dir {
			None => Ok(root.to_path_buf()),
			Some(s) if s.trim().is_empty() => Ok(root.to_path_buf()),
			Some(s) => {
				let relative = Path::new(s.trim());
				if relative.components().all(|c| matches!(c, Component::Normal(_))) {
					Ok(root.join(relative))
				} else {
					Err("dir must be a relative path inside the data directory".into())
				}
			}
		}
	}
}

fn error_response(e: SynthesisError) -> HttpResponse {
	match e {
		SynthesisError::InvalidStep(_)
		| SynthesisError::InvalidLength
		| SynthesisError::InvalidParameter(_) => HttpResponse::BadRequest().body(e.to_string()),
		SynthesisError::EmptyModel => HttpResponse::ServiceUnavailable().body(e.to_string()),
		SynthesisError::UnreachableLength { .. } => HttpResponse::UnprocessableEntity().body(e.to_string()),
		SynthesisError::EmptySequence | SynthesisError::Io(_) => {
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `count` sequences (default 1) from the trained tree.
/// Values are newline separated; sequences are separated by a blank line.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let input = match query.generation_input() {
		Ok(input) => input,
		Err(e) => return error_response(e),
	};
	let count = query.count.unwrap_or(1);

	let model = match data.model.read() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	match model.generate_batch(&input, count, query.seed) {
		Ok(batch) => {
			let body = batch
				.iter()
				.map(|seq| seq.iter().map(f64::to_string).collect::<Vec<_>>().join("\n"))
				.collect::<Vec<_>>()
				.join("\n\n");
			HttpResponse::Ok().body(body)
		}
		Err(e) => error_response(e),
	}
}

/// HTTP GET endpoint `/v1/stats`: training counters of the current tree.
#[get("/v1/stats")]
async fn get_stats(data: web::Data<SharedData>) -> impl Responder {
	match data.model.read() {
		Ok(m) => HttpResponse::Ok().json(m.stats()),
		Err(_) => HttpResponse::InternalServerError().body("Model lock failed"),
	}
}

/// HTTP PUT endpoint `/v1/train`
///
/// Rebuilds the tree from a corpus directory. The new model is trained
/// before the lock is taken, so generation keeps serving the old one
/// meanwhile.
#[put("/v1/train")]
async fn put_train(data: web::Data<SharedData>, query: web::Query<TrainParams>) -> impl Responder {
	let dir = match query.corpus_dir(&data.data_root) {
		Ok(dir) => dir,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let synth = match Synthesizer::from_directory(
		&dir,
		query.step.unwrap_or(0.001),
		query.train_step.unwrap_or(0.1),
		query.allow_repeats.unwrap_or(false),
	) {
		Ok(s) => s,
		Err(e) => return error_response(e),
	};
	let stats = synth.stats();

	let mut model = match data.model.write() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	*model = synth;

	log::info!("model retrained from {}", dir.display());
	HttpResponse::Ok().json(stats)
}

/// Main entry point for the server.
///
/// Trains a model from the data directory (an empty model when it cannot
/// be read), shares it behind a `RwLock` and starts the HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let model = match Synthesizer::from_directory(&args.data, args.step, args.train_step, false) {
		Ok(m) => m,
		Err(SynthesisError::Io(e)) => {
			log::warn!("starting without data, {} unreadable: {}", args.data.display(), e);
			Synthesizer::from_sequences(&[], args.step, args.train_step, false).map_err(std::io::Error::other)?
		}
		Err(e) => return Err(std::io::Error::other(e)),
	};

	let shared_data = web::Data::new(SharedData {
		model: RwLock::new(model),
		data_root: args.data.clone(),
	});

	log::info!("listening on {}:{}", args.host, args.port);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(get_stats)
			.service(put_train)
	})
		.bind((args.host.as_str(), args.port))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::{test, App};

	fn shared(sequences: &[Vec<f64>]) -> web::Data<SharedData> {
		web::Data::new(SharedData {
			model: RwLock::new(Synthesizer::from_sequences(sequences, 1.0, 1.0, false).unwrap()),
			data_root: PathBuf::from("./data"),
		})
	}

	#[actix_web::test]
	async fn generates_requested_length() {
		let data = shared(&[vec![1.0, 1.0, 1.0, 2.0, 2.0, 3.0], vec![1.0, 1.0, 2.0, 2.0, 2.0, 3.0]]);
		let app = test::init_service(App::new().app_data(data).service(get_generated)).await;

		let req = test::TestRequest::get().uri("/v1/generate?max_length=6&count=2&seed=3").to_request();
		let body = test::call_and_read_body(&app, req).await;
		let text = String::from_utf8(body.to_vec()).unwrap();

		let sequences: Vec<&str> = text.split("\n\n").collect();
		assert_eq!(sequences.len(), 2);
		assert!(sequences.iter().all(|s| s.lines().count() == 6));
	}

	#[actix_web::test]
	async fn rejects_zero_length() {
		let data = shared(&[vec![1.0, 2.0]]);
		let app = test::init_service(App::new().app_data(data).service(get_generated)).await;
		let req = test::TestRequest::get().uri("/v1/generate?max_length=0").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn rejects_oversized_requests() {
		let data = shared(&[vec![1.0, 1.0, 1.0]]);
		let app = test::init_service(App::new().app_data(data).service(get_generated)).await;

		let uri = format!("/v1/generate?max_length={}", usize::MAX);
		let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
		assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

		let uri = format!("/v1/generate?max_length=3&count={}", usize::MAX);
		let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
		assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn empty_model_is_unavailable() {
		let data = shared(&[]);
		let app = test::init_service(App::new().app_data(data).service(get_generated)).await;
		let req = test::TestRequest::get().uri("/v1/generate").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), actix_web::http::StatusCode::SERVICE_UNAVAILABLE);
	}

	#[::core::prelude::v1::test]
	fn train_query_reads_dir() {
		let query = web::Query::<TrainParams>::from_query("dir=rama_1&allow_repeats=true").unwrap();
		assert_eq!(query.dir.as_deref(), Some("rama_1"));
		assert_eq!(query.corpus_dir(Path::new("/srv/data")).unwrap(), Path::new("/srv/data/rama_1"));
	}

	#[::core::prelude::v1::test]
	fn corpus_must_stay_inside_root() {
		let root = Path::new("/srv/data");
		let params = |c: &str| TrainParams { dir: Some(c.to_owned()), step: None, train_step: None, allow_repeats: None };
		assert_eq!(params("rama_1").corpus_dir(root).unwrap(), root.join("rama_1"));
		assert!(params("../etc").corpus_dir(root).is_err());
		assert!(params("/etc").corpus_dir(root).is_err());
	}
}
