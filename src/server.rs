/// HTTP API for Ksat prediction.
///
/// Routes:
/// - `GET /` health message
/// - `POST /predict` Ksat for manual fractions or a coordinate
/// - `GET /rainfall?lat=..&lon=..` average annual rainfall
///
/// Routing is a pure function of (method, url, body) so it can be tested
/// without sockets; `serve` only moves bytes between `tiny_http` and `route`.

use std::io::Read;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tiny_http::{Header, Request, Response, Server};

use crate::features::CoordinateInput;
use crate::logging::{self, Component};
use crate::model::KsatError;
use crate::service::{AppContext, ErrorDetail, PredictRequest, RainfallResponse};

pub const HEALTH_MESSAGE: &str = "Soil Model API is running";

/// Request bodies larger than this get a 413 and are never parsed.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON text; empty for preflight responses.
    pub body: String,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self { status, body },
            Err(e) => Self::detail(500, format!("Prediction error: {}", e)),
        }
    }

    fn detail(status: u16, detail: String) -> Self {
        let body = serde_json::to_string(&ErrorDetail { detail })
            .unwrap_or_else(|_| r#"{"detail":"internal error"}"#.to_string());
        Self { status, body }
    }

    /// Maps a pipeline error to 400 or 500.
    fn from_error(err: &KsatError) -> Self {
        if err.is_client_error() {
            Self::detail(400, err.to_string())
        } else {
            Self::detail(500, format!("Prediction error: {}", err))
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
}

pub fn route(ctx: &AppContext, method: &str, url: &str, body: &str) -> ApiResponse {
    let parsed = match reqwest::Url::parse("http://localhost")
        .and_then(|base| base.join(url))
    {
        Ok(parsed) => parsed,
        Err(e) => return ApiResponse::detail(400, format!("Malformed URL: {}", e)),
    };

    match (method, parsed.path()) {
        ("OPTIONS", _) => ApiResponse {
            status: 204,
            body: String::new(),
        },
        ("GET", "/") => ApiResponse::json(200, &HealthResponse { message: HEALTH_MESSAGE }),
        ("POST", "/predict") => handle_predict(ctx, body),
        ("GET", "/rainfall") => handle_rainfall(ctx, &parsed),
        (_, path) => ApiResponse::detail(404, format!("Not Found: {} {}", method, path)),
    }
}

fn handle_predict(ctx: &AppContext, body: &str) -> ApiResponse {
    let request: PredictRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => return ApiResponse::detail(400, format!("Invalid request body: {}", e)),
    };

    match ctx.predict(&request) {
        Ok(response) => ApiResponse::json(200, &response),
        Err(err) => {
            let context = format!("{:.4},{:.4}", request.latitude, request.longitude);
            if err.is_client_error() {
                logging::debug(Component::Api, Some(&context), &format!("Rejected: {}", err));
            } else {
                logging::error(Component::Api, Some(&context), &format!("Prediction failed: {}", err));
            }
            ApiResponse::from_error(&err)
        }
    }
}

fn handle_rainfall(ctx: &AppContext, url: &reqwest::Url) -> ApiResponse {
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    let coord = match (param("lat"), param("lon")) {
        (Some(lat), Some(lon)) => match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => CoordinateInput::new(lat, lon),
            _ => return ApiResponse::detail(400, "lat and lon must be numbers".to_string()),
        },
        _ => {
            return ApiResponse::detail(400, "lat and lon query parameters are required".to_string())
        }
    };

    match ctx.annual_rainfall(&coord) {
        Ok(annual_rainfall) => ApiResponse::json(200, &RainfallResponse { annual_rainfall }),
        Err(err) if err.is_client_error() => ApiResponse::from_error(&err),
        Err(err) => ApiResponse::detail(500, format!("Rainfall lookup failed: {}", err)),
    }
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// Reads at most `MAX_BODY_BYTES`. One byte past the limit is read so an
/// oversized body is detected instead of silently cut short.
pub fn read_body<R: Read + ?Sized>(reader: &mut R) -> Result<String, ApiResponse> {
    let mut bytes = Vec::new();
    reader
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| ApiResponse::detail(400, format!("Unreadable request body: {}", e)))?;

    if bytes.len() as u64 > MAX_BODY_BYTES {
        return Err(ApiResponse::detail(
            413,
            format!("Request body too large (limit {} bytes)", MAX_BODY_BYTES),
        ));
    }

    String::from_utf8(bytes)
        .map_err(|_| ApiResponse::detail(400, "Request body is not valid UTF-8".to_string()))
}

fn handle_request(ctx: &AppContext, mut request: Request) {
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();

    let api_response = match read_body(request.as_reader()) {
        Ok(body) => route(ctx, &method, &url, &body),
        Err(response) => response,
    };

    logging::debug(
        Component::Api,
        Some(&url),
        &format!("{} -> {}", method, api_response.status),
    );

    let mut response = Response::from_string(api_response.body).with_status_code(api_response.status);
    let headers = [
        header("Content-Type", "application/json"),
        header("Access-Control-Allow-Origin", "*"),
        header("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        header("Access-Control-Allow-Headers", "*"),
    ];
    for h in headers.into_iter().flatten() {
        response.add_header(h);
    }

    if let Err(e) = request.respond(response) {
        logging::warn(Component::Api, Some(&url), &format!("Failed to send response: {}", e));
    }
}

/// Binds `bind_addr` and serves requests on `workers` threads until the
/// process exits.
pub fn serve(ctx: Arc<AppContext>, bind_addr: &str, workers: usize) -> Result<(), KsatError> {
    let server = Server::http(bind_addr)
        .map_err(|e| KsatError::Config(format!("cannot bind {}: {}", bind_addr, e)))?;
    let server = Arc::new(server);

    logging::info(
        Component::Api,
        None,
        &format!("Listening on {} with {} workers", bind_addr, workers),
    );

    let handles: Vec<_> = (0..workers.max(1))
        .map(|_| {
            let server = Arc::clone(&server);
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || loop {
                match server.recv() {
                    Ok(request) => handle_request(&ctx, request),
                    Err(e) => {
                        logging::error(Component::Api, None, &format!("Accept failed: {}", e));
                        break;
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            logging::error(Component::Api, None, "Worker thread panicked");
        }
    }

    Ok(())
}
