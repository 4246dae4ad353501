//! JSON-over-HTTP surface for the workbench.
//!
//! Routing is a pure function of [`ApiRequest`] to [`ApiResponse`], so every
//! endpoint can be exercised without opening a socket. [`serve`] only adapts
//! tiny_http requests to that shape.
//!
//! ## Endpoints
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST | `/datasets?filename=..` or `?url=..&content_type=..` | ingest CSV body |
//! | GET | `/datasets` | list cached datasets |
//! | GET | `/datasets/{key}/page?page=N&per_page=M` | one page |
//! | POST | `/datasets/{key}/edit` | `{row, col, value}` |
//! | GET/PUT/DELETE | `/datasets/{key}/edits` | the owner's edit set |
//! | GET | `/datasets/{key}/export?delimiter=;` | merged CSV download |
//! | POST | `/settings/page-size` | `{page_size}` |
//! | GET | `/stats` | timings and counts |
//!
//! Session identity comes from the `X-Owner` header or an `owner` query
//! parameter. Bodies over the upload cap are refused with 413 before they are
//! buffered.

use crate::constants::{OWNER_HEADER, SERVER_POLL_MS};
use crate::data::error::DataError;
use crate::settings::Settings;
use crate::types::{CellCoord, DatasetKey, OwnerId, SourceDescriptor};
use crate::workbench::Workbench;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other,
}

impl From<&tiny_http::Method> for Method {
    fn from(method: &tiny_http::Method) -> Self {
        match method {
            tiny_http::Method::Get => Method::Get,
            tiny_http::Method::Post => Method::Post,
            tiny_http::Method::Put => Method::Put,
            tiny_http::Method::Delete => Method::Delete,
            _ => Method::Other,
        }
    }
}

/// A request reduced to what the router needs
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub owner: Option<String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    /// Build from a method and a raw URL (path plus optional query string)
    pub fn new(method: Method, url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            method,
            path: path.to_string(),
            query: parse_query(query),
            owner: None,
            body: Vec::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json<T: Serialize>(self, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.with_body(body)
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Header wins over the query parameter
    fn owner_id(&self) -> Result<OwnerId, ApiResponse> {
        self.owner
            .as_deref()
            .or_else(|| self.param("owner"))
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(OwnerId::new)
            .ok_or_else(|| ApiResponse::error(400, format!("Missing {OWNER_HEADER} header")))
    }

    fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, ApiResponse> {
        serde_json::from_slice(&self.body).map_err(|e| ApiResponse::from(DataError::Json(e)))
    }
}

/// Status, content type, extra headers and body of a reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                headers: Vec::new(),
                body,
            },
            Err(e) => Self::error(500, e.to_string()),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        let body = json!({ "error": message.into() }).to_string().into_bytes();
        Self {
            status,
            content_type: "application/json",
            headers: Vec::new(),
            body,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Header value by case-insensitive name, including the content type
    pub fn header(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("content-type") {
            return Some(self.content_type);
        }
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl From<DataError> for ApiResponse {
    fn from(err: DataError) -> Self {
        let status = match &err {
            DataError::NotFound(_) => 404,
            DataError::TooLarge { .. } => 413,
            e if e.is_bad_input() => 400,
            _ => 500,
        };
        ApiResponse::error(status, err.to_string())
    }
}

type ApiResult = Result<ApiResponse, ApiResponse>;

#[derive(Deserialize)]
struct EditBody {
    row: usize,
    col: usize,
    value: String,
}

#[derive(Deserialize)]
struct PageSizeBody {
    page_size: usize,
}

/// Maps requests onto workbench operations
#[derive(Clone)]
pub struct Router {
    workbench: Arc<Workbench>,
}

impl Router {
    pub fn new(workbench: Arc<Workbench>) -> Self {
        Self { workbench }
    }

    pub fn workbench(&self) -> &Arc<Workbench> {
        &self.workbench
    }

    pub fn handle(&self, req: &ApiRequest) -> ApiResponse {
        let segments: Vec<String> = req
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_component)
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let result = match (req.method, segments.as_slice()) {
            (Method::Post, ["datasets"]) => self.ingest(req),
            (Method::Get, ["datasets"]) => Ok(ApiResponse::json(200, &self.workbench.datasets())),
            (Method::Get, ["datasets", key, "page"]) => self.page(req, key),
            (Method::Post, ["datasets", key, "edit"]) => self.edit(req, key),
            (Method::Get, ["datasets", key, "edits"]) => self.list_edits(req, key),
            (Method::Put, ["datasets", key, "edits"]) => self.replace_edits(req, key),
            (Method::Delete, ["datasets", key, "edits"]) => self.clear_edits(req, key),
            (Method::Get, ["datasets", key, "export"]) => self.export(req, key),
            (Method::Post, ["settings", "page-size"]) => self.set_page_size(req),
            (Method::Get, ["stats"]) => Ok(ApiResponse::json(200, &self.workbench.stats())),
            _ => Err(ApiResponse::error(
                404,
                format!("No route for {:?} {}", req.method, req.path),
            )),
        };

        let response = result.unwrap_or_else(|e| e);
        debug!(method = ?req.method, path = %req.path, status = response.status, "Handled request");
        response
    }

    fn ingest(&self, req: &ApiRequest) -> ApiResult {
        let source = match (req.param("url"), req.param("filename")) {
            (Some(url), _) => SourceDescriptor::for_url(url, req.param("content_type")),
            (None, Some(filename)) => SourceDescriptor::for_upload(filename),
            (None, None) => return Err(ApiResponse::error(400, "Missing filename or url")),
        };

        let content = std::str::from_utf8(&req.body)
            .map_err(|_| ApiResponse::from(DataError::InvalidData("Body is not UTF-8".into())))?;
        let summary = self.workbench.ingest_text(content, source)?;
        Ok(ApiResponse::json(201, &summary))
    }

    fn page(&self, req: &ApiRequest, key: &str) -> ApiResult {
        let owner = req.owner_id()?;
        let page = parse_param::<i64>(req, "page")?.unwrap_or(1);
        let per_page = parse_param::<usize>(req, "per_page")?;

        let view = self
            .workbench
            .get_page(&DatasetKey::new(key), &owner, page, per_page)?;
        Ok(ApiResponse::json(200, &view))
    }

    fn edit(&self, req: &ApiRequest, key: &str) -> ApiResult {
        let owner = req.owner_id()?;
        let body: EditBody = req.json_body()?;

        let outcome = self.workbench.apply_edit(
            &DatasetKey::new(key),
            &owner,
            CellCoord::new(body.row, body.col),
            body.value,
        )?;
        Ok(ApiResponse::json(200, &json!({ "outcome": outcome })))
    }

    fn list_edits(&self, req: &ApiRequest, key: &str) -> ApiResult {
        let owner = req.owner_id()?;
        let edits = self.workbench.edits(&DatasetKey::new(key), &owner)?;
        Ok(ApiResponse::json(200, &edits))
    }

    fn replace_edits(&self, req: &ApiRequest, key: &str) -> ApiResult {
        let owner = req.owner_id()?;
        let edits: BTreeMap<CellCoord, String> = req.json_body()?;
        let summary = self
            .workbench
            .replace_edits(&DatasetKey::new(key), &owner, edits)?;
        Ok(ApiResponse::json(200, &summary))
    }

    fn clear_edits(&self, req: &ApiRequest, key: &str) -> ApiResult {
        let owner = req.owner_id()?;
        self.workbench.clear_edits(&DatasetKey::new(key), &owner);
        Ok(ApiResponse::json(200, &json!({ "cleared": true })))
    }

    fn export(&self, req: &ApiRequest, key: &str) -> ApiResult {
        let owner = req.owner_id()?;
        let delimiter = match req.param("delimiter") {
            None => None,
            Some(raw) => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => {
                        return Err(ApiResponse::error(
                            400,
                            format!("Delimiter must be a single character: {raw:?}"),
                        ));
                    }
                }
            }
        };

        let export = self
            .workbench
            .export(&DatasetKey::new(key), &owner, delimiter)?;
        Ok(ApiResponse {
            status: 200,
            content_type: "text/csv",
            headers: vec![(
                "Content-Disposition".to_string(),
                format!("attachment; filename=\"{}\"", export.filename.replace('"', "")),
            )],
            body: export.bytes,
        })
    }

    fn set_page_size(&self, req: &ApiRequest) -> ApiResult {
        let owner = req.owner_id()?;
        let body: PageSizeBody = req.json_body()?;
        let page_size = self.workbench.set_page_size(&owner, body.page_size);
        Ok(ApiResponse::json(200, &json!({ "page_size": page_size })))
    }
}

fn parse_param<T: std::str::FromStr>(req: &ApiRequest, name: &str) -> Result<Option<T>, ApiResponse> {
    match req.param(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ApiResponse::error(400, format!("Invalid {name}: {raw:?}"))),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

// ============================================================================
// tiny_http adapter
// ============================================================================

/// Helper to create HTTP headers, returning None if the bytes are invalid
fn create_header(name: &[u8], value: &[u8]) -> Option<Header> {
    Header::from_bytes(name, value).ok()
}

/// Read at most `limit` bytes of body.
///
/// A declared length over the limit is refused without reading; otherwise one
/// byte past the limit is enough to tell the body is too large.
fn read_body(reader: impl Read, declared: Option<usize>, limit: u64) -> Result<Vec<u8>, ApiResponse> {
    let too_large = || ApiResponse::error(413, format!("Request body exceeds {limit} bytes"));

    if declared.is_some_and(|len| len as u64 > limit) {
        return Err(too_large());
    }

    let mut body = Vec::with_capacity(declared.unwrap_or(0));
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|e| {
            warn!(error = %e, "Failed to read request body");
            ApiResponse::error(400, format!("Failed to read request body: {e}"))
        })?;

    if body.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(body)
}

fn to_api_request(request: &mut tiny_http::Request, body_limit: u64) -> Result<ApiRequest, ApiResponse> {
    let owner = request
        .headers()
        .iter()
        .find(|h| h.field.equiv(OWNER_HEADER))
        .map(|h| h.value.as_str().to_string());

    let declared = request.body_length();
    let body = read_body(request.as_reader(), declared, body_limit)?;

    let mut api = ApiRequest::new(Method::from(request.method()), request.url()).with_body(body);
    api.owner = owner;
    Ok(api)
}

fn respond(request: tiny_http::Request, api: ApiResponse) {
    let mut response = Response::from_data(api.body).with_status_code(StatusCode(api.status));
    if let Some(h) = create_header(&b"Content-Type"[..], api.content_type.as_bytes()) {
        response = response.with_header(h);
    }
    for (name, value) in &api.headers {
        if let Some(h) = create_header(name.as_bytes(), value.as_bytes()) {
            response = response.with_header(h);
        }
    }
    if let Err(e) = request.respond(response) {
        debug!(error = %e, "Client went away before the response was sent");
    }
}

/// Serve the workbench until `shutdown` is raised.
///
/// Binds `settings.server.addr` and runs `settings.server.workers` threads (at
/// least one) that share the listener. Request bodies are capped at the upload
/// limit. Returns once every worker has stopped.
pub fn serve(settings: &Settings, workbench: Arc<Workbench>, shutdown: Arc<AtomicBool>) -> Result<(), DataError> {
    let addr = &settings.server.addr;
    let server = Server::http(addr).map_err(|e| {
        error!("Failed to start server on {}: {}", addr, e);
        DataError::Io(std::io::Error::other(e))
    })?;
    let server = Arc::new(server);
    let router = Router::new(workbench);
    let workers = settings.server.workers.max(1);
    let body_limit = settings.max_upload_bytes();

    info!(addr = %addr, workers, body_limit, "Serving workbench");

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let server = Arc::clone(&server);
            let router = router.clone();
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }

                    match server.recv_timeout(Duration::from_millis(SERVER_POLL_MS)) {
                        Ok(Some(mut request)) => {
                            let response = match to_api_request(&mut request, body_limit) {
                                Ok(api) => router.handle(&api),
                                Err(rejected) => {
                                    debug!(url = %request.url(), status = rejected.status, "Rejected request body");
                                    rejected
                                }
                            };
                            respond(request, response);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(worker, error = %e, "Server socket failed");
                            break;
                        }
                    }
                }
                debug!(worker, "Worker stopped");
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            error!("Server worker panicked");
        }
    }
    info!("Server stopped");
    Ok(())
}
