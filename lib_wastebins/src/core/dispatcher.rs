//! # Request Dispatcher
//!
//! Maps a decoded `(method, path, body)` request onto one registry operation
//! and turns the outcome into a `Response`.
//!
//! | Method | Path              | Operation                         |
//! |--------|-------------------|-----------------------------------|
//! | GET    | `/bins`           | list every bin                    |
//! | POST   | `/bins`           | create a bin from a form body     |
//! | POST   | `/bins/{id}/fill` | raise the fill level by one step  |
//! | POST   | `/bins/{id}/sort` | classify the bin's current waste  |
//! | GET    | `/route`          | ids of bins needing collection    |
//!
//! Route handlers return a tagged result (`Ok(body)` or a [`DispatchError`])
//! that is converted to a response in a single place. Anything that does not
//! match the table is answered with 404.
//!
//! The dispatcher itself holds no state besides the shared registry handle.
//! Each request locks the registry once for its whole operation, which keeps
//! concurrent connections from interleaving registry access.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::bin::{BinId, WasteType};
use crate::core::registry::{Registry, RegistryError, SharedRegistry};
use crate::protocol::{Request, Response, StatusCode};

/// Fill increment applied by `POST /bins/{id}/fill`.
pub const DEFAULT_FILL_INCREMENT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("bin {0} does not exist")]
    NotFound(BinId),

    #[error("{0}")]
    BadRequest(String),

    #[error("no route for {method} {path}")]
    Unroutable { method: String, path: String },
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => DispatchError::NotFound(id),
        }
    }
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound(_) | DispatchError::Unroutable { .. } => StatusCode::NOT_FOUND,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            DispatchError::NotFound(_) | DispatchError::Unroutable { .. } => Response::not_found(),
            DispatchError::BadRequest(_) => Response::error(self.status(), self),
        }
    }
}

/// # Route
///
/// A recognized request, with its path parameter already parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ListBins,
    CreateBin,
    FillBin(BinId),
    SortBin(BinId),
    CollectionRoute,
}

impl Route {
    /// Matches a method and path against the routing table. Path segments
    /// must match exactly, so `/bins/` or `/bins/3/fill/now` are unroutable.
    pub fn resolve(method: &str, path: &str) -> Result<Self, DispatchError> {
        let unroutable = || DispatchError::Unroutable {
            method: method.to_string(),
            path: path.to_string(),
        };

        let segments: Vec<&str> = path.strip_prefix('/').ok_or_else(unroutable)?.split('/').collect();

        match (method, segments.as_slice()) {
            ("GET", ["bins"]) => Ok(Route::ListBins),
            ("POST", ["bins"]) => Ok(Route::CreateBin),
            ("POST", ["bins", id, "fill"]) => Ok(Route::FillBin(parse_bin_id(id)?)),
            ("POST", ["bins", id, "sort"]) => Ok(Route::SortBin(parse_bin_id(id)?)),
            ("GET", ["route"]) => Ok(Route::CollectionRoute),
            _ => Err(unroutable()),
        }
    }
}

fn parse_bin_id(raw: &str) -> Result<BinId, DispatchError> {
    raw.parse::<BinId>()
        .map_err(|_| DispatchError::BadRequest(format!("invalid bin id {:?}", raw)))
}

/// # New Bin Form
///
/// Fields of a `POST /bins` body. The body is a flat `key=value` list joined
/// by `&`; values are taken verbatim (no percent-decoding). Pairs without `=`
/// and unknown keys are skipped; a repeated key keeps its last value.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBin {
    pub location: String,
    pub waste_type: WasteType,
    pub fill_level: f64,
}

impl Default for NewBin {
    fn default() -> Self {
        Self {
            location: String::new(),
            waste_type: WasteType::Mixed,
            fill_level: 0.0,
        }
    }
}

impl NewBin {
    pub fn from_form(body: &str) -> Result<Self, DispatchError> {
        let mut new_bin = Self::default();
        for pair in body.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "location" => new_bin.location = value.to_string(),
                "type" => new_bin.waste_type = WasteType::from(value),
                "fill" => {
                    new_bin.fill_level = value.trim().parse::<f64>().map_err(|_| {
                        DispatchError::BadRequest(format!("fill value {:?} is not a number", value))
                    })?
                }
                _ => debug!("ignoring form key {:?}", key),
            }
        }
        Ok(new_bin)
    }
}

/// # Execute
///
/// Runs one route against the registry and builds the JSON body of a
/// successful reply.
pub fn execute(
    registry: &mut Registry,
    route: Route,
    body: &str,
    fill_increment: f64,
) -> Result<Value, DispatchError> {
    match route {
        Route::ListBins => Ok(json!(registry.list_all())),
        Route::CreateBin => {
            let new_bin = NewBin::from_form(body)?;
            let bin = registry.create(new_bin.location, new_bin.waste_type, new_bin.fill_level);
            Ok(json!(bin))
        }
        Route::FillBin(id) => {
            let bin = registry.increase_fill(id, fill_increment)?;
            Ok(json!(bin))
        }
        Route::SortBin(id) => {
            let bin = registry.classify(id)?;
            Ok(json!(bin))
        }
        Route::CollectionRoute => Ok(json!({ "route": registry.generate_route() })),
    }
}

/// # Dispatcher
///
/// Shared by every connection task. Cloning is cheap: clones point at the
/// same registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
    fill_increment: f64,
}

impl Dispatcher {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            fill_increment: DEFAULT_FILL_INCREMENT,
        }
    }

    /// Overrides the step used by the fill route.
    pub fn with_fill_increment(mut self, fill_increment: f64) -> Self {
        self.fill_increment = fill_increment;
        self
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn fill_increment(&self) -> f64 {
        self.fill_increment
    }

    /// Resolves, executes and encodes one request. Never fails: every error
    /// becomes a response with the matching status.
    pub async fn dispatch(&self, request: &Request) -> Response {
        let outcome = match Route::resolve(&request.method, &request.path) {
            Ok(route) => {
                let mut registry = self.registry.lock().await;
                execute(&mut registry, route, &request.body, self.fill_increment)
            }
            Err(err) => Err(err),
        };

        let response = match outcome {
            Ok(body) => Response::ok(body),
            Err(err) => {
                warn!(method = %request.method, path = %request.path, "{}", err);
                err.into_response()
            }
        };

        info!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            "request dispatched"
        );
        response
    }
}
