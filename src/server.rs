use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::emi::{self, EmiDefaults, EmiInputs};
use crate::error::ShowroomError;
use crate::filter::BikeQuery;
use crate::leads::{self, Dealer, LeadKind};
use crate::model::{BikeUpdate, NewBike, NewReview};
use crate::store::CatalogStore;

// Request bodies above 64KB are refused outright.
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Header the auth layer in front of us sets to the signed-in subject.
pub const USER_HEADER: &str = "x-user-id";

pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub dealer: Dealer,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, dealer: Dealer) -> Self {
        Self { store, dealer }
    }
}

#[derive(Serialize, Debug)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

fn reply_json<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn reply_message(message: &str, field: Option<&'static str>, status: StatusCode) -> Response {
    reply_json(&ErrorBody { message, field }, status)
}

/// Maps a store error onto a status; `message` overrides the text for
/// client errors so the API keeps its stable wording.
fn reply_error(err: ShowroomError, message: Option<&str>) -> Response {
    match &err {
        ShowroomError::Validation { .. } | ShowroomError::InvalidLoan(_) => {
            let text = err.to_string();
            reply_message(message.unwrap_or(&text), err.field(), StatusCode::BAD_REQUEST)
        }
        ShowroomError::BikeNotFound(_) => reply_message("Bike not found", None, StatusCode::NOT_FOUND),
        ShowroomError::Unauthorized => reply_message("Unauthorized", None, StatusCode::UNAUTHORIZED),
        ShowroomError::Io(_) | ShowroomError::Encoding(_) | ShowroomError::Poisoned => {
            error!("request failed: {}", err);
            reply_message("Internal server error", None, StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, String> {
    serde_json::from_slice(body).map_err(|e| e.to_string())
}

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}

/// The full API, with rejections turned into JSON errors.
pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // GET /api/bikes?brand=..&minPrice=..&sort=..
    let list = warp::path!("api" / "bikes")
        .and(warp::get())
        .and(warp::query::<BikeQuery>())
        .and(with_state(state.clone()))
        .and_then(list_bikes);

    // GET /api/bikes/:id
    let get = warp::path!("api" / "bikes" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_bike);

    // POST /api/bikes
    let create = warp::path!("api" / "bikes")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_bike);

    // PATCH /api/bikes/:id
    let update = warp::path!("api" / "bikes" / String)
        .and(warp::patch())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update_bike);

    // GET /api/bikes/:id/reviews
    let reviews = warp::path!("api" / "bikes" / String / "reviews")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_reviews);

    // POST /api/bikes/:id/reviews
    let review = warp::path!("api" / "bikes" / String / "reviews")
        .and(warp::post())
        .and(warp::header::optional::<String>(USER_HEADER))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_review);

    // GET /api/bikes/:id/emi?loanAmount=..&rate=..&months=..
    let bike_emi = warp::path!("api" / "bikes" / String / "emi")
        .and(warp::get())
        .and(warp::query::<LoanQuery>())
        .and(with_state(state.clone()))
        .and_then(bike_emi);

    // GET /api/emi?principal=..&rate=..&months=..
    let emi = warp::path!("api" / "emi")
        .and(warp::get())
        .and(warp::query::<LoanQuery>())
        .and_then(calculate_emi);

    // GET /api/bikes/:id/enquiry?kind=card|offer
    let enquiry = warp::path!("api" / "bikes" / String / "enquiry")
        .and(warp::get())
        .and(warp::query::<EnquiryQuery>())
        .and(with_state(state.clone()))
        .and_then(enquiry);

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_state(state))
        .and_then(health);

    list.or(get)
        .or(create)
        .or(update)
        .or(reviews)
        .or(review)
        .or(bike_emi)
        .or(emi)
        .or(enquiry)
        .or(health)
        .recover(handle_rejection)
        .with(warp::log::custom(|req| {
            info!("{} {} {} ({:?})", req.method(), req.path(), req.status().as_u16(), req.elapsed());
        }))
}

/// Binds and serves until `shutdown` resolves.
pub async fn serve<F>(state: Arc<AppState>, addr: SocketAddr, shutdown: F) -> Result<(), ShowroomError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| ShowroomError::Io(std::io::Error::new(std::io::ErrorKind::AddrInUse, e.to_string())))?;
    info!("showroom API listening on http://{}", bound);
    server.await;
    info!("showroom API stopped");
    Ok(())
}

// --- HANDLERS ---

async fn list_bikes(query: BikeQuery, state: Arc<AppState>) -> Result<Response, Rejection> {
    let filter = match query.parse() {
        Ok(filter) => filter,
        Err(e) => return Ok(reply_message("Invalid filter parameters", e.field(), StatusCode::BAD_REQUEST)),
    };
    Ok(match state.store.list_bikes(&filter) {
        Ok(bikes) => reply_json(&bikes, StatusCode::OK),
        Err(e) => reply_error(e, None),
    })
}

async fn get_bike(id: String, state: Arc<AppState>) -> Result<Response, Rejection> {
    let Ok(id) = id.parse::<u64>() else {
        return Ok(reply_message("Bike not found", None, StatusCode::NOT_FOUND));
    };
    Ok(match state.store.get_bike(id) {
        Ok(bike) => reply_json(&bike, StatusCode::OK),
        Err(e) => reply_error(e, None),
    })
}

async fn create_bike(body: Bytes, state: Arc<AppState>) -> Result<Response, Rejection> {
    let payload: NewBike = match parse_body(&body) {
        Ok(p) => p,
        Err(e) => return Ok(reply_message(&e, None, StatusCode::BAD_REQUEST)),
    };
    Ok(match state.store.create_bike(payload) {
        Ok(bike) => reply_json(&bike, StatusCode::CREATED),
        Err(e) => reply_error(e, None),
    })
}

async fn update_bike(id: String, body: Bytes, state: Arc<AppState>) -> Result<Response, Rejection> {
    let Ok(id) = id.parse::<u64>() else {
        return Ok(reply_message("Bike not found", None, StatusCode::NOT_FOUND));
    };
    let update: BikeUpdate = match parse_body(&body) {
        Ok(u) => u,
        Err(e) => return Ok(reply_message(&e, None, StatusCode::BAD_REQUEST)),
    };
    Ok(match state.store.update_bike(id, update) {
        Ok(bike) => reply_json(&bike, StatusCode::OK),
        Err(e) => reply_error(e, None),
    })
}

async fn list_reviews(id: String, state: Arc<AppState>) -> Result<Response, Rejection> {
    let Ok(id) = id.parse::<u64>() else {
        return Ok(reply_message("Invalid bike ID", None, StatusCode::BAD_REQUEST));
    };
    Ok(match state.store.list_reviews(id) {
        Ok(reviews) => reply_json(&reviews, StatusCode::OK),
        Err(e) => reply_error(e, None),
    })
}

async fn create_review(
    id: String,
    user: Option<String>,
    body: Bytes,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let Some(user) = user.filter(|u| !u.trim().is_empty()) else {
        return Ok(reply_message("Unauthorized", None, StatusCode::UNAUTHORIZED));
    };
    let Ok(id) = id.parse::<u64>() else {
        return Ok(reply_message("Invalid bike ID", None, StatusCode::BAD_REQUEST));
    };
    let payload: NewReview = match parse_body(&body) {
        Ok(p) => p,
        Err(_) => return Ok(reply_message("Invalid review data", None, StatusCode::BAD_REQUEST)),
    };
    Ok(match state.store.create_review(id, &user, payload) {
        Ok(review) => reply_json(&review, StatusCode::CREATED),
        Err(e) => reply_error(e, Some("Invalid review data")),
    })
}

/// Loan inputs as they arrive on a query string.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct LoanQuery {
    principal: Option<String>,
    loan_amount: Option<String>,
    rate: Option<String>,
    months: Option<String>,
}

impl LoanQuery {
    fn inputs(self, fallback: Option<EmiInputs>) -> Result<EmiInputs, ShowroomError> {
        let principal = self.principal.or(self.loan_amount);
        Ok(EmiInputs {
            principal: pick("principal", principal, fallback.map(|f| f.principal))?,
            annual_rate: pick("rate", self.rate, fallback.map(|f| f.annual_rate))?,
            months: pick("months", self.months, fallback.map(|f| f.months))?,
        })
    }
}

fn pick<T: std::str::FromStr>(field: &'static str, raw: Option<String>, fallback: Option<T>) -> Result<T, ShowroomError> {
    match raw.filter(|r| !r.is_empty()) {
        Some(text) => text
            .trim()
            .parse()
            .map_err(|_| ShowroomError::validation(field, format!("'{}' is not a number", text))),
        None => fallback.ok_or_else(|| ShowroomError::validation(field, "is required")),
    }
}

async fn calculate_emi(query: LoanQuery) -> Result<Response, Rejection> {
    let quote = query.inputs(None).and_then(|inputs| emi::quote(&inputs).map(|q| (inputs, q)));
    Ok(match quote {
        Ok((inputs, quote)) => reply_json(&json!({ "inputs": inputs, "quote": quote }), StatusCode::OK),
        Err(e) => reply_error(e, None),
    })
}

async fn bike_emi(id: String, query: LoanQuery, state: Arc<AppState>) -> Result<Response, Rejection> {
    let Ok(id) = id.parse::<u64>() else {
        return Ok(reply_message("Bike not found", None, StatusCode::NOT_FOUND));
    };
    let bike = match state.store.get_bike(id) {
        Ok(bike) => bike,
        Err(e) => return Ok(reply_error(e, None)),
    };
    let defaults = EmiDefaults::for_price(bike.price);
    let quote = query
        .inputs(Some(defaults.inputs))
        .and_then(|inputs| emi::quote(&inputs).map(|q| (inputs, q)));
    Ok(match quote {
        Ok((inputs, quote)) => reply_json(
            &json!({ "bikeId": bike.id, "defaults": defaults, "inputs": inputs, "quote": quote }),
            StatusCode::OK,
        ),
        Err(e) => reply_error(e, None),
    })
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct EnquiryQuery {
    kind: Option<String>,
}

async fn enquiry(id: String, query: EnquiryQuery, state: Arc<AppState>) -> Result<Response, Rejection> {
    let kind = match query.kind.as_deref() {
        None | Some("") | Some("card") => LeadKind::Card,
        Some("offer") => LeadKind::Offer,
        Some(_) => return Ok(reply_message("Unknown enquiry kind", Some("kind"), StatusCode::BAD_REQUEST)),
    };
    let Ok(id) = id.parse::<u64>() else {
        return Ok(reply_message("Bike not found", None, StatusCode::NOT_FOUND));
    };
    let lead = state
        .store
        .get_bike(id)
        .and_then(|bike| leads::whatsapp_link(&bike, kind, &state.dealer));
    Ok(match lead {
        Ok(lead) => reply_json(&lead, StatusCode::OK),
        Err(e) => reply_error(e, None),
    })
}

async fn health(state: Arc<AppState>) -> Result<Response, Rejection> {
    Ok(match state.store.bike_count() {
        Ok(bikes) => reply_json(&json!({ "status": "ok", "bikes": bikes }), StatusCode::OK),
        Err(e) => reply_error(e, None),
    })
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let reply = if err.is_not_found() {
        reply_message("Not found", None, StatusCode::NOT_FOUND)
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        reply_message("Invalid filter parameters", None, StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        reply_message("Payload too large", None, StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        reply_message("Content-Length required", None, StatusCode::LENGTH_REQUIRED)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        reply_message("Method not allowed", None, StatusCode::METHOD_NOT_ALLOWED)
    } else {
        error!("unhandled rejection: {:?}", err);
        reply_message("Internal server error", None, StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(reply)
}
