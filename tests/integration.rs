use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cab_booking::api::rest::router;
use cab_booking::auth::{FixedCodeProvider, IdentityToolkitProvider, PhoneAuthProvider};
use cab_booking::error::AppError;
use cab_booking::fare::{FareService, HttpFareClient};
use cab_booking::geo::{Geocoder, GoogleGeocoder};
use cab_booking::models::location::{Coordinates, GeocodedPlace};
use cab_booking::models::trip::{FareRequest, FareResult};
use cab_booking::persistence::{HostedStore, MemoryStore, RestStore};
use cab_booking::state::{AppState, Services};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

const OTP: &str = "246810";

struct StubFare {
    calls: Mutex<Vec<FareRequest>>,
    reply: Value,
}

#[async_trait]
impl FareService for StubFare {
    async fn calculate(&self, request: &FareRequest) -> Result<FareResult, AppError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(FareResult(self.reply.clone()))
    }
}

struct StubGeocoder;

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn forward(&self, address: &str) -> Result<Option<GeocodedPlace>, AppError> {
        Ok((address == "MG Road").then(|| GeocodedPlace {
            address: "MG Road, Bengaluru".to_string(),
            coords: Coordinates { lat: 12.9756, lng: 77.6066 },
            place_id: Some("mg-road".to_string()),
        }))
    }

    async fn reverse(&self, coords: Coordinates) -> Result<Option<GeocodedPlace>, AppError> {
        Ok((coords.lat > 0.0).then(|| GeocodedPlace {
            address: "Clicked spot".to_string(),
            coords,
            place_id: None,
        }))
    }
}

struct TestApp {
    app: axum::Router,
    store: Arc<MemoryStore>,
    fare: Arc<StubFare>,
}

fn setup_with_fare(reply: Value) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let fare = Arc::new(StubFare {
        calls: Mutex::new(Vec::new()),
        reply,
    });
    let state = AppState::new(
        Services {
            store: store.clone(),
            fare: fare.clone(),
            geocoder: Arc::new(StubGeocoder),
            phone_auth: Arc::new(FixedCodeProvider::new(OTP)),
        },
        "+91",
        64,
    );

    TestApp {
        app: router(Arc::new(state)),
        store,
        fare,
    }
}

fn setup() -> TestApp {
    setup_with_fare(json!({ "distance": 35.4, "fares": { "sedan": 1240, "suv": 1710 } }))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn session_request(method: &str, uri: &str, session: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-session-id", session)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Runs the OTP flow and returns `(token, uid)`.
async fn login(app: &axum::Router, phone: &str) -> (String, String) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/send",
            json!({ "phone": phone, "recaptchaToken": "captcha-ok" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let verification_id = body_json(res).await["verificationId"]
        .as_str()
        .unwrap()
        .to_string();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            json!({ "verificationId": verification_id, "code": OTP }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;

    (
        body["token"].as_str().unwrap().to_string(),
        body["session"]["uid"].as_str().unwrap().to_string(),
    )
}

async fn seed_booked_trips(store: &MemoryStore, uid: &str) {
    store
        .set(
            &format!("customers/{uid}"),
            json!({
                "name": "Kavya", "email": "kavya@example.in", "dob": "1995-05-05",
                "phone": "+919845012345",
                "trips": { "TRP1": true, "TRP2": true }
            }),
        )
        .await
        .unwrap();
    store
        .set(
            "trips/TRP1",
            json!({
                "Id": "TRP1", "status": 102, "source": "Hebbal", "destination": "Airport",
                "pickupDatetime": "2026-11-02T05:30:00Z", "bookedTime": "2026-11-01T10:00:00Z",
                "totalCost": 1240.0, "driver": "D7", "vendor": "V1", "vehicleNumber": "KA03XY9876",
                "tripType": "ONE WAY"
            }),
        )
        .await
        .unwrap();
    store
        .set(
            "trips/TRP2",
            json!({
                "Id": "TRP2", "status": 105, "source": "Whitefield",
                "pickupDatetime": "2026-10-01T09:00:00Z", "bookedTime": "2026-09-30T10:00:00Z",
                "totalCost": 2400.0, "tripType": "HOURLY RENTAL", "hours": 8
            }),
        )
        .await
        .unwrap();
    store
        .set(
            "trips/TRP9",
            json!({
                "Id": "TRP9", "status": 101, "source": "Elsewhere",
                "pickupDatetime": "", "bookedTime": "", "totalCost": 0.0, "tripType": "ONE WAY"
            }),
        )
        .await
        .unwrap();
    store
        .set("drivers/D7", json!({ "name": "Imran", "phone": "+919811122233", "licenseNumber": "KA0320190001111" }))
        .await
        .unwrap();
    store
        .set(
            "vendors/V1/vehicles/KA03XY9876",
            json!({ "number": "KA03XY9876", "model": "Ertiga", "color": "Silver" }),
        )
        .await
        .unwrap();
}

fn plan_body(trip_type: &str) -> Value {
    json!({
        "tripType": trip_type,
        "source": "Hebbal",
        "sourceCoords": { "lat": 13.0358, "lng": 77.597 },
        "destination": "Kempegowda Airport",
        "destinationCoords": { "lat": 13.1986, "lng": 77.7066 },
        "pickupDatetime": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339()
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let t = setup();
    let response = t.app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["signed_in_sessions"], 0);
    assert_eq!(body["browser_sessions"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let t = setup();
    let response = t.app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("active_sessions"));
}

#[tokio::test]
async fn status_lookup_uses_table_and_fallback() {
    let t = setup();

    let res = t.app.clone().oneshot(get_request("/status/105")).await.unwrap();
    let body = body_json(res).await;
    assert_eq!(body["text"], "Completed");
    assert_eq!(body["canLeaveFeedback"], true);
    assert_eq!(body["progress"], 100);

    let res = t.app.oneshot(get_request("/status/999")).await.unwrap();
    let body = body_json(res).await;
    assert_eq!(body["text"], "Unknown (999)");
    assert_eq!(body["progress"], 0);
    assert_eq!(body["canCancel"], false);
}

#[tokio::test]
async fn one_way_plan_stores_trip_and_redirects_once() {
    let t = setup();

    let res = t
        .app
        .clone()
        .oneshot(session_request("POST", "/trips/plan", "tab-1", plan_body("ONE WAY")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["redirect"], "/select-cab");

    {
        let calls = t.fare.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source_coords, Coordinates { lat: 13.0358, lng: 77.597 });
        assert_eq!(calls[0].destination_coords, Some(Coordinates { lat: 13.1986, lng: 77.7066 }));
    }

    let res = t
        .app
        .oneshot(session_request("GET", "/session/trip-data", "tab-1", Value::Null))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let stored = body_json(res).await;
    assert_eq!(stored["tripType"], "ONE WAY");
    assert_eq!(stored["distance"], 35.4);
    assert_eq!(stored["fares"]["sedan"], 1240);
}

#[tokio::test]
async fn fare_error_is_shown_and_nothing_is_stored() {
    let t = setup_with_fare(json!({ "error": "Pickup is outside our service area" }));

    let res = t
        .app
        .clone()
        .oneshot(session_request("POST", "/trips/plan", "tab-1", plan_body("ONE WAY")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(res).await;
    assert_eq!(body["error"], "Pickup is outside our service area");
    assert!(body.get("redirect").is_none());

    let res = t
        .app
        .oneshot(session_request("GET", "/session/trip-data", "tab-1", Value::Null))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_round_trip_is_rejected_before_fare_call() {
    let t = setup();

    let res = t
        .app
        .oneshot(session_request("POST", "/trips/plan", "tab-1", plan_body("ROUND TRIP")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(res).await["error"], "Return time must be after pickup time");
    assert!(t.fare.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn plan_without_session_header_is_400() {
    let t = setup();
    let res = t
        .app
        .oneshot(json_request("POST", "/trips/plan", plan_body("ONE WAY")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fare_proxy_returns_body_unchanged() {
    let t = setup();
    let res = t
        .app
        .oneshot(json_request(
            "POST",
            "/fare",
            json!({
                "sourceCoords": { "lat": 12.9, "lng": 77.6 },
                "destinationCoords": { "lat": 13.1, "lng": 77.7 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({ "distance": 35.4, "fares": { "sedan": 1240, "suv": 1710 } })
    );
}

#[tokio::test]
async fn geocoding_routes() {
    let t = setup();

    let res = t
        .app
        .clone()
        .oneshot(get_request("/geocode/forward?address=MG%20Road"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["placeId"], "mg-road");

    let res = t
        .app
        .clone()
        .oneshot(get_request("/geocode/reverse?lat=-1.0&lng=36.8"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = t
        .app
        .clone()
        .oneshot(get_request("/geocode/reverse?lat=95.0&lng=36.8"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = t
        .app
        .oneshot(get_request("/planner/prefill?source=MG%20Road&des=Unknown%20Place"))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["source"]["address"], "MG Road, Bengaluru");
    assert!(body["destination"].is_null());
}

#[tokio::test]
async fn otp_login_register_and_logout() {
    let t = setup();
    let (token, uid) = login(&t.app, "98450 12345").await;

    let res = t
        .app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/customers",
            &token,
            Some(json!({ "name": "Kavya", "email": "kavya@example.in", "dob": "1995-05-05" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["phone"], "+919845012345");

    let res = t
        .app
        .clone()
        .oneshot(authed_request("PATCH", "/customers/me", &token, Some(json!({ "name": "Kavya S" }))))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let profile = body_json(res).await;
    assert_eq!(profile["name"], "Kavya S");
    assert_eq!(profile["email"], "kavya@example.in");

    let user = t.store.get(&format!("user/{uid}")).await.unwrap().unwrap();
    assert_eq!(user["phone"], "+919845012345");

    let res = t
        .app
        .clone()
        .oneshot(authed_request("GET", "/customers/me/trips", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["error"], "No trips found for this customer");

    let res = t
        .app
        .clone()
        .oneshot(authed_request("POST", "/auth/logout", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = t
        .app
        .oneshot(authed_request("GET", "/auth/session", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_otp_is_unauthorized() {
    let t = setup();
    let res = t
        .app
        .clone()
        .oneshot(json_request("POST", "/auth/otp/send", json!({ "phone": "9845012345" })))
        .await
        .unwrap();
    let verification_id = body_json(res).await["verificationId"].as_str().unwrap().to_string();

    let res = t
        .app
        .oneshot(json_request(
            "POST",
            "/auth/otp/verify",
            json!({ "verificationId": verification_id, "code": "000000" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await["error"], "Invalid OTP");
}

#[tokio::test]
async fn trip_history_and_detail() {
    let t = setup();
    let (token, uid) = login(&t.app, "9845012345").await;
    seed_booked_trips(&t.store, &uid).await;

    let res = t
        .app
        .clone()
        .oneshot(authed_request("GET", "/customers/me/trips", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let trips = body_json(res).await;
    let list = trips.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["Id"], "TRP1");
    assert_eq!(list[0]["statusDisplay"]["text"], "Driver Assigned");

    let res = t
        .app
        .clone()
        .oneshot(authed_request("GET", "/trips/TRP1", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let detail = body_json(res).await;
    assert_eq!(detail["driver"]["name"], "Imran");
    assert_eq!(detail["vehicle"]["model"], "Ertiga");

    let res = t
        .app
        .oneshot(authed_request("GET", "/trips/TRP9", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cancel_only_when_permitted() {
    let t = setup();
    let (token, uid) = login(&t.app, "9845012345").await;
    seed_booked_trips(&t.store, &uid).await;

    let res = t
        .app
        .clone()
        .oneshot(authed_request("POST", "/trips/TRP1/cancel", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["code"], 201);
    assert_eq!(t.store.get("trips/TRP1/status").await.unwrap(), Some(json!(201)));

    let res = t
        .app
        .clone()
        .oneshot(authed_request("POST", "/trips/TRP1/cancel", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = t
        .app
        .oneshot(authed_request("POST", "/trips/TRP2/cancel", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn feedback_only_after_completion() {
    let t = setup();
    let (token, uid) = login(&t.app, "9845012345").await;
    seed_booked_trips(&t.store, &uid).await;

    let res = t
        .app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/trips/TRP1/feedback",
            &token,
            Some(json!({ "rating": 4, "comment": "early" })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = t
        .app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/trips/TRP2/feedback",
            &token,
            Some(json!({ "rating": 9 })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = t
        .app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/trips/TRP2/feedback",
            &token,
            Some(json!({ "rating": 5, "comment": " Smooth ride " })),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let stored = t
        .store
        .get(&format!("feedbacks/trips/TRP2/{uid}"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["rating"], 5);
    assert_eq!(stored["comment"], "Smooth ride");

    let res = t
        .app
        .clone()
        .oneshot(authed_request("GET", "/trips/TRP2/feedback", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["rating"], 5);

    let res = t
        .app
        .oneshot(authed_request("GET", "/trips/TRP1/feedback", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authorization_letter_needs_driver_and_vehicle() {
    let t = setup();
    let (token, uid) = login(&t.app, "9845012345").await;
    seed_booked_trips(&t.store, &uid).await;

    let res = t
        .app
        .clone()
        .oneshot(authed_request("GET", "/trips/TRP1/authorization", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let letter = body_string(res).await;
    assert!(letter.contains("VEHICLE AUTHORIZATION LETTER"));
    assert!(letter.contains("Imran"));
    assert!(letter.contains("KA03XY9876"));

    let res = t
        .app
        .oneshot(authed_request("GET", "/trips/TRP2/authorization", &token, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn customer_routes_require_login() {
    let t = setup();
    let res = t.app.oneshot(get_request("/customers/me")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

async fn spawn_stub(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn http_fare_client_posts_coordinates() {
    use axum::routing::post;
    use axum::Json;

    let stub = axum::Router::new().route(
        "/calculateFare",
        post(|Json(body): Json<Value>| async move {
            Json(json!({ "echo": body, "distance": 12.0 }))
        }),
    );
    let base = spawn_stub(stub).await;

    let client = HttpFareClient::new(format!("{base}/calculateFare"), Duration::from_secs(5)).unwrap();
    let result = client
        .calculate(&FareRequest {
            source_coords: Coordinates { lat: 12.9, lng: 77.6 },
            destination_coords: Some(Coordinates { lat: 13.0, lng: 77.7 }),
        })
        .await
        .unwrap();

    assert_eq!(result.0["distance"], 12.0);
    assert_eq!(result.0["echo"]["sourceCoords"]["lat"], 12.9);
    assert_eq!(result.0["echo"]["destinationCoords"]["lng"], 77.7);
}

#[tokio::test]
async fn http_fare_client_passes_error_bodies_through() {
    use axum::routing::post;
    use axum::Json;

    let stub = axum::Router::new().route(
        "/calculateFare",
        post(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid coordinates" }))) }),
    );
    let base = spawn_stub(stub).await;

    let client = HttpFareClient::new(format!("{base}/calculateFare"), Duration::from_secs(5)).unwrap();
    let result = client
        .calculate(&FareRequest {
            source_coords: Coordinates { lat: 0.0, lng: 0.0 },
            destination_coords: None,
        })
        .await
        .unwrap();

    assert_eq!(result.error_message().as_deref(), Some("Invalid coordinates"));
}

#[tokio::test]
async fn google_geocoder_parses_results() {
    use axum::extract::Query;
    use axum::routing::get;
    use axum::Json;
    use std::collections::HashMap;

    let stub = axum::Router::new().route(
        "/geocode/json",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            if params.get("key").map(String::as_str) != Some("test-key") {
                return Json(json!({ "status": "REQUEST_DENIED", "error_message": "bad key" }));
            }
            if params.get("address").map(String::as_str) == Some("Cubbon Park") {
                return Json(json!({
                    "status": "OK",
                    "results": [{
                        "formatted_address": "Cubbon Park, Bengaluru",
                        "geometry": { "location": { "lat": 12.9763, "lng": 77.5929 } },
                        "place_id": "cubbon"
                    }]
                }));
            }
            Json(json!({ "status": "ZERO_RESULTS", "results": [] }))
        }),
    );
    let base = spawn_stub(stub).await;

    let geocoder =
        GoogleGeocoder::new(format!("{base}/geocode/json"), "test-key", Duration::from_secs(5)).unwrap();

    let place = geocoder.forward("Cubbon Park").await.unwrap().unwrap();
    assert_eq!(place.address, "Cubbon Park, Bengaluru");
    assert_eq!(place.coords, Coordinates { lat: 12.9763, lng: 77.5929 });

    assert!(geocoder.reverse(Coordinates { lat: 1.0, lng: 1.0 }).await.unwrap().is_none());

    let denied = GoogleGeocoder::new(format!("{base}/geocode/json"), "wrong", Duration::from_secs(5)).unwrap();
    assert!(matches!(denied.forward("Cubbon Park").await, Err(AppError::Upstream(_))));
}

#[derive(Clone, Default)]
struct DbStub {
    data: Arc<Mutex<std::collections::HashMap<String, Value>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

async fn db_stub_handler(
    axum::extract::State(db): axum::extract::State<DbStub>,
    method: axum::http::Method,
    axum::extract::Path(path): axum::extract::Path<String>,
    axum::extract::Query(query): axum::extract::Query<std::collections::HashMap<String, String>>,
    body: axum::body::Bytes,
) -> (StatusCode, axum::Json<Value>) {
    let auth = query.get("auth").cloned().unwrap_or_default();
    db.seen.lock().unwrap().push(format!("{method} {path} auth={auth}"));
    if auth != "db-secret" {
        return (StatusCode::UNAUTHORIZED, axum::Json(json!({ "error": "Permission denied" })));
    }

    let body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    let mut data = db.data.lock().unwrap();
    let reply = match method.as_str() {
        "GET" => data.get(&path).cloned().unwrap_or(Value::Null),
        "PUT" => {
            data.insert(path, body.clone());
            body
        }
        "PATCH" => {
            let entry = data.entry(path).or_insert_with(|| json!({}));
            if let (Some(target), Some(fields)) = (entry.as_object_mut(), body.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            body
        }
        "DELETE" => {
            data.remove(&path);
            Value::Null
        }
        _ => return (StatusCode::METHOD_NOT_ALLOWED, axum::Json(Value::Null)),
    };
    (StatusCode::OK, axum::Json(reply))
}

#[tokio::test]
async fn rest_store_round_trips_through_the_database_api() {
    let db = DbStub::default();
    let stub = axum::Router::new()
        .route("/*path", axum::routing::any(db_stub_handler))
        .with_state(db.clone());
    let base = spawn_stub(stub).await;

    let store = RestStore::new(base.clone(), Some("db-secret".to_string()), Duration::from_secs(5)).unwrap();

    assert_eq!(store.get("customers/u1").await.unwrap(), None);

    store
        .set("customers/u1", json!({ "name": "Asha", "phone": "+919812345678" }))
        .await
        .unwrap();
    let mut fields = serde_json::Map::new();
    fields.insert("email".to_string(), json!("asha@example.in"));
    store.update("customers/u1", fields).await.unwrap();

    assert_eq!(
        store.get("customers/u1").await.unwrap(),
        Some(json!({ "name": "Asha", "phone": "+919812345678", "email": "asha@example.in" }))
    );

    store.remove("customers/u1").await.unwrap();
    assert_eq!(store.get("customers/u1").await.unwrap(), None);

    let seen = db.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            "GET customers/u1.json auth=db-secret",
            "PUT customers/u1.json auth=db-secret",
            "PATCH customers/u1.json auth=db-secret",
            "GET customers/u1.json auth=db-secret",
            "DELETE customers/u1.json auth=db-secret",
            "GET customers/u1.json auth=db-secret",
        ]
    );

    let anonymous = RestStore::new(base, None, Duration::from_secs(5)).unwrap();
    assert!(matches!(anonymous.get("customers/u1").await, Err(AppError::Upstream(_))));
    assert!(matches!(
        anonymous.set("customers/u1", json!({})).await,
        Err(AppError::Upstream(_))
    ));
}

async fn identity_stub_handler(
    axum::extract::Path(method): axum::extract::Path<String>,
    axum::extract::Query(query): axum::extract::Query<std::collections::HashMap<String, String>>,
    axum::Json(body): axum::Json<Value>,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    let provider_error = |message: &str| {
        (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": { "code": 400, "message": message } })),
        )
            .into_response()
    };

    if query.get("key").map(String::as_str) != Some("auth-key") {
        return provider_error("API_KEY_INVALID");
    }

    match method.as_str() {
        "accounts:sendVerificationCode" => {
            if body["phoneNumber"] == "+910000000000" {
                return provider_error("INVALID_PHONE_NUMBER : Invalid format.");
            }
            if body["recaptchaToken"] == "crash" {
                return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
            }
            axum::Json(json!({ "sessionInfo": format!("sess-{}", body["recaptchaToken"].as_str().unwrap_or("")) }))
                .into_response()
        }
        "accounts:signInWithPhoneNumber" => {
            if body["code"] != "654321" {
                return provider_error("INVALID_CODE");
            }
            if body["sessionInfo"] == "sess-stale" {
                return provider_error("SESSION_EXPIRED");
            }
            axum::Json(json!({
                "localId": "uid-asha",
                "phoneNumber": "+919812345678",
                "idToken": "ignored"
            }))
            .into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

#[tokio::test]
async fn identity_toolkit_provider_sends_and_confirms_codes() {
    let stub = axum::Router::new().route("/*method", axum::routing::post(identity_stub_handler));
    let base = spawn_stub(stub).await;

    let provider = IdentityToolkitProvider::new(base.clone(), "auth-key", Duration::from_secs(5)).unwrap();

    let session_info = provider.send_code("+919812345678", "captcha-ok").await.unwrap();
    assert_eq!(session_info, "sess-captcha-ok");

    let user = provider.confirm(&session_info, "654321").await.unwrap();
    assert_eq!(user.uid, "uid-asha");
    assert_eq!(user.phone, "+919812345678");

    assert!(matches!(
        provider.confirm(&session_info, "111111").await,
        Err(AppError::Unauthorized(msg)) if msg == "Invalid OTP"
    ));
    assert!(matches!(
        provider.confirm("sess-stale", "654321").await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        provider.send_code("+910000000000", "captcha-ok").await,
        Err(AppError::BadRequest(msg)) if msg == "Please enter a valid phone number"
    ));
    assert!(matches!(
        provider.send_code("+919812345678", "crash").await,
        Err(AppError::Upstream(_))
    ));

    let wrong_key = IdentityToolkitProvider::new(base, "other-key", Duration::from_secs(5)).unwrap();
    assert!(matches!(
        wrong_key.send_code("+919812345678", "captcha-ok").await,
        Err(AppError::Upstream(_))
    ));
}

async fn ws_handshake(base: &str, token: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("{base}/ws/session?token={token}"))
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn session_socket_rejects_unknown_token() {
    let t = setup();
    let base = spawn_stub(t.app.clone()).await;

    let res = ws_handshake(&base, "not-a-session").await;
    assert_eq!(res.status().as_u16(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "session expired, please log in again");
}

#[tokio::test]
async fn session_socket_upgrades_for_signed_in_user() {
    let t = setup();
    let (token, _uid) = login(&t.app, "9845012345").await;
    let base = spawn_stub(t.app.clone()).await;

    let res = ws_handshake(&base, &token).await;
    assert_eq!(res.status().as_u16(), 101);
}
