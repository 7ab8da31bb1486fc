use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use citizen_core::db::open_db_in_memory;
use citizen_core::{Address, Citizen, CitizenRepository, PartyResolver, SqliteCitizenRepository};
use citizen_server::{build_router, AppState};
use http_body_util::BodyExt;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower::ServiceExt;
use uuid::Uuid;

const PARTY_ID: &str = "f0882f1d-06bc-47fd-b017-1d8307f5ce95";

/// Answers every Party lookup with a fixed value and records the subject type.
struct StubResolver {
    answer: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl PartyResolver for StubResolver {
    fn resolve(
        &self,
        personal_number: &str,
        _municipality_id: &str,
        subject_type: &str,
    ) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .push((personal_number.to_string(), subject_type.to_string()));
        self.answer.clone()
    }
}

/// Party stand-in that answers only after a fixed delay.
struct SlowResolver {
    delay: Duration,
}

impl PartyResolver for SlowResolver {
    fn resolve(
        &self,
        _personal_number: &str,
        _municipality_id: &str,
        _subject_type: &str,
    ) -> Option<String> {
        std::thread::sleep(self.delay);
        Some(PARTY_ID.to_string())
    }
}

struct Fixture {
    app: Router,
    resolver: Arc<StubResolver>,
    visible: Citizen,
    classified: Citizen,
}

/// Stores one open citizen with an address and one classified citizen.
fn seed(conn: &Connection) -> (Citizen, Citizen) {
    let mut visible = Citizen::new("199001011234");
    visible.givenname = Some("Anna".to_string());
    visible.lastname = Some("Svensson".to_string());
    visible.updated_at = 10_000;
    let mut home = Address::new();
    home.status = Some("Current".to_string());
    home.city = Some("Sundsvall".to_string());
    home.postal_code = Some("85230".to_string());
    visible.addresses.push(home);

    let mut classified = Citizen::new("198502029876");
    classified.classified = Some("J".to_string());
    classified.updated_at = 1_000;

    let repo = SqliteCitizenRepository::try_new(conn).unwrap();
    repo.save(&visible).unwrap();
    repo.save(&classified).unwrap();
    (visible, classified)
}

fn fixture(party_answer: Option<&str>) -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let (visible, classified) = seed(&conn);

    let resolver = Arc::new(StubResolver {
        answer: party_answer.map(str::to_string),
        calls: Mutex::new(Vec::new()),
    });
    let state = AppState::new(conn, resolver.clone(), "2281");

    Fixture {
        app: build_router(state),
        resolver,
        visible,
        classified,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, content_type, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_version() {
    let fixture = fixture(None);
    let (status, _, body) = send(&fixture.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], citizen_core::core_version());
}

#[tokio::test(flavor = "multi_thread")]
async fn get_citizen_returns_extended_projection() {
    let fixture = fixture(None);
    let uri = format!("/api/v2/citizen/{}", fixture.visible.person_id);
    let (status, _, body) = send(&fixture.app, get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["personId"], fixture.visible.person_id.to_string());
    assert_eq!(body["personalNumber"], "199001011234");
    assert_eq!(body["givenname"], "Anna");
    assert_eq!(body["addresses"][0]["city"], "Sundsvall");
    assert!(body.get("protectedNR").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn classified_citizen_is_hidden_unless_requested() {
    let fixture = fixture(None);
    let uri = format!("/api/v2/citizen/{}", fixture.classified.person_id);

    let (status, _, body) = send(&fixture.app, get(&uri)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _, body) = send(&fixture.app, get(&format!("{uri}?showClassified=true"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["classified"], "J");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_citizen_is_problem_not_found() {
    let fixture = fixture(None);
    let missing = Uuid::new_v4();
    let (status, content_type, body) =
        send(&fixture.app, get(&format!("/api/v2/citizen/{missing}"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
    let body = json_body(&body);
    assert_eq!(body["status"], 404);
    assert_eq!(body["title"], "Not Found");
    assert_eq!(body["detail"], format!("No citizen found with ID: {missing}"));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_person_id_is_bad_request() {
    let fixture = fixture(None);
    let (status, content_type, _) = send(&fixture.app, get("/api/v2/citizen/not-a-uuid")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_lookup_skips_unknown_and_hidden_citizens() {
    let fixture = fixture(None);
    let ids = json!([
        fixture.visible.person_id,
        Uuid::new_v4(),
        fixture.classified.person_id
    ]);

    let (status, _, body) = send(&fixture.app, post_json("/api/v2/citizen/batch", ids.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["personId"], fixture.visible.person_id.to_string());

    let (_, _, body) = send(
        &fixture.app,
        post_json("/api/v2/citizen/batch?showClassified=true", ids),
    )
    .await;
    assert_eq!(json_body(&body).as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn personal_number_lookup_by_id() {
    let fixture = fixture(None);
    let uri = format!("/api/v2/citizen/{}/personnumber", fixture.visible.person_id);
    let (status, _, body) = send(&fixture.app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!("199001011234"));

    let uri = format!("/api/v2/citizen/{}/personnumber", Uuid::new_v4());
    let (status, _, _) = send(&fixture.app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn guid_lookup_for_party_municipality_asks_party() {
    let fixture = fixture(Some(PARTY_ID));
    let (status, _, body) = send(&fixture.app, get("/api/v2/citizen/199001011234/guid")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!(PARTY_ID));
    assert_eq!(
        fixture.resolver.calls.lock().unwrap().clone(),
        vec![("199001011234".to_string(), "PRIVATE".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn guid_lookup_without_party_answer_is_no_content() {
    let fixture = fixture(None);
    let (status, _, body) = send(
        &fixture.app,
        get("/api/v2/citizen/199001011234/guid?municipalityId=2281"),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn guid_lookup_for_other_municipality_uses_local_store() {
    let fixture = fixture(Some(PARTY_ID));
    let (status, _, body) = send(
        &fixture.app,
        get("/api/v2/citizen/199001011234/guid?municipalityId=1440"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!(fixture.visible.person_id.to_string()));

    let (status, _, body) = send(
        &fixture.app,
        get("/api/v2/citizen/200001010000/guid?municipalityId=1440"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(&body)["detail"],
        "No citizen found with personal number: 200001010000"
    );
    assert!(fixture.resolver.calls.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn guid_batch_reports_every_input() {
    let fixture = fixture(None);
    let (status, _, body) = send(
        &fixture.app,
        post_json(
            "/api/v2/citizen/guid/batch",
            json!(["199001011234", "200001010000"]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body[0]["personNumber"], "199001011234");
    assert_eq!(body[0]["success"], true);
    assert_eq!(body[0]["personId"], fixture.visible.person_id.to_string());
    assert_eq!(body[1]["success"], false);
    assert_eq!(body[1]["errorMessage"], "Citizen not found");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_person_registers_then_conflicts() {
    let fixture = fixture(None);
    let request = || post_json("/api/v2/citizen/guid", json!({ "personalNumber": "201001019999" }));

    let (status, _, body) = send(&fixture.app, request()).await;
    assert_eq!(status, StatusCode::OK);
    let created: Uuid = serde_json::from_slice(&body).unwrap();

    let (status, _, body) = send(
        &fixture.app,
        get("/api/v2/citizen/201001019999/guid?municipalityId=1440"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!(created.to_string()));

    let (status, content_type, body) = send(&fixture.app, request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
    assert_eq!(
        json_body(&body)["detail"],
        "Person with personal number 201001019999 already exists"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn create_person_requires_personal_number() {
    let fixture = fixture(None);

    let (status, _, body) =
        send(&fixture.app, post_json("/api/v2/citizen/guid", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["detail"], "Personal number is required");

    let empty = Request::builder()
        .method("POST")
        .uri("/api/v2/citizen/guid")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&fixture.app, empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn changed_addresses_filter_by_owner_update_time() {
    let fixture = fixture(None);

    let (status, _, body) = send(
        &fixture.app,
        get("/api/v2/citizen/changedaddress?changedDateFrom=1970-01-01T00:00:05Z"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["personId"], fixture.visible.person_id.to_string());
    assert_eq!(body[0]["address"]["city"], "Sundsvall");

    let (status, _, _) = send(
        &fixture.app,
        get("/api/v2/citizen/changedaddress?changedDateFrom=2100-01-01T00:00:00Z"),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test(flavor = "multi_thread")]
async fn address_search_matches_filters() {
    let fixture = fixture(None);

    let (status, _, body) = send(
        &fixture.app,
        get("/api/v2/citizen/addresses?city=Sundsvall&postalCode=85230"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body).as_array().unwrap().len(), 1);

    let (status, _, _) = send(&fixture.app, get("/api/v2/citizen/addresses?city=Kiruna")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_route_is_problem_not_found() {
    let fixture = fixture(None);
    let (status, content_type, _) = send(&fixture.app, get("/api/v1/citizen")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn local_lookup_proceeds_while_party_call_is_slow() {
    let conn = open_db_in_memory().unwrap();
    let (visible, _) = seed(&conn);
    let resolver = Arc::new(SlowResolver {
        delay: Duration::from_secs(2),
    });
    let app = build_router(AppState::new(conn, resolver, "2281"));

    let party_app = app.clone();
    let party_call = tokio::spawn(async move {
        send(&party_app, get("/api/v2/citizen/190001019999/guid")).await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    let uri = format!("/api/v2/citizen/{}", visible.person_id);
    let (status, _, _) = send(&app, get(&uri)).await;
    let elapsed = started.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert!(
        elapsed < Duration::from_secs(1),
        "local lookup waited {elapsed:?} for the Party call"
    );

    let (status, _, body) = party_call.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!(PARTY_ID));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_json_bodies_are_problem_bad_request() {
    let fixture = fixture(None);

    let (status, content_type, body) = send(
        &fixture.app,
        post_json("/api/v2/citizen/batch", json!(["not-a-uuid"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
    assert_eq!(json_body(&body)["status"], 400);

    let without_content_type = Request::builder()
        .method("POST")
        .uri("/api/v2/citizen/guid/batch")
        .body(Body::from(r#"["199001011234"]"#))
        .unwrap();
    let (status, content_type, _) = send(&fixture.app, without_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_query_is_problem_bad_request() {
    let fixture = fixture(None);
    let uri = format!(
        "/api/v2/citizen/{}?showClassified=sometimes",
        fixture.visible.person_id
    );
    let (status, content_type, _) = send(&fixture.app, get(&uri)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/problem+json"));

    let (status, _, _) = send(
        &fixture.app,
        get("/api/v2/citizen/changedaddress?changedDateFrom=yesterday"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn list_citizens_pages_and_filters_classified() {
    let fixture = fixture(None);

    let (status, _, body) = send(&fixture.app, get("/api/v2/citizen")).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["personId"], fixture.visible.person_id.to_string());

    let (_, _, body) = send(
        &fixture.app,
        get("/api/v2/citizen?showClassified=true&limit=1"),
    )
    .await;
    let body = json_body(&body);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["personalNumber"], "198502029876");

    let uri = format!(
        "/api/v2/citizen?showClassified=true&personId={}",
        fixture.classified.person_id
    );
    let (_, _, body) = send(&fixture.app, get(&uri)).await;
    assert_eq!(json_body(&body)[0]["classified"], "J");
}
