use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use vihara::gate::AccessGate;
use vihara::gate::password::hash_secret;
use vihara::router::{ViharaState, vihara_router};
use vihara::store::DataStore;

async fn test_app() -> (Router, DataStore) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    let store = DataStore::new(pool);
    store.init_schema().await.expect("schema init failed");
    let gate = AccessGate::new(store.clone(), 1800, 120);
    let state = ViharaState::new(store.clone(), gate);
    (vihara_router(state), store)
}

async fn seed_actor(store: &DataStore, role: &str, username: &str, secret: &str) -> i64 {
    store
        .insert(
            "actors",
            &[
                ("role", role.into()),
                ("username", username.into()),
                ("display_name", username.into()),
                ("credential_hash", hash_secret(secret).expect("hash failed").into()),
            ],
        )
        .await
        .expect("seed actor failed")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");
    app.clone().oneshot(request).await.expect("request failed")
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not json")
}

async fn login(app: &Router, identifier: &str, secret: &str, role: &str) -> String {
    let resp = send(
        app,
        "POST",
        "/login",
        None,
        Some(serde_json::json!({
            "identifier": identifier,
            "secret": secret,
            "role": role,
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("no session cookie set")
        .to_str()
        .expect("cookie was not utf-8");
    set_cookie
        .split(';')
        .next()
        .expect("empty set-cookie")
        .to_string()
}

#[tokio::test]
async fn admin_routes_reject_other_roles_and_anonymous() {
    let (app, store) = test_app().await;
    seed_actor(&store, "admin", "abbot", "admin-pw").await;
    seed_actor(&store, "doctor", "pema", "doctor-pw").await;

    // Anonymous.
    let resp = send(&app, "GET", "/monks", None, None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Wrong role: a doctor session never opens an admin page.
    let doctor_cookie = login(&app, "pema", "doctor-pw", "doctor").await;
    let resp = send(&app, "GET", "/monks", Some(&doctor_cookie), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Right role.
    let admin_cookie = login(&app, "abbot", "admin-pw", "admin").await;
    let resp = send(&app, "GET", "/monks", Some(&admin_cookie), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn failed_logins_share_one_response() {
    let (app, store) = test_app().await;
    seed_actor(&store, "admin", "abbot", "admin-pw").await;

    let unknown = send(
        &app,
        "POST",
        "/login",
        None,
        Some(serde_json::json!({
            "identifier": "nobody", "secret": "x", "role": "admin"
        })),
    )
    .await;
    let wrong_pw = send(
        &app,
        "POST",
        "/login",
        None,
        Some(serde_json::json!({
            "identifier": "abbot", "secret": "wrong", "role": "admin"
        })),
    )
    .await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = json_body(unknown).await;
    let wrong_pw_body = json_body(wrong_pw).await;
    assert_eq!(unknown_body, wrong_pw_body);
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let (app, store) = test_app().await;
    seed_actor(&store, "admin", "abbot", "admin-pw").await;
    let cookie = login(&app, "abbot", "admin-pw", "admin").await;

    let resp = send(&app, "GET", "/session", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, "POST", "/logout", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["message"], "You have been logged out.");

    let resp = send(&app, "GET", "/session", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn monk_lifecycle_maintains_room_occupancy() {
    let (app, store) = test_app().await;
    seed_actor(&store, "admin", "abbot", "admin-pw").await;
    let cookie = login(&app, "abbot", "admin-pw", "admin").await;

    let resp = send(
        &app,
        "POST",
        "/rooms",
        Some(&cookie),
        Some(serde_json::json!({ "room_no": "A1", "capacity": 2 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let room_id = json_body(resp).await["id"].as_i64().expect("room id missing");

    let resp = send(
        &app,
        "POST",
        "/monks",
        Some(&cookie),
        Some(serde_json::json!({ "full_name": "Tenzin", "room_id": room_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let monk_id = json_body(resp).await["id"].as_i64().expect("monk id missing");

    let resp = send(&app, "GET", "/rooms", Some(&cookie), None).await;
    let rooms = json_body(resp).await;
    assert_eq!(rooms[0]["current_occupancy"], 1);

    let resp = send(
        &app,
        "POST",
        "/doctors",
        Some(&cookie),
        Some(serde_json::json!({ "full_name": "Dr. Pema" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let doctor_id = json_body(resp).await["id"].as_i64().expect("doctor id missing");

    let resp = send(
        &app,
        "POST",
        "/appointments",
        Some(&cookie),
        Some(serde_json::json!({
            "monk_id": monk_id,
            "doctor_id": doctor_id,
            "scheduled_at": "2026-09-01T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        "DELETE",
        &format!("/monks/{monk_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, "GET", "/rooms", Some(&cookie), None).await;
    let rooms = json_body(resp).await;
    assert_eq!(rooms[0]["current_occupancy"], 0);

    let orphans = store
        .fetch_all(
            "SELECT id FROM appointments WHERE monk_id = ?",
            &[monk_id.into()],
        )
        .await
        .expect("fetch failed");
    assert!(orphans.is_empty());

    // Every write along the way left an audit row.
    let audits = store
        .fetch_all("SELECT action, table_name FROM audit_log", &[])
        .await
        .expect("fetch failed");
    assert_eq!(audits.len(), 5);
}

#[tokio::test]
async fn full_rooms_reject_new_residents() {
    let (app, store) = test_app().await;
    seed_actor(&store, "admin", "abbot", "admin-pw").await;
    let cookie = login(&app, "abbot", "admin-pw", "admin").await;

    let resp = send(
        &app,
        "POST",
        "/rooms",
        Some(&cookie),
        Some(serde_json::json!({ "room_no": "B1", "capacity": 1 })),
    )
    .await;
    let room_id = json_body(resp).await["id"].as_i64().expect("room id missing");

    let resp = send(
        &app,
        "POST",
        "/monks",
        Some(&cookie),
        Some(serde_json::json!({ "full_name": "Tenzin", "room_id": room_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        "POST",
        "/monks",
        Some(&cookie),
        Some(serde_json::json!({ "full_name": "Lobsang", "room_id": room_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The rejected admission rolled back entirely: one monk, occupancy one.
    let monks = store
        .fetch_all("SELECT id FROM monks", &[])
        .await
        .expect("fetch failed");
    assert_eq!(monks.len(), 1);
    let room = store
        .fetch_one(
            "SELECT current_occupancy FROM rooms WHERE id = ?",
            &[room_id.into()],
        )
        .await
        .expect("fetch failed")
        .expect("room missing");
    assert_eq!(room.integer("current_occupancy"), Some(1));
}

#[tokio::test]
async fn public_report_needs_no_session() {
    let (app, store) = test_app().await;
    let category_id = store
        .insert(
            "donation_categories",
            &[("name", "Medical Fund".into())],
        )
        .await
        .expect("category insert failed");
    store
        .insert(
            "donations",
            &[
                ("category_id", category_id.into()),
                ("donor_name", "Anonymous".into()),
                ("amount_cents", 5000i64.into()),
                ("donated_at", "2026-08-01T09:00:00Z".into()),
            ],
        )
        .await
        .expect("donation insert failed");
    store
        .insert(
            "expenses",
            &[
                ("description", "bandages".into()),
                ("amount_cents", 1500i64.into()),
                ("spent_on", "2026-08-02".into()),
            ],
        )
        .await
        .expect("expense insert failed");

    let resp = send(&app, "GET", "/report/public", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["total_donated_cents"], 5000);
    assert_eq!(body["total_spent_cents"], 1500);
    assert_eq!(body["balance_cents"], 3500);
    assert_eq!(body["categories"][0]["name"], "Medical Fund");
    assert_eq!(body["categories"][0]["total_cents"], 5000);
}

#[tokio::test]
async fn donator_donates_and_sees_own_gifts() {
    let (app, store) = test_app().await;
    seed_actor(&store, "donator", "karma", "donor-pw").await;
    store
        .insert("donation_categories", &[("name", "Alms".into())])
        .await
        .expect("category insert failed");
    let cookie = login(&app, "karma", "donor-pw", "donator").await;

    let resp = send(
        &app,
        "POST",
        "/donations",
        Some(&cookie),
        Some(serde_json::json!({ "category_id": 1, "amount_cents": 2500 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&app, "GET", "/donations", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let donations = json_body(resp).await;
    assert_eq!(donations.as_array().map(Vec::len), Some(1));
    assert_eq!(donations[0]["donor_name"], "karma");
    assert_eq!(donations[0]["amount_cents"], 2500);

    let resp = send(&app, "GET", "/dashboard", Some(&cookie), None).await;
    let dashboard = json_body(resp).await;
    assert_eq!(dashboard["role"], "donator");
    assert_eq!(dashboard["donation_count"], 1);
    assert_eq!(dashboard["total_donated_cents"], 2500);

    // Donation pages are not monk or doctor territory.
    let resp = send(&app, "GET", "/records", Some(&cookie), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
