use axum::Router;
use axum::extract::FromRef;
use axum::routing::{get, post, put};
use axum_extra::extract::cookie::Key;

use crate::gate::AccessGate;
use crate::handlers::{
    appointments, auth, categories, dashboard, doctors, donations, expenses, monks, records,
    report, rooms,
};
use crate::store::DataStore;

#[derive(Clone)]
pub struct ViharaState {
    pub store: DataStore,
    pub gate: AccessGate,
    key: Key,
}

impl ViharaState {
    pub fn new(store: DataStore, gate: AccessGate) -> Self {
        // Sessions are process-local, so a per-process cookie key is
        // consistent: a restart invalidates both together.
        Self {
            store,
            gate,
            key: Key::generate(),
        }
    }
}

impl FromRef<ViharaState> for Key {
    fn from_ref(state: &ViharaState) -> Key {
        state.key.clone()
    }
}

pub fn vihara_router(state: ViharaState) -> Router {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session_info))
        .route("/session/ping", post(auth::ping))
        .route("/monks", get(monks::list).post(monks::create))
        .route(
            "/monks/{id}",
            get(monks::get).put(monks::update).delete(monks::remove),
        )
        .route("/doctors", get(doctors::list).post(doctors::create))
        .route(
            "/doctors/{id}",
            get(doctors::get).put(doctors::update).delete(doctors::remove),
        )
        .route("/rooms", get(rooms::list).post(rooms::create))
        .route("/rooms/{id}", put(rooms::update).delete(rooms::remove))
        .route(
            "/appointments",
            get(appointments::list).post(appointments::create),
        )
        .route("/appointments/{id}/status", put(appointments::set_status))
        .route("/records", get(records::list).post(records::create))
        .route("/records/{id}", put(records::update))
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::remove),
        )
        .route("/donations", get(donations::list).post(donations::create))
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route(
            "/expenses/{id}",
            put(expenses::update).delete(expenses::remove),
        )
        .route("/dashboard", get(dashboard::summary))
        .route("/report/public", get(report::public_report))
        .with_state(state)
}
