use sqlx::sqlite::SqlitePoolOptions;
use vihara::ViharaError;
use vihara::store::{DataStore, Value};

async fn memory_store() -> DataStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    let store = DataStore::new(pool);
    store.init_schema().await.expect("schema init failed");
    store
}

#[tokio::test]
async fn hostile_values_are_bound_as_literal_data() {
    let store = memory_store().await;
    let hostile = "O'Brien'); DROP TABLE monks;--";

    let id = store
        .insert("monks", &[("full_name", hostile.into())])
        .await
        .expect("insert failed");
    let row = store
        .fetch_one("SELECT full_name FROM monks WHERE id = ?", &[id.into()])
        .await
        .expect("fetch failed")
        .expect("row missing");
    assert_eq!(row.text("full_name"), Some(hostile));

    // The table survived and still accepts writes.
    store
        .insert("monks", &[("full_name", "Tenzin".into())])
        .await
        .expect("table no longer usable");
    let rows = store
        .fetch_all("SELECT id FROM monks", &[])
        .await
        .expect("fetch_all failed");
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn hostile_where_params_stay_data() {
    let store = memory_store().await;
    store
        .insert("monks", &[("full_name", "Tenzin".into())])
        .await
        .expect("insert failed");

    let rows = store
        .fetch_all(
            "SELECT id FROM monks WHERE full_name = ?",
            &["' OR '1'='1".into()],
        )
        .await
        .expect("fetch failed");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn missing_rows_are_not_errors() {
    let store = memory_store().await;
    let row = store
        .fetch_one("SELECT id FROM monks WHERE id = ?", &[42i64.into()])
        .await
        .expect("fetch failed");
    assert!(row.is_none());

    let rows = store
        .fetch_all("SELECT id FROM monks", &[])
        .await
        .expect("fetch_all failed");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn unknown_columns_surface_as_query_errors() {
    let store = memory_store().await;
    let result = store
        .insert("monks", &[("no_such_column", "x".into())])
        .await;
    assert!(matches!(result, Err(ViharaError::Query(_))));
}

#[tokio::test]
async fn empty_row_data_is_rejected() {
    let store = memory_store().await;
    let result = store.insert("monks", &[]).await;
    assert!(matches!(result, Err(ViharaError::Query(_))));
}

#[tokio::test]
async fn rolled_back_writes_are_not_observable() {
    let store = memory_store().await;
    store
        .insert(
            "rooms",
            &[("room_no", "A1".into()), ("capacity", 2i64.into())],
        )
        .await
        .expect("room insert failed");

    let mut tx = store.begin().await.expect("begin failed");
    tx.insert("monks", &[("full_name", "Tenzin".into())])
        .await
        .expect("monk insert failed");
    // A duplicate room_no violates UNIQUE and poisons the compound write.
    let failure = tx
        .insert(
            "rooms",
            &[("room_no", "A1".into()), ("capacity", 1i64.into())],
        )
        .await;
    assert!(matches!(failure, Err(ViharaError::Query(_))));
    tx.rollback().await.expect("rollback failed");

    let rows = store
        .fetch_all("SELECT id FROM monks", &[])
        .await
        .expect("fetch_all failed");
    assert!(rows.is_empty(), "rolled-back monk row is observable");
}

#[tokio::test]
async fn dropping_an_unfinished_transaction_rolls_back() {
    let store = memory_store().await;
    {
        let mut tx = store.begin().await.expect("begin failed");
        tx.insert("monks", &[("full_name", "Tenzin".into())])
            .await
            .expect("insert failed");
        // dropped without commit
    }
    let rows = store
        .fetch_all("SELECT id FROM monks", &[])
        .await
        .expect("fetch_all failed");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn finishing_a_completed_transaction_fails_loudly() {
    let store = memory_store().await;
    let mut tx = store.begin().await.expect("begin failed");
    tx.insert(
        "rooms",
        &[("room_no", "B1".into()), ("capacity", 1i64.into())],
    )
    .await
    .expect("insert failed");
    tx.commit().await.expect("commit failed");

    assert!(matches!(
        tx.rollback().await,
        Err(ViharaError::Transaction(_))
    ));
    assert!(matches!(tx.commit().await, Err(ViharaError::Transaction(_))));
    assert!(matches!(
        tx.insert("rooms", &[("room_no", "B2".into())]).await,
        Err(ViharaError::Transaction(_))
    ));
}

#[tokio::test]
async fn room_occupancy_moves_with_the_monk_row() {
    let store = memory_store().await;
    let room_id = store
        .insert(
            "rooms",
            &[
                ("room_no", "5".into()),
                ("capacity", 3i64.into()),
                ("current_occupancy", 0i64.into()),
            ],
        )
        .await
        .expect("room insert failed");

    let mut tx = store.begin().await.expect("begin failed");
    let monk_id = tx
        .insert(
            "monks",
            &[("full_name", "Tenzin".into()), ("room_id", room_id.into())],
        )
        .await
        .expect("monk insert failed");
    let occupancy = tx
        .fetch_one(
            "SELECT current_occupancy FROM rooms WHERE id = ?",
            &[room_id.into()],
        )
        .await
        .expect("fetch failed")
        .and_then(|r| r.integer("current_occupancy"))
        .expect("occupancy missing");
    let affected = tx
        .update(
            "rooms",
            &[("current_occupancy", (occupancy + 1).into())],
            "id = ?",
            &[room_id.into()],
        )
        .await
        .expect("occupancy update failed");
    assert_eq!(affected, 1);
    tx.commit().await.expect("commit failed");

    assert!(monk_id > 0);
    let row = store
        .fetch_one(
            "SELECT current_occupancy FROM rooms WHERE id = ?",
            &[room_id.into()],
        )
        .await
        .expect("fetch failed")
        .expect("room missing");
    assert_eq!(row.integer("current_occupancy"), Some(1));
}

#[tokio::test]
async fn deleting_a_monk_cleans_children_and_references() {
    let store = memory_store().await;
    let room_id = store
        .insert(
            "rooms",
            &[
                ("room_no", "C3".into()),
                ("capacity", 1i64.into()),
                ("current_occupancy", 1i64.into()),
            ],
        )
        .await
        .expect("room insert failed");
    let actor_id = store
        .insert(
            "actors",
            &[
                ("role", "monk".into()),
                ("username", "tenzin".into()),
                ("display_name", "Tenzin".into()),
                ("credential_hash", "x".into()),
            ],
        )
        .await
        .expect("actor insert failed");
    let monk_id = store
        .insert(
            "monks",
            &[
                ("actor_id", actor_id.into()),
                ("full_name", "Tenzin".into()),
                ("room_id", room_id.into()),
            ],
        )
        .await
        .expect("monk insert failed");
    let doctor_id = store
        .insert("doctors", &[("full_name", "Dr. Pema".into())])
        .await
        .expect("doctor insert failed");
    for day in ["2026-08-10", "2026-08-11", "2026-08-12"] {
        store
            .insert(
                "appointments",
                &[
                    ("monk_id", monk_id.into()),
                    ("doctor_id", doctor_id.into()),
                    ("scheduled_at", format!("{day}T09:00:00Z").into()),
                ],
            )
            .await
            .expect("appointment insert failed");
    }
    for diagnosis in ["fever", "follow-up"] {
        store
            .insert(
                "medical_records",
                &[
                    ("monk_id", monk_id.into()),
                    ("doctor_id", doctor_id.into()),
                    ("recorded_at", "2026-08-01T10:00:00Z".into()),
                    ("diagnosis", diagnosis.into()),
                ],
            )
            .await
            .expect("record insert failed");
    }
    let category_id = store
        .insert("donation_categories", &[("name", "Alms".into())])
        .await
        .expect("category insert failed");
    for amount in [500i64, 1200] {
        store
            .insert(
                "donations",
                &[
                    ("category_id", category_id.into()),
                    ("donor_id", actor_id.into()),
                    ("donor_name", "Tenzin".into()),
                    ("amount_cents", amount.into()),
                    ("donated_at", "2026-07-01T08:00:00Z".into()),
                ],
            )
            .await
            .expect("donation insert failed");
    }

    let mut tx = store.begin().await.expect("begin failed");
    tx.delete("appointments", "monk_id = ?", &[monk_id.into()])
        .await
        .expect("appointment delete failed");
    tx.delete("medical_records", "monk_id = ?", &[monk_id.into()])
        .await
        .expect("record delete failed");
    tx.update(
        "donations",
        &[("donor_id", Value::Null)],
        "donor_id = ?",
        &[actor_id.into()],
    )
    .await
    .expect("donation update failed");
    tx.delete("actors", "id = ?", &[actor_id.into()])
        .await
        .expect("actor delete failed");
    tx.update(
        "rooms",
        &[("current_occupancy", 0i64.into())],
        "id = ?",
        &[room_id.into()],
    )
    .await
    .expect("room update failed");
    tx.delete("monks", "id = ?", &[monk_id.into()])
        .await
        .expect("monk delete failed");
    tx.commit().await.expect("commit failed");

    let appointments = store
        .fetch_all(
            "SELECT * FROM appointments WHERE monk_id = ?",
            &[monk_id.into()],
        )
        .await
        .expect("fetch failed");
    assert!(appointments.is_empty());

    let donations = store
        .fetch_all("SELECT donor_id, amount_cents FROM donations", &[])
        .await
        .expect("fetch failed");
    assert_eq!(donations.len(), 2);
    assert!(donations.iter().all(|r| r.is_null("donor_id")));

    let room = store
        .fetch_one(
            "SELECT current_occupancy FROM rooms WHERE id = ?",
            &[room_id.into()],
        )
        .await
        .expect("fetch failed")
        .expect("room missing");
    assert_eq!(room.integer("current_occupancy"), Some(0));
}
