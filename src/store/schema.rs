//! SQL DDL for initializing the application database.
//! SQLite-first design; can be adapted for other RDBMS.

/// Schema notes:
/// - Primary keys are `INTEGER PRIMARY KEY AUTOINCREMENT` throughout; the
///   store returns the generated rowid from inserts.
/// - Timestamps are RFC3339 TEXT; date-only columns are `YYYY-MM-DD` TEXT.
/// - `rooms.current_occupancy` is a derived counter summarizing the monks
///   assigned to the room. Every write that changes a monk's `room_id` must
///   adjust it inside the same transaction.
/// - Category totals are NOT stored; they are aggregated at read time.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS actors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    role TEXT NOT NULL CHECK (role IN ('admin', 'doctor', 'monk', 'donator')),
    username TEXT NOT NULL UNIQUE,
    email TEXT NULL,
    display_name TEXT NOT NULL,
    credential_hash TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_actors_role_username ON actors(role, username);

CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    room_no TEXT NOT NULL UNIQUE,
    capacity INTEGER NOT NULL DEFAULT 1,
    current_occupancy INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS monks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id INTEGER NULL,
    full_name TEXT NOT NULL,
    date_of_birth TEXT NULL,
    room_id INTEGER NULL,
    admitted_on TEXT NULL,
    notes TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_monks_room_id ON monks(room_id);

CREATE TABLE IF NOT EXISTS doctors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id INTEGER NULL,
    full_name TEXT NOT NULL,
    specialty TEXT NULL,
    phone TEXT NULL
);

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    monk_id INTEGER NOT NULL,
    doctor_id INTEGER NOT NULL,
    scheduled_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled'
        CHECK (status IN ('scheduled', 'completed', 'cancelled')),
    reason TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_monk_id ON appointments(monk_id);
CREATE INDEX IF NOT EXISTS idx_appointments_doctor_id ON appointments(doctor_id);

CREATE TABLE IF NOT EXISTS medical_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    monk_id INTEGER NOT NULL,
    doctor_id INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    diagnosis TEXT NOT NULL,
    treatment TEXT NULL,
    status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'closed'))
);

CREATE INDEX IF NOT EXISTS idx_medical_records_monk_id ON medical_records(monk_id);

CREATE TABLE IF NOT EXISTS donation_categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NULL
);

CREATE TABLE IF NOT EXISTS donations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER NOT NULL,
    donor_id INTEGER NULL,
    donor_name TEXT NULL,
    amount_cents INTEGER NOT NULL,
    donated_at TEXT NOT NULL,
    note TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_donations_category_id ON donations(category_id);
CREATE INDEX IF NOT EXISTS idx_donations_donor_id ON donations(donor_id);

CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category_id INTEGER NULL,
    description TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    spent_on TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_role TEXT NOT NULL,
    actor_id INTEGER NOT NULL,
    action TEXT NOT NULL CHECK (action IN ('create', 'update', 'delete')),
    table_name TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    old_values TEXT NULL,
    new_values TEXT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_log_table_record ON audit_log(table_name, record_id);
"#;
