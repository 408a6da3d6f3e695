//! SQL schema for the Beacon SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Registry-wide settings written once on first open (e.g. the qr salt).
CREATE TABLE IF NOT EXISTS registry_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- AUTOINCREMENT: ids start at 1 and are never reused.
CREATE TABLE IF NOT EXISTS alerts (
    alert_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT    NOT NULL,
    location    TEXT    NOT NULL,
    alert_type  TEXT    NOT NULL
                CHECK (alert_type IN ('emergency', 'warning', 'information', 'safe')),
    status      TEXT    NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'resolved', 'expired')),
    content_ref TEXT    NOT NULL,
    issuer      TEXT    NOT NULL,
    created_at  TEXT    NOT NULL,   -- ISO 8601 UTC; from the registry clock
    latitude    INTEGER NOT NULL,   -- microdegrees
    longitude   INTEGER NOT NULL    -- microdegrees
);

-- Exactly one token per alert, in both directions.
CREATE TABLE IF NOT EXISTS qr_codes (
    token    TEXT    PRIMARY KEY,
    alert_id INTEGER NOT NULL UNIQUE REFERENCES alerts(alert_id)
);

CREATE TABLE IF NOT EXISTS roles (
    principal TEXT NOT NULL,
    role      TEXT NOT NULL CHECK (role IN ('admin', 'authority')),
    PRIMARY KEY (principal, role)
);

-- Append-only audit trail of effective grants and revocations.
CREATE TABLE IF NOT EXISTS role_events (
    event_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    principal   TEXT NOT NULL,
    role        TEXT NOT NULL,
    action      TEXT NOT NULL CHECK (action IN ('granted', 'revoked')),
    actor       TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

-- Attachments are append-only; attachment_id order is insertion order.
CREATE TABLE IF NOT EXISTS attachments (
    attachment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id      INTEGER NOT NULL REFERENCES alerts(alert_id),
    kind          TEXT    NOT NULL,
    content_hash  TEXT    NOT NULL,
    added_by      TEXT    NOT NULL,
    appended_at   TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS attachments_alert_idx ON attachments(alert_id, attachment_id);
CREATE INDEX IF NOT EXISTS role_events_principal_idx ON role_events(principal);

-- Only alerts.status may ever change. Nothing is ever deleted.
CREATE TRIGGER IF NOT EXISTS alerts_body_immutable
BEFORE UPDATE OF alert_id, title, location, alert_type, content_ref, issuer,
                 created_at, latitude, longitude ON alerts
BEGIN
    SELECT RAISE(ABORT, 'alert body is immutable');
END;

CREATE TRIGGER IF NOT EXISTS alerts_status_terminal
BEFORE UPDATE OF status ON alerts
WHEN OLD.status <> 'active' OR NEW.status = 'active'
BEGIN
    SELECT RAISE(ABORT, 'status may only leave active');
END;

CREATE TRIGGER IF NOT EXISTS alerts_no_delete
BEFORE DELETE ON alerts
BEGIN
    SELECT RAISE(ABORT, 'alerts are never deleted');
END;

CREATE TRIGGER IF NOT EXISTS qr_codes_immutable
BEFORE UPDATE ON qr_codes
BEGIN
    SELECT RAISE(ABORT, 'qr tokens are immutable');
END;

CREATE TRIGGER IF NOT EXISTS qr_codes_no_delete
BEFORE DELETE ON qr_codes
BEGIN
    SELECT RAISE(ABORT, 'qr tokens are never deleted');
END;

CREATE TRIGGER IF NOT EXISTS attachments_immutable
BEFORE UPDATE ON attachments
BEGIN
    SELECT RAISE(ABORT, 'attachments are append-only');
END;

CREATE TRIGGER IF NOT EXISTS attachments_no_delete
BEFORE DELETE ON attachments
BEGIN
    SELECT RAISE(ABORT, 'attachments are append-only');
END;

CREATE TRIGGER IF NOT EXISTS role_events_append_only
BEFORE UPDATE ON role_events
BEGIN
    SELECT RAISE(ABORT, 'role events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS role_events_no_delete
BEFORE DELETE ON role_events
BEGIN
    SELECT RAISE(ABORT, 'role events are append-only');
END;

PRAGMA user_version = 1;
";

/// `registry_meta` key under which the hex-encoded qr salt is stored.
pub const SALT_KEY: &str = "qr_salt";
