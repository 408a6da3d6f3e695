//! [`SqliteStore`]: the SQLite implementation of [`AlertRegistry`].

use std::{collections::BTreeSet, path::Path, sync::Arc};

use beacon_core::{
  alert::{Alert, AlertId, AlertStatus, NewAlert},
  attachment::{Attachment, NewAttachment},
  clock::{Clock, SystemClock},
  principal::Principal,
  qr::{QrToken, SALT_BYTES},
  role::{self, Role, RoleAction, RoleEvent},
  store::{AlertRegistry, RegistryPolicy},
};
use rand_core::{OsRng, RngCore as _};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  Error, Result,
  encode::{
    ALERT_SELECT, RawAlert, RawAttachment, RawRoleEvent, alert_exists, decode_alert_id,
    decode_salt, encode_alert_id, encode_dt, held_roles, parse_column,
  },
  schema::{SALT_KEY, SCHEMA},
};

/// What a connection closure hands back: either the committed value or the
/// registry rejection that caused the transaction to roll back.
type Outcome<T> = std::result::Result<T, beacon_core::Error>;

/// Convert a closure outcome into a store result, logging rejections.
fn settle<T>(op: &'static str, outcome: Outcome<T>) -> Result<T> {
  outcome.map_err(|e| {
    tracing::debug!(op, error = %e, "registry call rejected");
    Error::Registry(e)
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Beacon registry backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  salt:   Arc<[u8; SALT_BYTES]>,
  clock:  Arc<dyn Clock>,
  policy: RegistryPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the clock used to stamp alerts, attachments and role events.
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  pub fn with_policy(mut self, policy: RegistryPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn policy(&self) -> RegistryPolicy { self.policy }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let mut fresh = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut fresh);
    let fresh_hex = hex::encode(fresh);

    // First open wins; later opens read back the stored salt.
    let stored: String = conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
          "INSERT OR IGNORE INTO registry_meta (key, value) VALUES (?1, ?2)",
          rusqlite::params![SALT_KEY, fresh_hex],
        )?;
        Ok(conn.query_row(
          "SELECT value FROM registry_meta WHERE key = ?1",
          [SALT_KEY],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(Self {
      conn,
      salt: Arc::new(decode_salt(&stored)?),
      clock: Arc::new(SystemClock),
      policy: RegistryPolicy::default(),
    })
  }
}

/// Bind the token for `id` inside an open transaction.
fn bind_token(
  tx: &rusqlite::Transaction<'_>,
  salt: &[u8],
  id: AlertId,
  raw_id: i64,
) -> rusqlite::Result<Outcome<QrToken>> {
  let existing: Option<String> = tx
    .query_row("SELECT token FROM qr_codes WHERE alert_id = ?1", [raw_id], |r| r.get(0))
    .optional()?;
  if existing.is_some() {
    return Ok(Err(beacon_core::Error::AlreadyBound(id)));
  }

  let token = QrToken::mint(salt, id);
  tx.execute(
    "INSERT INTO qr_codes (token, alert_id) VALUES (?1, ?2)",
    rusqlite::params![token.as_str(), raw_id],
  )?;
  Ok(Ok(token))
}

fn record_role_event(
  tx: &rusqlite::Transaction<'_>,
  principal: &Principal,
  role: Role,
  action: RoleAction,
  actor: &Principal,
  at: &str,
) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO role_events (principal, role, action, actor, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![principal.as_str(), role.as_ref(), action.as_ref(), actor.as_str(), at],
  )?;
  Ok(())
}

// ─── AlertRegistry impl ──────────────────────────────────────────────────────

impl AlertRegistry for SqliteStore {
  type Error = Error;

  // ── Bootstrap ─────────────────────────────────────────────────────────────

  async fn initialize(&self, admin: Principal) -> Result<bool> {
    let at = encode_dt(self.clock.now());
    let who = admin.clone();

    let granted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let admins: i64 = tx.query_row(
          "SELECT COUNT(*) FROM roles WHERE role = ?1",
          [Role::Admin.as_ref()],
          |r| r.get(0),
        )?;
        if admins > 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO roles (principal, role) VALUES (?1, ?2)",
          rusqlite::params![who.as_str(), Role::Admin.as_ref()],
        )?;
        record_role_event(&tx, &who, Role::Admin, RoleAction::Granted, &who, &at)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if granted {
      tracing::info!(admin = %admin, "registry initialised");
    }
    Ok(granted)
  }

  // ── Access control ────────────────────────────────────────────────────────

  async fn grant_role(&self, caller: Principal, principal: Principal, role: Role) -> Result<()> {
    let at = encode_dt(self.clock.now());
    let target = principal.clone();

    let outcome: Outcome<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let held = held_roles(&tx, &caller)?;
        if let Err(e) = role::authorize(&caller, &held, role::MANAGE_ROLES, "grant roles") {
          return Ok(Err(e));
        }

        let changed = tx.execute(
          "INSERT OR IGNORE INTO roles (principal, role) VALUES (?1, ?2)",
          rusqlite::params![target.as_str(), role.as_ref()],
        )?;
        if changed > 0 {
          record_role_event(&tx, &target, role, RoleAction::Granted, &caller, &at)?;
        }
        tx.commit()?;
        Ok(Ok(changed > 0))
      })
      .await?;

    if settle("grant_role", outcome)? {
      tracing::info!(principal = %principal, role = %role, "role granted");
    }
    Ok(())
  }

  async fn revoke_role(&self, caller: Principal, principal: Principal, role: Role) -> Result<()> {
    let at = encode_dt(self.clock.now());
    let target = principal.clone();

    let outcome: Outcome<bool> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let held = held_roles(&tx, &caller)?;
        if let Err(e) = role::authorize(&caller, &held, role::MANAGE_ROLES, "revoke roles") {
          return Ok(Err(e));
        }

        if role == Role::Admin && held_roles(&tx, &target)?.contains(&Role::Admin) {
          let admins: i64 = tx.query_row(
            "SELECT COUNT(*) FROM roles WHERE role = ?1",
            [Role::Admin.as_ref()],
            |r| r.get(0),
          )?;
          if admins <= 1 {
            return Ok(Err(beacon_core::ValidationError::LastAdmin(target).into()));
          }
        }

        let changed = tx.execute(
          "DELETE FROM roles WHERE principal = ?1 AND role = ?2",
          rusqlite::params![target.as_str(), role.as_ref()],
        )?;
        if changed > 0 {
          record_role_event(&tx, &target, role, RoleAction::Revoked, &caller, &at)?;
        }
        tx.commit()?;
        Ok(Ok(changed > 0))
      })
      .await?;

    if settle("revoke_role", outcome)? {
      tracing::info!(principal = %principal, role = %role, "role revoked");
    }
    Ok(())
  }

  async fn has_role(&self, principal: Principal, role: Role) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE principal = ?1 AND role = ?2)",
            rusqlite::params![principal.as_str(), role.as_ref()],
            |r| r.get(0),
          )?)
        })
        .await?,
    )
  }

  async fn roles_of(&self, principal: Principal) -> Result<BTreeSet<Role>> {
    Ok(self.conn.call(move |conn| Ok(held_roles(conn, &principal)?)).await?)
  }

  async fn role_events(&self, principal: Option<Principal>) -> Result<Vec<RoleEvent>> {
    let raws: Vec<RawRoleEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT principal, role, action, actor, recorded_at
           FROM role_events
           WHERE ?1 IS NULL OR principal = ?1
           ORDER BY event_id",
        )?;
        let rows = stmt
          .query_map([principal.as_ref().map(Principal::as_str)], |row| {
            Ok(RawRoleEvent {
              principal:   row.get(0)?,
              role:        row.get(1)?,
              action:      row.get(2)?,
              actor:       row.get(3)?,
              recorded_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRoleEvent::into_event).collect()
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn create_alert(&self, caller: Principal, input: NewAlert) -> Result<Alert> {
    let created_at = self.clock.now();
    let at = encode_dt(created_at);
    let salt = Arc::clone(&self.salt);
    let issuer = caller.clone();
    let stored = input.clone();

    let outcome: Outcome<(AlertId, QrToken)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let held = held_roles(&tx, &issuer)?;
        if let Err(e) = role::authorize(&issuer, &held, role::CREATE_ALERT, "create alerts") {
          return Ok(Err(e));
        }
        if let Err(e) = stored.validate() {
          return Ok(Err(e.into()));
        }

        tx.execute(
          "INSERT INTO alerts (
             title, location, alert_type, status, content_ref,
             issuer, created_at, latitude, longitude
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            stored.title,
            stored.location,
            stored.alert_type.as_ref(),
            AlertStatus::Active.as_ref(),
            stored.content_ref,
            issuer.as_str(),
            at,
            stored.latitude,
            stored.longitude,
          ],
        )?;
        let raw_id = tx.last_insert_rowid();
        let id = AlertId(raw_id.unsigned_abs());

        let token = match bind_token(&tx, &salt[..], id, raw_id)? {
          Ok(token) => token,
          Err(e) => return Ok(Err(e)),
        };
        tx.commit()?;
        Ok(Ok((id, token)))
      })
      .await?;

    let (alert_id, qr_token) = settle("create_alert", outcome)?;
    tracing::info!(%alert_id, issuer = %caller, alert_type = %input.alert_type, "alert created");

    Ok(Alert {
      alert_id,
      title: input.title,
      location: input.location,
      alert_type: input.alert_type,
      status: AlertStatus::Active,
      content_ref: input.content_ref,
      issuer: caller,
      created_at,
      latitude: input.latitude,
      longitude: input.longitude,
      qr_token,
    })
  }

  async fn get_alert_by_id(&self, id: AlertId) -> Result<Alert> {
    let Some(raw_id) = encode_alert_id(id) else {
      return Err(beacon_core::Error::AlertNotFound(id).into());
    };

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{ALERT_SELECT} WHERE a.alert_id = ?1"),
              [raw_id],
              RawAlert::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or(beacon_core::Error::AlertNotFound(id))?
      .into_alert()
  }

  async fn get_alerts(&self, offset: usize, count: usize) -> Result<Vec<Alert>> {
    if count == 0 {
      return Ok(Vec::new());
    }
    let limit_val = i64::try_from(count).unwrap_or(i64::MAX);
    let offset_val = i64::try_from(offset).unwrap_or(i64::MAX);

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{ALERT_SELECT} ORDER BY a.alert_id LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val, offset_val], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  async fn alert_count(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM alerts", [], |r| r.get(0))?))
      .await?;
    Ok(n.unsigned_abs())
  }

  async fn change_alert_status(
    &self,
    caller: Principal,
    id: AlertId,
    new_status: AlertStatus,
  ) -> Result<()> {
    let raw_id = encode_alert_id(id);
    let who = caller.clone();

    let outcome: Outcome<AlertStatus> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let held = held_roles(&tx, &who)?;
        if let Err(e) = role::authorize(&who, &held, role::CHANGE_STATUS, "change alert status") {
          return Ok(Err(e));
        }

        let current: Option<String> = match raw_id {
          Some(raw_id) => tx
            .query_row("SELECT status FROM alerts WHERE alert_id = ?1", [raw_id], |r| r.get(0))
            .optional()?,
          None => None,
        };
        let (Some(raw_id), Some(current)) = (raw_id, current) else {
          return Ok(Err(beacon_core::Error::AlertNotFound(id)));
        };

        let from = parse_column(0, &current, AlertStatus::parse)?;
        let to = match from.transition(id, new_status) {
          Ok(to) => to,
          Err(e) => return Ok(Err(e)),
        };

        tx.execute(
          "UPDATE alerts SET status = ?1 WHERE alert_id = ?2",
          rusqlite::params![to.as_ref(), raw_id],
        )?;
        tx.commit()?;
        Ok(Ok(from))
      })
      .await?;

    let from = settle("change_alert_status", outcome)?;
    tracing::info!(alert_id = %id, %from, to = %new_status, by = %caller, "alert status changed");
    Ok(())
  }

  // ── QR index ──────────────────────────────────────────────────────────────

  async fn generate_qr_code(&self, alert_id: AlertId) -> Result<QrToken> {
    let Some(raw_id) = encode_alert_id(alert_id) else {
      return Err(beacon_core::Error::AlertNotFound(alert_id).into());
    };
    let salt = Arc::clone(&self.salt);

    let outcome: Outcome<QrToken> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !alert_exists(&tx, raw_id)? {
          return Ok(Err(beacon_core::Error::AlertNotFound(alert_id)));
        }
        let outcome = bind_token(&tx, &salt[..], alert_id, raw_id)?;
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;

    let token = settle("generate_qr_code", outcome)?;
    tracing::info!(%alert_id, "qr token bound");
    Ok(token)
  }

  async fn get_alert_id_by_qr_code(&self, token: QrToken) -> Result<AlertId> {
    let lookup = token.clone();
    let raw: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT alert_id FROM qr_codes WHERE token = ?1",
              [lookup.as_str()],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => decode_alert_id(raw),
      None => Err(beacon_core::Error::TokenNotFound(token).into()),
    }
  }

  async fn get_qr_code_by_alert_id(&self, alert_id: AlertId) -> Result<QrToken> {
    let Some(raw_id) = encode_alert_id(alert_id) else {
      return Err(beacon_core::Error::AlertNotFound(alert_id).into());
    };

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT token FROM qr_codes WHERE alert_id = ?1", [raw_id], |r| r.get(0))
            .optional()?,
        )
      })
      .await?;

    raw
      .map(QrToken::new)
      .ok_or_else(|| beacon_core::Error::AlertNotFound(alert_id).into())
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn add_attachment(
    &self,
    caller: Principal,
    alert_id: AlertId,
    input: NewAttachment,
  ) -> Result<Attachment> {
    let appended_at = self.clock.now();
    let at = encode_dt(appended_at);
    let raw_id = encode_alert_id(alert_id);
    let restricted = self.policy.restrict_attachments;
    let who = caller.clone();
    let stored = input.clone();

    let outcome: Outcome<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if restricted {
          let held = held_roles(&tx, &who)?;
          if let Err(e) = role::authorize(&who, &held, role::ADD_ATTACHMENT, "add attachments") {
            return Ok(Err(e));
          }
        }

        let raw_id = match raw_id {
          Some(raw_id) if alert_exists(&tx, raw_id)? => raw_id,
          _ => return Ok(Err(beacon_core::Error::AlertNotFound(alert_id))),
        };
        if let Err(e) = stored.validate() {
          return Ok(Err(e.into()));
        }

        tx.execute(
          "INSERT INTO attachments (alert_id, kind, content_hash, added_by, appended_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![raw_id, stored.kind, stored.content_hash, who.as_str(), at],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    settle("add_attachment", outcome)?;
    tracing::info!(%alert_id, kind = %input.kind, by = %caller, "attachment added");

    Ok(Attachment {
      alert_id,
      kind: input.kind,
      content_hash: input.content_hash,
      added_by: caller,
      appended_at,
    })
  }

  async fn get_attachments(&self, alert_id: AlertId) -> Result<Vec<Attachment>> {
    let Some(raw_id) = encode_alert_id(alert_id) else {
      return Err(beacon_core::Error::AlertNotFound(alert_id).into());
    };

    let raws: Option<Vec<RawAttachment>> = self
      .conn
      .call(move |conn| {
        if !alert_exists(conn, raw_id)? {
          return Ok(None);
        }
        let mut stmt = conn.prepare(
          "SELECT alert_id, kind, content_hash, added_by, appended_at
           FROM attachments
           WHERE alert_id = ?1
           ORDER BY attachment_id",
        )?;
        let rows = stmt
          .query_map([raw_id], |row| {
            Ok(RawAttachment {
              alert_id:     row.get(0)?,
              kind:         row.get(1)?,
              content_hash: row.get(2)?,
              added_by:     row.get(3)?,
              appended_at:  row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    raws
      .ok_or(beacon_core::Error::AlertNotFound(alert_id))?
      .into_iter()
      .map(RawAttachment::into_attachment)
      .collect()
  }
}
