//! Integration tests for `SqliteStore` against an in-memory database.

use beacon_core::{
  ErrorKind,
  alert::{AlertId, AlertStatus, AlertType, NewAlert},
  attachment::NewAttachment,
  clock::FixedClock,
  principal::Principal,
  qr::QrToken,
  role::{Role, RoleAction},
  store::{AlertRegistry, RegistryPolicy, StoreError},
};
use chrono::{TimeZone, Utc};

use crate::{SqliteStore, encode::decode_salt, schema::SALT_KEY};

fn p(s: &str) -> Principal { Principal::new(s).unwrap() }

fn admin() -> Principal { p("admin") }

fn authority() -> Principal { p("authority-a") }

fn outsider() -> Principal { p("citizen-b") }

fn kind_of(err: &crate::Error) -> Option<ErrorKind> { err.registry_error().map(|e| e.kind()) }

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
    .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
  assert!(s.initialize(admin()).await.unwrap());
  s.grant_role(admin(), authority(), Role::Authority).await.unwrap();
  s
}

fn new_alert(title: &str) -> NewAlert {
  NewAlert {
    title:       title.into(),
    location:    "Test Location".into(),
    alert_type:  AlertType::Emergency,
    content_ref: "QmTestIPFSHash".into(),
    latitude:    40_123_456,
    longitude:   -74_123_456,
  }
}

// ─── Bootstrap and roles ─────────────────────────────────────────────────────

#[tokio::test]
async fn initialize_only_grants_the_first_admin() {
  let s = store().await;
  assert!(!s.initialize(p("usurper")).await.unwrap());
  assert!(!s.has_role(p("usurper"), Role::Admin).await.unwrap());
  assert!(s.has_role(admin(), Role::Admin).await.unwrap());
}

#[tokio::test]
async fn non_admin_cannot_grant_or_revoke() {
  let s = store().await;

  let err = s.grant_role(authority(), outsider(), Role::Authority).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Unauthorized));
  assert!(!s.has_role(outsider(), Role::Authority).await.unwrap());

  let err = s.revoke_role(outsider(), authority(), Role::Authority).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Unauthorized));
  assert!(s.has_role(authority(), Role::Authority).await.unwrap());
}

#[tokio::test]
async fn grant_and_revoke_are_idempotent() {
  let s = store().await;

  s.grant_role(admin(), authority(), Role::Authority).await.unwrap();
  s.revoke_role(admin(), outsider(), Role::Authority).await.unwrap();

  let roles = s.roles_of(authority()).await.unwrap();
  assert_eq!(roles.into_iter().collect::<Vec<_>>(), vec![Role::Authority]);

  // Only effective changes are audited: bootstrap admin + one authority grant.
  let events = s.role_events(None).await.unwrap();
  assert_eq!(events.len(), 2);
  assert_eq!(events[0].role, Role::Admin);
  assert_eq!(events[0].actor, admin());
  assert_eq!(events[1].principal, authority());
  assert_eq!(events[1].action, RoleAction::Granted);
}

#[tokio::test]
async fn role_events_filter_by_principal() {
  let s = store().await;
  s.revoke_role(admin(), authority(), Role::Authority).await.unwrap();

  let events = s.role_events(Some(authority())).await.unwrap();
  let actions: Vec<_> = events.iter().map(|e| e.action).collect();
  assert_eq!(actions, vec![RoleAction::Granted, RoleAction::Revoked]);
}

#[tokio::test]
async fn last_admin_cannot_be_revoked() {
  let s = store().await;

  let err = s.revoke_role(admin(), admin(), Role::Admin).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Validation));
  assert!(s.has_role(admin(), Role::Admin).await.unwrap());

  // With a second admin in place the first may step down.
  s.grant_role(admin(), p("deputy"), Role::Admin).await.unwrap();
  s.revoke_role(admin(), admin(), Role::Admin).await.unwrap();
  assert!(!s.has_role(admin(), Role::Admin).await.unwrap());
}

// ─── Alert creation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn authority_creates_alert_and_fields_roundtrip() {
  let s = store().await;

  let created = s.create_alert(authority(), new_alert("Test Alert")).await.unwrap();
  assert_eq!(created.alert_id, AlertId(1));
  assert_eq!(created.status, AlertStatus::Active);

  let fetched = s.get_alert_by_id(AlertId(1)).await.unwrap();
  assert_eq!(fetched.title, "Test Alert");
  assert_eq!(fetched.location, "Test Location");
  assert_eq!(fetched.alert_type, AlertType::Emergency);
  assert_eq!(fetched.content_ref, "QmTestIPFSHash");
  assert_eq!(fetched.issuer, authority());
  assert_eq!(fetched.latitude, 40_123_456);
  assert_eq!(fetched.longitude, -74_123_456);
  assert_eq!(fetched.status, AlertStatus::Active);
  assert_eq!(fetched.created_at, created.created_at);
  assert_eq!(fetched.qr_token, created.qr_token);
}

#[tokio::test]
async fn principal_without_authority_cannot_create() {
  let s = store().await;

  for caller in [outsider(), admin()] {
    let err = s.create_alert(caller, new_alert("Nope")).await.unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::Unauthorized));
  }
  assert_eq!(s.alert_count().await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_input_persists_nothing() {
  let s = store().await;

  let mut blank = new_alert("  ");
  let err = s.create_alert(authority(), blank.clone()).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Validation));

  blank.title = "Flood".into();
  blank.location = String::new();
  let err = s.create_alert(authority(), blank).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Validation));

  assert_eq!(s.alert_count().await.unwrap(), 0);

  // A rejected call must not consume an id.
  let ok = s.create_alert(authority(), new_alert("First")).await.unwrap();
  assert_eq!(ok.alert_id, AlertId(1));
}

#[tokio::test]
async fn ids_are_sequential() {
  let s = store().await;
  for n in 1..=5u64 {
    let a = s.create_alert(authority(), new_alert(&format!("Alert {n}"))).await.unwrap();
    assert_eq!(a.alert_id, AlertId(n));
  }
  assert_eq!(s.alert_count().await.unwrap(), 5);
}

#[tokio::test]
async fn concurrent_creates_never_collide() {
  let s = store().await;

  let handles: Vec<_> = (0..20)
    .map(|i| {
      let s = s.clone();
      tokio::spawn(async move { s.create_alert(authority(), new_alert(&format!("c{i}"))).await })
    })
    .collect();

  let mut ids = Vec::new();
  for h in handles {
    ids.push(h.await.unwrap().unwrap().alert_id.get());
  }
  ids.sort_unstable();
  assert_eq!(ids, (1..=20).collect::<Vec<_>>());
}

#[tokio::test]
async fn revoked_authority_keeps_existing_alerts() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("Before")).await.unwrap();

  s.revoke_role(admin(), authority(), Role::Authority).await.unwrap();

  let err = s.create_alert(authority(), new_alert("After")).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Unauthorized));

  let kept = s.get_alert_by_id(a.alert_id).await.unwrap();
  assert_eq!(kept.issuer, authority());
  assert_eq!(kept.title, "Before");
}

#[tokio::test]
async fn unknown_alert_is_not_found() {
  let s = store().await;
  let err = s.get_alert_by_id(AlertId(99)).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));

  let err = s.get_alert_by_id(AlertId(u64::MAX)).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_alerts_returns_contiguous_slice() {
  let s = store().await;
  for i in 0..5 {
    s.create_alert(authority(), new_alert(&format!("Test Alert {i}"))).await.unwrap();
  }

  let page = s.get_alerts(1, 3).await.unwrap();
  let titles: Vec<_> = page.iter().map(|a| a.title.as_str()).collect();
  assert_eq!(titles, ["Test Alert 1", "Test Alert 2", "Test Alert 3"]);

  let tail = s.get_alerts(3, 10).await.unwrap();
  assert_eq!(tail.len(), 2);
  assert_eq!(tail[0].alert_id, AlertId(4));

  assert!(s.get_alerts(5, 3).await.unwrap().is_empty());
  assert!(s.get_alerts(usize::MAX, usize::MAX).await.unwrap().is_empty());
  assert!(s.get_alerts(0, 0).await.unwrap().is_empty());
}

// ─── Status lifecycle ────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_then_second_change_is_rejected() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("Test Alert")).await.unwrap();

  s.change_alert_status(authority(), a.alert_id, AlertStatus::Resolved).await.unwrap();
  let after = s.get_alert_by_id(a.alert_id).await.unwrap();
  assert_eq!(after.status, AlertStatus::Resolved);
  assert_eq!(after.title, a.title);
  assert_eq!(after.created_at, a.created_at);

  let err = s
    .change_alert_status(authority(), a.alert_id, AlertStatus::Resolved)
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::InvalidTransition));

  let err = s
    .change_alert_status(authority(), a.alert_id, AlertStatus::Expired)
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::InvalidTransition));
}

#[tokio::test]
async fn admin_may_expire_but_outsider_may_not() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("Heat")).await.unwrap();

  let err = s
    .change_alert_status(outsider(), a.alert_id, AlertStatus::Expired)
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Unauthorized));

  s.change_alert_status(admin(), a.alert_id, AlertStatus::Expired).await.unwrap();
  assert_eq!(s.get_alert_by_id(a.alert_id).await.unwrap().status, AlertStatus::Expired);
}

#[tokio::test]
async fn status_cannot_be_set_back_to_active() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("Storm")).await.unwrap();
  let err = s
    .change_alert_status(authority(), a.alert_id, AlertStatus::Active)
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::InvalidTransition));
}

#[tokio::test]
async fn status_change_on_unknown_alert_is_not_found() {
  let s = store().await;
  let err = s
    .change_alert_status(authority(), AlertId(3), AlertStatus::Resolved)
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
}

// ─── QR index ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn qr_token_resolves_to_its_alert() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("One")).await.unwrap();
  let b = s.create_alert(authority(), new_alert("Two")).await.unwrap();
  assert_ne!(a.qr_token, b.qr_token);

  assert_eq!(s.get_alert_id_by_qr_code(a.qr_token.clone()).await.unwrap(), a.alert_id);
  assert_eq!(s.get_qr_code_by_alert_id(b.alert_id).await.unwrap(), b.qr_token);

  let err = s
    .get_alert_id_by_qr_code(QrToken::new("0123456789abcdef0123456789abcdef"))
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn second_token_for_an_alert_is_already_bound() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("One")).await.unwrap();

  let err = s.generate_qr_code(a.alert_id).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::AlreadyBound));
  assert_eq!(s.get_qr_code_by_alert_id(a.alert_id).await.unwrap(), a.qr_token);

  let err = s.generate_qr_code(AlertId(42)).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn attachments_keep_insertion_order() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("Quake")).await.unwrap();
  assert!(s.get_attachments(a.alert_id).await.unwrap().is_empty());

  s.add_attachment(authority(), a.alert_id, NewAttachment::new("image", "QmImageHash"))
    .await
    .unwrap();
  s.add_attachment(outsider(), a.alert_id, NewAttachment::new("document", "QmDocHash"))
    .await
    .unwrap();
  s.add_attachment(authority(), a.alert_id, NewAttachment::new("image", "QmSecondImage"))
    .await
    .unwrap();

  let got = s.get_attachments(a.alert_id).await.unwrap();
  let pairs: Vec<_> = got.iter().map(|x| (x.kind.as_str(), x.content_hash.as_str())).collect();
  assert_eq!(
    pairs,
    [("image", "QmImageHash"), ("document", "QmDocHash"), ("image", "QmSecondImage")]
  );
  assert_eq!(got[1].added_by, outsider());
}

#[tokio::test]
async fn attachment_on_unknown_alert_is_not_found() {
  let s = store().await;
  let err = s
    .add_attachment(authority(), AlertId(8), NewAttachment::new("image", "QmImageHash"))
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));

  let err = s.get_attachments(AlertId(8)).await.unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn empty_attachment_fields_are_rejected() {
  let s = store().await;
  let a = s.create_alert(authority(), new_alert("Fire")).await.unwrap();

  let err = s
    .add_attachment(authority(), a.alert_id, NewAttachment::new("image", ""))
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Validation));
  assert!(s.get_attachments(a.alert_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn restricted_policy_requires_a_role() {
  let s = store()
    .await
    .with_policy(RegistryPolicy { restrict_attachments: true });
  assert!(s.policy().restrict_attachments);
  let a = s.create_alert(authority(), new_alert("Gas leak")).await.unwrap();

  let err = s
    .add_attachment(outsider(), a.alert_id, NewAttachment::new("image", "QmImageHash"))
    .await
    .unwrap_err();
  assert_eq!(kind_of(&err), Some(ErrorKind::Unauthorized));

  s.add_attachment(admin(), a.alert_id, NewAttachment::new("image", "QmImageHash"))
    .await
    .unwrap();
  assert_eq!(s.get_attachments(a.alert_id).await.unwrap().len(), 1);
}

// ─── Persistence ─────────────────────────────────────────────────────────────

fn stored_salt(path: &std::path::Path) -> String {
  rusqlite::Connection::open(path)
    .unwrap()
    .query_row("SELECT value FROM registry_meta WHERE key = ?1", [SALT_KEY], |r| r.get(0))
    .unwrap()
}

#[tokio::test]
async fn reopening_keeps_state_and_salt() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("beacon.sqlite");

  let token = {
    let s = SqliteStore::open(&path).await.unwrap();
    s.initialize(admin()).await.unwrap();
    s.grant_role(admin(), authority(), Role::Authority).await.unwrap();
    s.create_alert(authority(), new_alert("Persisted")).await.unwrap().qr_token
  };
  let salt_before = stored_salt(&path);

  let s = SqliteStore::open(&path).await.unwrap();
  assert!(!s.initialize(p("someone-else")).await.unwrap());
  assert_eq!(s.get_alert_id_by_qr_code(token.clone()).await.unwrap(), AlertId(1));
  assert_eq!(stored_salt(&path), salt_before);

  let salt = decode_salt(&salt_before).unwrap();
  assert_eq!(token, QrToken::mint(&salt, AlertId(1)));

  let next = s.create_alert(authority(), new_alert("Second")).await.unwrap();
  assert_eq!(next.alert_id, AlertId(2));
  assert_eq!(next.qr_token, QrToken::mint(&salt, AlertId(2)));
}

#[tokio::test]
async fn history_tables_refuse_raw_deletes() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("beacon.sqlite");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.initialize(admin()).await.unwrap();
    s.grant_role(admin(), authority(), Role::Authority).await.unwrap();
    let a = s.create_alert(authority(), new_alert("Kept")).await.unwrap();
    s.add_attachment(authority(), a.alert_id, NewAttachment::new("image", "QmImageHash"))
      .await
      .unwrap();
  }

  let conn = rusqlite::Connection::open(&path).unwrap();
  for table in ["role_events", "alerts", "qr_codes", "attachments"] {
    let err = conn.execute(&format!("DELETE FROM {table}"), []).unwrap_err();
    assert!(err.to_string().contains("never deleted") || err.to_string().contains("append-only"));
  }
  let events: i64 =
    conn.query_row("SELECT COUNT(*) FROM role_events", [], |r| r.get(0)).unwrap();
  assert_eq!(events, 2);
  assert!(conn.execute("UPDATE role_events SET actor = 'x'", []).is_err());
}
