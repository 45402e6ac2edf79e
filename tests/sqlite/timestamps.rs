use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use quarry::prelude::*;

use crate::common::{USERS, setup_db};

fn long_ago() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("1979-07-02 08:00", "%Y-%m-%d %H:%M").unwrap()
}

fn user_names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get::<String>("user_name").unwrap())
        .collect()
}

#[test]
fn create_stamps_both_timestamps() {
    let db = setup_db();
    let user = db
        .create(Record::new("User").set("user_name", "lprosser"))
        .unwrap();
    let created: DateTime<Utc> = user.get("created_at").unwrap();
    let updated: DateTime<Utc> = user.get("updated_at").unwrap();
    assert_eq!(created, updated);
    assert!(created <= Utc::now());
    assert_eq!(user.value("deleted_at"), None);

    let stored = db
        .first(Query::model("User").r#where([("user_name", "lprosser")]))
        .unwrap();
    assert_eq!(stored.value("created_at"), user.value("created_at"));
    assert_eq!(stored.value("deleted_at"), Some(&Value::Null));
}

#[test]
fn explicit_created_at_is_kept() {
    let db = setup_db();
    let user = db
        .create(
            Record::new("User")
                .set("user_name", "lprosser")
                .set("created_at", long_ago()),
        )
        .unwrap();
    assert_eq!(user.get::<NaiveDateTime>("created_at").unwrap(), long_ago());
    assert!(user.get::<NaiveDateTime>("updated_at").unwrap() > long_ago());
}

#[test]
fn save_refreshes_updated_at_only() {
    let db = setup_db();
    let mut arthur = db
        .first(Query::model("User").r#where([("user_name", "adent")]))
        .unwrap();
    let created = arthur.value("created_at").cloned();
    arthur.insert("updated_at", long_ago());
    let saved = db.save(arthur).unwrap();
    assert!(saved.get::<NaiveDateTime>("updated_at").unwrap() > long_ago());

    let stored = db.first(Query::model("User").r#where([("id", 1)])).unwrap();
    assert_eq!(stored.value("created_at").cloned(), created);
    assert_eq!(stored.value("updated_at"), saved.value("updated_at"));
}

#[test]
fn created_before_and_between() {
    let db = setup_db();
    let now = Utc::now();
    let month_ago = now - Duration::days(30);
    db.exec(raw!(
        "UPDATE users SET created_at = ? WHERE user_name = ?",
        now - Duration::days(90),
        "mrobot"
    ))
    .unwrap();

    let before_now = db
        .count(Query::model("User").r#where(raw!("created_at < ?", now)))
        .unwrap();
    assert_eq!(before_now, USERS.len() as i64);

    let recent = db
        .find(
            Query::model("User")
                .r#where(raw!("created_at BETWEEN ? AND ?", month_ago, now))
                .order("id"),
        )
        .unwrap();
    assert_eq!(
        user_names(&recent),
        ["adent", "fprefect", "tmacmillan", "zbeeblebrox"]
    );

    let older = db
        .find(Query::model("User").r#where(raw!("created_at < ?", month_ago)))
        .unwrap();
    assert_eq!(user_names(&older), ["mrobot"]);
}

#[test]
fn delete_hides_rows_until_unscoped() {
    let db = setup_db();
    let marvin = || Query::model("User").r#where([("user_name", "mrobot")]);
    let found = db.first(marvin()).unwrap();
    assert_eq!(db.delete(&found).unwrap(), 1);

    assert!(db.first(marvin()).unwrap_err().is_not_found());
    assert_eq!(db.count(Query::model("User")).unwrap(), USERS.len() as i64 - 1);

    let ghost = db.first(marvin().unscoped()).unwrap();
    let deleted_at: Option<DateTime<Utc>> = ghost.get("deleted_at").unwrap();
    assert!(deleted_at.is_some());
    assert_eq!(
        db.count(Query::model("User").unscoped()).unwrap(),
        USERS.len() as i64
    );
}

#[test]
fn preload_skips_deleted_children() {
    let db = setup_db();
    let drink = db
        .first(Query::model("Appointment").r#where([("subject", "Get a Drink at Local Pub")]))
        .unwrap();
    db.delete(&drink).unwrap();

    let ford = db
        .first(
            Query::model("User")
                .r#where([("user_name", "fprefect")])
                .preload("calendar.appointments"),
        )
        .unwrap();
    let appointments = ford.one("calendar").unwrap().many("appointments");
    assert_eq!(appointments.len(), 4);
    assert!(appointments.iter().all(|a| a.get::<i64>("id").unwrap() != 2));
}

#[test]
fn purge_removes_the_row() {
    let db = setup_db();
    let user = db
        .create(Record::new("User").set("user_name", "lprosser"))
        .unwrap();
    assert_eq!(db.purge(&user).unwrap(), 1);
    assert!(db.backend().statements().last().unwrap().starts_with("DELETE"));
    assert_eq!(
        db.count(Query::model("User").unscoped()).unwrap(),
        USERS.len() as i64
    );
}

#[test]
fn delete_needs_a_primary_key() {
    let db = setup_db();
    let err = db
        .delete(&Record::new("User").set("user_name", "adent"))
        .unwrap_err();
    assert!(matches!(err, QuarryError::Mapping(_)));
    assert_eq!(db.backend().executes(), 0);
}
