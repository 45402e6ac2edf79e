use quarry::prelude::*;

use crate::common::{USERS, schema, setup_db, setup_db_with};

#[test]
fn exec_then_find() {
    let db = setup_db();
    let result = db
        .exec(raw!(
            "UPDATE users SET last_name = ? WHERE last_name IN (?)",
            "Human",
            vec!["Dent", "Macmillan"]
        ))
        .unwrap();
    assert_eq!(result.rows_affected, 2);

    let humans = db
        .find(Query::model("User").r#where([("last_name", "Human")]).order("id"))
        .unwrap();
    let names: Vec<String> = humans.iter().map(|u| u.get("user_name").unwrap()).collect();
    assert_eq!(names, ["adent", "tmacmillan"]);
}

#[test]
fn exec_accepts_row_returning_statements() {
    let db = setup_db();
    let result = db.exec("SELECT * FROM users").unwrap();
    assert_eq!(result.last_insert_id, None);
    // The connection is still usable afterwards.
    assert_eq!(db.count(Query::model("User")).unwrap(), USERS.len() as i64);
}

#[test]
fn create_assigns_primary_key() {
    let db = setup_db();
    let user = db
        .create(Record::new("User").set("user_name", "lprosser").set("first_name", "Lou"))
        .unwrap();
    assert_eq!(user.get::<i64>("id").unwrap(), USERS.len() as i64 + 1);

    let calendar = db
        .create(Record::new("Calendar").set("user_id", user.get::<i64>("id").unwrap()))
        .unwrap();
    assert!(calendar.is_set("id"));
}

#[test]
fn save_updates_by_primary_key() {
    let db = setup_db();
    let mut arthur = db
        .first(Query::model("User").r#where([("user_name", "adent")]))
        .unwrap();
    arthur.insert("first_name", "Art");
    db.save(arthur).unwrap();
    assert!(db.backend().statements().last().unwrap().starts_with("UPDATE"));

    let stored = db.first(Query::model("User").r#where([("id", 1)])).unwrap();
    assert_eq!(stored.get::<String>("first_name").unwrap(), "Art");
    assert_eq!(stored.get::<String>("last_name").unwrap(), "Dent");
    assert_eq!(db.count(Query::model("User")).unwrap(), USERS.len() as i64);
}

#[test]
fn save_without_key_inserts() {
    let db = setup_db();
    let saved = db
        .save(Record::new("User").set("user_name", "lprosser"))
        .unwrap();
    assert!(saved.is_set("id"));
    assert_eq!(db.count(Query::model("User")).unwrap(), USERS.len() as i64 + 1);
}

#[test]
fn placeholder_mismatch_is_a_statement_error() {
    let db = setup_db();
    let err = db
        .find(Query::model("User").r#where(raw!("first_name = ? and last_name = ?", "Ford")))
        .unwrap_err();
    assert!(matches!(err, QuarryError::Statement(_)));

    let err = db.exec(raw!("DELETE FROM users", 1)).unwrap_err();
    assert!(matches!(err, QuarryError::Statement(_)));
    assert_eq!(db.backend().queries() + db.backend().executes(), 0);
}

#[test]
fn backend_errors_are_wrapped() {
    let db = setup_db();
    let err = db.exec("SELEKT 1").unwrap_err();
    assert!(matches!(err, QuarryError::Backend(_)));
}

#[test]
fn strict_columns_rejects_unmapped_columns() {
    let query = || {
        Query::model("User")
            .joins("inner join calendars on calendars.user_id = users.id")
            .select_raw("users.user_name, calendars.name")
    };

    // Lenient by default: unmatched columns are dropped.
    let db = setup_db();
    let users = db.find(query()).unwrap();
    assert_eq!(users.len(), USERS.len());
    assert!(!users[0].is_set("name"));

    let strict = setup_db_with(Config {
        strict_columns: true,
        ..Config::default()
    });
    let err = strict.find(query()).unwrap_err();
    assert!(matches!(err, QuarryError::Mapping(_)));
}

#[test]
fn config_from_toml() {
    let config = Config::from_toml_str("strict_columns = true").unwrap();
    assert!(config.strict_columns);
    assert!(!config.debug);

    let err = Config::from_toml_str("debug = \"loud\"").unwrap_err();
    assert!(matches!(err, QuarryError::Config(_)));
}

#[test]
fn conflicting_registration_is_rejected() {
    let mut db = setup_db();
    // An identical definition is accepted again.
    db.register(schema::user()).unwrap();

    let err = db
        .register(schema::user().field("nickname"))
        .unwrap_err();
    assert!(matches!(err, QuarryError::SchemaConflict(_)));
    // The registry is unchanged and still usable.
    assert_eq!(db.count(Query::model("User")).unwrap(), USERS.len() as i64);
}
