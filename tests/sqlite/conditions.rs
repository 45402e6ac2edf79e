use std::collections::{BTreeMap, HashMap};

use quarry::prelude::*;

use crate::common::setup_db;

fn user_names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get::<String>("user_name").unwrap())
        .collect()
}

#[test]
fn equality_forms_agree() {
    let db = setup_db();

    let by_fragment = db
        .find(Query::model("User").r#where(raw!("user_name = ?", "fprefect")))
        .unwrap();
    let by_record = db
        .find(Query::model("User").r#where(Record::new("User").set("user_name", "fprefect")))
        .unwrap();
    let by_hash_map = db
        .find(Query::model("User").r#where(HashMap::from([("user_name", "fprefect")])))
        .unwrap();
    let by_btree_map = db
        .find(Query::model("User").r#where(BTreeMap::from([("user_name", "fprefect")])))
        .unwrap();
    let by_pairs = db
        .find(Query::model("User").r#where([("user_name", "fprefect")]))
        .unwrap();

    assert_eq!(by_fragment.len(), 1);
    assert_eq!(by_fragment[0].get::<String>("first_name").unwrap(), "Ford");
    assert_eq!(by_fragment[0].get::<String>("last_name").unwrap(), "Prefect");
    assert_eq!(by_record, by_fragment);
    assert_eq!(by_hash_map, by_fragment);
    assert_eq!(by_btree_map, by_fragment);
    assert_eq!(by_pairs, by_fragment);
}

#[test]
fn multiple_pairs_are_anded() {
    let db = setup_db();
    let users = db
        .find(Query::model("User").r#where([("first_name", "Ford"), ("last_name", "Dent")]))
        .unwrap();
    assert!(users.is_empty());

    let users = db
        .find(Query::model("User").r#where(
            Record::new("User")
                .set("first_name", "Arthur")
                .set("last_name", "Dent"),
        ))
        .unwrap();
    assert_eq!(user_names(&users), ["adent"]);
}

#[test]
fn or_is_a_union() {
    let db = setup_db();
    let users = db
        .find(
            Query::model("User")
                .r#where(raw!("user_name = ?", "adent"))
                .or(raw!("user_name = ?", "fprefect"))
                .order("id"),
        )
        .unwrap();
    assert_eq!(user_names(&users), ["adent", "fprefect"]);

    // A record matching both sides appears once.
    let users = db
        .find(
            Query::model("User")
                .r#where([("user_name", "adent")])
                .or([("first_name", "Arthur")]),
        )
        .unwrap();
    assert_eq!(user_names(&users), ["adent"]);
}

#[test]
fn or_applies_to_everything_before_it() {
    let db = setup_db();
    // (first_name = Arthur AND last_name = Prefect) OR user_name = mrobot
    let users = db
        .find(
            Query::model("User")
                .r#where([("first_name", "Arthur")])
                .r#where([("last_name", "Prefect")])
                .or([("user_name", "mrobot")]),
        )
        .unwrap();
    assert_eq!(user_names(&users), ["mrobot"]);

    // (user_name = adent OR user_name = fprefect) AND first_name = Ford
    let users = db
        .find(
            Query::model("User")
                .r#where([("user_name", "adent")])
                .or([("user_name", "fprefect")])
                .r#where([("first_name", "Ford")]),
        )
        .unwrap();
    assert_eq!(user_names(&users), ["fprefect"]);
}

#[test]
fn not_excludes() {
    let db = setup_db();
    let users = db
        .find(Query::model("User").not(raw!("user_name = ?", "adent")).order("id"))
        .unwrap();
    assert_eq!(
        user_names(&users),
        ["fprefect", "tmacmillan", "zbeeblebrox", "mrobot"]
    );

    // NOT binds to its own operand only.
    let users = db
        .find(
            Query::model("User")
                .r#where([("user_name", "adent")])
                .or([("user_name", "fprefect")])
                .not([("first_name", "Ford")]),
        )
        .unwrap();
    assert_eq!(user_names(&users), ["adent"]);
}

#[test]
fn in_list_and_like() {
    let db = setup_db();
    let users = db
        .find(
            Query::model("User")
                .r#where(raw!("user_name in (?)", vec!["adent", "tmacmillan"]))
                .order("id"),
        )
        .unwrap();
    assert_eq!(user_names(&users), ["adent", "tmacmillan"]);

    let users = db
        .find(Query::model("User").r#where(raw!(
            "user_name like ? and first_name = ?",
            "%mac%",
            "Tricia"
        )))
        .unwrap();
    assert_eq!(user_names(&users), ["tmacmillan"]);
}

#[test]
fn empty_filters_match_everything() {
    let db = setup_db();
    let users = db
        .find(Query::model("User").r#where(Record::new("User")).r#where(""))
        .unwrap();
    assert_eq!(users.len(), 5);
}

#[test]
fn zero_values_are_still_filters() {
    let db = setup_db();
    let users = db
        .find(Query::model("User").r#where([("first_name", "")]))
        .unwrap();
    assert!(users.is_empty());
}

#[test]
fn unknown_field_fails_before_the_backend() {
    let db = setup_db();
    let err = db
        .find(Query::model("User").r#where([("nickname", "zaphod")]))
        .unwrap_err();
    assert!(matches!(err, QuarryError::UnknownField { .. }));
    assert_eq!(db.backend().queries(), 0);
}

#[test]
fn unknown_type() {
    let db = setup_db();
    let err = db.find(Query::model("Spaceship")).unwrap_err();
    assert!(matches!(err, QuarryError::UnknownType(name) if name == "Spaceship"));
}

#[test]
fn scopes_compose_canned_filters() {
    fn long_meetings(query: Query) -> Query {
        query.r#where(raw!("length > ?", 60))
    }

    let db = setup_db();
    let appointments = db.find(Query::model("Appointment").scope(long_meetings)).unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(
        appointments[0].get::<String>("subject").unwrap(),
        "Explore Planet Builder's HomeWorld"
    );

    let count = db
        .count(Query::model("Appointment").scopes([long_meetings as fn(Query) -> Query]))
        .unwrap();
    assert_eq!(count, 1);
}
