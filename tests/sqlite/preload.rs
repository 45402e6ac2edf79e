use quarry::prelude::*;
use serde::Deserialize;

use crate::common::{USERS, setup_db};

fn subjects(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get::<String>("subject").unwrap())
        .collect()
}

#[test]
fn has_one() {
    let db = setup_db();
    let users = db
        .find(Query::model("User").preload("calendar").order("id"))
        .unwrap();
    assert_eq!(users.len(), USERS.len());
    for user in &users {
        let calendar = user.one("calendar").expect("every user has a calendar");
        assert_eq!(calendar.get::<String>("name").unwrap(), "Calendar");
        assert_eq!(
            calendar.get::<i64>("user_id").unwrap(),
            user.get::<i64>("id").unwrap()
        );
    }
}

#[test]
fn nested_path_resolves_left_to_right() {
    let db = setup_db();
    let ford = db
        .first(
            Query::model("User")
                .r#where([("user_name", "fprefect")])
                .preload("calendar.appointments"),
        )
        .unwrap();
    let calendar = ford.one("calendar").unwrap();
    assert_eq!(
        subjects(calendar.many("appointments")),
        [
            "Get a Drink at Local Pub",
            "Hitch a ride",
            "Attend Poetry Reading",
            "Get Thrown into Space",
            "Get saved from Space",
        ]
    );
}

#[test]
fn owners_without_matches_get_empty_relations() {
    let db = setup_db();
    let users = db
        .find(
            Query::model("User")
                .r#where(raw!("user_name in (?)", vec!["tmacmillan", "mrobot"]))
                .preload("calendar.appointments"),
        )
        .unwrap();
    assert_eq!(users.len(), 2);
    for user in &users {
        let calendar = user.one("calendar").unwrap();
        assert!(matches!(
            calendar.relation("appointments"),
            Some(Related::Many(a)) if a.is_empty()
        ));
    }
}

#[test]
fn many_to_many() {
    let db = setup_db();
    let appointments = db
        .find(Query::model("Appointment").preload("attendees").order("id"))
        .unwrap();
    assert_eq!(appointments.len(), 7);
    assert!(appointments[0].many("attendees").is_empty());
    for appointment in &appointments[1..] {
        let attendees = appointment.many("attendees");
        assert_eq!(attendees.len(), 1);
        assert_eq!(attendees[0].get::<String>("user_name").unwrap(), "adent");
    }
}

#[test]
fn belongs_to() {
    let db = setup_db();
    let calendars = db
        .find(Query::model("Calendar").preload("owner").order("id"))
        .unwrap();
    let owners: Vec<String> = calendars
        .iter()
        .map(|c| c.one("owner").unwrap().get("user_name").unwrap())
        .collect();
    assert_eq!(
        owners,
        ["adent", "fprefect", "tmacmillan", "zbeeblebrox", "mrobot"]
    );
}

#[test]
fn deep_path_through_many_to_many() {
    let db = setup_db();
    let zaphod = db
        .first(
            Query::model("User")
                .r#where([("user_name", "zbeeblebrox")])
                .preload("calendar.appointments.attendees.calendar"),
        )
        .unwrap();
    let appointment = &zaphod.one("calendar").unwrap().many("appointments")[0];
    let arthur = &appointment.many("attendees")[0];
    assert_eq!(arthur.get::<String>("user_name").unwrap(), "adent");
    assert_eq!(
        arthur.one("calendar").unwrap().get::<i64>("user_id").unwrap(),
        1
    );
}

#[test]
fn fetch_count_is_independent_of_owner_count() {
    let db = setup_db();

    db.find(Query::model("User").r#where([("user_name", "adent")]).preload("calendar.appointments"))
        .unwrap();
    let one_owner = db.backend().queries();
    db.backend().reset();

    db.find(Query::model("User").preload("calendar.appointments")).unwrap();
    let all_owners = db.backend().queries();
    db.backend().reset();

    // base + calendars + appointments
    assert_eq!(one_owner, 3);
    assert_eq!(all_owners, 3);

    // base + link rows + users
    db.find(Query::model("Appointment").preload("attendees")).unwrap();
    assert_eq!(db.backend().queries(), 3);
}

#[test]
fn merged_paths_load_each_relation_once() {
    let db = setup_db();
    let users = db
        .find(
            Query::model("User")
                .preload("calendar")
                .preload("calendar.appointments")
                .preload("calendar.owner"),
        )
        .unwrap();
    assert_eq!(db.backend().queries(), 4);
    let ford = users
        .iter()
        .find(|u| u.get::<String>("user_name").unwrap() == "fprefect")
        .unwrap();
    let calendar = ford.one("calendar").unwrap();
    assert_eq!(calendar.many("appointments").len(), 5);
    assert_eq!(
        calendar.one("owner").unwrap().get::<String>("user_name").unwrap(),
        "fprefect"
    );
}

#[test]
fn unknown_relation_fails_before_the_backend() {
    let db = setup_db();
    let err = db
        .find(Query::model("User").preload("calendar.meetings"))
        .unwrap_err();
    assert!(matches!(
        err,
        QuarryError::UnknownRelation { ref record, ref relation }
            if record == "Calendar" && relation == "meetings"
    ));
    assert_eq!(db.backend().queries(), 0);

    let err = db.first(Query::model("User").preload("friends")).unwrap_err();
    assert!(matches!(err, QuarryError::UnknownRelation { .. }));
}

#[test]
fn decode_preloaded_graph() {
    #[derive(Debug, Deserialize)]
    struct Appointment {
        subject: String,
        length: i64,
    }
    #[derive(Debug, Deserialize)]
    struct Calendar {
        name: String,
        appointments: Vec<Appointment>,
    }
    #[derive(Debug, Deserialize)]
    struct User {
        user_name: String,
        calendar: Option<Calendar>,
    }

    let db = setup_db();
    let arthur: User = db
        .first(Query::model("User").preload("calendar.appointments"))
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(arthur.user_name, "adent");
    let calendar = arthur.calendar.unwrap();
    assert_eq!(calendar.name, "Calendar");
    assert_eq!(calendar.appointments.len(), 1);
    assert_eq!(calendar.appointments[0].subject, "Save House");
    assert_eq!(calendar.appointments[0].length, 60);
}
