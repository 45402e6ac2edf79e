use quarry::prelude::*;

use crate::common::{USERS, setup_db};

fn user_names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get::<String>("user_name").unwrap())
        .collect()
}

fn user(db: &crate::common::Db, user_name: &str) -> Record {
    db.first(Query::model("User").r#where([("user_name", user_name)]))
        .unwrap()
}

#[test]
fn save_writes_the_attached_graph() {
    let db = setup_db();
    let ford = user(&db, "fprefect");
    let lou = db
        .save(
            Record::new("User")
                .set("user_name", "lprosser")
                .set("first_name", "Lou")
                .with_one(
                    "calendar",
                    Record::new("Calendar").set("name", "Bulldozer").with_many(
                        "appointments",
                        vec![
                            Record::new("Appointment")
                                .set("subject", "Lie in front of house")
                                .set("length", 120)
                                .with_many("attendees", vec![ford]),
                        ],
                    ),
                ),
        )
        .unwrap();
    // user, calendar, appointment and one link row
    assert_eq!(db.backend().executes(), 4);

    let user_id: i64 = lou.get("id").unwrap();
    assert_eq!(user_id, USERS.len() as i64 + 1);
    let calendar = lou.one("calendar").unwrap();
    assert_eq!(calendar.get::<i64>("user_id").unwrap(), user_id);
    let appointment = &calendar.many("appointments")[0];
    assert_eq!(
        appointment.get::<i64>("calendar_id").unwrap(),
        calendar.get::<i64>("id").unwrap()
    );

    let stored = db
        .first(
            Query::model("User")
                .r#where([("id", user_id)])
                .preload("calendar.appointments.attendees"),
        )
        .unwrap();
    let appointments = stored.one("calendar").unwrap().many("appointments");
    assert_eq!(appointments.len(), 1);
    assert_eq!(user_names(appointments[0].many("attendees")), ["fprefect"]);
}

#[test]
fn saving_again_does_not_duplicate_links() {
    let db = setup_db();
    let drink = || Query::model("Appointment").r#where([("subject", "Get a Drink at Local Pub")]);
    let loaded = db.first(drink().preload("attendees")).unwrap();
    assert_eq!(user_names(loaded.many("attendees")), ["adent"]);

    let attended = loaded.with_many(
        "attendees",
        vec![user(&db, "adent"), user(&db, "fprefect")],
    );
    let saved = db.save(attended).unwrap();
    db.save(saved).unwrap();

    let reloaded = db.first(drink().preload("attendees")).unwrap();
    assert_eq!(user_names(reloaded.many("attendees")), ["adent", "fprefect"]);
    assert_eq!(db.count(Query::model("User")).unwrap(), USERS.len() as i64);
}

#[test]
fn belongs_to_parent_is_written_first() {
    let db = setup_db();
    let calendar = db
        .create(
            Record::new("Calendar")
                .set("name", "Guide")
                .with_one("owner", Record::new("User").set("user_name", "eddie")),
        )
        .unwrap();
    let owner_id: i64 = calendar.one("owner").unwrap().get("id").unwrap();
    assert_eq!(owner_id, USERS.len() as i64 + 1);
    assert_eq!(calendar.get::<i64>("user_id").unwrap(), owner_id);

    let stored = db
        .first(
            Query::model("Calendar")
                .r#where([("name", "Guide")])
                .preload("owner"),
        )
        .unwrap();
    assert_eq!(
        stored.one("owner").unwrap().get::<String>("user_name").unwrap(),
        "eddie"
    );

    // A parent that already has a key is only referenced.
    let arthur = user(&db, "adent");
    db.backend().reset();
    let spare = db
        .create(Record::new("Calendar").set("name", "Spare").with_one("owner", arthur))
        .unwrap();
    assert_eq!(spare.get::<i64>("user_id").unwrap(), 1);
    assert_eq!(db.backend().executes(), 1);
}

#[test]
fn existing_children_are_reparented() {
    let db = setup_db();
    let subject = "Explore Planet Builder's HomeWorld";
    let planet = db
        .first(Query::model("Appointment").r#where([("subject", subject)]))
        .unwrap();
    let tricia = db
        .first(Query::model("Calendar").r#where([("user_id", 3)]))
        .unwrap();
    let tricia = db
        .save(tricia.with_many("appointments", vec![planet]))
        .unwrap();

    let moved = db
        .first(Query::model("Appointment").r#where([("subject", subject)]))
        .unwrap();
    assert_eq!(
        moved.get::<i64>("calendar_id").unwrap(),
        tricia.get::<i64>("id").unwrap()
    );
    assert_eq!(db.count(Query::model("Appointment")).unwrap(), 7);
}

#[test]
fn attached_records_are_checked_before_writing() {
    let db = setup_db();
    let err = db
        .create(
            Record::new("User")
                .set("user_name", "lprosser")
                .with_one("calendar", Record::new("Appointment")),
        )
        .unwrap_err();
    assert!(matches!(err, QuarryError::Mapping(_)));

    let err = db
        .create(
            Record::new("User")
                .set("user_name", "lprosser")
                .with_many("towels", Vec::new()),
        )
        .unwrap_err();
    assert!(matches!(err, QuarryError::UnknownRelation { .. }));
    assert_eq!(db.backend().executes(), 0);
}
