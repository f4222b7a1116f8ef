//! Patient-flow tests against a real PostgreSQL database.
//!
//! Set `TEST_DATABASE_URL` to run them; every test works inside a
//! transaction that is rolled back. Without the variable they return early.

use chrono::Duration;
use diesel::prelude::*;

use emr_clinic::db;
use emr_clinic::enums::{Department, PatientStatus, Priority, QueueStatus, ReferralStatus, Role, Sex, VisitType};
use emr_clinic::error::ApiError;
use emr_clinic::models::{NewUser, Patient, User};
use emr_clinic::schema::{doctor_queue, patients};
use emr_clinic::store;
use emr_clinic::store::patients::Registration;
use emr_clinic::store::visits::VisitForm;

fn connection() -> Option<PgConnection> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let mut conn = PgConnection::establish(&url).expect("connect to TEST_DATABASE_URL");
    db::run_migrations(&mut conn).expect("migrations");
    Some(conn)
}

fn user(conn: &mut PgConnection, username: &str, role: Role) -> User {
    store::users::insert_user(
        conn,
        &NewUser {
            full_name: username,
            username,
            password_hash: "$2b$04$not.a.real.hash",
            role,
        },
    )
    .unwrap()
}

fn patient(conn: &mut PgConnection, name: &str, card_number: &str) -> Patient {
    store::patients::register(
        conn,
        &Registration {
            full_name: name.to_string(),
            sex: Sex::Female,
            phone: String::new(),
            card_number: card_number.to_string(),
        },
    )
    .unwrap()
}

fn queue_status(conn: &mut PgConnection, queue_id: i32) -> QueueStatus {
    store::queue::find(conn, queue_id).unwrap().unwrap().status
}

fn general_visit(patient_id: i32) -> VisitForm {
    VisitForm {
        patient_id,
        visit_type: VisitType::General,
        symptoms: "Headache".into(),
        diagnosis: "Tension headache".into(),
        prescription: "Rest".into(),
    }
}

#[test]
fn start_then_complete_walks_the_queue_states() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let p = patient(conn, "Queue Walker", "T-Q01");
        let entry = store::queue::enqueue(conn, p.id, desk.id, Priority::Normal, "")?;

        assert!(store::queue::start_visit(conn, entry.id, doctor.id)?);
        let started = store::queue::find(conn, entry.id)?.unwrap();
        assert_eq!(started.status, QueueStatus::InProgress);
        assert_eq!(started.doctor_id, Some(doctor.id));
        assert!(started.started_at.is_some());

        // a second start finds nothing waiting
        assert!(!store::queue::start_visit(conn, entry.id, doctor.id)?);

        assert!(store::queue::complete_visit(conn, entry.id)?);
        let completed = store::queue::find(conn, entry.id)?.unwrap();
        assert_eq!(completed.status, QueueStatus::Completed);
        assert!(completed.completed_at.is_some());
        Ok(())
    });
}

#[test]
fn transitions_out_of_order_change_nothing() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let p = patient(conn, "Out Of Order", "T-Q02");
        let entry = store::queue::enqueue(conn, p.id, desk.id, Priority::Urgent, "")?;

        assert!(!store::queue::complete_visit(conn, entry.id)?);
        assert_eq!(queue_status(conn, entry.id), QueueStatus::Waiting);

        assert!(store::queue::start_visit(conn, entry.id, doctor.id)?);
        assert!(store::queue::complete_visit(conn, entry.id)?);

        assert!(!store::queue::start_visit(conn, entry.id, doctor.id)?);
        assert!(!store::queue::complete_visit(conn, entry.id)?);
        assert_eq!(queue_status(conn, entry.id), QueueStatus::Completed);

        assert!(!store::queue::start_visit(conn, i32::MAX, doctor.id)?);
        Ok(())
    });
}

#[test]
fn a_patient_holds_one_active_queue_slot() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let p = patient(conn, "Double Send", "T-Q03");
        let entry = store::queue::enqueue(conn, p.id, desk.id, Priority::Normal, "")?;

        let again = store::queue::enqueue(conn, p.id, desk.id, Priority::Emergency, "");
        assert!(matches!(again, Err(ApiError::Conflict(_))));

        store::queue::start_visit(conn, entry.id, doctor.id)?;
        store::queue::complete_visit(conn, entry.id)?;
        let follow_up = store::queue::enqueue(conn, p.id, desk.id, Priority::Normal, "follow-up")?;
        assert_eq!(follow_up.status, QueueStatus::Waiting);
        Ok(())
    });
}

#[test]
fn doctor_queue_serves_by_priority_then_arrival() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let a = patient(conn, "Patient A", "T-Q04");
        let b = patient(conn, "Patient B", "T-Q05");
        let c = patient(conn, "Patient C", "T-Q06");
        let base = store::now() - Duration::hours(1);

        for (p, priority, offset) in [
            (&a, Priority::Normal, 0),
            (&b, Priority::Emergency, 5),
            (&c, Priority::Urgent, 2),
        ] {
            let entry = store::queue::enqueue(conn, p.id, desk.id, priority, "")?;
            diesel::update(doctor_queue::table.find(entry.id))
                .set(doctor_queue::sent_at.eq(base + Duration::minutes(offset)))
                .execute(conn)?;
        }

        let ours = [a.id, b.id, c.id];
        let order: Vec<i32> = store::queue::active_queue(conn)?
            .into_iter()
            .map(|row| row.patient.id)
            .filter(|id| ours.contains(id))
            .collect();
        assert_eq!(order, vec![b.id, c.id, a.id]);
        Ok(())
    });
}

#[test]
fn first_visit_activates_exactly_once() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let p = patient(conn, "First Timer", "T-V01");
        assert_eq!(p.status, PatientStatus::Inactive);

        let first = store::visits::record(conn, doctor.id, &general_visit(p.id), None)?;
        assert!(first.activated);
        let after_first = store::patients::find(conn, p.id)?.unwrap();
        assert_eq!(after_first.status, PatientStatus::Active);
        assert_eq!(after_first.first_visit_date, Some(store::today()));

        let second = store::visits::record(conn, doctor.id, &general_visit(p.id), None)?;
        assert!(!second.activated);
        assert_eq!(store::patients::find(conn, p.id)?.unwrap(), after_first);
        Ok(())
    });
}

#[test]
fn visit_from_the_queue_completes_its_entry() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let p = patient(conn, "From Queue", "T-V02");
        let entry = store::queue::enqueue(conn, p.id, desk.id, Priority::Normal, "")?;
        store::queue::start_visit(conn, entry.id, doctor.id)?;

        let recorded = store::visits::record(conn, doctor.id, &general_visit(p.id), Some(entry.id))?;
        assert_eq!(recorded.queue_completed, Some(true));
        assert_eq!(queue_status(conn, entry.id), QueueStatus::Completed);
        Ok(())
    });
}

#[test]
fn visit_cannot_close_another_patients_queue_entry() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let seen = patient(conn, "Being Seen", "T-V03");
        let other = patient(conn, "Still Waiting", "T-V04");
        let entry = store::queue::enqueue(conn, other.id, desk.id, Priority::Normal, "")?;
        store::queue::start_visit(conn, entry.id, doctor.id)?;

        let recorded = store::visits::record(conn, doctor.id, &general_visit(seen.id), Some(entry.id))?;
        assert_eq!(recorded.queue_completed, Some(false));
        assert_eq!(queue_status(conn, entry.id), QueueStatus::InProgress);
        assert!(store::queue::active_entry_for(conn, other.id)?.is_some());
        Ok(())
    });
}

#[test]
fn visit_for_unknown_patient_is_rejected() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let result = store::visits::record(conn, doctor.id, &general_visit(i32::MAX), None);
        assert!(matches!(result, Err(ApiError::NotFound("patient"))));
        Ok(())
    });
}

#[test]
fn waiting_list_is_first_come_and_skips_queued_patients() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let early = patient(conn, "Early Bird", "T-W01");
        let late = patient(conn, "Late Comer", "T-W02");
        let queued = patient(conn, "Already Queued", "T-W03");

        let base = store::now() - Duration::hours(2);
        for (p, offset) in [(&late, 30), (&early, 0), (&queued, 10)] {
            diesel::update(patients::table.find(p.id))
                .set(patients::date_registered.eq(base + Duration::minutes(offset)))
                .execute(conn)?;
        }
        store::queue::enqueue(conn, queued.id, desk.id, Priority::Normal, "")?;

        let ours = [early.id, late.id, queued.id];
        let waiting: Vec<i32> = store::patients::waiting_list(conn)?
            .into_iter()
            .map(|p| p.id)
            .filter(|id| ours.contains(id))
            .collect();
        assert_eq!(waiting, vec![early.id, late.id]);
        Ok(())
    });
}

#[test]
fn duplicate_card_numbers_are_rejected() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        patient(conn, "Original", "T-D01");
        let duplicate = store::patients::register(
            conn,
            &Registration {
                full_name: "Copy".into(),
                sex: Sex::Male,
                phone: String::new(),
                card_number: "T-D01".into(),
            },
        );
        assert!(matches!(duplicate, Err(ApiError::Conflict(_))));
        Ok(())
    });
}

#[test]
fn referrals_move_forward_within_their_own_department() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let p = patient(conn, "Referred", "T-R01");
        let visit = store::visits::record(conn, doctor.id, &general_visit(p.id), None)?.visit;
        let referral = store::referrals::create(conn, visit.id, doctor.id, Department::Lab, "")?;
        assert_eq!(referral.status, ReferralStatus::Pending);
        assert_eq!(referral.notes, format!("Referred from visit #{}", visit.id));

        // another department cannot touch it
        assert!(!store::referrals::transition(conn, Department::Ultrasound, referral.id, ReferralStatus::InProgress)?);
        // no skipping straight to completed
        assert!(!store::referrals::transition(conn, Department::Lab, referral.id, ReferralStatus::Completed)?);

        assert!(store::referrals::transition(conn, Department::Lab, referral.id, ReferralStatus::InProgress)?);
        assert!(store::referrals::transition(conn, Department::Lab, referral.id, ReferralStatus::Completed)?);
        assert!(!store::referrals::transition(conn, Department::Lab, referral.id, ReferralStatus::Completed)?);

        let stored = store::referrals::for_visit(conn, visit.id)?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, ReferralStatus::Completed);
        assert!(stored[0].completed_at.is_some());
        Ok(())
    });
}

#[test]
fn lab_results_attach_once() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let doctor = user(conn, "t-doctor", Role::Doctor);
        let tech = user(conn, "t-lab", Role::Lab);
        let p = patient(conn, "Blood Work", "T-L01");
        let request = store::requests::create_lab_request(conn, p.id, doctor.id, "CBC", "")?;

        let before = store::requests::lab_counts(conn, Some(doctor.id))?;
        assert_eq!(before.pending, 1);

        assert!(store::requests::complete_lab_request(conn, request.id, tech.id, "Normal ranges")?);
        assert!(!store::requests::complete_lab_request(conn, request.id, tech.id, "Overwritten")?);

        let after = store::requests::lab_counts(conn, Some(doctor.id))?;
        assert_eq!(after.pending, 0);
        assert_eq!(after.completed_today, 1);
        assert_eq!(store::requests::completed_lab_total(conn, Some(doctor.id))?, 1);
        Ok(())
    });
}

#[test]
fn dashboard_waiting_count_matches_the_waiting_list() {
    let Some(mut conn) = connection() else { return };
    conn.test_transaction::<_, ApiError, _>(|conn| {
        let desk = user(conn, "t-desk", Role::Receptionist);
        let p = patient(conn, "Counted Once", "T-S01");

        let before = store::stats::dashboard(conn, Role::Receptionist, desk.id)?;
        assert_eq!(before.waiting_patients, store::patients::waiting_list(conn)?.len() as i64);

        store::queue::enqueue(conn, p.id, desk.id, Priority::Normal, "")?;
        let after = store::stats::dashboard(conn, Role::Receptionist, desk.id)?;
        assert_eq!(after.waiting_patients, before.waiting_patients - 1);
        assert_eq!(after.waiting_patients, store::patients::waiting_count(conn)?);
        Ok(())
    });
}
