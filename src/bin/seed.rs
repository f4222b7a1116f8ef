//! Loads the default staff accounts and a handful of sample patients.
//! Rows that already exist are left untouched, so the binary can be rerun.

use anyhow::{Context, Result};
use diesel::PgConnection;
use tracing_subscriber::EnvFilter;

use emr_clinic::config::AppConfig;
use emr_clinic::crypto::CryptoUtils;
use emr_clinic::db;
use emr_clinic::enums::{PatientStatus, Priority, Role, Sex};
use emr_clinic::models::NewUser;
use emr_clinic::store;
use emr_clinic::store::patients::Registration;

const USERS: &[(&str, &str, &str, Role)] = &[
    ("Dr. John Smith", "doctor", "password123", Role::Doctor),
    ("Lab Technician Sarah", "lab", "password123", Role::Lab),
    ("Ultrasound Tech Mike", "ultrasound", "password123", Role::Ultrasound),
    ("Emergency Nurse Lisa", "emergency", "password123", Role::Emergency),
    ("Receptionist Anna", "receptionist", "password123", Role::Receptionist),
    ("System Administrator", "admin", "admin123", Role::Admin),
];

const PATIENTS: &[(&str, Sex, &str, &str, PatientStatus)] = &[
    ("Alice Johnson", Sex::Female, "+1234567890", "P001", PatientStatus::Active),
    ("Bob Wilson", Sex::Male, "+1234567891", "P002", PatientStatus::Active),
    ("Carol Davis", Sex::Female, "+1234567892", "P003", PatientStatus::Inactive),
    ("David Brown", Sex::Male, "+1234567893", "P004", PatientStatus::Active),
    ("Emma Garcia", Sex::Female, "+1234567894", "P005", PatientStatus::Active),
];

// (card number, priority, notes)
const QUEUE: &[(&str, Priority, &str)] = &[
    ("P003", Priority::Normal, "New patient, first consultation"),
    ("P001", Priority::Urgent, "Follow-up, persistent fever"),
    ("P004", Priority::Emergency, "Chest pain on arrival"),
];

fn seed_users(conn: &mut PgConnection) -> Result<()> {
    for &(full_name, username, password, role) in USERS {
        if store::users::find_by_username(conn, username)?.is_some() {
            tracing::info!(username, "user already exists");
            continue;
        }
        let password_hash = CryptoUtils::hash_password(password)?;
        let user = store::users::insert_user(
            conn,
            &NewUser {
                full_name,
                username,
                password_hash: &password_hash,
                role,
            },
        )?;
        tracing::info!(user_id = user.id, username, %role, "created user");
    }
    Ok(())
}

fn seed_patients(conn: &mut PgConnection) -> Result<()> {
    for &(full_name, sex, phone, card_number, status) in PATIENTS {
        if store::patients::card_number_taken(conn, card_number, None)? {
            tracing::info!(card_number, "patient already exists");
            continue;
        }
        let patient = store::patients::register(
            conn,
            &Registration {
                full_name: full_name.to_string(),
                sex,
                phone: phone.to_string(),
                card_number: card_number.to_string(),
            },
        )?;
        if status == PatientStatus::Active {
            store::patients::set_status(conn, patient.id, status)?;
        }
        tracing::info!(patient_id = patient.id, card_number, %status, "created patient");
    }
    Ok(())
}

fn seed_queue(conn: &mut PgConnection) -> Result<()> {
    let receptionist = store::users::find_by_username(conn, "receptionist")?
        .context("receptionist account is missing")?;

    for &(card_number, priority, notes) in QUEUE {
        let Some(patient) = store::patients::find_by_card_number(conn, card_number)? else {
            continue;
        };
        if store::queue::active_entry_for(conn, patient.id)?.is_some() {
            tracing::info!(card_number, "patient already queued");
            continue;
        }
        let entry = store::queue::enqueue(conn, patient.id, receptionist.id, priority, notes)?;
        tracing::info!(queue_id = entry.id, card_number, %priority, "queued patient");
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    let pool = db::build_pool(&config.database_url, 1)?;
    let mut conn = pool.get().context("Failed to get a database connection")?;
    db::run_migrations(&mut conn)?;

    seed_users(&mut conn)?;
    seed_patients(&mut conn)?;
    seed_queue(&mut conn)?;

    tracing::info!("seed complete");
    Ok(())
}
