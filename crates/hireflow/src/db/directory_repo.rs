//! Companies, jobs and applicant profiles.
//!
//! These rows are owned by other parts of the portal. The application store
//! only reads them to fill display fields, so this repository offers
//! upserts for seeding and synchronisation and nothing more.

use rusqlite::params;

use super::{Database, DatabaseError};

/// Inserts or renames a company.
pub fn upsert_company(db: &Database, id: &str, name: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO companies (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![id, name],
        )?;
        Ok(())
    })
}

/// Inserts or updates a job posting.
pub fn upsert_job(
    db: &Database,
    id: &str,
    title: &str,
    company_id: Option<&str>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, title, company_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, company_id = excluded.company_id",
            params![id, title, company_id],
        )?;
        Ok(())
    })
}

/// Inserts or updates an applicant profile.
pub fn upsert_profile(
    db: &Database,
    id: &str,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO profiles (id, full_name, email) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET full_name = excluded.full_name, email = excluded.email",
            params![id, full_name, email],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upserts_overwrite() {
        let db = Database::open_in_memory().unwrap();
        upsert_company(&db, "c1", "Initech").unwrap();
        upsert_company(&db, "c1", "Initrode").unwrap();
        upsert_job(&db, "j1", "TPS Analyst", Some("c1")).unwrap();
        upsert_profile(&db, "u1", Some("Peter"), Some("peter@example.com")).unwrap();
        upsert_profile(&db, "u1", None, None).unwrap();

        db.with_conn(|conn| {
            let name: String =
                conn.query_row("SELECT name FROM companies WHERE id = 'c1'", [], |r| r.get(0))?;
            assert_eq!(name, "Initrode");
            let full_name: Option<String> =
                conn.query_row("SELECT full_name FROM profiles WHERE id = 'u1'", [], |r| r.get(0))?;
            assert!(full_name.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_job_requires_known_company() {
        let db = Database::open_in_memory().unwrap();
        assert!(upsert_job(&db, "j1", "Ghost", Some("nope")).is_err());
        assert!(upsert_job(&db, "j2", "Freelance", None).is_ok());
    }
}
