//! CRUD and filtered queries for the `applications` table.
//!
//! Reads join the job, company and applicant profile so records carry their
//! display fields. Any of the joined rows may be missing.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::application::{
    ApplicationFilter, ApplicationPatch, ApplicationRecord, ApplicationStatus, PaymentStatus,
};

const SELECT_JOINED: &str = "SELECT a.id, a.user_id, a.job_id, a.status, a.applied_at, a.updated_at,
        a.assignment_completed, a.assignment_status, a.payment_required, a.payment_status,
        a.payment_amount, a.payment_due_date,
        j.title AS job_title, c.name AS company, p.full_name AS applicant_name
     FROM applications a
     LEFT JOIN jobs j ON j.id = a.job_id
     LEFT JOIN companies c ON c.id = j.company_id
     LEFT JOIN profiles p ON p.id = a.user_id";

/// Formats a timestamp with fixed precision so stored strings sort chronologically.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A raw application row from the database.
#[derive(Debug, Clone)]
pub struct ApplicationRow {
    pub id: String,
    pub user_id: String,
    pub job_id: String,
    pub status: String,
    pub applied_at: String,
    pub updated_at: String,
    pub assignment_completed: bool,
    pub assignment_status: Option<String>,
    pub payment_required: bool,
    pub payment_status: Option<String>,
    pub payment_amount: Option<i64>,
    pub payment_due_date: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub applicant_name: Option<String>,
}

impl ApplicationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            job_id: row.get("job_id")?,
            status: row.get("status")?,
            applied_at: row.get("applied_at")?,
            updated_at: row.get("updated_at")?,
            assignment_completed: row.get("assignment_completed")?,
            assignment_status: row.get("assignment_status")?,
            payment_required: row.get("payment_required")?,
            payment_status: row.get("payment_status")?,
            payment_amount: row.get("payment_amount")?,
            payment_due_date: row.get("payment_due_date")?,
            job_title: row.get("job_title")?,
            company: row.get("company")?,
            applicant_name: row.get("applicant_name")?,
        })
    }

    /// Decodes the row into a domain record.
    pub fn into_record(self) -> Result<ApplicationRecord, DatabaseError> {
        let status = self
            .status
            .parse::<ApplicationStatus>()
            .map_err(|_| invalid(&self.id, "status", &self.status))?;
        let applied_at = parse_timestamp(&self.id, "applied_at", &self.applied_at)?;
        let updated_at = parse_timestamp(&self.id, "updated_at", &self.updated_at)?;
        let payment_status = match self.payment_status {
            Some(ref s) => Some(
                s.parse::<PaymentStatus>()
                    .map_err(|_| invalid(&self.id, "payment_status", s))?,
            ),
            None => None,
        };
        let payment_due_date = match self.payment_due_date {
            Some(ref s) => Some(
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|_| invalid(&self.id, "payment_due_date", s))?,
            ),
            None => None,
        };

        Ok(ApplicationRecord {
            id: self.id,
            user_id: self.user_id,
            job_id: self.job_id,
            status,
            applied_at,
            updated_at,
            assignment_completed: self.assignment_completed,
            assignment_status: self.assignment_status,
            payment_required: self.payment_required,
            payment_status,
            payment_amount: self.payment_amount,
            payment_due_date,
            job_title: self.job_title,
            company: self.company,
            applicant_name: self.applicant_name,
        })
    }
}

fn invalid(id: &str, column: &'static str, value: &str) -> DatabaseError {
    DatabaseError::InvalidValue {
        id: id.to_string(),
        column,
        value: value.to_string(),
    }
}

fn parse_timestamp(id: &str, column: &'static str, s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid(id, column, s))
}

/// Outcome of a guarded update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    /// The row exists but its status differs from the patch's expectation.
    StatusMismatch,
}

/// Inserts a new application row. Joined display fields are ignored.
pub fn insert(db: &Database, record: &ApplicationRecord) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO applications (id, user_id, job_id, status, applied_at, updated_at,
             assignment_completed, assignment_status, payment_required, payment_status,
             payment_amount, payment_due_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.id,
                record.user_id,
                record.job_id,
                record.status.as_str(),
                format_timestamp(record.applied_at),
                format_timestamp(record.updated_at),
                record.assignment_completed,
                record.assignment_status,
                record.payment_required,
                record.payment_status.map(|s| s.as_str()),
                record.payment_amount,
                record.payment_due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        Ok(())
    })
}

/// Applies the set fields of `patch`, honouring its `expected_status` guard.
pub fn update_fields(
    db: &Database,
    id: &str,
    patch: &ApplicationPatch,
) -> Result<UpdateOutcome, DatabaseError> {
    // The write and the existence probe share a transaction so the outcome
    // describes one consistent snapshot.
    db.with_tx(|tx| {
        let mut assignments = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(id.to_string())];

        if let Some(status) = patch.status {
            param_values.push(Box::new(status.as_str()));
            assignments.push(format!("status = ?{}", param_values.len()));
        }
        if let Some(updated_at) = patch.updated_at {
            param_values.push(Box::new(format_timestamp(updated_at)));
            assignments.push(format!("updated_at = ?{}", param_values.len()));
        }
        if let Some(completed) = patch.assignment_completed {
            param_values.push(Box::new(completed));
            assignments.push(format!("assignment_completed = ?{}", param_values.len()));
        }
        if let Some(ref assignment_status) = patch.assignment_status {
            param_values.push(Box::new(assignment_status.clone()));
            assignments.push(format!("assignment_status = ?{}", param_values.len()));
        }
        if let Some(payment_status) = patch.payment_status {
            param_values.push(Box::new(payment_status.as_str()));
            assignments.push(format!("payment_status = ?{}", param_values.len()));
        }

        // An empty patch still has to report whether the row exists.
        if assignments.is_empty() {
            assignments.push("id = id".to_string());
        }

        let mut sql = format!("UPDATE applications SET {} WHERE id = ?1", assignments.join(", "));
        if let Some(expected) = patch.expected_status {
            param_values.push(Box::new(expected.as_str()));
            sql.push_str(&format!(" AND status = ?{}", param_values.len()));
        }

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let changed = tx.execute(&sql, params_ref.as_slice())?;
        if changed > 0 {
            return Ok(UpdateOutcome::Updated);
        }

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM applications WHERE id = ?1)",
            params![id],
            |r| r.get(0),
        )?;
        Ok(if exists {
            UpdateOutcome::StatusMismatch
        } else {
            UpdateOutcome::NotFound
        })
    })
}

/// Finds an application by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ApplicationRecord>, DatabaseError> {
    find_one(db, &format!("{} WHERE a.id = ?1", SELECT_JOINED), params![id])
}

/// Finds the application of `user_id` for `job_id`, if any.
pub fn find_by_user_and_job(
    db: &Database,
    user_id: &str,
    job_id: &str,
) -> Result<Option<ApplicationRecord>, DatabaseError> {
    find_one(
        db,
        &format!("{} WHERE a.user_id = ?1 AND a.job_id = ?2", SELECT_JOINED),
        params![user_id, job_id],
    )
}

fn find_one(
    db: &Database,
    sql: &str,
    args: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<ApplicationRecord>, DatabaseError> {
    let row = db.with_conn(|conn| {
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query_map(args, ApplicationRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })?;
    row.map(ApplicationRow::into_record).transpose()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Queries applications with filters, returning (records, total_count).
///
/// `total_count` ignores pagination.
pub fn query(
    db: &Database,
    filter: &ApplicationFilter,
) -> Result<(Vec<ApplicationRecord>, u64), DatabaseError> {
    let (rows, total) = db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push(format!("a.status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.as_str()));
        }
        if let Some(ref user_id) = filter.user_id {
            conditions.push(format!("a.user_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(user_id.clone()));
        }
        if let Some(ref job_id) = filter.job_id {
            conditions.push(format!("a.job_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(job_id.clone()));
        }
        if let Some(from) = filter.from_date {
            conditions.push(format!("a.applied_at >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_timestamp(from)));
        }
        if let Some(to) = filter.to_date {
            conditions.push(format!("a.applied_at <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_timestamp(to)));
        }
        if let Some(term) = filter.search_term() {
            let n = param_values.len() + 1;
            conditions.push(format!(
                "(fold_case(p.full_name) LIKE ?{n} ESCAPE '\\' \
                 OR fold_case(j.title) LIKE ?{n} ESCAPE '\\' \
                 OR fold_case(c.name) LIKE ?{n} ESCAPE '\\')"
            ));
            // Folded on both sides the same way ApplicationFilter::matches folds.
            param_values.push(Box::new(escape_like(&term.to_lowercase())));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total matching rows.
        let count_sql = format!(
            "SELECT COUNT(*) FROM applications a
             LEFT JOIN jobs j ON j.id = a.job_id
             LEFT JOIN companies c ON c.id = j.company_id
             LEFT JOIN profiles p ON p.id = a.user_id {}",
            where_clause
        );
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // SQLite treats a negative LIMIT as "no limit".
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "{} {} ORDER BY a.applied_at DESC, a.id ASC LIMIT ?{} OFFSET ?{}",
            SELECT_JOINED,
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<ApplicationRow> = stmt
            .query_map(params_ref.as_slice(), ApplicationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })?;

    let records = rows
        .into_iter()
        .map(ApplicationRow::into_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((records, total))
}

/// Counts applications per status with SQL grouping. Statuses without
/// applications are reported as zero.
pub fn count_by_status(db: &Database) -> Result<BTreeMap<ApplicationStatus, u64>, DatabaseError> {
    let rows: Vec<(String, u64)> = db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM applications GROUP BY status")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;

    let mut counts: BTreeMap<ApplicationStatus, u64> =
        ApplicationStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for (status, count) in rows {
        let status = status
            .parse::<ApplicationStatus>()
            .map_err(|_| invalid("*", "status", &status))?;
        counts.insert(status, count);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::directory_repo;
    use chrono::TimeZone;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap()
    }

    fn sample(id: &str, user_id: &str, job_id: &str, day: u32) -> ApplicationRecord {
        let mut record = ApplicationRecord::new(user_id, job_id, ts(day));
        record.id = id.to_string();
        record
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();

        let found = find_by_id(&db, "a1").unwrap().unwrap();
        assert_eq!(found.user_id, "u1");
        assert_eq!(found.status, ApplicationStatus::Applied);
        assert_eq!(found.applied_at, ts(1));
        assert!(found.job_title.is_none());
        assert!(found.applicant_name.is_none());
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_joined_display_fields() {
        let db = test_db();
        directory_repo::upsert_company(&db, "c1", "Acme").unwrap();
        directory_repo::upsert_job(&db, "j1", "Rust Engineer", Some("c1")).unwrap();
        directory_repo::upsert_profile(&db, "u1", Some("Grace Hopper"), None).unwrap();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();

        let found = find_by_id(&db, "a1").unwrap().unwrap();
        assert_eq!(found.job_title.as_deref(), Some("Rust Engineer"));
        assert_eq!(found.company.as_deref(), Some("Acme"));
        assert_eq!(found.applicant_name.as_deref(), Some("Grace Hopper"));
    }

    #[test]
    fn test_payment_fields_round_trip() {
        let db = test_db();
        let mut record = sample("a1", "u1", "j1", 1);
        record.payment_required = true;
        record.payment_status = Some(PaymentStatus::Pending);
        record.payment_amount = Some(2_500);
        record.payment_due_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        insert(&db, &record).unwrap();

        let found = find_by_id(&db, "a1").unwrap().unwrap();
        assert_eq!(found, record);
    }

    #[test]
    fn test_duplicate_user_job_is_unique_violation() {
        let db = test_db();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();
        let err = insert(&db, &sample("a2", "u1", "j1", 2)).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_find_by_user_and_job() {
        let db = test_db();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();
        assert!(find_by_user_and_job(&db, "u1", "j1").unwrap().is_some());
        assert!(find_by_user_and_job(&db, "u1", "j2").unwrap().is_none());
    }

    #[test]
    fn test_guarded_update() {
        let db = test_db();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();

        let patch = ApplicationPatch {
            expected_status: Some(ApplicationStatus::Applied),
            status: Some(ApplicationStatus::UnderReview),
            updated_at: Some(ts(2)),
            ..Default::default()
        };
        assert_eq!(update_fields(&db, "a1", &patch).unwrap(), UpdateOutcome::Updated);
        // Same guard again no longer holds.
        assert_eq!(
            update_fields(&db, "a1", &patch).unwrap(),
            UpdateOutcome::StatusMismatch
        );
        assert_eq!(
            update_fields(&db, "missing", &patch).unwrap(),
            UpdateOutcome::NotFound
        );

        let found = find_by_id(&db, "a1").unwrap().unwrap();
        assert_eq!(found.status, ApplicationStatus::UnderReview);
        assert_eq!(found.updated_at, ts(2));
    }

    #[test]
    fn test_empty_patch_reports_existence() {
        let db = test_db();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();
        let empty = ApplicationPatch::default();
        assert_eq!(update_fields(&db, "a1", &empty).unwrap(), UpdateOutcome::Updated);
        assert_eq!(update_fields(&db, "zz", &empty).unwrap(), UpdateOutcome::NotFound);
    }

    #[test]
    fn test_search_folds_non_ascii_case_like_in_memory_filter() {
        let db = test_db();
        directory_repo::upsert_profile(&db, "u1", Some("ZOË ÅSTRÖM"), None).unwrap();
        directory_repo::upsert_company(&db, "c1", "Ärzte ohne Grenzen").unwrap();
        directory_repo::upsert_job(&db, "j1", "Koordinator", Some("c1")).unwrap();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();
        insert(&db, &sample("a2", "u2", "j9", 2)).unwrap();
        let (everything, _) = query(&db, &ApplicationFilter::default()).unwrap();

        for term in ["zoë", "åSTRÖ", "ärzte"] {
            let filter = ApplicationFilter::with_search(term);
            let (hits, total) = query(&db, &filter).unwrap();
            let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["a1"], "search {:?}", term);
            assert_eq!(total, 1);
            assert_eq!(filter.apply(&everything), hits);
        }
    }

    #[test]
    fn test_query_orders_newest_first() {
        let db = test_db();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();
        insert(&db, &sample("a2", "u2", "j1", 3)).unwrap();
        insert(&db, &sample("a3", "u3", "j1", 2)).unwrap();

        let (records, total) = query(&db, &ApplicationFilter::default()).unwrap();
        assert_eq!(total, 3);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a3", "a1"]);
    }

    #[test]
    fn test_query_filters() {
        let db = test_db();
        directory_repo::upsert_company(&db, "c1", "Globex").unwrap();
        directory_repo::upsert_job(&db, "j1", "Data Analyst", Some("c1")).unwrap();
        directory_repo::upsert_job(&db, "j2", "Site Reliability", None).unwrap();
        directory_repo::upsert_profile(&db, "u1", Some("Hank Scorpio"), None).unwrap();

        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();
        let mut reviewed = sample("a2", "u2", "j2", 5);
        reviewed.status = ApplicationStatus::UnderReview;
        insert(&db, &reviewed).unwrap();

        let (by_status, _) =
            query(&db, &ApplicationFilter::with_status(ApplicationStatus::UnderReview)).unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].id, "a2");

        let (by_company, _) = query(&db, &ApplicationFilter::with_search("glob")).unwrap();
        assert_eq!(by_company.len(), 1);
        assert_eq!(by_company[0].id, "a1");

        let (by_name, _) = query(&db, &ApplicationFilter::with_search("SCORPIO")).unwrap();
        assert_eq!(by_name.len(), 1);

        let (by_title, _) = query(&db, &ApplicationFilter::with_search("reliab")).unwrap();
        assert_eq!(by_title[0].id, "a2");

        let (wildcard, _) = query(&db, &ApplicationFilter::with_search("%")).unwrap();
        assert!(wildcard.is_empty());

        let (ranged, total) = query(
            &db,
            &ApplicationFilter {
                from_date: Some(ts(2)),
                to_date: Some(ts(5)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(ranged[0].id, "a2");
    }

    #[test]
    fn test_query_pagination() {
        let db = test_db();
        for i in 0..10 {
            insert(&db, &sample(&format!("p{}", i), &format!("u{}", i), "j1", i + 1)).unwrap();
        }

        let (records, total) = query(
            &db,
            &ApplicationFilter {
                limit: Some(3),
                offset: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(total, 10);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "p7");
    }

    #[test]
    fn test_count_by_status_includes_zeroes() {
        let db = test_db();
        insert(&db, &sample("a1", "u1", "j1", 1)).unwrap();
        let mut rejected = sample("a2", "u2", "j1", 1);
        rejected.status = ApplicationStatus::Rejected;
        insert(&db, &rejected).unwrap();

        let counts = count_by_status(&db).unwrap();
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[&ApplicationStatus::Applied], 1);
        assert_eq!(counts[&ApplicationStatus::Rejected], 1);
        assert_eq!(counts[&ApplicationStatus::Approved], 0);
    }

    #[test]
    fn test_corrupt_timestamp_is_reported() {
        let db = test_db();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO applications (id, user_id, job_id, status, applied_at, updated_at)
                 VALUES ('bad', 'u1', 'j1', 'applied', 'yesterday', 'today')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let err = find_by_id(&db, "bad").unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InvalidValue {
                column: "applied_at",
                ..
            }
        ));
    }
}
