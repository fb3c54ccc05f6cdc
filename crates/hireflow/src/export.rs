//! Flat CSV export, one row per application.

use crate::application::ApplicationRecord;
use crate::display;

pub const CSV_HEADER: [&str; 7] = [
    "Applicant",
    "Job",
    "Company",
    "Status",
    "Applied Date",
    "Assignment",
    "Payment",
];

/// Quotes a field when it contains a separator, quote or line break.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn to_row(record: &ApplicationRecord) -> [String; 7] {
    [
        display::applicant_name(record).to_string(),
        display::job_title(record).to_string(),
        display::company(record).to_string(),
        display::status_label(record.status),
        display::applied_date(record),
        display::assignment(record),
        display::payment(record),
    ]
}

/// Renders `records` as CSV with a header line. Rows keep input order and
/// every line ends with `\n`.
pub fn to_csv(records: &[ApplicationRecord]) -> String {
    let mut output = CSV_HEADER.join(",") + "\n";

    for record in records {
        let values: Vec<String> = to_row(record).iter().map(|v| escape_field(v)).collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ApplicationStatus, PaymentStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(
            to_csv(&[]),
            "Applicant,Job,Company,Status,Applied Date,Assignment,Payment\n"
        );
    }

    #[test]
    fn test_row_rendering() {
        let mut record =
            ApplicationRecord::new("u1", "j1", Utc.with_ymd_and_hms(2026, 11, 2, 10, 0, 0).unwrap());
        record.applicant_name = Some("Linus".to_string());
        record.job_title = Some("Kernel Hacker".to_string());
        record.status = ApplicationStatus::UnderReview;
        record.payment_status = Some(PaymentStatus::Completed);

        let csv = to_csv(&[record]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "Linus,Kernel Hacker,N/A,UNDER REVIEW,11/02/2026,N/A,COMPLETED"
        );
    }

    #[test]
    fn test_fields_are_quoted() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("Acme, Inc."), "\"Acme, Inc.\"");
        assert_eq!(escape_field("the \"best\""), "\"the \"\"best\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_company_with_comma_stays_one_column() {
        let mut record =
            ApplicationRecord::new("u1", "j1", Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap());
        record.company = Some("Wayne Enterprises, LLC".to_string());
        let csv = to_csv(&[record]);
        assert!(csv.contains(",\"Wayne Enterprises, LLC\","));
    }
}
