use chrono::{DateTime, Utc};

use super::model::InterviewRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CsvColumns {
    #[default]
    Standard,
    /// Adds the candidate phone after the email
    WithPhone,
}

impl CsvColumns {
    pub fn header(&self) -> &'static str {
        match self {
            CsvColumns::Standard => "Name,Email,Date,Type,Status,Notes",
            CsvColumns::WithPhone => "Name,Email,Phone,Date,Type,Status,Notes",
        }
    }
}

/// `March 1, 2024, 10:00 AM`
pub fn format_interview_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y, %I:%M %p").to_string()
}

/// Quote a field, doubling embedded quotes
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

pub fn to_csv(records: &[InterviewRecord], columns: CsvColumns) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(columns.header().to_string());

    for record in records {
        let date = format_interview_date(&record.interview_date);
        let mut fields = vec![record.candidate_name.as_str(), record.candidate_email.as_str()];
        if columns == CsvColumns::WithPhone {
            fields.push(record.candidate_phone.as_str());
        }
        fields.extend([
            date.as_str(),
            record.interview_type.as_str(),
            record.status.as_str(),
            record.notes.as_str(),
        ]);
        lines.push(fields.into_iter().map(quote).collect::<Vec<_>>().join(","));
    }

    lines.join("\n")
}
