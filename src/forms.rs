// Field schemas and the validation that reads form strings into records

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;

use crate::models::{Attachment, LookupKind, MAX_ATTACHMENTS};

pub const TEXT_MAX: usize = 120;
pub const REMARKS_MAX: usize = 500;
pub const ATTACHMENTS_KEY: &str = "attachments";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Remarks,
    Amount,
    Integer,
    Date,
    Month,
    Lookup(LookupKind),
    /// Computed from other fields, never edited directly
    Derived,
    Attachments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            required: true,
        }
    }

    pub const fn optional(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            required: false,
        }
    }

    pub const fn derived(key: &'static str, label: &'static str) -> Self {
        Self::optional(key, label, FieldKind::Derived)
    }

    pub const fn attachments() -> Self {
        Self::optional(ATTACHMENTS_KEY, "Attachments", FieldKind::Attachments)
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, FieldKind::Derived)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Record an error; only the first error per field is kept.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        if self.for_field(field).is_none() {
            self.0.push(FieldError {
                field: field.to_string(),
                message: message.into(),
            });
        }
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn clear_field(&mut self, field: &str) {
        self.0.retain(|e| e.field != field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Parse an amount as typed by a user: surrounding blanks and thousands
/// separators are ignored.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Accepts `YYYY-MM` or a full date and returns the first day of that month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = parse_date(raw).or_else(|| parse_date(&format!("{raw}-01")))?;
    date.with_day(1)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Raw string values of a form, keyed by field key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    values: BTreeMap<String, String>,
    pub attachments: Vec<Attachment>,
}

impl FormValues {
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn set_amount(&mut self, key: &str, value: f64) {
        self.set(key, format!("{:.2}", value));
    }

    pub fn set_date(&mut self, key: &str, value: NaiveDate) {
        self.set(key, value.format(DATE_FORMAT).to_string());
    }

    pub fn set_month(&mut self, key: &str, value: NaiveDate) {
        self.set(key, value.format("%Y-%m").to_string());
    }

    pub fn set_id(&mut self, key: &str, value: Option<u64>) {
        self.set(key, value.map(|v| v.to_string()).unwrap_or_default());
    }

    pub fn set_optional(&mut self, key: &str, value: Option<&str>) {
        self.set(key, value.unwrap_or_default());
    }

    /// Lenient numeric read used for derived fields: blanks and typos count as 0.
    pub fn number(&self, key: &str) -> f64 {
        parse_amount(self.get(key)).unwrap_or(0.0)
    }

    pub fn lookup_id(&self, key: &str) -> Option<u64> {
        self.get(key).trim().parse().ok()
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        parse_date(self.get(key))
    }
}

/// Reads typed values out of [`FormValues`], accumulating field errors
pub struct FormReader<'a> {
    values: &'a FormValues,
    fields: &'static [FieldSpec],
    today: NaiveDate,
    errors: ValidationErrors,
}

impl<'a> FormReader<'a> {
    pub fn new(values: &'a FormValues, fields: &'static [FieldSpec]) -> Self {
        Self {
            values,
            fields,
            today: Local::now().date_naive(),
            errors: ValidationErrors::default(),
        }
    }

    #[cfg(test)]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn label(&self, key: &str) -> &'static str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.label)
            .unwrap_or("Field")
    }

    fn raw(&self, key: &str) -> &'a str {
        self.values.get(key).trim()
    }

    pub fn fail(&mut self, key: &str, message: impl Into<String>) {
        self.errors.push(key, message);
    }

    /// Attach `message` to `key` unless `ok` holds and the field is otherwise valid.
    pub fn check(&mut self, ok: bool, key: &str, message: impl Into<String>) {
        if !ok {
            self.fail(key, message);
        }
    }

    pub fn has_error(&self, key: &str) -> bool {
        self.errors.for_field(key).is_some()
    }

    pub fn text(&mut self, key: &str) -> String {
        let raw = self.raw(key);
        if raw.is_empty() {
            let message = format!("{} is required", self.label(key));
            self.fail(key, message);
        } else if raw.chars().count() > TEXT_MAX {
            let message = format!("{} must be at most {TEXT_MAX} characters", self.label(key));
            self.fail(key, message);
        }
        raw.to_string()
    }

    pub fn optional_text(&mut self, key: &str) -> Option<String> {
        let raw = self.raw(key);
        if raw.is_empty() {
            return None;
        }
        if raw.chars().count() > TEXT_MAX {
            let message = format!("{} must be at most {TEXT_MAX} characters", self.label(key));
            self.fail(key, message);
        }
        Some(raw.to_string())
    }

    pub fn remarks(&mut self, key: &str) -> Option<String> {
        let raw = self.raw(key);
        if raw.is_empty() {
            return None;
        }
        if raw.chars().count() > REMARKS_MAX {
            let message = format!("{} must be at most {REMARKS_MAX} characters", self.label(key));
            self.fail(key, message);
        }
        Some(raw.to_string())
    }

    /// Required amount, strictly positive.
    pub fn amount(&mut self, key: &str) -> f64 {
        let raw = self.raw(key);
        if raw.is_empty() {
            let message = format!("{} is required", self.label(key));
            self.fail(key, message);
            return 0.0;
        }
        match parse_amount(raw) {
            Some(v) if v > 0.0 => round2(v),
            Some(_) => {
                let message = format!("{} must be greater than zero", self.label(key));
                self.fail(key, message);
                0.0
            }
            None => {
                let message = format!("{} must be a number", self.label(key));
                self.fail(key, message);
                0.0
            }
        }
    }

    /// Optional amount; blank reads as zero, negatives are rejected.
    pub fn non_negative(&mut self, key: &str) -> f64 {
        let raw = self.raw(key);
        if raw.is_empty() {
            return 0.0;
        }
        match parse_amount(raw) {
            Some(v) if v >= 0.0 => round2(v),
            Some(_) => {
                let message = format!("{} cannot be negative", self.label(key));
                self.fail(key, message);
                0.0
            }
            None => {
                let message = format!("{} must be a number", self.label(key));
                self.fail(key, message);
                0.0
            }
        }
    }

    /// Optional signed amount, such as a running balance.
    pub fn signed_amount(&mut self, key: &str) -> Option<f64> {
        let raw = self.raw(key);
        if raw.is_empty() {
            return None;
        }
        match parse_amount(raw) {
            Some(v) => Some(round2(v)),
            None => {
                let message = format!("{} must be a number", self.label(key));
                self.fail(key, message);
                None
            }
        }
    }

    pub fn optional_integer(&mut self, key: &str) -> Option<u64> {
        let raw = self.raw(key);
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                let message = format!("{} must be a whole number", self.label(key));
                self.fail(key, message);
                None
            }
        }
    }

    fn parse_required_date(&mut self, key: &str) -> Option<NaiveDate> {
        let raw = self.raw(key);
        if raw.is_empty() {
            let message = format!("{} is required", self.label(key));
            self.fail(key, message);
            return None;
        }
        let parsed = parse_date(raw);
        if parsed.is_none() {
            let message = format!("{} must be a date (YYYY-MM-DD)", self.label(key));
            self.fail(key, message);
        }
        parsed
    }

    /// Required record date that may not lie in the future.
    pub fn date(&mut self, key: &str) -> NaiveDate {
        match self.parse_required_date(key) {
            Some(date) if date > self.today => {
                let message = format!("{} cannot be in the future", self.label(key));
                self.fail(key, message);
                date
            }
            Some(date) => date,
            None => NaiveDate::MIN,
        }
    }

    /// Required date without the future check (period boundaries).
    pub fn period_date(&mut self, key: &str) -> NaiveDate {
        self.parse_required_date(key).unwrap_or(NaiveDate::MIN)
    }

    pub fn month(&mut self, key: &str) -> NaiveDate {
        let raw = self.raw(key);
        if raw.is_empty() {
            let message = format!("{} is required", self.label(key));
            self.fail(key, message);
            return NaiveDate::MIN;
        }
        match parse_month(raw) {
            Some(month) => month,
            None => {
                let message = format!("{} must be a month (YYYY-MM)", self.label(key));
                self.fail(key, message);
                NaiveDate::MIN
            }
        }
    }

    pub fn lookup(&mut self, key: &str) -> u64 {
        match self.values.lookup_id(key) {
            Some(id) => id,
            None => {
                let message = format!("{} is required", self.label(key));
                self.fail(key, message);
                0
            }
        }
    }

    pub fn attachments(&mut self) -> Vec<Attachment> {
        let attachments = self.values.attachments.clone();
        if attachments.len() > MAX_ATTACHMENTS {
            self.fail(
                ATTACHMENTS_KEY,
                format!("At most {MAX_ATTACHMENTS} attachments are allowed"),
            );
        }
        for attachment in &attachments {
            if let Attachment::Local(file) = attachment {
                if let Some(problem) = file.problem() {
                    self.fail(ATTACHMENTS_KEY, problem);
                }
            }
        }
        attachments
    }

    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalFile;
    use std::path::PathBuf;

    static FIELDS: [FieldSpec; 6] = [
        FieldSpec::required("name", "Name", FieldKind::Text),
        FieldSpec::required("amount", "Amount", FieldKind::Amount),
        FieldSpec::optional("vat", "VAT", FieldKind::Amount),
        FieldSpec::required("date", "Bill Date", FieldKind::Date),
        FieldSpec::required("shopId", "Shop", FieldKind::Lookup(LookupKind::Shop)),
        FieldSpec::attachments(),
    ];

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn valid_values() -> FormValues {
        let mut values = FormValues::default();
        values.set("name", "  Fuel station ");
        values.set("amount", "1,250.456");
        values.set("date", "2024-06-01");
        values.set("shopId", "4");
        values
    }

    #[test]
    fn reads_valid_values() {
        let values = valid_values();
        let mut reader = FormReader::new(&values, &FIELDS).with_today(today());
        let name = reader.text("name");
        let amount = reader.amount("amount");
        let vat = reader.non_negative("vat");
        let date = reader.date("date");
        let shop = reader.lookup("shopId");
        let result = reader.finish((name, amount, vat, date, shop)).unwrap();

        assert_eq!(result.0, "Fuel station");
        assert_eq!(result.1, 1250.46);
        assert_eq!(result.2, 0.0);
        assert_eq!(result.3, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(result.4, 4);
    }

    #[test]
    fn collects_one_error_per_field() {
        let mut values = FormValues::default();
        values.set("amount", "-3");
        values.set("vat", "abc");
        values.set("date", "2024-07-01");

        let mut reader = FormReader::new(&values, &FIELDS).with_today(today());
        reader.text("name");
        reader.amount("amount");
        reader.non_negative("vat");
        reader.date("date");
        reader.lookup("shopId");
        reader.check(false, "amount", "second amount error");
        let errors = reader.finish(()).unwrap_err();

        assert_eq!(errors.len(), 5);
        assert_eq!(errors.for_field("name"), Some("Name is required"));
        assert_eq!(errors.for_field("amount"), Some("Amount must be greater than zero"));
        assert_eq!(errors.for_field("vat"), Some("VAT must be a number"));
        assert_eq!(errors.for_field("date"), Some("Bill Date cannot be in the future"));
        assert_eq!(errors.for_field("shopId"), Some("Shop is required"));
    }

    #[test]
    fn rejects_bad_dates_and_long_text() {
        let mut values = valid_values();
        values.set("date", "01/06/2024");
        values.set("name", "x".repeat(TEXT_MAX + 1));

        let mut reader = FormReader::new(&values, &FIELDS).with_today(today());
        reader.text("name");
        reader.date("date");
        let errors = reader.finish(()).unwrap_err();
        assert_eq!(
            errors.for_field("date"),
            Some("Bill Date must be a date (YYYY-MM-DD)")
        );
        assert!(errors.for_field("name").unwrap().contains("at most"));
    }

    #[test]
    fn validates_pending_attachments_only() {
        let mut values = valid_values();
        values.attachments = vec![
            Attachment::Local(LocalFile {
                path: PathBuf::from("a.exe"),
                file_name: "a.exe".into(),
                size: 10,
            }),
        ];
        let mut reader = FormReader::new(&values, &FIELDS).with_today(today());
        reader.attachments();
        let errors = reader.finish(()).unwrap_err();
        assert!(errors.for_field(ATTACHMENTS_KEY).unwrap().contains("a.exe"));
    }

    #[test]
    fn too_many_attachments_is_an_error() {
        let mut values = valid_values();
        values.attachments = (0..=MAX_ATTACHMENTS)
            .map(|i| {
                Attachment::Stored(crate::models::StoredFile {
                    file_name: format!("{i}.pdf"),
                    file_path: format!("/f/{i}.pdf"),
                })
            })
            .collect();
        let mut reader = FormReader::new(&values, &FIELDS).with_today(today());
        reader.attachments();
        assert!(reader.has_error(ATTACHMENTS_KEY));
    }

    #[test]
    fn month_parsing_normalises_to_first_day() {
        let first = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(parse_month("2024-02"), Some(first));
        assert_eq!(parse_month("2024-02-20"), Some(first));
        assert_eq!(parse_month("2024-13"), None);
    }

    #[test]
    fn lenient_number_reads_blank_as_zero() {
        let mut values = FormValues::default();
        values.set("a", "12.5");
        values.set("b", "oops");
        assert_eq!(values.number("a"), 12.5);
        assert_eq!(values.number("b"), 0.0);
        assert_eq!(values.number("missing"), 0.0);
    }
}
