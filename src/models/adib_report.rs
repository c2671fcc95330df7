use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors};
use crate::records::{CellValue, Column, Record, RecordKind};

/// A line from the ADIB bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdibReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub transaction_date: NaiveDate,
    pub reference_no: String,
    pub description: String,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_uploaded",
        deserialize_with = "deserialize_stored"
    )]
    pub attachments: Vec<Attachment>,
}

static FIELDS: [FieldSpec; 8] = [
    FieldSpec::required("transactionDate", "Transaction Date", FieldKind::Date),
    FieldSpec::required("referenceNo", "Reference No", FieldKind::Text),
    FieldSpec::required("description", "Description", FieldKind::Text),
    FieldSpec::optional("debit", "Debit", FieldKind::Amount),
    FieldSpec::optional("credit", "Credit", FieldKind::Amount),
    FieldSpec::optional("balance", "Balance", FieldKind::Amount),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 7] = [
    Column::new("Date", 11),
    Column::new("Reference", 13),
    Column::new("Description", 24),
    Column::summed("Debit", 11),
    Column::summed("Credit", 11),
    Column::new("Balance", 11),
    FILES_COLUMN,
];

impl Record for AdibReport {
    const KIND: RecordKind = RecordKind::AdibReport;

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: Option<u64>) {
        self.id = id;
    }

    fn columns() -> &'static [Column] {
        &COLUMNS
    }

    fn row(&self, _lookups: &Lookups) -> Vec<CellValue> {
        vec![
            CellValue::Date(self.transaction_date),
            CellValue::text(&self.reference_no),
            CellValue::text(&self.description),
            CellValue::Amount(self.debit),
            CellValue::Amount(self.credit),
            self.balance.map(CellValue::Amount).unwrap_or(CellValue::Empty),
            files_cell(&self.attachments),
        ]
    }

    fn fields() -> &'static [FieldSpec] {
        &FIELDS
    }

    fn blank_form() -> FormValues {
        let mut values = FormValues::default();
        values.set_date("transactionDate", today());
        values
    }

    fn to_form(&self) -> FormValues {
        let mut values = FormValues::default();
        values.set_date("transactionDate", self.transaction_date);
        values.set("referenceNo", self.reference_no.as_str());
        values.set("description", self.description.as_str());
        values.set_amount("debit", self.debit);
        values.set_amount("credit", self.credit);
        if let Some(balance) = self.balance {
            values.set_amount("balance", balance);
        }
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let transaction_date = reader.date("transactionDate");
        let reference_no = reader.text("referenceNo");
        let description = reader.text("description");
        let debit = reader.non_negative("debit");
        let credit = reader.non_negative("credit");
        if !reader.has_error("debit") && !reader.has_error("credit") {
            if debit > 0.0 && credit > 0.0 {
                reader.fail("credit", "A transaction cannot be both a debit and a credit");
            } else if debit == 0.0 && credit == 0.0 {
                reader.fail("debit", "Enter either a debit or a credit amount");
            }
        }
        let balance = reader.signed_amount("balance");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        reader.finish(AdibReport {
            id: None,
            transaction_date,
            reference_no,
            description,
            debit,
            credit,
            balance,
            remarks,
            attachments,
        })
    }

    fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        &mut self.attachments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> FormValues {
        let mut values = FormValues::default();
        values.set("transactionDate", "2024-02-14");
        values.set("referenceNo", "FT24045XK9");
        values.set("description", "Salary transfer");
        values
    }

    #[test]
    fn needs_exactly_one_side() {
        let errors = AdibReport::from_form(&filled()).unwrap_err();
        assert_eq!(
            errors.for_field("debit"),
            Some("Enter either a debit or a credit amount")
        );

        let mut both = filled();
        both.set("debit", "10");
        both.set("credit", "10");
        let errors = AdibReport::from_form(&both).unwrap_err();
        assert!(errors.for_field("credit").is_some());

        let mut debit_only = filled();
        debit_only.set("debit", "2,500.00");
        debit_only.set("balance", "-120.5");
        let report = AdibReport::from_form(&debit_only).unwrap();
        assert_eq!(report.debit, 2500.0);
        assert_eq!(report.balance, Some(-120.5));
    }
}
