use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, LookupKind, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors, round2};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaExpenseReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub employee_id: u64,
    pub expense_date: NaiveDate,
    pub visa_type: String,
    #[serde(default)]
    pub entry_permit_fee: f64,
    #[serde(default)]
    pub medical_fee: f64,
    #[serde(default)]
    pub emirates_id_fee: f64,
    #[serde(default)]
    pub other_fee: f64,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_uploaded",
        deserialize_with = "deserialize_stored"
    )]
    pub attachments: Vec<Attachment>,
}

const FEE_KEYS: [&str; 4] = ["entryPermitFee", "medicalFee", "emiratesIdFee", "otherFee"];

fn total_fees(fees: [f64; 4]) -> f64 {
    round2(fees.iter().sum())
}

static FIELDS: [FieldSpec; 10] = [
    FieldSpec::required("employeeId", "Employee", FieldKind::Lookup(LookupKind::Employee)),
    FieldSpec::required("expenseDate", "Expense Date", FieldKind::Date),
    FieldSpec::required("visaType", "Visa Type", FieldKind::Text),
    FieldSpec::optional("entryPermitFee", "Entry Permit Fee", FieldKind::Amount),
    FieldSpec::optional("medicalFee", "Medical Fee", FieldKind::Amount),
    FieldSpec::optional("emiratesIdFee", "Emirates ID Fee", FieldKind::Amount),
    FieldSpec::optional("otherFee", "Other Fee", FieldKind::Amount),
    FieldSpec::derived("totalAmount", "Total"),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 9] = [
    Column::new("Employee", 18),
    Column::new("Date", 10),
    Column::new("Visa Type", 14),
    Column::summed("Entry Permit", 10),
    Column::summed("Medical", 9),
    Column::summed("Emirates ID", 9),
    Column::summed("Other", 8),
    Column::summed("Total", 10),
    FILES_COLUMN,
];

impl Record for VisaExpenseReport {
    const KIND: RecordKind = RecordKind::VisaExpenseReport;

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: Option<u64>) {
        self.id = id;
    }

    fn columns() -> &'static [Column] {
        &COLUMNS
    }

    fn row(&self, lookups: &Lookups) -> Vec<CellValue> {
        vec![
            CellValue::Text(lookups.name(LookupKind::Employee, self.employee_id)),
            CellValue::Date(self.expense_date),
            CellValue::text(&self.visa_type),
            CellValue::Amount(self.entry_permit_fee),
            CellValue::Amount(self.medical_fee),
            CellValue::Amount(self.emirates_id_fee),
            CellValue::Amount(self.other_fee),
            CellValue::Amount(total_fees([
                self.entry_permit_fee,
                self.medical_fee,
                self.emirates_id_fee,
                self.other_fee,
            ])),
            files_cell(&self.attachments),
        ]
    }

    fn fields() -> &'static [FieldSpec] {
        &FIELDS
    }

    fn blank_form() -> FormValues {
        let mut values = FormValues::default();
        values.set_date("expenseDate", today());
        values.set_amount("totalAmount", 0.0);
        values
    }

    fn to_form(&self) -> FormValues {
        let mut values = FormValues::default();
        values.set_id("employeeId", Some(self.employee_id));
        values.set_date("expenseDate", self.expense_date);
        values.set("visaType", self.visa_type.as_str());
        values.set_amount("entryPermitFee", self.entry_permit_fee);
        values.set_amount("medicalFee", self.medical_fee);
        values.set_amount("emiratesIdFee", self.emirates_id_fee);
        values.set_amount("otherFee", self.other_fee);
        values.set_amount("totalAmount", self.total_amount);
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let employee_id = reader.lookup("employeeId");
        let expense_date = reader.date("expenseDate");
        let visa_type = reader.text("visaType");
        let fees = FEE_KEYS.map(|key| reader.non_negative(key));
        let total_amount = total_fees(fees);
        if FEE_KEYS.iter().all(|key| !reader.has_error(key)) {
            reader.check(total_amount > 0.0, "entryPermitFee", "Enter at least one fee");
        }
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        let [entry_permit_fee, medical_fee, emirates_id_fee, other_fee] = fees;
        reader.finish(VisaExpenseReport {
            id: None,
            employee_id,
            expense_date,
            visa_type,
            entry_permit_fee,
            medical_fee,
            emirates_id_fee,
            other_fee,
            total_amount,
            remarks,
            attachments,
        })
    }

    fn derive(values: &mut FormValues) {
        let total = total_fees(FEE_KEYS.map(|key| values.number(key)));
        values.set_amount("totalAmount", total);
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
        values.set("employeeId", "3");
        values.set("expenseDate", "2024-03-10");
        values.set("visaType", "Employment");
        values
    }

    #[test]
    fn at_least_one_fee_is_required() {
        let errors = VisaExpenseReport::from_form(&filled()).unwrap_err();
        assert_eq!(errors.for_field("entryPermitFee"), Some("Enter at least one fee"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn total_sums_every_fee() {
        let mut values = filled();
        values.set("entryPermitFee", "1,150");
        values.set("medicalFee", "320.50");
        values.set("emiratesIdFee", "370");
        let report = VisaExpenseReport::from_form(&values).unwrap();
        assert_eq!(report.total_amount, 1840.5);
        assert_eq!(report.other_fee, 0.0);

        VisaExpenseReport::derive(&mut values);
        assert_eq!(values.get("totalAmount"), "1840.50");
    }

    #[test]
    fn negative_fee_is_reported_on_its_field() {
        let mut values = filled();
        values.set("medicalFee", "-20");
        values.set("otherFee", "100");
        let errors = VisaExpenseReport::from_form(&values).unwrap_err();
        assert_eq!(errors.for_field("medicalFee"), Some("Medical Fee cannot be negative"));
        assert_eq!(errors.for_field("entryPermitFee"), None);
    }

    #[test]
    fn row_computes_total_when_the_server_omits_it() {
        let report: VisaExpenseReport = serde_json::from_value(serde_json::json!({
            "employeeId": 3,
            "expenseDate": "2024-02-01",
            "visaType": "Employment",
            "entryPermitFee": 1200.0,
            "medicalFee": 320.5,
            "emiratesIdFee": 370.0
        }))
        .unwrap();
        assert_eq!(report.row(&Lookups::default())[7], CellValue::Amount(1890.5));
    }
}
