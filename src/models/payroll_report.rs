use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, LookupKind, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors, round2};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub employee_id: u64,
    /// First day of the payroll month
    pub month: NaiveDate,
    pub basic_salary: f64,
    #[serde(default)]
    pub allowances: f64,
    #[serde(default)]
    pub overtime: f64,
    #[serde(default)]
    pub deductions: f64,
    #[serde(default)]
    pub net_salary: f64,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_uploaded",
        deserialize_with = "deserialize_stored"
    )]
    pub attachments: Vec<Attachment>,
}

fn net_salary(basic: f64, allowances: f64, overtime: f64, deductions: f64) -> f64 {
    round2(basic + allowances + overtime - deductions)
}

static FIELDS: [FieldSpec; 9] = [
    FieldSpec::required("employeeId", "Employee", FieldKind::Lookup(LookupKind::Employee)),
    FieldSpec::required("month", "Month", FieldKind::Month),
    FieldSpec::required("basicSalary", "Basic Salary", FieldKind::Amount),
    FieldSpec::optional("allowances", "Allowances", FieldKind::Amount),
    FieldSpec::optional("overtime", "Overtime", FieldKind::Amount),
    FieldSpec::optional("deductions", "Deductions", FieldKind::Amount),
    FieldSpec::derived("netSalary", "Net Salary"),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 8] = [
    Column::new("Employee", 20),
    Column::new("Month", 9),
    Column::summed("Basic", 12),
    Column::summed("Allowances", 12),
    Column::summed("Overtime", 10),
    Column::summed("Deductions", 11),
    Column::summed("Net", 12),
    FILES_COLUMN,
];

impl Record for PayrollReport {
    const KIND: RecordKind = RecordKind::PayrollReport;

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
            CellValue::Text(self.month.format("%b %Y").to_string()),
            CellValue::Amount(self.basic_salary),
            CellValue::Amount(self.allowances),
            CellValue::Amount(self.overtime),
            CellValue::Amount(self.deductions),
            CellValue::Amount(net_salary(self.basic_salary, self.allowances, self.overtime, self.deductions)),
            files_cell(&self.attachments),
        ]
    }

    fn fields() -> &'static [FieldSpec] {
        &FIELDS
    }

    fn blank_form() -> FormValues {
        let mut values = FormValues::default();
        let current = today();
        values.set_month("month", current.with_day(1).unwrap_or(current));
        values
    }

    fn to_form(&self) -> FormValues {
        let mut values = FormValues::default();
        values.set_id("employeeId", Some(self.employee_id));
        values.set_month("month", self.month);
        values.set_amount("basicSalary", self.basic_salary);
        values.set_amount("allowances", self.allowances);
        values.set_amount("overtime", self.overtime);
        values.set_amount("deductions", self.deductions);
        values.set_amount("netSalary", self.net_salary);
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let employee_id = reader.lookup("employeeId");
        let month = reader.month("month");
        let basic_salary = reader.amount("basicSalary");
        let allowances = reader.non_negative("allowances");
        let overtime = reader.non_negative("overtime");
        let deductions = reader.non_negative("deductions");
        let net = net_salary(basic_salary, allowances, overtime, deductions);
        if !reader.has_error("basicSalary") {
            reader.check(net >= 0.0, "deductions", "Deductions cannot exceed gross salary");
        }
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        reader.finish(PayrollReport {
            id: None,
            employee_id,
            month,
            basic_salary,
            allowances,
            overtime,
            deductions,
            net_salary: net,
            remarks,
            attachments,
        })
    }

    fn derive(values: &mut FormValues) {
        let net = net_salary(
            values.number("basicSalary"),
            values.number("allowances"),
            values.number("overtime"),
            values.number("deductions"),
        );
        values.set_amount("netSalary", net);
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
        values.set("employeeId", "42");
        values.set("month", "2024-05");
        values.set("basicSalary", "3000");
        values.set("allowances", "800");
        values.set("overtime", "150.5");
        values.set("deductions", "200");
        values
    }

    #[test]
    fn net_salary_is_computed() {
        let report = PayrollReport::from_form(&filled()).unwrap();
        assert_eq!(report.net_salary, 3750.5);
        assert_eq!(report.month, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn deductions_cannot_exceed_gross() {
        let mut values = filled();
        values.set("deductions", "5000");
        let errors = PayrollReport::from_form(&values).unwrap_err();
        assert_eq!(
            errors.for_field("deductions"),
            Some("Deductions cannot exceed gross salary")
        );
    }

    #[test]
    fn month_serializes_as_first_of_month() {
        let report = PayrollReport::from_form(&filled()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["month"], "2024-05-01");
        assert_eq!(report.to_form().get("month"), "2024-05");
    }

    #[test]
    fn row_computes_net_when_the_server_omits_it() {
        let report: PayrollReport = serde_json::from_value(serde_json::json!({
            "employeeId": 1,
            "month": "2024-05-01",
            "basicSalary": 2000.0,
            "allowances": 300.0,
            "overtime": 50.0,
            "deductions": 100.0
        }))
        .unwrap();
        assert_eq!(report.row(&Lookups::default())[6], CellValue::Amount(2250.0));
    }
}
