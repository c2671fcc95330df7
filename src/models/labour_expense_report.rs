use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, LookupKind, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors};
use crate::labour::{LabourInputs, LabourProjection};
use crate::records::{CellValue, Column, Record, RecordKind};

/// Salary breakdown of one worker with its two-year cost projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabourExpenseReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub employee_id: u64,
    pub entry_date: NaiveDate,
    pub basic_salary: f64,
    #[serde(default)]
    pub housing_allowance: f64,
    #[serde(default)]
    pub transport_allowance: f64,
    #[serde(default)]
    pub other_allowance: f64,
    #[serde(default)]
    pub visa_cost: f64,
    #[serde(default)]
    pub insurance_cost: f64,
    #[serde(default)]
    pub air_ticket_cost: f64,
    #[serde(flatten)]
    pub projection: LabourProjection,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_uploaded",
        deserialize_with = "deserialize_stored"
    )]
    pub attachments: Vec<Attachment>,
}

impl LabourExpenseReport {
    pub fn inputs(&self) -> LabourInputs {
        LabourInputs {
            basic_salary: self.basic_salary,
            housing_allowance: self.housing_allowance,
            transport_allowance: self.transport_allowance,
            other_allowance: self.other_allowance,
            visa_cost: self.visa_cost,
            insurance_cost: self.insurance_cost,
            air_ticket_cost: self.air_ticket_cost,
        }
    }
}

const INPUT_KEYS: [&str; 7] = [
    "basicSalary",
    "housingAllowance",
    "transportAllowance",
    "otherAllowance",
    "visaCost",
    "insuranceCost",
    "airTicketCost",
];

fn inputs_from(values: &FormValues) -> LabourInputs {
    let [basic, housing, transport, other, visa, insurance, ticket] =
        INPUT_KEYS.map(|key| values.number(key));
    LabourInputs {
        basic_salary: basic,
        housing_allowance: housing,
        transport_allowance: transport,
        other_allowance: other,
        visa_cost: visa,
        insurance_cost: insurance,
        air_ticket_cost: ticket,
    }
}

fn write_projection(values: &mut FormValues, p: &LabourProjection) {
    values.set_amount("monthlySalary", p.monthly_salary);
    values.set_amount("annualSalary", p.annual_salary);
    values.set_amount("twoYearSalary", p.two_year_salary);
    values.set_amount("gratuity", p.gratuity);
    values.set_amount("leaveSalary", p.leave_salary);
    values.set_amount("airTickets", p.air_tickets);
    values.set_amount("insurance", p.insurance);
    values.set_amount("twoYearTotalCost", p.two_year_total_cost);
    values.set_amount("averageMonthlyCost", p.average_monthly_cost);
}

static FIELDS: [FieldSpec; 20] = [
    FieldSpec::required("employeeId", "Employee", FieldKind::Lookup(LookupKind::Employee)),
    FieldSpec::required("entryDate", "Entry Date", FieldKind::Date),
    FieldSpec::required("basicSalary", "Basic Salary", FieldKind::Amount),
    FieldSpec::optional("housingAllowance", "Housing Allowance", FieldKind::Amount),
    FieldSpec::optional("transportAllowance", "Transport Allowance", FieldKind::Amount),
    FieldSpec::optional("otherAllowance", "Other Allowance", FieldKind::Amount),
    FieldSpec::optional("visaCost", "Visa Cost (2 yrs)", FieldKind::Amount),
    FieldSpec::optional("insuranceCost", "Insurance / Year", FieldKind::Amount),
    FieldSpec::optional("airTicketCost", "Air Ticket / Year", FieldKind::Amount),
    FieldSpec::derived("monthlySalary", "Monthly Salary"),
    FieldSpec::derived("annualSalary", "Annual Salary"),
    FieldSpec::derived("twoYearSalary", "Salary (2 yrs)"),
    FieldSpec::derived("gratuity", "Gratuity (2 yrs)"),
    FieldSpec::derived("leaveSalary", "Leave Salary (2 yrs)"),
    FieldSpec::derived("airTickets", "Air Tickets (2 yrs)"),
    FieldSpec::derived("insurance", "Insurance (2 yrs)"),
    FieldSpec::derived("twoYearTotalCost", "Total Cost (2 yrs)"),
    FieldSpec::derived("averageMonthlyCost", "Average Monthly Cost"),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 8] = [
    Column::new("Employee", 18),
    Column::new("Date", 10),
    Column::summed("Monthly", 11),
    Column::summed("Annual", 11),
    Column::summed("Gratuity", 10),
    Column::summed("2-Yr Cost", 12),
    Column::summed("Avg/Month", 11),
    FILES_COLUMN,
];

impl Record for LabourExpenseReport {
    const KIND: RecordKind = RecordKind::LabourExpenseReport;

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
        let p = self.inputs().project();
        vec![
            CellValue::Text(lookups.name(LookupKind::Employee, self.employee_id)),
            CellValue::Date(self.entry_date),
            CellValue::Amount(p.monthly_salary),
            CellValue::Amount(p.annual_salary),
            CellValue::Amount(p.gratuity),
            CellValue::Amount(p.two_year_total_cost),
            CellValue::Amount(p.average_monthly_cost),
            files_cell(&self.attachments),
        ]
    }

    fn fields() -> &'static [FieldSpec] {
        &FIELDS
    }

    fn blank_form() -> FormValues {
        let mut values = FormValues::default();
        values.set_date("entryDate", today());
        write_projection(&mut values, &LabourProjection::default());
        values
    }

    fn to_form(&self) -> FormValues {
        let mut values = FormValues::default();
        values.set_id("employeeId", Some(self.employee_id));
        values.set_date("entryDate", self.entry_date);
        let inputs = self.inputs();
        let amounts = [
            inputs.basic_salary,
            inputs.housing_allowance,
            inputs.transport_allowance,
            inputs.other_allowance,
            inputs.visa_cost,
            inputs.insurance_cost,
            inputs.air_ticket_cost,
        ];
        for (key, amount) in INPUT_KEYS.iter().zip(amounts) {
            values.set_amount(key, amount);
        }
        // Stored projections may predate a formula change; show the current one.
        write_projection(&mut values, &inputs.project());
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let employee_id = reader.lookup("employeeId");
        let entry_date = reader.date("entryDate");
        let basic_salary = reader.amount("basicSalary");
        let housing_allowance = reader.non_negative("housingAllowance");
        let transport_allowance = reader.non_negative("transportAllowance");
        let other_allowance = reader.non_negative("otherAllowance");
        let visa_cost = reader.non_negative("visaCost");
        let insurance_cost = reader.non_negative("insuranceCost");
        let air_ticket_cost = reader.non_negative("airTicketCost");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        let mut report = LabourExpenseReport {
            id: None,
            employee_id,
            entry_date,
            basic_salary,
            housing_allowance,
            transport_allowance,
            other_allowance,
            visa_cost,
            insurance_cost,
            air_ticket_cost,
            projection: LabourProjection::default(),
            remarks,
            attachments,
        };
        report.projection = report.inputs().project();

        reader.finish(report)
    }

    fn derive(values: &mut FormValues) {
        let projection = inputs_from(values).project();
        write_projection(values, &projection);
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
        values.set("employeeId", "8");
        values.set("entryDate", "2024-01-15");
        values.set("basicSalary", "1500");
        values.set("housingAllowance", "500");
        values.set("transportAllowance", "200");
        values.set("visaCost", "3000");
        values.set("insuranceCost", "700");
        values.set("airTicketCost", "1200");
        values
    }

    #[test]
    fn derive_projects_while_typing() {
        let mut values = filled();
        LabourExpenseReport::derive(&mut values);
        assert_eq!(values.get("monthlySalary"), "2200.00");
        assert_eq!(values.get("twoYearTotalCost"), "64700.00");
        assert_eq!(values.get("averageMonthlyCost"), "2695.83");

        values.set("basicSalary", "not a number");
        LabourExpenseReport::derive(&mut values);
        assert_eq!(values.get("monthlySalary"), "700.00");
        assert_eq!(values.get("gratuity"), "0.00");
    }

    #[test]
    fn saved_report_carries_projection() {
        let report = LabourExpenseReport::from_form(&filled()).unwrap();
        assert_eq!(report.projection.two_year_total_cost, 64700.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["twoYearTotalCost"], 64700.0);
        assert_eq!(json["basicSalary"], 1500.0);
    }

    #[test]
    fn server_record_without_projection_still_loads() {
        let report: LabourExpenseReport = serde_json::from_str(
            r#"{"id":1,"employeeId":8,"entryDate":"2024-01-15","basicSalary":1500.0}"#,
        )
        .unwrap();
        assert_eq!(report.projection, LabourProjection::default());
        assert_eq!(report.to_form().get("gratuity"), "2100.00");
    }

    #[test]
    fn row_projects_when_the_server_omits_the_projection() {
        let report: LabourExpenseReport = serde_json::from_value(serde_json::json!({
            "employeeId": 5,
            "entryDate": "2024-01-15",
            "basicSalary": 1500.0
        }))
        .unwrap();
        let row = report.row(&Lookups::default());
        assert_eq!(row[2], CellValue::Amount(1500.0));
        assert_eq!(row[3], CellValue::Amount(18000.0));
        assert_eq!(row[4], CellValue::Amount(2100.0));
    }
}
