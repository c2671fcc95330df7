use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors, round2};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProfitReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub project_name: String,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub labour_cost: f64,
    #[serde(default)]
    pub material_cost: f64,
    #[serde(default)]
    pub other_cost: f64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub profit: f64,
    #[serde(default)]
    pub margin_percent: f64,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_uploaded",
        deserialize_with = "deserialize_stored"
    )]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ProfitFigures {
    total_cost: f64,
    profit: f64,
    margin_percent: f64,
}

fn profit_figures(revenue: f64, costs: [f64; 3]) -> ProfitFigures {
    let total_cost: f64 = costs.iter().sum();
    let profit = revenue - total_cost;
    let margin_percent = if revenue > 0.0 {
        profit / revenue * 100.0
    } else {
        0.0
    };
    ProfitFigures {
        total_cost: round2(total_cost),
        profit: round2(profit),
        margin_percent: round2(margin_percent),
    }
}

static FIELDS: [FieldSpec; 12] = [
    FieldSpec::required("projectName", "Project", FieldKind::Text),
    FieldSpec::required("periodFrom", "Period From", FieldKind::Date),
    FieldSpec::required("periodTo", "Period To", FieldKind::Date),
    FieldSpec::optional("revenue", "Revenue", FieldKind::Amount),
    FieldSpec::optional("labourCost", "Labour Cost", FieldKind::Amount),
    FieldSpec::optional("materialCost", "Material Cost", FieldKind::Amount),
    FieldSpec::optional("otherCost", "Other Cost", FieldKind::Amount),
    FieldSpec::derived("totalCost", "Total Cost"),
    FieldSpec::derived("profit", "Profit / Loss"),
    FieldSpec::derived("marginPercent", "Margin %"),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 8] = [
    Column::new("Project", 18),
    Column::new("From", 10),
    Column::new("To", 10),
    Column::summed("Revenue", 11),
    Column::summed("Total Cost", 11),
    Column::summed("Profit", 11),
    Column::new("Margin %", 8),
    FILES_COLUMN,
];

impl Record for ProjectProfitReport {
    const KIND: RecordKind = RecordKind::ProjectProfitReport;

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
        let figures = profit_figures(self.revenue, [self.labour_cost, self.material_cost, self.other_cost]);
        vec![
            CellValue::text(&self.project_name),
            CellValue::Date(self.period_from),
            CellValue::Date(self.period_to),
            CellValue::Amount(self.revenue),
            CellValue::Amount(figures.total_cost),
            CellValue::Amount(figures.profit),
            CellValue::Amount(figures.margin_percent),
            files_cell(&self.attachments),
        ]
    }

    fn fields() -> &'static [FieldSpec] {
        &FIELDS
    }

    fn blank_form() -> FormValues {
        let mut values = FormValues::default();
        values.set_date("periodTo", today());
        values
    }

    fn to_form(&self) -> FormValues {
        let mut values = FormValues::default();
        values.set("projectName", self.project_name.as_str());
        values.set_date("periodFrom", self.period_from);
        values.set_date("periodTo", self.period_to);
        values.set_amount("revenue", self.revenue);
        values.set_amount("labourCost", self.labour_cost);
        values.set_amount("materialCost", self.material_cost);
        values.set_amount("otherCost", self.other_cost);
        values.set_amount("totalCost", self.total_cost);
        values.set_amount("profit", self.profit);
        values.set_amount("marginPercent", self.margin_percent);
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let project_name = reader.text("projectName");
        let period_from = reader.period_date("periodFrom");
        let period_to = reader.period_date("periodTo");
        if !reader.has_error("periodFrom") {
            reader.check(
                period_to >= period_from,
                "periodTo",
                "Period To cannot be before Period From",
            );
        }
        let revenue = reader.non_negative("revenue");
        let labour_cost = reader.non_negative("labourCost");
        let material_cost = reader.non_negative("materialCost");
        let other_cost = reader.non_negative("otherCost");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        let figures = profit_figures(revenue, [labour_cost, material_cost, other_cost]);

        reader.finish(ProjectProfitReport {
            id: None,
            project_name,
            period_from,
            period_to,
            revenue,
            labour_cost,
            material_cost,
            other_cost,
            total_cost: figures.total_cost,
            profit: figures.profit,
            margin_percent: figures.margin_percent,
            remarks,
            attachments,
        })
    }

    fn derive(values: &mut FormValues) {
        let figures = profit_figures(
            values.number("revenue"),
            [
                values.number("labourCost"),
                values.number("materialCost"),
                values.number("otherCost"),
            ],
        );
        values.set_amount("totalCost", figures.total_cost);
        values.set_amount("profit", figures.profit);
        values.set_amount("marginPercent", figures.margin_percent);
    }

    fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        &mut self.attachments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_gives_negative_margin() {
        let figures = profit_figures(1000.0, [600.0, 500.0, 0.0]);
        assert_eq!(figures.total_cost, 1100.0);
        assert_eq!(figures.profit, -100.0);
        assert_eq!(figures.margin_percent, -10.0);
    }

    #[test]
    fn zero_revenue_has_zero_margin() {
        let figures = profit_figures(0.0, [250.0, 0.0, 0.0]);
        assert_eq!(figures.profit, -250.0);
        assert_eq!(figures.margin_percent, 0.0);
    }

    #[test]
    fn derive_writes_all_figures() {
        let mut values = FormValues::default();
        values.set("revenue", "80000");
        values.set("labourCost", "30000");
        values.set("materialCost", "15000");
        values.set("otherCost", "5000");
        ProjectProfitReport::derive(&mut values);
        assert_eq!(values.get("totalCost"), "50000.00");
        assert_eq!(values.get("profit"), "30000.00");
        assert_eq!(values.get("marginPercent"), "37.50");
    }

    #[test]
    fn row_computes_figures_when_the_server_omits_them() {
        let report: ProjectProfitReport = serde_json::from_value(serde_json::json!({
            "projectName": "Tower B",
            "periodFrom": "2024-01-01",
            "periodTo": "2024-03-31",
            "revenue": 10000.0,
            "labourCost": 4000.0,
            "materialCost": 2500.0,
            "otherCost": 500.0
        }))
        .unwrap();
        let row = report.row(&Lookups::default());
        assert_eq!(row[4], CellValue::Amount(7000.0));
        assert_eq!(row[5], CellValue::Amount(3000.0));
        assert_eq!(row[6], CellValue::Amount(30.0));
    }
}
