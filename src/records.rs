use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::forms::{FieldSpec, FormValues, ValidationErrors};
use crate::models::{Attachment, LookupKind, Lookups};

/// Every entity the manager can list, edit and export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum RecordKind {
    GeneralBill,
    FuelBill,
    MessBill,
    VehicleBill,
    AccommodationBill,
    AdibReport,
    ProjectProfitReport,
    PayrollReport,
    LabourExpenseReport,
    VisaExpenseReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordGroup {
    Bills,
    Reports,
}

impl RecordKind {
    pub const ALL: [RecordKind; 10] = [
        RecordKind::GeneralBill,
        RecordKind::FuelBill,
        RecordKind::MessBill,
        RecordKind::VehicleBill,
        RecordKind::AccommodationBill,
        RecordKind::AdibReport,
        RecordKind::ProjectProfitReport,
        RecordKind::PayrollReport,
        RecordKind::LabourExpenseReport,
        RecordKind::VisaExpenseReport,
    ];

    /// REST collection path segment
    pub fn resource(self) -> &'static str {
        match self {
            RecordKind::GeneralBill => "general-bills",
            RecordKind::FuelBill => "fuel-bills",
            RecordKind::MessBill => "mess-bills",
            RecordKind::VehicleBill => "vehicle-bills",
            RecordKind::AccommodationBill => "accommodation-bills",
            RecordKind::AdibReport => "adib-reports",
            RecordKind::ProjectProfitReport => "project-profit-reports",
            RecordKind::PayrollReport => "payroll-reports",
            RecordKind::LabourExpenseReport => "labour-expense-reports",
            RecordKind::VisaExpenseReport => "visa-expense-reports",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            RecordKind::GeneralBill => "General Bills",
            RecordKind::FuelBill => "Fuel Bills",
            RecordKind::MessBill => "Mess Bills",
            RecordKind::VehicleBill => "Vehicle Bills",
            RecordKind::AccommodationBill => "Accommodation Bills",
            RecordKind::AdibReport => "ADIB Reports",
            RecordKind::ProjectProfitReport => "Project Profit Reports",
            RecordKind::PayrollReport => "Payroll Reports",
            RecordKind::LabourExpenseReport => "Labour Expense Reports",
            RecordKind::VisaExpenseReport => "Visa Expense Reports",
        }
    }

    pub fn group(self) -> RecordGroup {
        match self {
            RecordKind::GeneralBill
            | RecordKind::FuelBill
            | RecordKind::MessBill
            | RecordKind::VehicleBill
            | RecordKind::AccommodationBill => RecordGroup::Bills,
            _ => RecordGroup::Reports,
        }
    }

    /// The lookup a list of this kind can be narrowed by, if any.
    pub fn filter_lookup(self) -> Option<LookupKind> {
        match self {
            RecordKind::GeneralBill | RecordKind::MessBill => Some(LookupKind::Shop),
            RecordKind::FuelBill | RecordKind::VehicleBill => Some(LookupKind::Vehicle),
            RecordKind::PayrollReport
            | RecordKind::LabourExpenseReport
            | RecordKind::VisaExpenseReport => Some(LookupKind::Employee),
            RecordKind::AccommodationBill
            | RecordKind::AdibReport
            | RecordKind::ProjectProfitReport => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    /// Share of the table width, in percent
    pub width: u16,
    /// Summed into the export total row
    pub total: bool,
}

impl Column {
    pub const fn new(title: &'static str, width: u16) -> Self {
        Self {
            title,
            width,
            total: false,
        }
    }

    pub const fn summed(title: &'static str, width: u16) -> Self {
        Self {
            title,
            width,
            total: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Amount(f64),
    Integer(u64),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn optional_text(value: Option<&str>) -> Self {
        value.map(CellValue::text).unwrap_or(CellValue::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Amount(v) => Some(*v),
            CellValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Amount(v) => f.write_str(&format_amount(*v)),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Empty => Ok(()),
        }
    }
}

/// `1234.5` -> `1,234.50`
pub fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative && fixed != "0.00" {
        format!("-{grouped}.{cents}")
    } else {
        format!("{grouped}.{cents}")
    }
}

/// A bill or report as exchanged with the backend
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn id(&self) -> Option<u64>;
    fn set_id(&mut self, id: Option<u64>);

    fn columns() -> &'static [Column];
    /// Display cells, one per entry of [`Record::columns`].
    fn row(&self, lookups: &Lookups) -> Vec<CellValue>;

    fn fields() -> &'static [FieldSpec];
    /// Defaults for a brand-new form.
    fn blank_form() -> FormValues;
    fn to_form(&self) -> FormValues;
    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors>;
    /// Recompute read-only fields after an edit.
    fn derive(_values: &mut FormValues) {}

    fn attachments_mut(&mut self) -> &mut Vec<Attachment>;
}

/// Run `$body` with `$R` bound to the concrete record type for `$kind`.
macro_rules! with_record {
    ($kind:expr, $R:ident => $body:expr) => {
        match $kind {
            $crate::records::RecordKind::GeneralBill => {
                type $R = $crate::models::GeneralBill;
                $body
            }
            $crate::records::RecordKind::FuelBill => {
                type $R = $crate::models::FuelBill;
                $body
            }
            $crate::records::RecordKind::MessBill => {
                type $R = $crate::models::MessBill;
                $body
            }
            $crate::records::RecordKind::VehicleBill => {
                type $R = $crate::models::VehicleBill;
                $body
            }
            $crate::records::RecordKind::AccommodationBill => {
                type $R = $crate::models::AccommodationBill;
                $body
            }
            $crate::records::RecordKind::AdibReport => {
                type $R = $crate::models::AdibReport;
                $body
            }
            $crate::records::RecordKind::ProjectProfitReport => {
                type $R = $crate::models::ProjectProfitReport;
                $body
            }
            $crate::records::RecordKind::PayrollReport => {
                type $R = $crate::models::PayrollReport;
                $body
            }
            $crate::records::RecordKind::LabourExpenseReport => {
                type $R = $crate::models::LabourExpenseReport;
                $body
            }
            $crate::records::RecordKind::VisaExpenseReport => {
                type $R = $crate::models::VisaExpenseReport;
                $body
            }
        }
    };
}

pub(crate) use with_record;

/// Field schema of a kind without naming its type.
pub fn fields_of(kind: RecordKind) -> &'static [FieldSpec] {
    with_record!(kind, R => R::fields())
}

pub fn columns_of(kind: RecordKind) -> &'static [Column] {
    with_record!(kind, R => R::columns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FieldKind;

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.5), "1,234,567.50");
        assert_eq!(format_amount(-42.1), "-42.10");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn kinds_have_unique_resources() {
        let mut resources: Vec<&str> = RecordKind::ALL.iter().map(|k| k.resource()).collect();
        resources.sort();
        resources.dedup();
        assert_eq!(resources.len(), RecordKind::ALL.len());
    }

    #[test]
    fn groups_split_bills_and_reports() {
        let bills = RecordKind::ALL
            .iter()
            .filter(|k| k.group() == RecordGroup::Bills)
            .count();
        assert_eq!(bills, 5);
    }

    #[test]
    fn every_schema_has_keys_columns_and_attachments() {
        for kind in RecordKind::ALL {
            let fields = fields_of(kind);
            let mut keys: Vec<&str> = fields.iter().map(|f| f.key).collect();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), fields.len(), "duplicate field key in {kind}");
            assert!(
                fields.iter().any(|f| f.kind == FieldKind::Attachments),
                "{kind} has no attachments field"
            );

            let widths: u16 = columns_of(kind).iter().map(|c| c.width).sum();
            assert!(widths <= 100, "{kind} columns exceed table width");
        }
    }

    #[test]
    fn filter_lookup_fields_exist_on_the_form() {
        for kind in RecordKind::ALL {
            if let Some(lookup) = kind.filter_lookup() {
                assert!(
                    fields_of(kind)
                        .iter()
                        .any(|f| f.kind == FieldKind::Lookup(lookup)),
                    "{kind} filters by {} but has no such field",
                    lookup.label()
                );
            }
        }
    }
}
