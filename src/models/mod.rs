mod attachment;
mod lookup;
mod general_bill;
mod fuel_bill;
mod mess_bill;
mod vehicle_bill;
mod accommodation_bill;
mod adib_report;
mod project_profit_report;
mod payroll_report;
mod labour_expense_report;
mod visa_expense_report;

use chrono::{Local, NaiveDate};

use crate::records::{CellValue, Column};

pub use attachment::{
    Attachment, LocalFile, MAX_ATTACHMENTS, StoredFile, deserialize_stored, serialize_uploaded,
};
pub use lookup::{LookupItem, LookupKind, Lookups};
pub use general_bill::GeneralBill;
pub use fuel_bill::FuelBill;
pub use mess_bill::MessBill;
pub use vehicle_bill::VehicleBill;
pub use accommodation_bill::AccommodationBill;
pub use adib_report::AdibReport;
pub use project_profit_report::ProjectProfitReport;
pub use payroll_report::PayrollReport;
pub use labour_expense_report::LabourExpenseReport;
pub use visa_expense_report::VisaExpenseReport;

pub(crate) const FILES_COLUMN: Column = Column::new("Files", 6);

pub(crate) fn files_cell(attachments: &[Attachment]) -> CellValue {
    CellValue::Integer(attachments.len() as u64)
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
