use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationBill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub bill_date: NaiveDate,
    pub building: String,
    #[serde(default)]
    pub room_no: Option<String>,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub amount: f64,
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
    FieldSpec::required("billDate", "Bill Date", FieldKind::Date),
    FieldSpec::required("building", "Building", FieldKind::Text),
    FieldSpec::optional("roomNo", "Room No", FieldKind::Text),
    FieldSpec::required("periodFrom", "Period From", FieldKind::Date),
    FieldSpec::required("periodTo", "Period To", FieldKind::Date),
    FieldSpec::required("amount", "Amount", FieldKind::Amount),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 8] = [
    Column::new("Date", 11),
    Column::new("Building", 18),
    Column::new("Room", 8),
    Column::new("From", 11),
    Column::new("To", 11),
    Column::summed("Amount", 12),
    Column::new("Remarks", 19),
    FILES_COLUMN,
];

impl Record for AccommodationBill {
    const KIND: RecordKind = RecordKind::AccommodationBill;

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
            CellValue::Date(self.bill_date),
            CellValue::text(&self.building),
            CellValue::optional_text(self.room_no.as_deref()),
            CellValue::Date(self.period_from),
            CellValue::Date(self.period_to),
            CellValue::Amount(self.amount),
            CellValue::optional_text(self.remarks.as_deref()),
            files_cell(&self.attachments),
        ]
    }

    fn fields() -> &'static [FieldSpec] {
        &FIELDS
    }

    fn blank_form() -> FormValues {
        let mut values = FormValues::default();
        values.set_date("billDate", today());
        values
    }

    fn to_form(&self) -> FormValues {
        let mut values = FormValues::default();
        values.set_date("billDate", self.bill_date);
        values.set("building", self.building.as_str());
        values.set_optional("roomNo", self.room_no.as_deref());
        values.set_date("periodFrom", self.period_from);
        values.set_date("periodTo", self.period_to);
        values.set_amount("amount", self.amount);
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let bill_date = reader.date("billDate");
        let building = reader.text("building");
        let room_no = reader.optional_text("roomNo");
        let period_from = reader.period_date("periodFrom");
        let period_to = reader.period_date("periodTo");
        if !reader.has_error("periodFrom") {
            reader.check(
                period_to >= period_from,
                "periodTo",
                "Period To cannot be before Period From",
            );
        }
        let amount = reader.amount("amount");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        reader.finish(AccommodationBill {
            id: None,
            bill_date,
            building,
            room_no,
            period_from,
            period_to,
            amount,
            remarks,
            attachments,
        })
    }

    fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        &mut self.attachments
    }
}
