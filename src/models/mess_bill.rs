use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, LookupKind, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors, round2};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessBill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub bill_date: NaiveDate,
    pub shop_id: u64,
    pub amount: f64,
    #[serde(default)]
    pub headcount: Option<u64>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_uploaded",
        deserialize_with = "deserialize_stored"
    )]
    pub attachments: Vec<Attachment>,
}

fn cost_per_head(amount: f64, headcount: Option<u64>) -> f64 {
    match headcount {
        Some(n) if n > 0 => round2(amount / n as f64),
        _ => 0.0,
    }
}

static FIELDS: [FieldSpec; 7] = [
    FieldSpec::required("billDate", "Bill Date", FieldKind::Date),
    FieldSpec::required("shopId", "Supplier", FieldKind::Lookup(LookupKind::Shop)),
    FieldSpec::required("amount", "Amount", FieldKind::Amount),
    FieldSpec::optional("headcount", "Headcount", FieldKind::Integer),
    FieldSpec::derived("costPerHead", "Cost / Head"),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 7] = [
    Column::new("Date", 12),
    Column::new("Supplier", 24),
    Column::summed("Amount", 14),
    Column::new("Headcount", 10),
    Column::new("Per Head", 12),
    Column::new("Remarks", 20),
    FILES_COLUMN,
];

impl Record for MessBill {
    const KIND: RecordKind = RecordKind::MessBill;

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
            CellValue::Date(self.bill_date),
            CellValue::Text(lookups.name(LookupKind::Shop, self.shop_id)),
            CellValue::Amount(self.amount),
            self.headcount.map(CellValue::Integer).unwrap_or(CellValue::Empty),
            CellValue::Amount(cost_per_head(self.amount, self.headcount)),
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
        values.set_id("shopId", Some(self.shop_id));
        values.set_amount("amount", self.amount);
        values.set_id("headcount", self.headcount);
        values.set_amount("costPerHead", cost_per_head(self.amount, self.headcount));
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let bill_date = reader.date("billDate");
        let shop_id = reader.lookup("shopId");
        let amount = reader.amount("amount");
        let headcount = reader.optional_integer("headcount");
        reader.check(headcount != Some(0), "headcount", "Headcount must be at least 1");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        reader.finish(MessBill {
            id: None,
            bill_date,
            shop_id,
            amount,
            headcount,
            remarks,
            attachments,
        })
    }

    fn derive(values: &mut FormValues) {
        let headcount = values.get("headcount").trim().parse().ok();
        values.set_amount("costPerHead", cost_per_head(values.number("amount"), headcount));
    }

    fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        &mut self.attachments
    }
}
