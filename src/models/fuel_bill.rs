use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, LookupKind, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors, round2};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelBill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub bill_date: NaiveDate,
    pub vehicle_id: u64,
    pub shop_id: u64,
    pub litres: f64,
    pub amount: f64,
    #[serde(default)]
    pub odometer: Option<u64>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_uploaded",
        deserialize_with = "deserialize_stored"
    )]
    pub attachments: Vec<Attachment>,
}

impl FuelBill {
    pub fn price_per_litre(&self) -> f64 {
        price_per_litre(self.amount, self.litres)
    }
}

fn price_per_litre(amount: f64, litres: f64) -> f64 {
    if litres > 0.0 {
        round2(amount / litres)
    } else {
        0.0
    }
}

static FIELDS: [FieldSpec; 9] = [
    FieldSpec::required("billDate", "Bill Date", FieldKind::Date),
    FieldSpec::required("vehicleId", "Vehicle", FieldKind::Lookup(LookupKind::Vehicle)),
    FieldSpec::required("shopId", "Fuel Station", FieldKind::Lookup(LookupKind::Shop)),
    FieldSpec::required("litres", "Litres", FieldKind::Amount),
    FieldSpec::required("amount", "Amount", FieldKind::Amount),
    FieldSpec::derived("pricePerLitre", "Price / Litre"),
    FieldSpec::optional("odometer", "Odometer (km)", FieldKind::Integer),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 8] = [
    Column::new("Date", 11),
    Column::new("Vehicle", 14),
    Column::new("Station", 16),
    Column::summed("Litres", 9),
    Column::summed("Amount", 11),
    Column::new("Price/L", 9),
    Column::new("Odometer", 10),
    FILES_COLUMN,
];

impl Record for FuelBill {
    const KIND: RecordKind = RecordKind::FuelBill;

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
            CellValue::Text(lookups.name(LookupKind::Vehicle, self.vehicle_id)),
            CellValue::Text(lookups.name(LookupKind::Shop, self.shop_id)),
            CellValue::Amount(self.litres),
            CellValue::Amount(self.amount),
            CellValue::Amount(self.price_per_litre()),
            self.odometer.map(CellValue::Integer).unwrap_or(CellValue::Empty),
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
        values.set_id("vehicleId", Some(self.vehicle_id));
        values.set_id("shopId", Some(self.shop_id));
        values.set_amount("litres", self.litres);
        values.set_amount("amount", self.amount);
        values.set_amount("pricePerLitre", self.price_per_litre());
        values.set_id("odometer", self.odometer);
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let bill_date = reader.date("billDate");
        let vehicle_id = reader.lookup("vehicleId");
        let shop_id = reader.lookup("shopId");
        let litres = reader.amount("litres");
        let amount = reader.amount("amount");
        let odometer = reader.optional_integer("odometer");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        reader.finish(FuelBill {
            id: None,
            bill_date,
            vehicle_id,
            shop_id,
            litres,
            amount,
            odometer,
            remarks,
            attachments,
        })
    }

    fn derive(values: &mut FormValues) {
        let price = price_per_litre(values.number("amount"), values.number("litres"));
        values.set_amount("pricePerLitre", price);
    }

    fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        &mut self.attachments
    }
}
