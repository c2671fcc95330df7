use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, LookupKind, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleBill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub bill_date: NaiveDate,
    pub vehicle_id: u64,
    pub shop_id: u64,
    pub service_type: String,
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

static FIELDS: [FieldSpec; 7] = [
    FieldSpec::required("billDate", "Bill Date", FieldKind::Date),
    FieldSpec::required("vehicleId", "Vehicle", FieldKind::Lookup(LookupKind::Vehicle)),
    FieldSpec::required("shopId", "Garage", FieldKind::Lookup(LookupKind::Shop)),
    FieldSpec::required("serviceType", "Service", FieldKind::Text),
    FieldSpec::required("amount", "Amount", FieldKind::Amount),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 7] = [
    Column::new("Date", 12),
    Column::new("Vehicle", 16),
    Column::new("Garage", 18),
    Column::new("Service", 20),
    Column::summed("Amount", 12),
    Column::new("Remarks", 14),
    FILES_COLUMN,
];

impl Record for VehicleBill {
    const KIND: RecordKind = RecordKind::VehicleBill;

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
            CellValue::text(&self.service_type),
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
        values.set_id("vehicleId", Some(self.vehicle_id));
        values.set_id("shopId", Some(self.shop_id));
        values.set("serviceType", self.service_type.as_str());
        values.set_amount("amount", self.amount);
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let bill_date = reader.date("billDate");
        let vehicle_id = reader.lookup("vehicleId");
        let shop_id = reader.lookup("shopId");
        let service_type = reader.text("serviceType");
        let amount = reader.amount("amount");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        reader.finish(VehicleBill {
            id: None,
            bill_date,
            vehicle_id,
            shop_id,
            service_type,
            amount,
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

    #[test]
    fn all_required_fields_are_reported() {
        let errors = VehicleBill::from_form(&FormValues::default()).unwrap_err();
        for key in ["billDate", "vehicleId", "shopId", "serviceType", "amount"] {
            assert!(errors.for_field(key).is_some(), "{key} not reported");
        }
        assert!(errors.for_field("remarks").is_none());
    }

    #[test]
    fn long_remarks_are_rejected() {
        let mut values = FormValues::default();
        values.set("billDate", "2024-02-02");
        values.set("vehicleId", "1");
        values.set("shopId", "1");
        values.set("serviceType", "Oil change");
        values.set("amount", "180");
        values.set("remarks", "a".repeat(501));
        let errors = VehicleBill::from_form(&values).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.for_field("remarks").is_some());
    }
}
