use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Attachment, FILES_COLUMN, LookupKind, Lookups, deserialize_stored, files_cell, serialize_uploaded, today};
use crate::forms::{FieldKind, FieldSpec, FormReader, FormValues, ValidationErrors, round2};
use crate::records::{CellValue, Column, Record, RecordKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralBill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub bill_date: NaiveDate,
    pub shop_id: u64,
    pub category_id: u64,
    pub invoice_no: String,
    pub amount: f64,
    #[serde(default)]
    pub vat_amount: f64,
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

static FIELDS: [FieldSpec; 9] = [
    FieldSpec::required("billDate", "Bill Date", FieldKind::Date),
    FieldSpec::required("shopId", "Shop", FieldKind::Lookup(LookupKind::Shop)),
    FieldSpec::required("categoryId", "Category", FieldKind::Lookup(LookupKind::Category)),
    FieldSpec::required("invoiceNo", "Invoice No", FieldKind::Text),
    FieldSpec::required("amount", "Amount", FieldKind::Amount),
    FieldSpec::optional("vatAmount", "VAT", FieldKind::Amount),
    FieldSpec::derived("totalAmount", "Total"),
    FieldSpec::optional("remarks", "Remarks", FieldKind::Remarks),
    FieldSpec::attachments(),
];

static COLUMNS: [Column; 8] = [
    Column::new("Date", 12),
    Column::new("Shop", 18),
    Column::new("Category", 14),
    Column::new("Invoice No", 12),
    Column::summed("Amount", 11),
    Column::summed("VAT", 10),
    Column::summed("Total", 11),
    FILES_COLUMN,
];

impl Record for GeneralBill {
    const KIND: RecordKind = RecordKind::GeneralBill;

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
            CellValue::Text(lookups.name(LookupKind::Category, self.category_id)),
            CellValue::text(&self.invoice_no),
            CellValue::Amount(self.amount),
            CellValue::Amount(self.vat_amount),
            CellValue::Amount(round2(self.amount + self.vat_amount)),
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
        values.set_id("categoryId", Some(self.category_id));
        values.set("invoiceNo", self.invoice_no.as_str());
        values.set_amount("amount", self.amount);
        values.set_amount("vatAmount", self.vat_amount);
        values.set_amount("totalAmount", self.total_amount);
        values.set_optional("remarks", self.remarks.as_deref());
        values.attachments = self.attachments.clone();
        values
    }

    fn from_form(values: &FormValues) -> Result<Self, ValidationErrors> {
        let mut reader = FormReader::new(values, &FIELDS);
        let bill_date = reader.date("billDate");
        let shop_id = reader.lookup("shopId");
        let category_id = reader.lookup("categoryId");
        let invoice_no = reader.text("invoiceNo");
        let amount = reader.amount("amount");
        let vat_amount = reader.non_negative("vatAmount");
        let remarks = reader.remarks("remarks");
        let attachments = reader.attachments();

        reader.finish(GeneralBill {
            id: None,
            bill_date,
            shop_id,
            category_id,
            invoice_no,
            amount,
            vat_amount,
            total_amount: round2(amount + vat_amount),
            remarks,
            attachments,
        })
    }

    fn derive(values: &mut FormValues) {
        let total = values.number("amount") + values.number("vatAmount");
        values.set_amount("totalAmount", round2(total));
    }

    fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
        &mut self.attachments
    }
}
