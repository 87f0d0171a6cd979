//! # Template Context
//!
//! Flattens a `ContractRecord` into the display values a contract template
//! refers to. Every scalar becomes a string (currency grouped and suffixed,
//! dates day-first, missing values replaced by `format::NOT_AVAILABLE`), the
//! three collections become numbered rows, and each month's scheduled fee is
//! exposed under the month's own name.
//!
//! The context is rebuilt for every document and dropped with it.

use common::model::contract::{ContractRecord, LaboratoryEntry, MonthlyPayment, Payment};
use log::warn;
use serde::Serialize;

use super::format;
use super::months::{Month, MonthFees};
use super::words::amount_in_words;

/// Value of the `qr_code` field when an image is ready to be embedded. The
/// image module only injects bytes for tags carrying this value.
pub const QR_CODE_PLACEHOLDER: &str = "QR_CODE_PLACEHOLDER";

#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    #[serde(flatten)]
    pub fields: ContractFields,
    pub laboratory: Vec<LaboratoryRow>,
    pub monthly_payments: Vec<MonthlyPaymentRow>,
    pub payments: Vec<PaymentRow>,
    #[serde(flatten)]
    pub month_fees: MonthFees,
    pub qr_code: String,
}

/// Scalar contract fields in display form.
#[derive(Debug, Clone, Serialize)]
pub struct ContractFields {
    pub contract_number: String,
    pub contract_date: String,
    pub price: String,
    pub price_in_words: String,
    pub percent: String,
    pub status: String,
    pub status_text: String,
    pub full_name: String,
    pub passport: String,
    pub phone: String,
    pub address: String,
    pub business_name: String,
    pub inn: String,
    pub director: String,
    pub bank_name: String,
    pub bank_account: String,
    pub mfo: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaboratoryRow {
    pub index: usize,
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyPaymentRow {
    pub index: usize,
    pub month: String,
    pub fee: String,
    pub given_amount: String,
    pub status: String,
    pub due_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRow {
    pub index: usize,
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub operator: String,
    pub comment: String,
    pub date: String,
}

impl TemplateContext {
    /// Builds the context for `record`. `qr_available` decides whether the
    /// image placeholder is armed.
    pub fn build(record: &ContractRecord, qr_available: bool) -> TemplateContext {
        let mut month_fees = MonthFees::default();
        for payment in &record.monthly_payments {
            match payment.month.and_then(Month::from_number) {
                Some(month) => month_fees.set(month, format::currency(payment.fee)),
                None => warn!(
                    "Skipping monthly fee with invalid month {:?} for contract {:?}",
                    payment.month, record.contract_number
                ),
            }
        }

        TemplateContext {
            fields: ContractFields::from_record(record),
            laboratory: numbered(&record.laboratory, LaboratoryRow::from_entry),
            monthly_payments: numbered(&record.monthly_payments, MonthlyPaymentRow::from_payment),
            payments: numbered(&record.payments, PaymentRow::from_payment),
            month_fees,
            qr_code: if qr_available {
                QR_CODE_PLACEHOLDER.to_string()
            } else {
                String::new()
            },
        }
    }

    /// The context of an empty record, used to dry-run templates.
    pub fn empty() -> TemplateContext {
        TemplateContext::build(&ContractRecord::default(), false)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl ContractFields {
    fn from_record(record: &ContractRecord) -> ContractFields {
        let price_in_words = match format::whole_units(record.price) {
            Some(units) if units > 0 => amount_in_words(units.unsigned_abs()),
            _ => format::NOT_AVAILABLE.to_string(),
        };

        ContractFields {
            contract_number: format::text(record.contract_number.as_deref()),
            contract_date: format::date(record.contract_date.as_deref()),
            price: format::currency(record.price),
            price_in_words,
            percent: format::percent(record.percent),
            status: format::code(record.status),
            status_text: format::text(record.status_text.as_deref()),
            full_name: format::text(record.full_name.as_deref()),
            passport: format::text(record.passport.as_deref()),
            phone: format::text(record.phone.as_deref()),
            address: format::text(record.address.as_deref()),
            business_name: format::text(record.business_name.as_deref()),
            inn: format::text(record.inn.as_deref()),
            director: format::text(record.director.as_deref()),
            bank_name: format::text(record.bank_name.as_deref()),
            bank_account: format::text(record.bank_account.as_deref()),
            mfo: format::text(record.mfo.as_deref()),
        }
    }
}

impl LaboratoryRow {
    fn from_entry(index: usize, entry: &LaboratoryEntry) -> LaboratoryRow {
        LaboratoryRow {
            index,
            id: format::code(entry.id),
            name: format::text(entry.name.as_deref()),
            kind: format::text(entry.type_code.as_deref()),
        }
    }
}

impl MonthlyPaymentRow {
    fn from_payment(index: usize, payment: &MonthlyPayment) -> MonthlyPaymentRow {
        MonthlyPaymentRow {
            index,
            month: payment
                .month
                .and_then(Month::from_number)
                .map(|m| m.name().to_string())
                .unwrap_or_else(|| format::NOT_AVAILABLE.to_string()),
            fee: format::currency(payment.fee),
            given_amount: format::currency(payment.given_amount),
            status: format::code(payment.status),
            due_date: format::date(payment.due_date.as_deref()),
        }
    }
}

impl PaymentRow {
    fn from_payment(index: usize, payment: &Payment) -> PaymentRow {
        PaymentRow {
            index,
            amount: format::currency(payment.amount),
            kind: format::text(payment.payment_type.as_deref()),
            operator: format::text(payment.operator_name.as_deref()),
            comment: format::text(payment.comment.as_deref()),
            date: format::date(payment.created_at.as_deref()),
        }
    }
}

/// Maps items to rows with a 1-based index.
fn numbered<T, R>(items: &[T], row: impl Fn(usize, &T) -> R) -> Vec<R> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| row(i + 1, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ContractRecord {
        ContractRecord {
            contract_number: Some("A-17".to_string()),
            contract_date: Some("2024-03-01".to_string()),
            price: Some(1_250_000.0),
            full_name: Some("Каримов Алишер".to_string()),
            laboratory: vec![LaboratoryEntry {
                id: Some(4),
                name: Some("Сув таҳлили".to_string()),
                type_code: None,
            }],
            monthly_payments: vec![
                MonthlyPayment {
                    month: Some(3),
                    fee: Some(500_000.0),
                    ..Default::default()
                },
                MonthlyPayment {
                    month: Some(14),
                    fee: Some(1.0),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn formats_scalar_fields() {
        let context = TemplateContext::build(&sample_record(), false);
        assert_eq!(context.fields.contract_number, "A-17");
        assert_eq!(context.fields.contract_date, "01.03.2024");
        assert_eq!(context.fields.price, "1 250 000 сўм");
        assert_eq!(
            context.fields.price_in_words,
            "бир миллион икки юз эллик минг сўм"
        );
        assert_eq!(context.fields.bank_name, format::NOT_AVAILABLE);
        assert!(context.qr_code.is_empty());
    }

    #[test]
    fn numbers_rows_from_one() {
        let context = TemplateContext::build(&sample_record(), true);
        assert_eq!(context.laboratory[0].index, 1);
        assert_eq!(context.laboratory[0].kind, format::NOT_AVAILABLE);
        assert_eq!(context.monthly_payments[0].month, "март");
        assert_eq!(context.monthly_payments[1].index, 2);
        assert_eq!(context.monthly_payments[1].month, format::NOT_AVAILABLE);
        assert_eq!(context.qr_code, QR_CODE_PLACEHOLDER);
    }

    #[test]
    fn month_fees_are_top_level_keys() {
        let value = TemplateContext::build(&sample_record(), false)
            .to_value()
            .unwrap();
        assert_eq!(value["март"], "500 000 сўм");
        assert_eq!(value["апрел"], format::NOT_AVAILABLE);
        assert_eq!(value["contract_number"], "A-17");
        assert_eq!(value["laboratory"][0]["type"], format::NOT_AVAILABLE);
    }

    #[test]
    fn empty_context_has_every_key() {
        let value = TemplateContext::empty().to_value().unwrap();
        let object = value.as_object().unwrap();
        for key in ["contract_number", "price_in_words", "mfo", "декабр", "qr_code"] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(value["payments"], serde_json::json!([]));
        assert_eq!(value["price_in_words"], format::NOT_AVAILABLE);
    }
}
