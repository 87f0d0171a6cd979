use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A contract as delivered by the dashboard's REST layer.
///
/// Every scalar is optional because the listing endpoints return partially
/// filled records; the document pipeline substitutes a placeholder text for
/// anything missing. The record is never mutated by the generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractRecord {
    pub id: Option<i64>,
    #[serde(deserialize_with = "string_or_number")]
    pub contract_number: Option<String>,
    /// ISO date (`2024-03-01`) or RFC 3339 timestamp.
    pub contract_date: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub percent: Option<f64>,
    pub status: Option<i32>,
    pub status_text: Option<String>,

    // Client identity.
    pub full_name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub passport: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub phone: Option<String>,
    pub address: Option<String>,

    // Business identity and bank details.
    pub business_name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub inn: Option<String>,
    pub director: Option<String>,
    pub bank_name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub bank_account: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub mfo: Option<String>,

    /// Either an HTTP(S) URL or a `data:image/...;base64,` URI.
    pub qr_code: Option<String>,

    pub laboratory: Vec<LaboratoryEntry>,
    pub monthly_payments: Vec<MonthlyPayment>,
    pub payments: Vec<Payment>,
}

/// A laboratory test included in the contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaboratoryEntry {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "type", deserialize_with = "string_or_number")]
    pub type_code: Option<String>,
}

/// One row of the contract's monthly payment schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonthlyPayment {
    /// Calendar month, 1 = January.
    pub month: Option<u32>,
    #[serde(deserialize_with = "number_or_string")]
    pub fee: Option<f64>,
    #[serde(deserialize_with = "number_or_string")]
    pub given_amount: Option<f64>,
    pub status: Option<i32>,
    pub due_date: Option<String>,
}

/// A payment already received against the contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Payment {
    #[serde(deserialize_with = "number_or_string")]
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub payment_type: Option<String>,
    pub operator_name: Option<String>,
    pub comment: Option<String>,
    pub created_at: Option<String>,
}

/// Accepts `"123"`, `123` or `null` for identifier-like fields.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Int(n)) => Some(n.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
        None => None,
    })
}

/// Accepts `1250000`, `1250000.5`, `"1250000.00"` or `null` for amounts.
/// A blank string counts as missing.
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid amount {s:?}"))),
        None => Ok(None),
    }
}
