//! Maps raw, source-shaped listing records into the canonical [`Listing`].
//!
//! Sources disagree on field names, not on meaning, so each canonical field is
//! resolved through an ordered alias list instead of per-source parsers.
//! Adding a source is a data change here, never a new type.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::domain::{Listing, ListingSource};

const URL_ALIASES: &[&str] = &["url", "link", "permalink", "listing_url", "listingUrl"];
const PRICE_ALIASES: &[&str] = &["price", "listing_price", "asking_price", "listPrice", "amount"];
const MILEAGE_ALIASES: &[&str] = &["mileage", "miles", "odometer", "odometer_miles"];
const YEAR_ALIASES: &[&str] = &["year", "model_year", "modelYear"];
const MAKE_ALIASES: &[&str] = &["make", "manufacturer", "brand"];
const MODEL_ALIASES: &[&str] = &["model", "model_name", "modelName"];
const TRIM_ALIASES: &[&str] = &["trim", "trim_level", "trimLevel", "series"];
const VIN_ALIASES: &[&str] = &["vin", "VIN", "vin_number"];
const SOURCE_ALIASES: &[&str] = &["source", "site", "marketplace", "provider"];
const DEALER_ALIASES: &[&str] = &["dealer", "dealer_name", "dealerName", "seller", "seller_name"];
const LOCATION_ALIASES: &[&str] = &["location", "city", "city_state", "region"];
const ZIP_ALIASES: &[&str] = &["zip", "zipCode", "zip_code", "postal_code", "postalCode"];
const FETCHED_ALIASES: &[&str] = &["fetchedAt", "fetched_at", "retrieved_at", "scraped_at"];
const LISTED_ALIASES: &[&str] = &["listedAt", "listed_at", "listing_date", "listingDate", "posted_at"];
const TRUST_ALIASES: &[&str] = &["trustScore", "trust_score", "confidence", "confidenceScore", "trust"];
const CURRENCY_ALIASES: &[&str] = &["currency", "currency_code", "currencyCode"];
const PHOTO_COUNT_ALIASES: &[&str] = &["photo_count", "photoCount", "num_photos"];
const SOURCE_TYPE_ALIASES: &[&str] = &["source_type", "sourceType", "listing_kind"];

const DEFAULT_TRUST: f64 = 0.5;

/// Fixed exchange rates into USD; unknown codes pass through at 1.0.
fn currency_rate(code: &str) -> f64 {
    match code.trim().to_ascii_uppercase().as_str() {
        "CAD" => 0.73,
        "EUR" => 1.08,
        "GBP" => 1.27,
        "MXN" => 0.054,
        _ => 1.0,
    }
}

/// Normalize one raw record. Returns `None` only when the record is not a
/// JSON object; every malformed field inside an object coerces to a safe
/// default instead of failing the batch.
pub fn normalize(raw: &Value) -> Option<Listing> {
    let record = raw.as_object()?;

    let url = string_field(record, URL_ALIASES);
    let mut price = number_field(record, PRICE_ALIASES).unwrap_or(0.0);
    if !price.is_finite() || price < 0.0 {
        price = 0.0;
    }
    if let Some(code) = string_field(record, CURRENCY_ALIASES) {
        if !code.eq_ignore_ascii_case("USD") {
            price *= currency_rate(&code);
        }
    }

    let year = number_field(record, YEAR_ALIASES)
        .filter(|value| value.is_finite() && *value >= 1900.0 && *value < 2100.0)
        .map(|value| value as i32);
    let make = string_field(record, MAKE_ALIASES).unwrap_or_default();
    let model = string_field(record, MODEL_ALIASES).unwrap_or_default();
    let mileage = number_field(record, MILEAGE_ALIASES).filter(|m| m.is_finite() && *m >= 0.0);

    let source_raw = string_field(record, SOURCE_ALIASES).unwrap_or_default();
    let source = ListingSource::from_raw(&source_raw);

    let id = listing_id(
        url.as_deref(),
        source,
        year,
        &make,
        &model,
        price,
        mileage,
    );

    let trust_score = number_field(record, TRUST_ALIASES)
        .filter(|value| value.is_finite())
        .unwrap_or(DEFAULT_TRUST)
        .clamp(0.0, 1.0);

    let estimated = string_field(record, SOURCE_TYPE_ALIASES)
        .map(|kind| {
            let kind = kind.to_ascii_lowercase();
            kind.contains("estimate") || kind.contains("synthetic") || kind.contains("fallback")
        })
        .unwrap_or(false);

    Some(Listing {
        id,
        vin: string_field(record, VIN_ALIASES).filter(|vin| vin.len() == 17),
        year,
        make,
        model,
        trim: string_field(record, TRIM_ALIASES),
        price,
        mileage,
        source,
        url,
        dealer: string_field(record, DEALER_ALIASES),
        location: string_field(record, LOCATION_ALIASES),
        zip: string_field(record, ZIP_ALIASES),
        fetched_at: datetime_field(record, FETCHED_ALIASES),
        listed_at: date_field(record, LISTED_ALIASES),
        photo_count: photo_count(record),
        estimated,
        trust_score,
    })
}

/// Stable identifier: first 16 hex chars of SHA-256 over the URL when one is
/// present, else over a synthetic composite key. Pure function of its input
/// bytes, so the same record always yields the same id across runs.
fn listing_id(
    url: Option<&str>,
    source: ListingSource,
    year: Option<i32>,
    make: &str,
    model: &str,
    price: f64,
    mileage: Option<f64>,
) -> String {
    let key = match url {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => format!(
            "{}|{}|{}|{}|{}|{}",
            source.label(),
            year.unwrap_or(0),
            make.to_ascii_lowercase(),
            model.to_ascii_lowercase(),
            price as i64,
            mileage.unwrap_or(0.0) as i64,
        ),
    };

    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..8])
}

fn first_value<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|alias| record.get(*alias))
        .filter(|value| !value.is_null())
}

fn string_field(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    let value = first_value(record, aliases)?;
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Coerce a JSON number or numeric-looking string ("$41,000") to f64.
fn number_field(record: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    let value = first_value(record, aliases)?;
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

fn datetime_field(record: &Map<String, Value>, aliases: &[&str]) -> Option<DateTime<Utc>> {
    let raw = string_field(record, aliases)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn date_field(record: &Map<String, Value>, aliases: &[&str]) -> Option<NaiveDate> {
    let raw = string_field(record, aliases)?;
    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.date_naive())
        .ok()
}

fn photo_count(record: &Map<String, Value>) -> u32 {
    if let Some(Value::Array(photos)) = record.get("photos") {
        return photos.len() as u32;
    }
    number_field(record, PHOTO_COUNT_ALIASES)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u32)
        .unwrap_or(0)
}
