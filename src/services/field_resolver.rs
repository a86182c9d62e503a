//! Field resolver - capability layer
//!
//! Turns a sparse caller payload into a fully defaulted `ResolvedFieldSet`.
//! Pure: the only outside input is the calendar day, passed explicitly to
//! `resolve_on`.

use chrono::{Datelike, Days, Local, NaiveDate};
use serde_json::Value as JsonValue;

use crate::error::ResolutionError;
use crate::models::quote::{
    BuildingValuation, FixedAnswers, Occupancy, OwnerBuilding, RawFields, ResolvedFieldSet,
};

// Accepted input keys per field, first present wins
const PERSON_ENTERING_RISK: &[&str] = &["person_entering_risk", "contact_name"];
const PERSON_ENTERING_RISK_EMAIL: &[&str] = &["person_entering_risk_email", "email"];
const COMPANY_NAME: &[&str] = &["company_name", "business_name"];
const MAILING_ADDRESS: &[&str] = &["mailing_address", "address"];
const DBA: &[&str] = &["dba", "dba_name"];
const EFFECTIVE_DATE: &[&str] = &["effective_date"];
const BUSINESS_TYPE: &[&str] = &["business_type"];
const APPLICANT: &[&str] = &["applicant_is", "applicant_type"];
const GROSS_SALES: &[&str] = &["gross_sales", "gross_sales_amount"];
const CONSTRUCTION_YEAR: &[&str] = &["construction_year", "original_construction_year"];
const NUMBER_OF_STORIES: &[&str] = &["number_of_stories", "stories"];
const SQUARE_FOOTAGE: &[&str] = &["square_footage", "square_feet"];
const BPP_LIMIT: &[&str] = &["bpp_limit", "business_personal_property_limit"];
const BUILDING_LIMIT: &[&str] = &["building_limit", "building_value"];
const BUILDING_VALUATION: &[&str] = &["building_valuation"];

const ALL_FIELDS: &[&[&str]] = &[
    PERSON_ENTERING_RISK,
    PERSON_ENTERING_RISK_EMAIL,
    COMPANY_NAME,
    MAILING_ADDRESS,
    DBA,
    EFFECTIVE_DATE,
    BUSINESS_TYPE,
    APPLICANT,
    GROSS_SALES,
    CONSTRUCTION_YEAR,
    NUMBER_OF_STORIES,
    SQUARE_FOOTAGE,
    BPP_LIMIT,
    BUILDING_LIMIT,
    BUILDING_VALUATION,
];

pub const DEFAULT_BUSINESS_TYPE: &str = "LIMITED LIABILITY COMPANY";
pub const DEFAULT_GROSS_SALES: u64 = 100_000;
pub const DEFAULT_NUMBER_OF_STORIES: u32 = 2;
pub const DEFAULT_SQUARE_FOOTAGE: u64 = 3_500;
pub const DEFAULT_BPP_LIMIT: u64 = 70_000;
pub const DEFAULT_BUILDING_LIMIT: u64 = 500_000;
pub const CONSTRUCTION_AGE_YEARS: i32 = 20;

/// Resolve against the local calendar day
pub fn resolve(payload: &RawFields) -> Result<ResolvedFieldSet, ResolutionError> {
    resolve_on(payload, Local::now().date_naive())
}

/// Resolve with `today` driving the clock-derived defaults
pub fn resolve_on(
    payload: &RawFields,
    today: NaiveDate,
) -> Result<ResolvedFieldSet, ResolutionError> {
    reject_structured(payload)?;

    let person_entering_risk = required(payload, PERSON_ENTERING_RISK)?;
    let person_entering_risk_email = required(payload, PERSON_ENTERING_RISK_EMAIL)?;
    if !person_entering_risk_email.contains('@') {
        return Err(ResolutionError::InvalidValue {
            field: PERSON_ENTERING_RISK_EMAIL[0],
            value: person_entering_risk_email,
            expected: "an email address",
        });
    }
    let company_name = required(payload, COMPANY_NAME)?;
    let mailing_address = required(payload, MAILING_ADDRESS)?;

    let effective_date = match lookup(payload, EFFECTIVE_DATE) {
        Some(text) => parse_date(EFFECTIVE_DATE[0], &text)?,
        None => today
            .checked_add_days(Days::new(1))
            .unwrap_or(today),
    };

    let construction_year = match lookup(payload, CONSTRUCTION_YEAR) {
        Some(text) => parse_year(CONSTRUCTION_YEAR[0], &text, today.year())?,
        None => today.year() - CONSTRUCTION_AGE_YEARS,
    };

    let occupancy = match lookup(payload, APPLICANT) {
        Some(text) if is_owner(&text) => Occupancy::Owner(OwnerBuilding {
            building_limit: number_or(payload, BUILDING_LIMIT, DEFAULT_BUILDING_LIMIT)?,
            building_valuation: lookup(payload, BUILDING_VALUATION)
                .map(|v| parse_valuation(&v))
                .unwrap_or(BuildingValuation::ReplacementCost),
        }),
        _ => Occupancy::Tenant,
    };

    Ok(ResolvedFieldSet {
        person_entering_risk,
        person_entering_risk_email,
        company_name,
        mailing_address,
        dba: lookup(payload, DBA),
        effective_date,
        business_type: lookup(payload, BUSINESS_TYPE)
            .unwrap_or_else(|| DEFAULT_BUSINESS_TYPE.to_string()),
        occupancy,
        gross_sales: number_or(payload, GROSS_SALES, DEFAULT_GROSS_SALES)?,
        construction_year,
        number_of_stories: number_or(payload, NUMBER_OF_STORIES, DEFAULT_NUMBER_OF_STORIES as u64)?
            .try_into()
            .map_err(|_| ResolutionError::InvalidValue {
                field: NUMBER_OF_STORIES[0],
                value: lookup(payload, NUMBER_OF_STORIES).unwrap_or_default(),
                expected: "a small whole number",
            })?,
        square_footage: number_or(payload, SQUARE_FOOTAGE, DEFAULT_SQUARE_FOOTAGE)?,
        bpp_limit: number_or(payload, BPP_LIMIT, DEFAULT_BPP_LIMIT)?,
        fixed: FixedAnswers::STANDARD,
    })
}

/// "tenant" wins over "owner"; anything else falls back to tenant
fn is_owner(text: &str) -> bool {
    let lowered = text.to_lowercase();
    !lowered.contains("tenant") && lowered.contains("owner")
}

fn parse_valuation(text: &str) -> BuildingValuation {
    if text.to_lowercase().contains("actual") {
        BuildingValuation::ActualCashValue
    } else {
        BuildingValuation::ReplacementCost
    }
}

/// Known fields only take scalars. A table or list (a TOML native date
/// arrives as a table) is an error, never a silent default.
fn reject_structured(payload: &RawFields) -> Result<(), ResolutionError> {
    for aliases in ALL_FIELDS {
        for key in aliases.iter() {
            if let Some(value @ (JsonValue::Object(_) | JsonValue::Array(_))) = payload.get(*key) {
                return Err(ResolutionError::InvalidValue {
                    field: aliases[0],
                    value: value.to_string(),
                    expected: "a text or number value",
                });
            }
        }
    }
    Ok(())
}

/// First alias holding a non-empty value, as trimmed text
fn lookup(payload: &RawFields, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| match payload.get(*key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn required(payload: &RawFields, aliases: &[&'static str]) -> Result<String, ResolutionError> {
    lookup(payload, aliases).ok_or(ResolutionError::MissingRequiredField { field: aliases[0] })
}

fn number_or(
    payload: &RawFields,
    aliases: &[&'static str],
    default: u64,
) -> Result<u64, ResolutionError> {
    match lookup(payload, aliases) {
        Some(text) => parse_amount(&text).ok_or(ResolutionError::InvalidValue {
            field: aliases[0],
            value: text,
            expected: "a whole number",
        }),
        None => Ok(default),
    }
}

/// Accepts `70000`, `70,000`, `$70,000` and `70000.00`
fn parse_amount(text: &str) -> Option<u64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    if !fraction.chars().all(|c| c == '0') {
        return None;
    }
    whole.parse().ok()
}

fn parse_date(field: &'static str, text: &str) -> Result<NaiveDate, ResolutionError> {
    NaiveDate::parse_from_str(text, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .map_err(|_| ResolutionError::InvalidValue {
            field,
            value: text.to_string(),
            expected: "a date (MM/DD/YYYY or YYYY-MM-DD)",
        })
}

fn parse_year(field: &'static str, text: &str, current_year: i32) -> Result<i32, ResolutionError> {
    match text.parse::<i32>() {
        Ok(year) if (1800..=current_year).contains(&year) => Ok(year),
        _ => Err(ResolutionError::InvalidValue {
            field,
            value: text.to_string(),
            expected: "a four-digit year not in the future",
        }),
    }
}
