use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Sparse business-field map as received from the caller
pub type RawFields = Map<String, JsonValue>;

/// Inbound job request
///
/// ```json
/// { "action": "start_automation", "task_id": "optional", "quote_data": { ... } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub quote_data: RawFields,
    /// Where the request was loaded from, if it came from disk
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

pub const START_AUTOMATION: &str = "start_automation";

fn default_action() -> String {
    START_AUTOMATION.to_string()
}

impl QuoteRequest {
    pub fn new(quote_data: RawFields) -> Self {
        Self {
            action: default_action(),
            task_id: None,
            quote_data,
            file_path: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn is_start_automation(&self) -> bool {
        self.action == START_AUTOMATION
    }
}

/// Applicant relationship to the building, derived once from free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantType {
    Tenant,
    Owner,
}

/// Building valuation basis, only meaningful for owners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildingValuation {
    #[serde(rename = "Replacement Cost")]
    ReplacementCost,
    #[serde(rename = "Actual Cash Value")]
    ActualCashValue,
}

impl BuildingValuation {
    pub fn label(self) -> &'static str {
        match self {
            BuildingValuation::ReplacementCost => "Replacement Cost",
            BuildingValuation::ActualCashValue => "Actual Cash Value",
        }
    }

    /// Rendered position of the option in the valuation radio group
    pub fn ordinal(self) -> usize {
        match self {
            BuildingValuation::ReplacementCost => 0,
            BuildingValuation::ActualCashValue => 1,
        }
    }
}

/// Owner-only building coverage inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerBuilding {
    pub building_limit: u64,
    pub building_valuation: BuildingValuation,
}

/// Tenant/owner branch; owner fields exist only on the owner variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "applicant", rename_all = "snake_case")]
pub enum Occupancy {
    Tenant,
    Owner(OwnerBuilding),
}

impl Occupancy {
    pub fn applicant_type(&self) -> ApplicantType {
        match self {
            Occupancy::Tenant => ApplicantType::Tenant,
            Occupancy::Owner(_) => ApplicantType::Owner,
        }
    }

    pub fn owner_building(&self) -> Option<&OwnerBuilding> {
        match self {
            Occupancy::Owner(building) => Some(building),
            Occupancy::Tenant => None,
        }
    }
}

/// Answers the portal always receives regardless of input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedAnswers {
    pub new_venture: bool,
    pub safeguard_business_type: &'static str,
    pub property_deductible: &'static str,
    pub wind_hail_deductible: &'static str,
    pub construction_type: &'static str,
    pub roof_type: &'static str,
    pub sprinkler: bool,
    pub class_code: &'static str,
    pub separate_canopy: bool,
    pub mortgagee_count: u32,
    pub additional_interests: bool,
    pub earthquake_coverage: bool,
    pub ancillary_building: bool,
    pub building_questions_agree: bool,
}

impl FixedAnswers {
    pub const STANDARD: FixedAnswers = FixedAnswers {
        new_venture: false,
        safeguard_business_type: "Mercantile",
        property_deductible: "$2,500",
        wind_hail_deductible: "$2,500",
        construction_type: "Frame",
        roof_type: "Other",
        sprinkler: false,
        class_code: "09321",
        separate_canopy: true,
        mortgagee_count: 0,
        additional_interests: false,
        earthquake_coverage: false,
        ancillary_building: false,
        building_questions_agree: true,
    };
}

/// Fully defaulted, validated inputs for one quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFieldSet {
    pub person_entering_risk: String,
    pub person_entering_risk_email: String,
    pub company_name: String,
    pub mailing_address: String,
    pub dba: Option<String>,
    pub effective_date: NaiveDate,
    pub business_type: String,
    pub occupancy: Occupancy,
    pub gross_sales: u64,
    pub construction_year: i32,
    pub number_of_stories: u32,
    pub square_footage: u64,
    pub bpp_limit: u64,
    pub fixed: FixedAnswers,
}

impl ResolvedFieldSet {
    /// Effective date in the portal's `MM/DD/YYYY` format
    pub fn effective_date_text(&self) -> String {
        self.effective_date.format("%m/%d/%Y").to_string()
    }

    pub fn applicant_type(&self) -> ApplicantType {
        self.occupancy.applicant_type()
    }
}

/// Summary recorded on a successful job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteSummary {
    pub company_name: String,
    pub applicant: ApplicantType,
    pub effective_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailing_address_suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection_class: Option<String>,
    pub stages_completed: Vec<crate::models::Stage>,
}
