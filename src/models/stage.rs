//! Portal page graph and semantic field names
//!
//! The state machine only ever addresses elements through `(Stage, Field)`;
//! the CSS behind each pair belongs to the driver.

use serde::Serialize;
use std::fmt;

/// One page (or modal) of the portal quote flow, in traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Login,
    GeneralInformation,
    SafeguardPolicyInformation,
    LocationModal,
    NewBuildingModal,
    BuildingQuestions,
    BuildingCoverage,
    LocationCoverages,
}

impl Stage {
    /// Every stage in the fixed order the flow visits them
    pub const ALL: [Stage; 8] = [
        Stage::Login,
        Stage::GeneralInformation,
        Stage::SafeguardPolicyInformation,
        Stage::LocationModal,
        Stage::NewBuildingModal,
        Stage::BuildingQuestions,
        Stage::BuildingCoverage,
        Stage::LocationCoverages,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Login => "Login",
            Stage::GeneralInformation => "GeneralInformation",
            Stage::SafeguardPolicyInformation => "SafeguardPolicyInformation",
            Stage::LocationModal => "LocationModal",
            Stage::NewBuildingModal => "NewBuildingModal",
            Stage::BuildingQuestions => "BuildingQuestions",
            Stage::BuildingCoverage => "BuildingCoverage",
            Stage::LocationCoverages => "LocationCoverages",
        }
    }

    pub fn next(self) -> Option<Stage> {
        let idx = Stage::ALL.iter().position(|s| *s == self)?;
        Stage::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic name of an element the flow interacts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    // login
    Username,
    Password,
    RememberMe,
    LoginButton,
    // general information
    NewQuoteButton,
    StartQuoteButton,
    NewVenture,
    EffectiveDate,
    PersonEnteringRisk,
    PersonEnteringRiskEmail,
    BusinessType,
    CompanyName,
    Dba,
    MailingAddress,
    // safeguard
    SafeguardBusinessType,
    // location modal
    NewLocationButton,
    AddressSameAsMailing,
    ProtectionClass,
    PropertyDeductible,
    WindHailDeductible,
    GrossSales,
    // new building modal
    AncillaryBuilding,
    ClassCode,
    SeparateCanopy,
    MortgageeCount,
    AdditionalInterests,
    ApplicantIs,
    ConstructionYear,
    ConstructionType,
    RoofType,
    NumberOfStories,
    SquareFootage,
    Sprinkler,
    BuildingLimit,
    BuildingValuation,
    BppLimit,
    EarthquakeCoverage,
    // wrap-up modals
    ReviewedCorrect,
    NextButton,
    DoneButton,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Password => "password",
            Field::RememberMe => "remember_me",
            Field::LoginButton => "login_button",
            Field::NewQuoteButton => "new_quote_button",
            Field::StartQuoteButton => "start_quote_button",
            Field::NewVenture => "new_venture",
            Field::EffectiveDate => "effective_date",
            Field::PersonEnteringRisk => "person_entering_risk",
            Field::PersonEnteringRiskEmail => "person_entering_risk_email",
            Field::BusinessType => "business_type",
            Field::CompanyName => "company_name",
            Field::Dba => "dba",
            Field::MailingAddress => "mailing_address",
            Field::SafeguardBusinessType => "safeguard_business_type",
            Field::NewLocationButton => "new_location_button",
            Field::AddressSameAsMailing => "address_same_as_mailing",
            Field::ProtectionClass => "protection_class",
            Field::PropertyDeductible => "property_deductible",
            Field::WindHailDeductible => "wind_hail_deductible",
            Field::GrossSales => "gross_sales",
            Field::AncillaryBuilding => "ancillary_building",
            Field::ClassCode => "class_code",
            Field::SeparateCanopy => "separate_canopy",
            Field::MortgageeCount => "mortgagee_count",
            Field::AdditionalInterests => "additional_interests",
            Field::ApplicantIs => "applicant_is",
            Field::ConstructionYear => "construction_year",
            Field::ConstructionType => "construction_type",
            Field::RoofType => "roof_type",
            Field::NumberOfStories => "number_of_stories",
            Field::SquareFootage => "square_footage",
            Field::Sprinkler => "sprinkler",
            Field::BuildingLimit => "building_limit",
            Field::BuildingValuation => "building_valuation",
            Field::BppLimit => "bpp_limit",
            Field::EarthquakeCoverage => "earthquake_coverage",
            Field::ReviewedCorrect => "reviewed_correct",
            Field::NextButton => "next_button",
            Field::DoneButton => "done_button",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        assert_eq!(Stage::Login.next(), Some(Stage::GeneralInformation));
        assert_eq!(Stage::LocationModal.next(), Some(Stage::NewBuildingModal));
        assert_eq!(Stage::LocationCoverages.next(), None);
    }

    #[test]
    fn stage_serializes_as_variant_name() {
        let json = serde_json::to_string(&Stage::LocationModal).unwrap();
        assert_eq!(json, "\"LocationModal\"");
    }
}
