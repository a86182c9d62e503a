//! Selector catalog for the Chromium driver
//!
//! Maps the flow's semantic locators onto the portal's DOM. Nothing outside
//! `chromium_portal` reads this table.

use crate::infrastructure::portal_driver::Locator;
use crate::models::Field;

/// How an element is found in the DOM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Plain CSS selector
    Css(&'static str),
    /// `input[type=radio][name=..]` group
    RadioGroup(&'static str),
    /// First `tag` element whose trimmed text contains `text` (case-insensitive)
    Text {
        tag: &'static str,
        text: &'static str,
    },
    /// `selector` inside the form `.field` whose label mentions `label`
    /// (label text, or its `for` attribute with spaces removed)
    InField {
        label: &'static str,
        selector: &'static str,
    },
}

/// Suggestion list rendered under geosuggest inputs
pub const SUGGESTION_ITEMS: &str =
    ".geosuggest__suggests li, .geosuggest__item, div[class*=\"geosuggest__item\"]";

/// Options of an opened semantic-ui dropdown
pub const DROPDOWN_OPTIONS: &str = "div[role=\"option\"], .menu .item";

pub fn target(locator: Locator) -> Target {
    use Field::*;
    match locator.field {
        Username => Target::Css("#username"),
        Password => Target::Css("#password"),
        RememberMe => Target::Css("input[name=\"saveUsername\"]"),
        LoginButton => Target::Text {
            tag: "button",
            text: "login",
        },

        NewQuoteButton => Target::Css("button#NewQuote"),
        StartQuoteButton => Target::Text {
            tag: "button",
            text: "start quote",
        },
        NewVenture => Target::RadioGroup("newVenture"),
        EffectiveDate => Target::Css("#effectiveDate"),
        PersonEnteringRisk => Target::Css("#personEnteringRisk"),
        PersonEnteringRiskEmail => Target::Css("#personEnteringRiskEmail"),
        BusinessType => Target::Css("#businessType"),
        CompanyName => Target::Css("input[name=\"insuredName.company\"]"),
        Dba => Target::Css("[id=\"insuredName.dba\"]"),
        MailingAddress => Target::Css("input[name=\"address.fullAddress\"]"),

        SafeguardBusinessType => Target::Css("[id=\"sfg.businessType\"]"),

        NewLocationButton => Target::Css("button.newLocationButton"),
        AddressSameAsMailing => Target::Text {
            tag: "button",
            text: "address same as mailing",
        },
        ProtectionClass => Target::RadioGroup("protectionClass"),
        PropertyDeductible => Target::RadioGroup("propertyDeductibleAmount"),
        WindHailDeductible => Target::Css("#windHailDeductible"),
        GrossSales => Target::Css("#grossSales"),

        AncillaryBuilding => Target::RadioGroup("ancillaryBuilding"),
        // several search dropdowns share the modal
        ClassCode => Target::InField {
            label: "class code",
            selector: ".ui.search.selection.dropdown",
        },
        SeparateCanopy => Target::RadioGroup("separateCanopy"),
        MortgageeCount => Target::Css("#numberOfMortgageesLossPayees"),
        AdditionalInterests => Target::RadioGroup("additionalInsureds"),
        ApplicantIs => Target::RadioGroup("ownerOccupied"),
        ConstructionYear => Target::Css("#constructionYear"),
        ConstructionType => Target::RadioGroup("constructionType"),
        RoofType => Target::RadioGroup("roofType"),
        NumberOfStories => Target::Css("#numberOfStories"),
        SquareFootage => Target::Css("#squareFootage"),
        Sprinkler => Target::RadioGroup("sprinkler"),
        BuildingLimit => Target::Css("#buildingLimit"),
        BuildingValuation => Target::RadioGroup("buildingValuation"),
        BppLimit => Target::Css("#bppLimit"),
        EarthquakeCoverage => Target::RadioGroup("earthquakeCoverage"),

        ReviewedCorrect => Target::RadioGroup("questions.reviewedCorrect"),
        DoneButton => Target::Css("#Done"),
        NextButton => Target::Css("#Next"),
    }
}
