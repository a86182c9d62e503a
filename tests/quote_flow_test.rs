mod common;

use common::{calls_for, minimal_payload, test_config, with_field, Call, Script, SimulatedPortal};
use quote_portal_automation::error::{FailureKind, PortalError};
use quote_portal_automation::infrastructure::RadioChoice;
use quote_portal_automation::models::{ApplicantType, Field, RawFields, Stage};
use quote_portal_automation::services::resolve;
use quote_portal_automation::{JobCtx, QuoteFlow};
use serde_json::json;

async fn run(
    payload: RawFields,
    script: Script,
) -> (
    Result<quote_portal_automation::models::QuoteSummary, quote_portal_automation::workflow::StageFailure>,
    Vec<Call>,
) {
    let dir = tempfile::tempdir().unwrap();
    let flow = QuoteFlow::new(&test_config(dir.path(), 1));
    let fields = resolve(&payload).unwrap();
    let (mut portal, journal) = SimulatedPortal::new(script);

    let result = flow.run(&mut portal, &fields, &JobCtx::new("flow")).await;
    let calls = journal.lock().unwrap().clone();
    (result, calls)
}

fn radio_choice(calls: &[Call], field: Field) -> Option<RadioChoice> {
    calls_for(calls, field).into_iter().find_map(|c| c.choice)
}

#[tokio::test]
async fn minimal_tenant_payload_walks_every_stage() {
    let (result, calls) = run(minimal_payload("Acme Hardware"), Script::default()).await;
    let summary = result.unwrap();

    assert_eq!(summary.stages_completed, Stage::ALL.to_vec());
    assert_eq!(summary.applicant, ApplicantType::Tenant);
    assert_eq!(
        summary.mailing_address_suggestion.as_deref(),
        Some("123 Main St, Springfield, MO, USA")
    );

    assert_eq!(
        radio_choice(&calls, Field::ApplicantIs),
        Some(RadioChoice::LabelOrOrdinal("Tenant", 2))
    );
    // owner-only inputs never touched
    assert!(calls_for(&calls, Field::BuildingLimit).is_empty());
    assert!(calls_for(&calls, Field::BuildingValuation).is_empty());
    assert!(calls_for(&calls, Field::Dba).is_empty());

    let last = calls.last().unwrap();
    assert_eq!(last.op, "click");
    assert_eq!(last.locator.unwrap().field, Field::DoneButton);
}

#[tokio::test]
async fn general_information_fills_fields_in_page_order() {
    let payload = with_field(minimal_payload("Acme"), "dba", json!("Acme Tools"));
    let (result, calls) = run(payload, Script::default()).await;
    result.unwrap();

    let general: Vec<(&str, Field)> = calls
        .iter()
        .filter_map(|c| {
            let locator = c.locator?;
            (locator.stage == Stage::GeneralInformation).then_some((c.op, locator.field))
        })
        .collect();

    assert_eq!(
        general,
        vec![
            ("present", Field::EffectiveDate),
            ("click", Field::NewQuoteButton),
            ("click", Field::StartQuoteButton),
            ("wait", Field::EffectiveDate),
            ("radio", Field::NewVenture),
            ("fill", Field::EffectiveDate),
            ("fill", Field::PersonEnteringRisk),
            ("fill", Field::PersonEnteringRiskEmail),
            ("dropdown", Field::BusinessType),
            ("fill", Field::CompanyName),
            ("fill", Field::Dba),
            ("autocomplete", Field::MailingAddress),
            ("click", Field::NextButton),
        ]
    );

    let business_type = calls_for(&calls, Field::BusinessType);
    assert_eq!(
        business_type[0].value.as_deref(),
        Some("LIMITED LIABILITY COMPANY")
    );
}

#[tokio::test]
async fn owner_payload_fills_building_coverage() {
    let payload = with_field(minimal_payload("Acme"), "applicant_type", json!("Building Owner"));
    let payload = with_field(payload, "building_limit", json!("$750,000"));
    let (result, calls) = run(payload, Script::default()).await;

    assert_eq!(result.unwrap().applicant, ApplicantType::Owner);
    assert_eq!(
        radio_choice(&calls, Field::ApplicantIs),
        Some(RadioChoice::LabelOrOrdinal("Owner", 0))
    );
    assert_eq!(
        calls_for(&calls, Field::BuildingLimit)[0].value.as_deref(),
        Some("750000")
    );
    assert_eq!(
        radio_choice(&calls, Field::BuildingValuation),
        Some(RadioChoice::LabelOrOrdinal("Replacement Cost", 0))
    );
}

#[tokio::test]
async fn protection_class_picks_lowest_numeric_option() {
    let (result, calls) = run(minimal_payload("Acme"), Script::default()).await;

    assert_eq!(result.unwrap().protection_class.as_deref(), Some("(1)"));
    assert_eq!(
        radio_choice(&calls, Field::ProtectionClass),
        Some(RadioChoice::Ordinal(2))
    );
}

#[tokio::test]
async fn single_protection_class_is_left_alone() {
    let script = Script {
        protection_labels: vec!["(3)".into()],
        ..Script::default()
    };
    let (result, calls) = run(minimal_payload("Acme"), script).await;

    assert_eq!(result.unwrap().protection_class.as_deref(), Some("(3)"));
    assert!(radio_choice(&calls, Field::ProtectionClass).is_none());
}

#[tokio::test]
async fn placeholder_protection_classes_fail_the_location_stage() {
    let script = Script {
        protection_labels: vec!["(5x)".into(), "(9x)".into()],
        ..Script::default()
    };
    let (result, calls) = run(minimal_payload("Acme"), script).await;

    let failure = result.unwrap_err();
    assert_eq!(failure.stage, Stage::LocationModal);
    assert_eq!(failure.field, Some(Field::ProtectionClass));
    assert!(matches!(failure.cause, PortalError::NoSelectableOption { .. }));
    assert_eq!(failure.detail().kind, FailureKind::NoSelectableOption);

    // nothing after the failure point
    assert!(calls_for(&calls, Field::GrossSales).is_empty());
}

#[tokio::test]
async fn absent_ancillary_question_is_skipped() {
    let script = Script {
        ancillary_present: false,
        ..Script::default()
    };
    let (result, calls) = run(minimal_payload("Acme"), script).await;
    result.unwrap();

    let ancillary = calls_for(&calls, Field::AncillaryBuilding);
    assert_eq!(ancillary.len(), 1);
    assert_eq!(ancillary[0].op, "present");
}

#[tokio::test]
async fn fixed_answers_are_always_sent() {
    let (result, calls) = run(minimal_payload("Acme"), Script::default()).await;
    result.unwrap();

    assert_eq!(
        radio_choice(&calls, Field::AncillaryBuilding),
        Some(RadioChoice::Label("No"))
    );
    assert_eq!(
        radio_choice(&calls, Field::SeparateCanopy),
        Some(RadioChoice::Label("Yes"))
    );
    assert_eq!(
        radio_choice(&calls, Field::PropertyDeductible),
        Some(RadioChoice::Label("$2,500"))
    );
    assert_eq!(
        radio_choice(&calls, Field::RoofType),
        Some(RadioChoice::LabelOrOrdinal("Other", 3))
    );
    assert_eq!(
        radio_choice(&calls, Field::ReviewedCorrect),
        Some(RadioChoice::LabelOrOrdinal("I Agree", 0))
    );
    assert_eq!(
        calls_for(&calls, Field::ClassCode)[0].value.as_deref(),
        Some("09321")
    );

    // wind/hail is a dropdown on the location modal, not a radio group
    let wind = calls_for(&calls, Field::WindHailDeductible);
    assert_eq!(wind.len(), 1);
    assert_eq!(wind[0].op, "dropdown");
    assert_eq!(wind[0].value.as_deref(), Some("$2,500"));
    assert!(radio_choice(&calls, Field::WindHailDeductible).is_none());
    assert_eq!(
        calls_for(&calls, Field::SafeguardBusinessType)[0].value.as_deref(),
        Some("Mercantile")
    );
    assert_eq!(
        calls_for(&calls, Field::MortgageeCount)[0].value.as_deref(),
        Some("0")
    );
}
