//! Quote flow - workflow layer
//!
//! Drives one resolved field set through the portal's page graph:
//!
//! 1. Login
//! 2. General Information
//! 3. Safeguard Policy Information
//! 4. Location modal
//! 5. New Building modal
//! 6. Building Questions -> Building Coverage -> Location Coverages
//!
//! Single attempt. The first unrecoverable error ends the flow with the stage
//! and field it happened at; nothing is retried or resumed.

use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{FailureDetail, PortalError};
use crate::infrastructure::{Credentials, Locator, PortalDriver, RadioChoice};
use crate::models::{ApplicantType, Field, QuoteSummary, ResolvedFieldSet, Stage};
use crate::workflow::job_ctx::JobCtx;
use crate::workflow::protection_class::{choose_protection_class, ProtectionClassChoice};

/// Why a flow stopped
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub field: Option<Field>,
    pub cause: PortalError,
}

impl StageFailure {
    /// Serializable form recorded on the job
    pub fn detail(&self) -> FailureDetail {
        FailureDetail {
            kind: self.cause.kind(),
            stage: Some(self.stage),
            field: self.field.or_else(|| self.cause.field()).map(|f| f.name().to_string()),
            message: self.cause.to_string(),
            screenshot: None,
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "{} failed at {}: {}", self.stage, field, self.cause),
            None => write!(f, "{} failed: {}", self.stage, self.cause),
        }
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// One page of the flow: every call is addressed to `stage` and every error
/// is tagged with the field it was about.
struct StagePage<'a, D: PortalDriver + ?Sized> {
    driver: &'a mut D,
    stage: Stage,
}

impl<'a, D: PortalDriver + ?Sized> StagePage<'a, D> {
    fn new(driver: &'a mut D, stage: Stage) -> Self {
        Self { driver, stage }
    }

    fn at(&self, field: Field) -> Locator {
        Locator::new(self.stage, field)
    }

    fn failed(&self, field: Field) -> impl FnOnce(PortalError) -> StageFailure {
        let stage = self.stage;
        move |cause| StageFailure {
            stage,
            field: Some(field),
            cause,
        }
    }

    async fn wait(&mut self, field: Field, timeout: Duration) -> Result<(), StageFailure> {
        let locator = self.at(field);
        let result = self.driver.wait_for_visible(locator, timeout).await;
        result.map_err(self.failed(field))
    }

    async fn fill(&mut self, field: Field, value: &str) -> Result<(), StageFailure> {
        let locator = self.at(field);
        let result = self.driver.fill(locator, value).await;
        result.map_err(self.failed(field))
    }

    async fn radio(&mut self, field: Field, choice: RadioChoice) -> Result<(), StageFailure> {
        let locator = self.at(field);
        let result = self.driver.select_radio(locator, choice).await;
        result.map_err(self.failed(field))
    }

    async fn dropdown(&mut self, field: Field, value: &str) -> Result<(), StageFailure> {
        let locator = self.at(field);
        let result = self.driver.select_from_dropdown(locator, value).await;
        result.map_err(self.failed(field))
    }

    async fn autocomplete(&mut self, field: Field, text: &str) -> Result<String, StageFailure> {
        let locator = self.at(field);
        let result = self
            .driver
            .select_first_autocomplete_suggestion(locator, text)
            .await;
        result.map_err(self.failed(field))
    }

    async fn click(&mut self, field: Field) -> Result<(), StageFailure> {
        let locator = self.at(field);
        let result = self.driver.click(locator).await;
        result.map_err(self.failed(field))
    }

    async fn labels(&mut self, field: Field) -> Result<Vec<String>, StageFailure> {
        let locator = self.at(field);
        let result = self.driver.option_labels(locator).await;
        result.map_err(self.failed(field))
    }

    async fn present(&mut self, field: Field) -> Result<bool, StageFailure> {
        let locator = self.at(field);
        let result = self.driver.is_present(locator).await;
        result.map_err(self.failed(field))
    }
}

/// Facts picked up along the way, reported in the summary
#[derive(Default)]
struct Progress {
    mailing_address_suggestion: Option<String>,
    protection_class: Option<String>,
    stages_completed: Vec<Stage>,
}

/// Quote flow
///
/// - Knows the page graph and the per-page field order
/// - Holds no browser resources; the driver is lent per run
pub struct QuoteFlow {
    credentials: Credentials,
    element_timeout: Duration,
    verbose_logging: bool,
}

impl QuoteFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            credentials: config.credentials(),
            element_timeout: config.element_timeout(),
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run<D: PortalDriver + ?Sized>(
        &self,
        driver: &mut D,
        fields: &ResolvedFieldSet,
        ctx: &JobCtx,
    ) -> Result<QuoteSummary, StageFailure> {
        if self.verbose_logging {
            debug!("{} resolved fields: {:?}", ctx, fields);
        }

        let mut progress = Progress::default();

        for stage in Stage::ALL {
            ctx.enter(stage);
            info!("{} ▶ {}", ctx, stage);

            let mut page = StagePage::new(&mut *driver, stage);
            match stage {
                Stage::Login => self.login(&mut page).await?,
                Stage::GeneralInformation => {
                    self.general_information(&mut page, fields, &mut progress)
                        .await?
                }
                Stage::SafeguardPolicyInformation => {
                    self.safeguard_policy_information(&mut page, fields).await?
                }
                Stage::LocationModal => {
                    self.location_modal(&mut page, fields, &mut progress, ctx)
                        .await?
                }
                Stage::NewBuildingModal => self.new_building_modal(&mut page, fields, ctx).await?,
                Stage::BuildingQuestions => self.building_questions(&mut page, fields).await?,
                Stage::BuildingCoverage => page.click(Field::NextButton).await?,
                Stage::LocationCoverages => page.click(Field::DoneButton).await?,
            }

            progress.stages_completed.push(stage);
            debug!("{} ✓ {}", ctx, stage);
        }

        info!("{} ✓ quote entered for {}", ctx, fields.company_name);

        Ok(QuoteSummary {
            company_name: fields.company_name.clone(),
            applicant: fields.applicant_type(),
            effective_date: fields.effective_date_text(),
            mailing_address_suggestion: progress.mailing_address_suggestion,
            protection_class: progress.protection_class,
            stages_completed: progress.stages_completed,
        })
    }

    async fn login<D: PortalDriver + ?Sized>(
        &self,
        page: &mut StagePage<'_, D>,
    ) -> Result<(), StageFailure> {
        page.driver
            .login(&self.credentials)
            .await
            .map_err(|cause| StageFailure {
                stage: Stage::Login,
                field: None,
                cause,
            })
    }

    async fn general_information<D: PortalDriver + ?Sized>(
        &self,
        page: &mut StagePage<'_, D>,
        fields: &ResolvedFieldSet,
        progress: &mut Progress,
    ) -> Result<(), StageFailure> {
        // the landing page only shows the form after New Quote -> Start Quote
        if !page.present(Field::EffectiveDate).await? {
            page.click(Field::NewQuoteButton).await?;
            page.click(Field::StartQuoteButton).await?;
        }
        page.wait(Field::EffectiveDate, self.element_timeout).await?;

        page.radio(
            Field::NewVenture,
            RadioChoice::Label(yes_no(fields.fixed.new_venture)),
        )
        .await?;
        page.fill(Field::EffectiveDate, &fields.effective_date_text())
            .await?;
        page.fill(Field::PersonEnteringRisk, &fields.person_entering_risk)
            .await?;
        page.fill(
            Field::PersonEnteringRiskEmail,
            &fields.person_entering_risk_email,
        )
        .await?;
        page.dropdown(Field::BusinessType, &fields.business_type)
            .await?;
        page.fill(Field::CompanyName, &fields.company_name).await?;
        if let Some(dba) = &fields.dba {
            page.fill(Field::Dba, dba).await?;
        }

        let suggestion = page
            .autocomplete(Field::MailingAddress, &fields.mailing_address)
            .await?;
        progress.mailing_address_suggestion = Some(suggestion);

        page.click(Field::NextButton).await
    }

    async fn safeguard_policy_information<D: PortalDriver + ?Sized>(
        &self,
        page: &mut StagePage<'_, D>,
        fields: &ResolvedFieldSet,
    ) -> Result<(), StageFailure> {
        page.dropdown(
            Field::SafeguardBusinessType,
            fields.fixed.safeguard_business_type,
        )
        .await?;
        page.click(Field::NextButton).await
    }

    async fn location_modal<D: PortalDriver + ?Sized>(
        &self,
        page: &mut StagePage<'_, D>,
        fields: &ResolvedFieldSet,
        progress: &mut Progress,
        ctx: &JobCtx,
    ) -> Result<(), StageFailure> {
        page.click(Field::NewLocationButton).await?;
        page.click(Field::AddressSameAsMailing).await?;

        let labels = page.labels(Field::ProtectionClass).await?;
        match choose_protection_class(&labels) {
            Ok(ProtectionClassChoice::AlreadySelected) => {
                info!("{} protection class: single option, already selected", ctx);
                progress.protection_class = labels.into_iter().next();
            }
            Ok(ProtectionClassChoice::Select { index, label, code }) => {
                info!("{} protection class: {} (code {})", ctx, label, code);
                page.radio(Field::ProtectionClass, RadioChoice::Ordinal(index))
                    .await?;
                progress.protection_class = Some(label);
            }
            Err(reason) => {
                warn!("{} ⚠️ protection class: {} ({:?})", ctx, reason, labels);
                return Err(StageFailure {
                    stage: page.stage,
                    field: Some(Field::ProtectionClass),
                    cause: PortalError::NoSelectableOption {
                        stage: page.stage,
                        field: Field::ProtectionClass,
                        reason: reason.to_string(),
                    },
                });
            }
        }

        page.radio(
            Field::PropertyDeductible,
            RadioChoice::Label(fields.fixed.property_deductible),
        )
        .await?;
        page.dropdown(Field::WindHailDeductible, fields.fixed.wind_hail_deductible)
            .await?;
        page.fill(Field::GrossSales, &fields.gross_sales.to_string())
            .await?;

        page.click(Field::NextButton).await
    }

    async fn new_building_modal<D: PortalDriver + ?Sized>(
        &self,
        page: &mut StagePage<'_, D>,
        fields: &ResolvedFieldSet,
        ctx: &JobCtx,
    ) -> Result<(), StageFailure> {
        let fixed = &fields.fixed;

        // only rendered for some class codes
        if page.present(Field::AncillaryBuilding).await? {
            page.radio(
                Field::AncillaryBuilding,
                RadioChoice::Label(yes_no(fixed.ancillary_building)),
            )
            .await?;
        } else {
            debug!("{} ancillary building question not shown", ctx);
        }

        page.dropdown(Field::ClassCode, fixed.class_code).await?;
        page.radio(
            Field::SeparateCanopy,
            RadioChoice::Label(yes_no(fixed.separate_canopy)),
        )
        .await?;
        page.fill(Field::MortgageeCount, &fixed.mortgagee_count.to_string())
            .await?;
        page.radio(
            Field::AdditionalInterests,
            RadioChoice::Label(yes_no(fixed.additional_interests)),
        )
        .await?;

        page.radio(Field::ApplicantIs, applicant_choice(fields.applicant_type()))
            .await?;

        page.fill(Field::ConstructionYear, &fields.construction_year.to_string())
            .await?;
        page.radio(
            Field::ConstructionType,
            RadioChoice::LabelOrOrdinal(fixed.construction_type, 0),
        )
        .await?;
        page.radio(
            Field::RoofType,
            RadioChoice::LabelOrOrdinal(fixed.roof_type, 3),
        )
        .await?;
        page.fill(Field::NumberOfStories, &fields.number_of_stories.to_string())
            .await?;
        page.fill(Field::SquareFootage, &fields.square_footage.to_string())
            .await?;
        page.radio(
            Field::Sprinkler,
            RadioChoice::Label(yes_no(fixed.sprinkler)),
        )
        .await?;

        if let Some(owner) = fields.occupancy.owner_building() {
            page.fill(Field::BuildingLimit, &owner.building_limit.to_string())
                .await?;
            let valuation = owner.building_valuation;
            page.radio(
                Field::BuildingValuation,
                RadioChoice::LabelOrOrdinal(valuation.label(), valuation.ordinal()),
            )
            .await?;
        }

        page.fill(Field::BppLimit, &fields.bpp_limit.to_string())
            .await?;
        page.radio(
            Field::EarthquakeCoverage,
            RadioChoice::Label(yes_no(fixed.earthquake_coverage)),
        )
        .await?;

        page.click(Field::NextButton).await
    }

    async fn building_questions<D: PortalDriver + ?Sized>(
        &self,
        page: &mut StagePage<'_, D>,
        fields: &ResolvedFieldSet,
    ) -> Result<(), StageFailure> {
        if fields.fixed.building_questions_agree {
            page.radio(
                Field::ReviewedCorrect,
                RadioChoice::LabelOrOrdinal("I Agree", 0),
            )
            .await?;
        }
        page.click(Field::NextButton).await
    }
}

fn yes_no(answer: bool) -> &'static str {
    if answer {
        "Yes"
    } else {
        "No"
    }
}

/// Tenant is the third rendered option, owner the first
pub fn applicant_choice(applicant: ApplicantType) -> RadioChoice {
    match applicant {
        ApplicantType::Tenant => RadioChoice::LabelOrOrdinal("Tenant", 2),
        ApplicantType::Owner => RadioChoice::LabelOrOrdinal("Owner", 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn applicant_radio_uses_label_with_position_fallback() {
        assert_eq!(
            applicant_choice(ApplicantType::Tenant),
            RadioChoice::LabelOrOrdinal("Tenant", 2)
        );
        assert_eq!(
            applicant_choice(ApplicantType::Owner),
            RadioChoice::LabelOrOrdinal("Owner", 0)
        );
    }

    #[test]
    fn stage_failure_detail_keeps_stage_and_field() {
        let failure = StageFailure {
            stage: Stage::LocationModal,
            field: Some(Field::GrossSales),
            cause: PortalError::ElementNotFound {
                stage: Stage::LocationModal,
                field: Field::GrossSales,
                waited: Duration::from_secs(10),
            },
        };

        let detail = failure.detail();
        assert_eq!(detail.kind, FailureKind::ElementNotFound);
        assert_eq!(detail.stage, Some(Stage::LocationModal));
        assert_eq!(detail.field.as_deref(), Some("gross_sales"));
        assert!(failure.to_string().starts_with("LocationModal failed at gross_sales"));
    }
}
