//! Lead funnel business logic: the per-step save dispatcher and the
//! repayment lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::errors::AppError;
use crate::executor::{QueryExecutor, SqlValue};
use crate::models::{NewCustomer, NewEmployment, RepaymentSummary};
use crate::normalize::{
    digits_only, int_or_zero, letters_and_spaces, letters_only_upper, upper_trim,
};
use crate::storage::{
    BlacklistStore, CustomerStore, EmploymentStore, LeadStore, PincodeStore, RecordKey,
    RepaymentStore, StateStore,
};

// ============ Step payloads ============

/// Step 1: initial contact and attribution info.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitialInfo {
    pub mobile: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub ip: Option<String>,
}

/// Step 2: personal info.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalInfo {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Step 3: address info. City and state arrive as names and are resolved
/// against the reference tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInfo {
    pub pincode: Option<String>,
    pub city_name: Option<String>,
    pub state_name: Option<String>,
}

/// Step 4: loan requirement. Amounts arrive loosely typed from the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanRequirementInfo {
    pub loan_amount: Option<Value>,
    pub obligations: Option<Value>,
}

/// Step 5: employment info.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmploymentInfo {
    pub company_name: Option<String>,
    pub designation: Option<String>,
    pub monthly_income: Option<Value>,
}

/// One submission of the multi-step lead form. A closed set: the dispatcher
/// matches exhaustively, and an out-of-range step number never reaches it.
#[derive(Debug, Clone)]
pub enum LeadStep {
    Initial(InitialInfo),
    Personal(PersonalInfo),
    Address(AddressInfo),
    LoanRequirement(LoanRequirementInfo),
    Employment(EmploymentInfo),
    Finalize,
}

impl LeadStep {
    /// Parses the wire form (step number plus raw JSON payload) into a step.
    pub fn from_request(step: u8, payload: &Value) -> Result<Self, AppError> {
        match step {
            1 => Ok(LeadStep::Initial(parse_payload(payload)?)),
            2 => Ok(LeadStep::Personal(parse_payload(payload)?)),
            3 => Ok(LeadStep::Address(parse_payload(payload)?)),
            4 => Ok(LeadStep::LoanRequirement(parse_payload(payload)?)),
            5 => Ok(LeadStep::Employment(parse_payload(payload)?)),
            6 => Ok(LeadStep::Finalize),
            other => Err(AppError::Validation(format!("Unknown lead step: {}", other))),
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            LeadStep::Initial(_) => 1,
            LeadStep::Personal(_) => 2,
            LeadStep::Address(_) => 3,
            LeadStep::LoanRequirement(_) => 4,
            LeadStep::Employment(_) => 5,
            LeadStep::Finalize => 6,
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, AppError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| AppError::Validation(format!("Invalid step payload: {}", e)))
}

// ============ Per-step write sets ============

/// Write set for the initial insert: normalized contact fields plus the
/// attribution and status defaults every new lead starts with.
pub fn initial_fields(
    info: &InitialInfo,
    pancard: &str,
    blacklisted: bool,
    now: DateTime<Utc>,
) -> Vec<(&'static str, SqlValue)> {
    let source_tag = letters_only_upper(info.utm_source.as_deref().unwrap_or(""));
    let source = match source_tag.as_str() {
        "C4C" => "C4C",
        "REFCASE" => "refcase",
        _ => "Import",
    };

    vec![
        ("lead_black_list_flag", SqlValue::Int(i64::from(blacklisted))),
        (
            "mobile",
            SqlValue::from(digits_only(info.mobile.as_deref().unwrap_or(""))),
        ),
        ("pancard", SqlValue::from(pancard)),
        ("user_type", SqlValue::from("NEW")),
        ("lead_entry_date", SqlValue::from(now)),
        ("created_on", SqlValue::from(now)),
        ("stage", SqlValue::from("S1")),
        ("lead_status_id", SqlValue::Int(1)),
        ("qde_consent", SqlValue::from("Y")),
        ("utm_source", SqlValue::from("WEB")),
        ("lead_is_mobile_verified", SqlValue::Int(1)),
        ("source", SqlValue::from(source)),
        (
            "utm_campaign",
            SqlValue::from(letters_only_upper(info.utm_campaign.as_deref().unwrap_or(""))),
        ),
        ("ip", SqlValue::from(info.ip.as_deref().unwrap_or(""))),
    ]
}

/// Write set for the personal-info step.
pub fn personal_fields(info: &PersonalInfo, now: DateTime<Utc>) -> Vec<(&'static str, SqlValue)> {
    vec![
        (
            "first_name",
            SqlValue::from(letters_and_spaces(info.name.as_deref().unwrap_or(""))),
        ),
        (
            "email",
            SqlValue::from(info.email.clone().unwrap_or_default()),
        ),
        ("updated_on", SqlValue::from(now)),
    ]
}

/// Write set for the address step. The reference lookups have already run;
/// unresolved names stay null.
pub fn address_fields(
    pincode: &str,
    state_id: Option<i64>,
    city_id: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<(&'static str, SqlValue)> {
    vec![
        ("pincode", SqlValue::from(pincode)),
        ("state_id", SqlValue::from(state_id)),
        ("city_id", SqlValue::from(city_id)),
        ("updated_on", SqlValue::from(now)),
    ]
}

/// Write set for the loan-requirement step.
pub fn loan_fields(info: &LoanRequirementInfo, now: DateTime<Utc>) -> Vec<(&'static str, SqlValue)> {
    vec![
        (
            "loan_amount",
            SqlValue::Int(int_or_zero(info.loan_amount.as_ref())),
        ),
        (
            "obligations",
            SqlValue::Int(int_or_zero(info.obligations.as_ref())),
        ),
        ("updated_on", SqlValue::from(now)),
    ]
}

/// Write set for the employment step.
pub fn employment_fields(info: &EmploymentInfo, now: DateTime<Utc>) -> Vec<(&'static str, SqlValue)> {
    vec![
        (
            "company_name",
            SqlValue::from(upper_trim(info.company_name.as_deref().unwrap_or(""))),
        ),
        (
            "designation",
            SqlValue::from(upper_trim(info.designation.as_deref().unwrap_or(""))),
        ),
        (
            "monthly_income",
            SqlValue::Int(int_or_zero(info.monthly_income.as_ref())),
        ),
        ("updated_on", SqlValue::from(now)),
    ]
}

// ============ Service ============

/// Result of one step submission.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Created {
        lead_id: u64,
    },
    Updated {
        rows_affected: u64,
    },
    Finalized {
        customer_id: u64,
        employment_id: u64,
        already_existed: bool,
    },
}

/// Business logic for the lead funnel. Holds the per-entity repositories,
/// all sharing one executor handle.
pub struct LeadFunnelService {
    leads: LeadStore,
    customers: CustomerStore,
    employment: EmploymentStore,
    blacklist: BlacklistStore,
    states: StateStore,
    pincodes: PincodeStore,
    repayments: RepaymentStore,
}

impl LeadFunnelService {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self {
            leads: LeadStore::new(Arc::clone(&executor)),
            customers: CustomerStore::new(Arc::clone(&executor)),
            employment: EmploymentStore::new(Arc::clone(&executor)),
            blacklist: BlacklistStore::new(Arc::clone(&executor)),
            states: StateStore::new(Arc::clone(&executor)),
            pincodes: PincodeStore::new(Arc::clone(&executor)),
            repayments: RepaymentStore::new(executor),
        }
    }

    /// Saves or updates a lead for one funnel step.
    ///
    /// Steps 2-5 are plain updates keyed by the natural key, so client
    /// retries overwrite rather than duplicate. Repository failures
    /// propagate unchanged; retrying is the executor's job alone.
    pub async fn save_lead_by_step(
        &self,
        step: LeadStep,
        pancard: &str,
    ) -> Result<StepOutcome, AppError> {
        if pancard.trim().is_empty() {
            return Err(AppError::Validation("Pancard is required".to_string()));
        }
        let pancard = upper_trim(pancard);
        let now = Utc::now();

        match step {
            LeadStep::Initial(info) => {
                let blacklisted = self.blacklist.contains(&pancard).await?;
                let fields = initial_fields(&info, &pancard, blacklisted, now);
                let lead_id = self.leads.insert(&fields).await?;
                tracing::info!(
                    "Created lead {} for pancard {} (blacklisted: {})",
                    lead_id,
                    pancard,
                    blacklisted
                );
                Ok(StepOutcome::Created { lead_id })
            }
            LeadStep::Personal(info) => {
                self.update_lead(&pancard, personal_fields(&info, now)).await
            }
            LeadStep::Address(info) => {
                let pincode = digits_only(info.pincode.as_deref().unwrap_or(""));

                let state_name = info.state_name.as_deref().unwrap_or("");
                let state_id = if state_name.is_empty() {
                    None
                } else {
                    self.states
                        .find_by_name(state_name)
                        .await?
                        .map(|state| state.m_state_id)
                };

                let city_id = if pincode.is_empty() {
                    None
                } else {
                    self.pincodes
                        .find_by_value(&pincode)
                        .await?
                        .and_then(|row| row.m_pincode_city_id)
                };

                self.update_lead(&pancard, address_fields(&pincode, state_id, city_id, now))
                    .await
            }
            LeadStep::LoanRequirement(info) => {
                self.update_lead(&pancard, loan_fields(&info, now)).await
            }
            LeadStep::Employment(info) => {
                self.update_lead(&pancard, employment_fields(&info, now)).await
            }
            LeadStep::Finalize => self.finalize(&pancard, now).await,
        }
    }

    async fn update_lead(
        &self,
        pancard: &str,
        fields: Vec<(&'static str, SqlValue)>,
    ) -> Result<StepOutcome, AppError> {
        let rows_affected = self
            .leads
            .update(&RecordKey::ByNaturalKey(pancard.to_string()), &fields)
            .await?;
        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "No lead found for pancard {}",
                pancard
            )));
        }
        Ok(StepOutcome::Updated { rows_affected })
    }

    /// Terminal step: materializes the customer and employment records from
    /// the most recent lead row.
    ///
    /// The two inserts share no transaction; a lead-id lookup up front keeps
    /// repeat finalizations from duplicating rows, and the employment insert
    /// is guarded separately in case an earlier attempt failed between the
    /// two writes.
    async fn finalize(&self, pancard: &str, now: DateTime<Utc>) -> Result<StepOutcome, AppError> {
        let lead = self
            .leads
            .latest_by_pancard(pancard)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No lead found for pancard {}", pancard)))?;

        if let Some(customer_id) = self.customers.find_by_lead_id(lead.lead_id).await? {
            let employment_id = match self.employment.find_by_lead_id(lead.lead_id).await? {
                Some(existing) => existing,
                None => {
                    self.employment
                        .create(&NewEmployment::from_lead(&lead, now))
                        .await?
                }
            };
            tracing::info!(
                "Lead {} was already finalized as customer {}",
                lead.lead_id,
                customer_id
            );
            return Ok(StepOutcome::Finalized {
                customer_id,
                employment_id,
                already_existed: true,
            });
        }

        let customer = NewCustomer::from_lead(&lead, pancard, now);
        let customer_id = self.customers.create(&customer).await?;
        let employment_id = self
            .employment
            .create(&NewEmployment::from_lead(&lead, now))
            .await?;

        tracing::info!(
            "Finalized lead {}: customer {}, employment {}",
            lead.lead_id,
            customer_id,
            employment_id
        );
        Ok(StepOutcome::Finalized {
            customer_id,
            employment_id,
            already_existed: false,
        })
    }

    /// Repayment/disbursement summary for the most recent lead of a natural
    /// key. Absence at either stage yields `None`; every call re-queries.
    pub async fn repayment_info(
        &self,
        pancard: &str,
    ) -> Result<Option<RepaymentSummary>, AppError> {
        let Some(lead) = self.leads.latest_by_pancard(pancard).await? else {
            tracing::debug!("No lead found for pancard {}", pancard);
            return Ok(None);
        };
        if lead.lead_id == 0 {
            return Ok(None);
        }
        self.repayments.full_repayment_details(lead.lead_id).await
    }
}
