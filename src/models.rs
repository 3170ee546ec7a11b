use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::executor::SqlValue;
use crate::normalize::ParsedName;

// ============ Database Models ============

/// A funnel lead. The central mutable entity, keyed by a surrogate id and a
/// natural key (the normalized identity document). Attributes accumulate as
/// the applicant moves through the form steps.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lead {
    /// Surrogate key.
    pub lead_id: u64,
    /// Natural key: normalized identity-document string.
    pub pancard: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    /// Full name as captured at the personal-info step.
    pub first_name: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub pincode: Option<String>,
    /// Resolved reference ids from the address step.
    pub state_id: Option<i64>,
    pub city_id: Option<i64>,
    pub loan_amount: Option<i64>,
    pub obligations: Option<i64>,
    pub monthly_income: Option<i64>,
    pub company_name: Option<String>,
    pub designation: Option<String>,
    pub user_type: Option<String>,
    pub stage: Option<String>,
    pub lead_status_id: Option<i64>,
    pub lead_black_list_flag: Option<i64>,
    pub source: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub ip: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
}

/// A state row from the `master_state` reference table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MasterState {
    pub m_state_id: i64,
    pub m_state_name: String,
}

/// A pincode row from the `master_pincode` reference table, mapping a
/// pincode value to its city.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MasterPincode {
    pub m_pincode_id: i64,
    pub m_pincode_value: String,
    pub m_pincode_city_id: Option<i64>,
}

/// A row from the `users` table, used by the demo endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Shaped record returned by the external repayment-detail provider.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RepaymentSummary {
    pub lead_id: u64,
    pub loan_amount: Option<i64>,
    pub disbursal_amount: Option<i64>,
    pub disbursal_date: Option<NaiveDate>,
    pub emi_amount: Option<i64>,
    pub tenure_months: Option<i64>,
    pub total_outstanding: Option<i64>,
    pub next_due_date: Option<NaiveDate>,
    pub repayment_status: Option<String>,
}

// ============ Derived-record builders ============

/// Customer record materialized from a fully-enriched lead at the final
/// step.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub customer_lead_id: u64,
    pub first_name: String,
    pub middle_name: String,
    pub sur_name: String,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub pancard: String,
    pub state_id: Option<i64>,
    pub city_id: Option<i64>,
    pub cr_residence_pincode: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl NewCustomer {
    /// Copies identity, contact and address fields off the lead. A lead that
    /// skipped enrichment steps produces a customer with empty name parts
    /// and null address references; creation still proceeds.
    pub fn from_lead(lead: &Lead, pancard: &str, now: DateTime<Utc>) -> Self {
        let name = crate::normalize::parse_full_name(lead.first_name.as_deref().unwrap_or(""));
        Self::from_parts(lead, name, pancard, now)
    }

    pub fn from_parts(lead: &Lead, name: ParsedName, pancard: &str, now: DateTime<Utc>) -> Self {
        Self {
            customer_lead_id: lead.lead_id,
            first_name: name.first,
            middle_name: name.middle,
            sur_name: name.last,
            gender: lead.gender.clone().unwrap_or_default(),
            dob: lead.dob,
            mobile: lead.mobile.clone(),
            email: lead.email.clone(),
            pancard: pancard.to_string(),
            state_id: lead.state_id,
            city_id: lead.city_id,
            cr_residence_pincode: lead.pincode.clone(),
            created_date: now,
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("customer_lead_id", SqlValue::from(self.customer_lead_id)),
            ("first_name", SqlValue::from(self.first_name.as_str())),
            ("middle_name", SqlValue::from(self.middle_name.as_str())),
            ("sur_name", SqlValue::from(self.sur_name.as_str())),
            ("gender", SqlValue::from(self.gender.as_str())),
            ("dob", SqlValue::from(self.dob)),
            ("mobile", SqlValue::from(self.mobile.clone())),
            ("email", SqlValue::from(self.email.clone())),
            ("pancard", SqlValue::from(self.pancard.as_str())),
            ("state_id", SqlValue::from(self.state_id)),
            ("city_id", SqlValue::from(self.city_id)),
            ("cr_residence_pincode", SqlValue::from(self.cr_residence_pincode.clone())),
            ("created_date", SqlValue::from(self.created_date)),
        ]
    }
}

/// Employment record created alongside the customer. Carries only the lead
/// reference and contact email today; the remaining employment fields are
/// an acknowledged gap inherited from the funnel design.
#[derive(Debug, Clone)]
pub struct NewEmployment {
    pub lead_id: u64,
    pub emp_email: Option<String>,
    pub created_on: DateTime<Utc>,
}

impl NewEmployment {
    pub fn from_lead(lead: &Lead, now: DateTime<Utc>) -> Self {
        Self {
            lead_id: lead.lead_id,
            emp_email: lead.email.clone(),
            created_on: now,
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("lead_id", SqlValue::from(self.lead_id)),
            ("emp_email", SqlValue::from(self.emp_email.clone())),
            ("created_on", SqlValue::from(self.created_on)),
        ]
    }
}
