//! Typed repositories over the query executor.
//!
//! Every write intersects the caller-supplied field set with the entity's
//! declared writable columns; every read filter and ordering target is
//! checked against the same schema. SQL text is assembled here, but values
//! always travel as bound parameters.

use sqlx::{FromRow, Row};
use std::sync::Arc;

use crate::errors::AppError;
use crate::executor::{QueryExecutor, SqlValue};
use crate::models::{
    Lead, MasterPincode, MasterState, NewCustomer, NewEmployment, RepaymentSummary, User,
};
use crate::schema::{EntitySchema, CUSTOMER_EMPLOYMENT, LEADS, LEAD_CUSTOMER};

/// How a record is addressed for updates and deletes.
///
/// The step flow only knows the natural key until the record is first
/// created, so both addressing modes are first-class. The caller states
/// which one it holds; nothing is inferred from the shape of the value.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKey {
    ById(u64),
    ByNaturalKey(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Options for flexible reads: allow-listed filters, ordering and a row
/// limit.
#[derive(Debug, Default)]
pub struct SelectOptions {
    pub filters: Vec<(String, SqlValue)>,
    pub order_by: Option<String>,
    pub order: SortOrder,
    pub limit: Option<u32>,
}

/// Builds a SELECT over the entity's table. Any filter or ordering key
/// outside the schema's allow-list is a caller bug and fails validation.
pub fn build_select(
    schema: &EntitySchema,
    options: &SelectOptions,
) -> Result<(String, Vec<SqlValue>), AppError> {
    let mut sql = format!("SELECT * FROM {}", schema.table);
    let mut params = Vec::new();

    let mut clauses = Vec::new();
    for (name, value) in &options.filters {
        let column = schema.filterable_column(name).ok_or_else(|| {
            AppError::Validation(format!("Invalid field name in where: {}", name))
        })?;
        clauses.push(format!("`{}` = ?", column));
        params.push(value.clone());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    if let Some(order_by) = &options.order_by {
        let column = schema
            .orderable_column(order_by)
            .ok_or_else(|| AppError::Validation(format!("Invalid orderBy field: {}", order_by)))?;
        sql.push_str(&format!(" ORDER BY `{}` {}", column, options.order.as_sql()));
    }

    if let Some(limit) = options.limit {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Int(i64::from(limit)));
    }

    Ok((sql, params))
}

/// Builds an INSERT from the writable subset of `fields`. Unknown fields
/// are dropped; an empty effective write-set fails validation rather than
/// silently inserting nothing.
pub fn build_insert(
    schema: &EntitySchema,
    fields: &[(&str, SqlValue)],
) -> Result<(String, Vec<SqlValue>), AppError> {
    let mut columns = Vec::new();
    let mut params = Vec::new();

    for (name, value) in fields {
        match schema.writable_column(name) {
            Some(column) => {
                columns.push(format!("`{}`", column));
                params.push(value.clone());
            }
            None => {
                tracing::debug!("Dropping unknown field {} on insert into {}", name, schema.table);
            }
        }
    }

    if columns.is_empty() {
        return Err(AppError::Validation(format!(
            "No valid fields provided for insert into {}",
            schema.table
        )));
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table,
        columns.join(", "),
        placeholders
    );
    Ok((sql, params))
}

/// Builds an UPDATE keyed by surrogate id or natural key, over the writable
/// subset of `fields`.
pub fn build_update(
    schema: &EntitySchema,
    key: &RecordKey,
    fields: &[(&str, SqlValue)],
) -> Result<(String, Vec<SqlValue>), AppError> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for (name, value) in fields {
        match schema.writable_column(name) {
            Some(column) => {
                assignments.push(format!("`{}` = ?", column));
                params.push(value.clone());
            }
            None => {
                tracing::debug!("Dropping unknown field {} on update of {}", name, schema.table);
            }
        }
    }

    if assignments.is_empty() {
        return Err(AppError::Validation(format!(
            "No valid fields provided for update of {}",
            schema.table
        )));
    }

    let key_column = key_column(schema, key)?;
    params.push(key_value(key));

    let sql = format!(
        "UPDATE {} SET {} WHERE `{}` = ?",
        schema.table,
        assignments.join(", "),
        key_column
    );
    Ok((sql, params))
}

/// Builds a DELETE keyed by surrogate id or natural key.
pub fn build_delete(
    schema: &EntitySchema,
    key: &RecordKey,
) -> Result<(String, Vec<SqlValue>), AppError> {
    let key_column = key_column(schema, key)?;
    let sql = format!("DELETE FROM {} WHERE `{}` = ?", schema.table, key_column);
    Ok((sql, vec![key_value(key)]))
}

fn key_column(schema: &EntitySchema, key: &RecordKey) -> Result<&'static str, AppError> {
    match key {
        RecordKey::ById(_) => Ok(schema.key_column),
        RecordKey::ByNaturalKey(_) => schema.natural_key_column.ok_or_else(|| {
            AppError::Validation(format!("{} has no natural key", schema.table))
        }),
    }
}

fn key_value(key: &RecordKey) -> SqlValue {
    match key {
        RecordKey::ById(id) => SqlValue::from(*id),
        RecordKey::ByNaturalKey(natural) => SqlValue::from(natural.as_str()),
    }
}

// ============ Lead repository ============

pub struct LeadStore {
    executor: Arc<QueryExecutor>,
}

impl LeadStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Flexible read with allow-listed filters, ordering and limit.
    pub async fn find(&self, options: &SelectOptions) -> Result<Vec<Lead>, AppError> {
        let (sql, params) = build_select(&LEADS, options)?;
        let rows = self.executor.fetch_all(&sql, &params).await?;
        rows.iter()
            .map(|row| Lead::from_row(row).map_err(AppError::from))
            .collect()
    }

    /// Single-result mode: first matched row or nothing.
    pub async fn find_one(&self, options: &SelectOptions) -> Result<Option<Lead>, AppError> {
        Ok(self.find(options).await?.into_iter().next())
    }

    /// The most recent lead for a natural key, by creation time.
    pub async fn latest_by_pancard(&self, pancard: &str) -> Result<Option<Lead>, AppError> {
        self.find_one(&SelectOptions {
            filters: vec![("pancard".to_string(), SqlValue::from(pancard))],
            order_by: Some("created_on".to_string()),
            order: SortOrder::Desc,
            limit: Some(1),
        })
        .await
    }

    /// Inserts the writable subset of `fields`; returns the new surrogate id.
    pub async fn insert(&self, fields: &[(&str, SqlValue)]) -> Result<u64, AppError> {
        let (sql, params) = build_insert(&LEADS, fields)?;
        let output = self.executor.execute(&sql, &params).await?;
        Ok(output.last_insert_id)
    }

    /// Updates the writable subset of `fields`; returns the affected-row
    /// count (zero when no lead matches the key).
    pub async fn update(
        &self,
        key: &RecordKey,
        fields: &[(&str, SqlValue)],
    ) -> Result<u64, AppError> {
        let (sql, params) = build_update(&LEADS, key, fields)?;
        let output = self.executor.execute(&sql, &params).await?;
        Ok(output.rows_affected)
    }

    /// Generic delete. Not part of the step flow.
    pub async fn delete(&self, key: &RecordKey) -> Result<u64, AppError> {
        let (sql, params) = build_delete(&LEADS, key)?;
        let output = self.executor.execute(&sql, &params).await?;
        Ok(output.rows_affected)
    }
}

// ============ Derived-record repositories ============

pub struct CustomerStore {
    executor: Arc<QueryExecutor>,
}

impl CustomerStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn create(&self, customer: &NewCustomer) -> Result<u64, AppError> {
        let fields = customer.to_fields();
        let (sql, params) = build_insert(&LEAD_CUSTOMER, &fields)?;
        let output = self.executor.execute(&sql, &params).await?;
        Ok(output.last_insert_id)
    }

    /// Existing customer id for a lead, if one was already materialized.
    pub async fn find_by_lead_id(&self, lead_id: u64) -> Result<Option<u64>, AppError> {
        let row = self
            .executor
            .fetch_optional(
                "SELECT customer_id FROM lead_customer WHERE customer_lead_id = ? LIMIT 1",
                &[SqlValue::from(lead_id)],
            )
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<u64, _>("customer_id").map_err(AppError::from)?)),
            None => Ok(None),
        }
    }
}

pub struct EmploymentStore {
    executor: Arc<QueryExecutor>,
}

impl EmploymentStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn create(&self, employment: &NewEmployment) -> Result<u64, AppError> {
        let fields = employment.to_fields();
        let (sql, params) = build_insert(&CUSTOMER_EMPLOYMENT, &fields)?;
        let output = self.executor.execute(&sql, &params).await?;
        Ok(output.last_insert_id)
    }

    /// Existing employment id for a lead, if one was already created.
    pub async fn find_by_lead_id(&self, lead_id: u64) -> Result<Option<u64>, AppError> {
        let row = self
            .executor
            .fetch_optional(
                "SELECT employment_id FROM customer_employment WHERE lead_id = ? LIMIT 1",
                &[SqlValue::from(lead_id)],
            )
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<u64, _>("employment_id").map_err(AppError::from)?)),
            None => Ok(None),
        }
    }
}

// ============ Reference-table lookups ============

/// A row existing in a reference table does not make it usable: every
/// lookup also requires the active flag set and the deleted flag clear.
pub const BLACKLIST_LOOKUP_SQL: &str = "SELECT pancard FROM blacklisted_pan \
     WHERE pancard = ? \
     AND bl_active = 1 \
     AND bl_deleted = 0 \
     LIMIT 1";

pub const STATE_BY_NAME_SQL: &str = "SELECT * FROM master_state \
     WHERE m_state_name = ? \
     AND m_state_active = 1 \
     AND m_state_deleted = 0 \
     LIMIT 1";

pub const PINCODE_BY_VALUE_SQL: &str = "SELECT * FROM master_pincode \
     WHERE m_pincode_value = ? \
     AND m_pincode_active = 1 \
     AND m_pincode_deleted = 0 \
     LIMIT 1";

pub struct BlacklistStore {
    executor: Arc<QueryExecutor>,
}

impl BlacklistStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn contains(&self, pancard: &str) -> Result<bool, AppError> {
        let row = self
            .executor
            .fetch_optional(BLACKLIST_LOOKUP_SQL, &[SqlValue::from(pancard)])
            .await?;
        Ok(row.is_some())
    }
}

pub struct StateStore {
    executor: Arc<QueryExecutor>,
}

impl StateStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<MasterState>, AppError> {
        let row = self
            .executor
            .fetch_optional(STATE_BY_NAME_SQL, &[SqlValue::from(name)])
            .await?;
        row.map(|row| MasterState::from_row(&row).map_err(AppError::from))
            .transpose()
    }
}

pub struct PincodeStore {
    executor: Arc<QueryExecutor>,
}

impl PincodeStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn find_by_value(&self, pincode: &str) -> Result<Option<MasterPincode>, AppError> {
        let row = self
            .executor
            .fetch_optional(PINCODE_BY_VALUE_SQL, &[SqlValue::from(pincode)])
            .await?;
        row.map(|row| MasterPincode::from_row(&row).map_err(AppError::from))
            .transpose()
    }
}

// ============ External lookups ============

pub struct UserStore {
    executor: Arc<QueryExecutor>,
}

impl UserStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        let row = self
            .executor
            .fetch_optional(
                "SELECT * FROM users WHERE user_id = ?",
                &[SqlValue::from(user_id)],
            )
            .await?;
        row.map(|row| User::from_row(&row).map_err(AppError::from))
            .transpose()
    }
}

/// Repayment-detail provider. The query itself is owned by the loan-servicing
/// side; from this service's perspective it is an opaque lookup keyed by
/// lead id that returns a shaped summary record or nothing.
pub struct RepaymentStore {
    executor: Arc<QueryExecutor>,
}

impl RepaymentStore {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    pub async fn full_repayment_details(
        &self,
        lead_id: u64,
    ) -> Result<Option<RepaymentSummary>, AppError> {
        let row = self
            .executor
            .fetch_optional(
                "SELECT lead_id, loan_amount, disbursal_amount, disbursal_date, \
                 emi_amount, tenure_months, total_outstanding, next_due_date, \
                 repayment_status \
                 FROM loan_repayment_details WHERE lead_id = ? LIMIT 1",
                &[SqlValue::from(lead_id)],
            )
            .await?;
        row.map(|row| RepaymentSummary::from_row(&row).map_err(AppError::from))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_filters_must_be_allow_listed() {
        let options = SelectOptions {
            filters: vec![("password".to_string(), SqlValue::from("x"))],
            ..Default::default()
        };
        let err = build_select(&LEADS, &options).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn select_builds_where_order_and_limit() {
        let options = SelectOptions {
            filters: vec![("pancard".to_string(), SqlValue::from("ABCDE1234F"))],
            order_by: Some("created_on".to_string()),
            order: SortOrder::Desc,
            limit: Some(1),
        };
        let (sql, params) = build_select(&LEADS, &options).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM leads WHERE `pancard` = ? ORDER BY `created_on` DESC LIMIT ?"
        );
        assert_eq!(
            params,
            vec![SqlValue::from("ABCDE1234F"), SqlValue::Int(1)]
        );
    }

    #[test]
    fn select_rejects_unlisted_order_target() {
        let options = SelectOptions {
            order_by: Some("email".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            build_select(&LEADS, &options),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn insert_drops_unknown_fields_silently() {
        let fields = [
            ("mobile", SqlValue::from("919876543210")),
            ("not_a_column", SqlValue::from("x")),
        ];
        let (sql, params) = build_insert(&LEADS, &fields).unwrap();
        assert_eq!(sql, "INSERT INTO leads (`mobile`) VALUES (?)");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn insert_with_no_valid_fields_fails_without_a_statement() {
        let fields = [("bogus", SqlValue::from("x"))];
        let err = build_insert(&LEADS, &fields).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn update_targets_the_key_the_caller_names() {
        let fields = [("email", SqlValue::from("a@b.c"))];

        let (sql, params) =
            build_update(&LEADS, &RecordKey::ByNaturalKey("ABCDE1234F".into()), &fields).unwrap();
        assert_eq!(sql, "UPDATE leads SET `email` = ? WHERE `pancard` = ?");
        assert_eq!(params[1], SqlValue::from("ABCDE1234F"));

        let (sql, params) = build_update(&LEADS, &RecordKey::ById(42), &fields).unwrap();
        assert_eq!(sql, "UPDATE leads SET `email` = ? WHERE `lead_id` = ?");
        assert_eq!(params[1], SqlValue::Int(42));
    }

    #[test]
    fn update_with_empty_write_set_fails() {
        let err = build_update(&LEADS, &RecordKey::ById(1), &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn delete_by_either_key() {
        let (sql, _) = build_delete(&LEADS, &RecordKey::ById(7)).unwrap();
        assert_eq!(sql, "DELETE FROM leads WHERE `lead_id` = ?");

        let (sql, _) = build_delete(&LEADS, &RecordKey::ByNaturalKey("ABCDE1234F".into())).unwrap();
        assert_eq!(sql, "DELETE FROM leads WHERE `pancard` = ?");
    }

    #[test]
    fn natural_key_update_requires_a_natural_key() {
        let fields = [("emp_email", SqlValue::from("a@b.c"))];
        let err = build_update(
            &CUSTOMER_EMPLOYMENT,
            &RecordKey::ByNaturalKey("x".into()),
            &fields,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn reference_lookups_require_active_undeleted_rows() {
        // A matching name on an inactive or deleted row must resolve to
        // nothing, so the predicates belong to the statement itself.
        assert!(STATE_BY_NAME_SQL.contains("m_state_active = 1"));
        assert!(STATE_BY_NAME_SQL.contains("m_state_deleted = 0"));
        assert!(PINCODE_BY_VALUE_SQL.contains("m_pincode_active = 1"));
        assert!(PINCODE_BY_VALUE_SQL.contains("m_pincode_deleted = 0"));
        assert!(BLACKLIST_LOOKUP_SQL.contains("bl_active = 1"));
        assert!(BLACKLIST_LOOKUP_SQL.contains("bl_deleted = 0"));
    }
}
