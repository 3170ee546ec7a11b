//! Statically declared storage schemas.
//!
//! Each entity declares, once, the canonical fields it exposes and what each
//! field may be used for (writes, read filters, ordering). Repositories and
//! the step state-machine both consult these declarations, so there is a
//! single allow-list per entity instead of ad-hoc lists per function. The
//! declarations are validated at process start.

/// Capabilities of a single canonical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical field name used by callers.
    pub name: &'static str,
    /// Backing SQL column.
    pub column: &'static str,
    /// May appear in INSERT / UPDATE write sets.
    pub writable: bool,
    /// May appear in WHERE filters.
    pub filterable: bool,
    /// May be used as an ORDER BY target.
    pub orderable: bool,
}

const fn field(
    name: &'static str,
    writable: bool,
    filterable: bool,
    orderable: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        column: name,
        writable,
        filterable,
        orderable,
    }
}

/// Static description of one entity's table.
#[derive(Debug)]
pub struct EntitySchema {
    pub table: &'static str,
    /// Surrogate key column.
    pub key_column: &'static str,
    /// Natural key column, where the entity has one.
    pub natural_key_column: Option<&'static str>,
    pub fields: &'static [FieldSpec],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column for `name` if it is writable, `None` otherwise.
    pub fn writable_column(&self, name: &str) -> Option<&'static str> {
        self.field(name).filter(|f| f.writable).map(|f| f.column)
    }

    /// Column for `name` if it may be filtered on, `None` otherwise.
    /// The key columns are always filterable.
    pub fn filterable_column(&self, name: &str) -> Option<&'static str> {
        if name == self.key_column {
            return Some(self.key_column);
        }
        if self.natural_key_column == Some(name) {
            return self.natural_key_column;
        }
        self.field(name).filter(|f| f.filterable).map(|f| f.column)
    }

    /// Column for `name` if it may be ordered on, `None` otherwise.
    pub fn orderable_column(&self, name: &str) -> Option<&'static str> {
        if name == self.key_column {
            return Some(self.key_column);
        }
        self.field(name).filter(|f| f.orderable).map(|f| f.column)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (i, a) in self.fields.iter().enumerate() {
            if a.name == self.key_column {
                anyhow::bail!(
                    "schema {}: field {} collides with the key column",
                    self.table,
                    a.name
                );
            }
            for b in &self.fields[i + 1..] {
                if a.name == b.name || a.column == b.column {
                    anyhow::bail!("schema {}: duplicate field {}", self.table, b.name);
                }
            }
        }
        if let Some(natural) = self.natural_key_column {
            if self.field(natural).is_none() {
                anyhow::bail!(
                    "schema {}: natural key {} is not a declared field",
                    self.table,
                    natural
                );
            }
        }
        Ok(())
    }
}

/// The central mutable entity. Attributes accumulate across funnel steps;
/// every column any step writes is declared here.
pub static LEADS: EntitySchema = EntitySchema {
    table: "leads",
    key_column: "lead_id",
    natural_key_column: Some("pancard"),
    fields: &[
        field("pancard", true, true, false),
        field("mobile", true, true, false),
        field("email", true, true, false),
        field("alternate_email", true, false, false),
        field("first_name", true, false, false),
        field("gender", true, false, false),
        field("dob", true, false, false),
        field("pincode", true, false, false),
        field("state_id", true, false, false),
        field("city_id", true, false, false),
        field("loan_amount", true, false, false),
        field("obligations", true, false, false),
        field("monthly_income", true, false, false),
        field("company_name", true, false, false),
        field("designation", true, false, false),
        field("user_type", true, false, false),
        field("stage", true, false, false),
        field("lead_status_id", true, true, false),
        field("lead_black_list_flag", true, false, false),
        field("lead_is_mobile_verified", true, false, false),
        field("qde_consent", true, false, false),
        field("source", true, true, false),
        field("utm_source", true, false, false),
        field("utm_campaign", true, false, false),
        field("coupon", true, false, false),
        field("coordinates", true, false, false),
        field("ip", true, false, false),
        field("lead_entry_date", true, false, false),
        field("created_on", true, true, true),
        field("updated_on", true, false, true),
    ],
};

/// Derived once per lead at finalization; copies identity, contact and
/// address fields plus a back-reference to the originating lead.
pub static LEAD_CUSTOMER: EntitySchema = EntitySchema {
    table: "lead_customer",
    key_column: "customer_id",
    natural_key_column: Some("pancard"),
    fields: &[
        field("customer_lead_id", true, true, false),
        field("first_name", true, false, false),
        field("middle_name", true, false, false),
        field("sur_name", true, false, false),
        field("gender", true, false, false),
        field("dob", true, false, false),
        field("mobile", true, false, false),
        field("email", true, false, false),
        field("pancard", true, true, false),
        field("state_id", true, false, false),
        field("city_id", true, false, false),
        field("cr_residence_pincode", true, false, false),
        field("created_date", true, false, true),
    ],
};

/// Created alongside the customer at finalization. Carries little beyond the
/// lead reference today.
pub static CUSTOMER_EMPLOYMENT: EntitySchema = EntitySchema {
    table: "customer_employment",
    key_column: "employment_id",
    natural_key_column: None,
    fields: &[
        field("lead_id", true, true, false),
        field("emp_email", true, false, false),
        field("created_on", true, false, true),
    ],
};

/// Validates every declared schema. Run once at startup so a bad declaration
/// stops the process before it serves traffic.
pub fn validate_all() -> anyhow::Result<()> {
    for schema in [&LEADS, &LEAD_CUSTOMER, &CUSTOMER_EMPLOYMENT] {
        schema.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_schemas_are_valid() {
        validate_all().unwrap();
    }

    #[test]
    fn writable_lookup_respects_capabilities() {
        assert_eq!(LEADS.writable_column("mobile"), Some("mobile"));
        assert_eq!(LEADS.writable_column("lead_id"), None);
        assert_eq!(LEADS.writable_column("no_such_field"), None);
    }

    #[test]
    fn key_columns_are_always_filterable() {
        assert_eq!(LEADS.filterable_column("lead_id"), Some("lead_id"));
        assert_eq!(LEADS.filterable_column("pancard"), Some("pancard"));
        // Writable does not imply filterable.
        assert_eq!(LEADS.filterable_column("company_name"), None);
    }

    #[test]
    fn ordering_is_restricted() {
        assert_eq!(LEADS.orderable_column("created_on"), Some("created_on"));
        assert_eq!(LEADS.orderable_column("email"), None);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        const FIELDS: &[FieldSpec] =
            &[field("a", true, false, false), field("a", true, false, false)];
        let broken = EntitySchema {
            table: "broken",
            key_column: "id",
            natural_key_column: None,
            fields: FIELDS,
        };
        assert!(broken.validate().is_err());
    }

    #[test]
    fn natural_key_must_be_declared() {
        const FIELDS: &[FieldSpec] = &[field("a", true, false, false)];
        let broken = EntitySchema {
            table: "broken",
            key_column: "id",
            natural_key_column: Some("missing"),
            fields: FIELDS,
        };
        assert!(broken.validate().is_err());
    }
}
