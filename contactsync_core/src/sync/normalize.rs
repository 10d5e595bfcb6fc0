//! Raw source record → `CanonicalContact`.

use crate::error::ValidationError;
use crate::sync::models::{CanonicalContact, ExternalContactRecord};
use chrono::{DateTime, Utc};

/// Validate and reshape one record. `synced_at` is the run start time shared by the whole run.
///
/// Only the external identifier is required. Profile fields pass through as given, with
/// blank strings collapsed to `None`.
pub fn normalize(
    record: &ExternalContactRecord,
    synced_at: DateTime<Utc>,
) -> Result<CanonicalContact, ValidationError> {
    let external_id = match record.external_id.as_deref() {
        None => return Err(ValidationError::MissingExternalId),
        Some(id) => id.trim(),
    };
    if external_id.is_empty() {
        return Err(ValidationError::EmptyExternalId);
    }

    Ok(CanonicalContact {
        external_id: external_id.to_string(),
        name: non_blank(record.name.as_deref()),
        email: non_blank(record.email.as_deref()),
        phone: non_blank(record.phone.as_deref()),
        company: non_blank(record.company.as_deref()),
        role: non_blank(record.role.as_deref()),
        last_synced_at: synced_at,
    })
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn maps_all_fields_and_stamps_run_time() {
        let rec = ExternalContactRecord::new("A1")
            .with_name("Jane")
            .with_email("jane@example.com")
            .with_phone("+1 555 0100")
            .with_company("Acme")
            .with_role("CTO")
            .with_metadata(serde_json::json!({"archived": false}));

        let c = normalize(&rec, t0()).unwrap();
        assert_eq!(c.external_id, "A1");
        assert_eq!(c.name.as_deref(), Some("Jane"));
        assert_eq!(c.email.as_deref(), Some("jane@example.com"));
        assert_eq!(c.phone.as_deref(), Some("+1 555 0100"));
        assert_eq!(c.company.as_deref(), Some("Acme"));
        assert_eq!(c.role.as_deref(), Some("CTO"));
        assert_eq!(c.last_synced_at, t0());
    }

    #[test]
    fn missing_or_blank_id_is_rejected() {
        let missing = ExternalContactRecord::without_id().with_name("Nobody");
        assert_eq!(
            normalize(&missing, t0()),
            Err(ValidationError::MissingExternalId)
        );

        let blank = ExternalContactRecord::new("   ");
        assert_eq!(normalize(&blank, t0()), Err(ValidationError::EmptyExternalId));
    }

    #[test]
    fn partial_records_pass_through() {
        let rec = ExternalContactRecord::new("  B2 ").with_email("");
        let c = normalize(&rec, t0()).unwrap();
        assert_eq!(c.external_id, "B2");
        assert_eq!(c.name, None);
        assert_eq!(c.email, None);
    }

    #[test]
    fn deterministic_for_same_input() {
        let rec = ExternalContactRecord::new("C3").with_name("Sam");
        assert_eq!(normalize(&rec, t0()), normalize(&rec, t0()));
    }
}
