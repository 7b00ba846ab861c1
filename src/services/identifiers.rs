use rand::rngs::OsRng;
use rand::RngCore;

use crate::services::errors::ServiceError;

pub(crate) const ID_LENGTH: usize = 24;

/// Checks the 24-hex shape before anything reaches the store or the catalog.
/// Returns the identifier in its canonical lowercase form.
pub(crate) fn validate_id(field: &'static str, raw: &str) -> Result<String, ServiceError> {
    let value = raw.trim();
    let placeholder = value.eq_ignore_ascii_case("undefined") || value.eq_ignore_ascii_case("null");

    if value.len() != ID_LENGTH
        || placeholder
        || !value.chars().all(|ch| ch.is_ascii_hexdigit())
    {
        return Err(ServiceError::InvalidIdentifier { field });
    }

    Ok(value.to_ascii_lowercase())
}

pub(crate) fn generate_id() -> String {
    let mut bytes = [0u8; ID_LENGTH / 2];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hex_identifiers_and_lowercases_them() {
        let id = validate_id("submissionId", "65A1B2C3D4E5F60718293A4B").unwrap();
        assert_eq!(id, "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn rejects_placeholders_and_malformed_values() {
        for raw in ["", "undefined", "null", "NULL", "123", "zz1b2c3d4e5f60718293a4bz", "65a1b2c3d4e5f60718293a4b0"]
        {
            let err = validate_id("assessmentId", raw).unwrap_err();
            assert!(
                matches!(err, ServiceError::InvalidIdentifier { field: "assessmentId" }),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn generated_identifiers_pass_validation() {
        let id = generate_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert_eq!(validate_id("id", &id).unwrap(), id);
        assert_ne!(generate_id(), id);
    }
}
