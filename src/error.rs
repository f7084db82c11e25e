// Domain error taxonomy
// Every failure the platform surfaces to a caller carries a stable machine
// code alongside the human-readable message, so both REST and GraphQL can
// translate without inspecting message text.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

// ============================================================================
// DOMAIN ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// A required input was empty or absent
    #[error("Missing required input: {field}")]
    MissingInput { field: &'static str },

    #[error("Member not found: {id}")]
    MemberNotFound { id: String },

    #[error("Vendor not found: {id}")]
    VendorNotFound { id: String },

    #[error("Promo not found: {id}")]
    PromoNotFound { id: String },

    #[error("Enrollment request not found: {id}")]
    EnrollmentRequestNotFound { id: String },

    /// Unique-field collision on create (username, vendor name)
    #[error("{entity} already exists: {value}")]
    AlreadyExists { entity: &'static str, value: String },

    /// Any prior request for the pair blocks a new one, regardless of status
    #[error("Member {member_id} already has an enrollment request for promo {promo_id}")]
    DuplicateEnrollment { member_id: String, promo_id: String },

    #[error("Promo {id} is not active")]
    PromoNotActive { id: String },

    #[error("Promo {id} is active and cannot be deleted")]
    ActivePromoDeletion { id: String },

    /// Template/field-group invariant violated, or a DEPOSIT promo without
    /// a usable minimum balance reached the eligibility engine
    #[error("Promo is misconfigured: {message}")]
    PromoMisconfigured { message: String },

    #[error("Required member field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    #[error("Member balance does not satisfy the promo requirement")]
    InsufficientBalance,

    #[error("Invalid {kind} value: {value}")]
    InvalidEnumValue { kind: &'static str, value: String },

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not allowed")]
    NotAllowed,

    /// "Invalid first" / "Invalid cursor"
    #[error("{0}")]
    PaginationInput(String),

    /// Catch-all storage failure
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl DomainError {
    /// Stable machine-readable code for transport layers
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::MissingInput { .. } => "MISSING_INPUT",
            DomainError::MemberNotFound { .. } => "MEMBER_NOT_FOUND",
            DomainError::VendorNotFound { .. } => "VENDOR_NOT_FOUND",
            DomainError::PromoNotFound { .. } => "PROMO_NOT_FOUND",
            DomainError::EnrollmentRequestNotFound { .. } => "ENROLLMENT_REQUEST_NOT_FOUND",
            DomainError::AlreadyExists { .. } => "ALREADY_EXISTS",
            DomainError::DuplicateEnrollment { .. } => "EXISTING_ENROLLMENT",
            DomainError::PromoNotActive { .. } => "INVALID_PROMO_STATE",
            DomainError::ActivePromoDeletion { .. } => "INVALID_PROMO_STATE",
            DomainError::PromoMisconfigured { .. } => "PROMO_MISCONFIGURED",
            DomainError::RequiredFieldMissing { .. } => "REQUIRED_FIELD_MISSING",
            DomainError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            DomainError::InvalidEnumValue { .. } => "INVALID_ENUM_VALUE",
            DomainError::MissingCredentials => "MISSING_CREDENTIALS",
            DomainError::InvalidCredentials => "INVALID_CREDENTIALS",
            DomainError::NotAllowed => "NOT_ALLOWED_ERROR",
            DomainError::PaginationInput(_) => "PAGINATION_INPUT",
            DomainError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    pub fn missing_input(field: &'static str) -> Self {
        DomainError::MissingInput { field }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        DomainError::Persistence(message.into())
    }
}

// ============================================================================
// WIRE SHAPE
// ============================================================================

/// Error body returned by the REST surface: `{error, code}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl From<&DomainError> for ErrorBody {
    fn from(err: &DomainError) -> Self {
        ErrorBody {
            error: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            DomainError::PromoNotFound { id: "p1".into() }.code(),
            "PROMO_NOT_FOUND"
        );
        assert_eq!(
            DomainError::DuplicateEnrollment {
                member_id: "m1".into(),
                promo_id: "p1".into()
            }
            .code(),
            "EXISTING_ENROLLMENT"
        );
        assert_eq!(DomainError::NotAllowed.code(), "NOT_ALLOWED_ERROR");
    }

    #[test]
    fn test_both_promo_state_failures_share_a_code() {
        let enroll = DomainError::PromoNotActive { id: "p1".into() };
        let delete = DomainError::ActivePromoDeletion { id: "p1".into() };
        assert_eq!(enroll.code(), delete.code());
        assert_eq!(enroll.code(), "INVALID_PROMO_STATE");
    }

    #[test]
    fn test_messages_interpolate_identifiers() {
        let err = DomainError::MemberNotFound { id: "m-42".into() };
        assert!(err.to_string().contains("m-42"));

        let err = DomainError::DuplicateEnrollment {
            member_id: "m-1".into(),
            promo_id: "p-9".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("m-1") && msg.contains("p-9"));
    }

    #[test]
    fn test_error_body_shape() {
        let err = DomainError::InvalidCredentials;
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, "INVALID_CREDENTIALS");
        assert_eq!(body.error, "Invalid credentials");
    }
}
