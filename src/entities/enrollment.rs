// EnrollmentRequest Entity - a member's pending claim on a promotion
//
// Dependent entity referencing member and promo by identifier; no cascading
// ownership. Created only by the eligibility engine, mutated only through
// the workflow transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ENROLLMENT STATUS
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "PENDING",
            EnrollmentStatus::Processing => "PROCESSING",
            EnrollmentStatus::Approved => "APPROVED",
            EnrollmentStatus::Rejected => "REJECTED",
        }
    }
}

// ============================================================================
// ENROLLMENT REQUEST ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub id: String,
    pub member_id: String,
    pub promo_id: String,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnrollmentRequest {
    /// New requests always start PENDING.
    pub fn new(member_id: String, promo_id: String) -> Self {
        let now = Utc::now();
        EnrollmentRequest {
            id: uuid::Uuid::new_v4().to_string(),
            member_id,
            promo_id,
            status: EnrollmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: EnrollmentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let request = EnrollmentRequest::new("m1".to_string(), "p1".to_string());
        assert_eq!(request.status, EnrollmentStatus::Pending);
        assert_eq!(request.member_id, "m1");
        assert_eq!(request.promo_id, "p1");
        assert!(!request.id.is_empty());
    }

    #[test]
    fn test_set_status_bumps_updated_at() {
        let mut request = EnrollmentRequest::new("m1".to_string(), "p1".to_string());
        let before = request.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        request.set_status(EnrollmentStatus::Approved);
        assert_eq!(request.status, EnrollmentStatus::Approved);
        assert!(request.updated_at > before);
    }

    #[test]
    fn test_status_wire_names() {
        let request = EnrollmentRequest::new("m1".to_string(), "p1".to_string());
        let doc = serde_json::to_value(&request).unwrap();
        assert_eq!(doc["status"], "PENDING");
        assert_eq!(doc["memberId"], "m1");
        assert_eq!(doc["promoId"], "p1");
    }
}
