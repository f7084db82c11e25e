// Enrollment-Request Workflow - lifecycle state machine
//
// States: PENDING -> PROCESSING -> APPROVED / REJECTED, with PENDING the
// sole initial state. approve/process/reject transition whatever state the
// request is currently in; APPROVED and REJECTED are terminal by convention
// only, the workflow does not lock them. Requests are never deleted by the
// workflow itself.

use crate::entities::{EnrollmentRequest, EnrollmentStatus};
use crate::error::{DomainError, Result};
use crate::pagination::{paginate, Connection};
use crate::store::Storage;

// ============================================================================
// WORKFLOW
// ============================================================================

#[derive(Clone)]
pub struct EnrollmentWorkflow {
    storage: Storage,
}

impl EnrollmentWorkflow {
    pub fn new(storage: Storage) -> Self {
        EnrollmentWorkflow { storage }
    }

    /// Insert a new request at PENDING. The storage layer enforces the
    /// (member, promo) uniqueness atomically, so two concurrent creates for
    /// the same pair cannot both land.
    pub fn create(&self, member_id: &str, promo_id: &str) -> Result<EnrollmentRequest> {
        let request = EnrollmentRequest::new(member_id.to_string(), promo_id.to_string());
        self.storage.enrollments.insert_unique(&request)?;
        Ok(request)
    }

    pub fn approve(&self, request_id: &str) -> Result<EnrollmentRequest> {
        self.transition(request_id, EnrollmentStatus::Approved)
    }

    pub fn process(&self, request_id: &str) -> Result<EnrollmentRequest> {
        self.transition(request_id, EnrollmentStatus::Processing)
    }

    pub fn reject(&self, request_id: &str) -> Result<EnrollmentRequest> {
        self.transition(request_id, EnrollmentStatus::Rejected)
    }

    pub fn select_one(&self, request_id: &str) -> Result<EnrollmentRequest> {
        self.storage
            .enrollments
            .find_by_id(request_id)?
            .ok_or_else(|| DomainError::EnrollmentRequestNotFound {
                id: request_id.to_string(),
            })
    }

    pub fn select_all(
        &self,
        first: Option<i64>,
        after: Option<&str>,
    ) -> Result<Connection<EnrollmentRequest>> {
        let requests = self.storage.enrollments.list()?;
        paginate(requests, first, after)
    }

    /// Administrative/test-only removal.
    pub fn remove(&self, request_id: &str) -> Result<bool> {
        self.storage.enrollments.delete(request_id)
    }

    // Single-step, unconditional once the request is located.
    fn transition(
        &self,
        request_id: &str,
        status: EnrollmentStatus,
    ) -> Result<EnrollmentRequest> {
        let mut request = self.select_one(request_id)?;
        request.set_status(status);
        if !self.storage.enrollments.update(&request)? {
            return Err(DomainError::EnrollmentRequestNotFound {
                id: request_id.to_string(),
            });
        }
        Ok(request)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::encode_cursor;

    fn workflow() -> EnrollmentWorkflow {
        EnrollmentWorkflow::new(Storage::in_memory())
    }

    #[test]
    fn test_create_starts_pending() {
        let wf = workflow();
        let request = wf.create("m1", "p1").unwrap();
        assert_eq!(request.status, EnrollmentStatus::Pending);

        let stored = wf.select_one(&request.id).unwrap();
        assert_eq!(stored, request);
    }

    #[test]
    fn test_create_same_pair_twice_fails() {
        let wf = workflow();
        wf.create("m1", "p1").unwrap();
        let err = wf.create("m1", "p1").unwrap_err();
        assert_eq!(err.code(), "EXISTING_ENROLLMENT");
    }

    #[test]
    fn test_approve_sets_approved() {
        let wf = workflow();
        let request = wf.create("m1", "p1").unwrap();

        let approved = wf.approve(&request.id).unwrap();
        assert_eq!(approved.status, EnrollmentStatus::Approved);

        // the transition persisted
        let stored = wf.select_one(&request.id).unwrap();
        assert_eq!(stored.status, EnrollmentStatus::Approved);
    }

    #[test]
    fn test_process_and_reject() {
        let wf = workflow();
        let request = wf.create("m1", "p1").unwrap();

        assert_eq!(
            wf.process(&request.id).unwrap().status,
            EnrollmentStatus::Processing
        );
        assert_eq!(
            wf.reject(&request.id).unwrap().status,
            EnrollmentStatus::Rejected
        );
    }

    #[test]
    fn test_transition_missing_request_fails() {
        let wf = workflow();
        let err = wf.approve("no-such-id").unwrap_err();
        assert_eq!(err.code(), "ENROLLMENT_REQUEST_NOT_FOUND");
        assert!(err.to_string().contains("no-such-id"));
    }

    #[test]
    fn test_transitions_are_unrestricted() {
        // Terminal states are a convention, not a guard: an approved
        // request can still be rejected afterwards.
        let wf = workflow();
        let request = wf.create("m1", "p1").unwrap();

        wf.approve(&request.id).unwrap();
        let rejected = wf.reject(&request.id).unwrap();
        assert_eq!(rejected.status, EnrollmentStatus::Rejected);

        let processing_again = wf.process(&request.id).unwrap();
        assert_eq!(processing_again.status, EnrollmentStatus::Processing);
    }

    #[test]
    fn test_select_all_paginates() {
        let wf = workflow();
        for i in 0..4 {
            wf.create(&format!("m{i}"), "p1").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let page = wf.select_all(Some(2), None).unwrap();
        assert_eq!(page.total_count, 4);
        assert_eq!(page.edges.len(), 2);
        assert!(page.page_info.has_next_page);

        // resume from the last returned edge
        let cursor = page.page_info.end_cursor.clone().unwrap();
        let rest = wf.select_all(None, Some(&cursor)).unwrap();
        assert_eq!(rest.edges[0].node.id, page.edges[1].node.id);
    }

    #[test]
    fn test_select_all_rejects_bad_args() {
        let wf = workflow();
        assert_eq!(
            wf.select_all(Some(-1), None).unwrap_err().code(),
            "PAGINATION_INPUT"
        );
        assert_eq!(
            wf.select_all(None, Some("@@@")).unwrap_err().code(),
            "PAGINATION_INPUT"
        );
    }

    #[test]
    fn test_remove_is_administrative_delete() {
        let wf = workflow();
        let request = wf.create("m1", "p1").unwrap();
        assert!(wf.remove(&request.id).unwrap());
        assert!(!wf.remove(&request.id).unwrap());
        assert!(wf.select_one(&request.id).is_err());
    }

    #[test]
    fn test_cursor_of_created_request_resumes_at_it() {
        let wf = workflow();
        let first = wf.create("m1", "p1").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        wf.create("m2", "p1").unwrap();

        let cursor = encode_cursor(first.created_at);
        let window = wf.select_all(None, Some(&cursor)).unwrap();
        assert_eq!(window.total_count, 2);
        assert_eq!(window.edges[0].node.id, first.id);
    }
}
