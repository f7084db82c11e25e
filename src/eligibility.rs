// Enrollment-Eligibility Engine
//
// Decides whether a member may enroll in a promotion. Evaluation is a
// sequence of hard gates; the first failure wins and is surfaced verbatim,
// with no retries and no partial evaluation. A successful evaluation hands
// off to the workflow, which persists the request at PENDING.

use crate::entities::{EnrollmentRequest, Member, Promo, PromoTemplate};
use crate::error::{DomainError, Result};
use crate::store::Storage;
use crate::workflow::EnrollmentWorkflow;

// ============================================================================
// ELIGIBILITY ENGINE
// ============================================================================

#[derive(Clone)]
pub struct EligibilityEngine {
    storage: Storage,
    workflow: EnrollmentWorkflow,
}

impl EligibilityEngine {
    pub fn new(storage: Storage) -> Self {
        let workflow = EnrollmentWorkflow::new(storage.clone());
        EligibilityEngine { storage, workflow }
    }

    /// Evaluate the member against the promotion and, if every gate passes,
    /// create the enrollment request.
    ///
    /// Gate order is observable through the returned error and must not be
    /// rearranged: input presence, promo existence, promo activation, member
    /// existence, duplicate check, then the template rule.
    pub fn evaluate(&self, promo_id: &str, member_id: &str) -> Result<EnrollmentRequest> {
        if promo_id.is_empty() {
            return Err(DomainError::missing_input("promoId"));
        }
        if member_id.is_empty() {
            return Err(DomainError::missing_input("memberId"));
        }

        let promo = self
            .storage
            .promos
            .find_by_id(promo_id)?
            .ok_or_else(|| DomainError::PromoNotFound {
                id: promo_id.to_string(),
            })?;

        // DRAFT and INACTIVE fail the same way
        if !promo.is_active() {
            return Err(DomainError::PromoNotActive {
                id: promo_id.to_string(),
            });
        }

        let member = self
            .storage
            .members
            .find_by_id(member_id)?
            .ok_or_else(|| DomainError::MemberNotFound {
                id: member_id.to_string(),
            })?;

        // Any prior request blocks, whatever its status. The storage layer
        // re-checks atomically at insert time; this gate exists so the
        // duplicate answer outranks the template rule.
        if self.storage.enrollments.exists_for(member_id, promo_id)? {
            return Err(DomainError::DuplicateEnrollment {
                member_id: member_id.to_string(),
                promo_id: promo_id.to_string(),
            });
        }

        match promo.template {
            PromoTemplate::SignUp => check_sign_up(&promo, &member)?,
            PromoTemplate::Deposit => check_deposit(&promo, &member)?,
        }

        self.workflow.create(member_id, promo_id)
    }
}

/// SIGN_UP: every required field must be present on the member, checked in
/// the promotion's listed order; the first missing one names itself.
fn check_sign_up(promo: &Promo, member: &Member) -> Result<()> {
    for field in &promo.required_member_fields {
        if !member.field_present(*field) {
            return Err(DomainError::RequiredFieldMissing {
                field: field.as_str(),
            });
        }
    }
    Ok(())
}

/// DEPOSIT: a zero balance is "no balance", and a promo whose minimum never
/// got configured is a misconfiguration, not a member failure.
fn check_deposit(promo: &Promo, member: &Member) -> Result<()> {
    if member.balance == 0.0 {
        return Err(DomainError::InsufficientBalance);
    }
    let Some(minimum) = promo.minimum_balance.filter(|m| *m != 0.0) else {
        return Err(DomainError::PromoMisconfigured {
            message: format!("promo {} has no usable minimumBalance", promo.id),
        });
    };
    if member.balance < minimum {
        return Err(DomainError::InsufficientBalance);
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
