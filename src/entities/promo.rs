// Promotion Entity - promotion catalog
//
// A promotion is shaped by its template: DEPOSIT promos gate on a minimum
// balance, SIGN_UP promos gate on profile completeness. Exactly one of the
// two field groups is populated, determined by the template.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

// ============================================================================
// PROMO TEMPLATE
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromoTemplate {
    /// Eligibility gates on the member's balance
    Deposit,

    /// Eligibility gates on profile completeness
    SignUp,
}

impl PromoTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromoTemplate::Deposit => "DEPOSIT",
            PromoTemplate::SignUp => "SIGN_UP",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "DEPOSIT" => Ok(PromoTemplate::Deposit),
            "SIGN_UP" => Ok(PromoTemplate::SignUp),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "template",
                value: raw.to_string(),
            }),
        }
    }
}

// ============================================================================
// PROMO STATUS
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromoStatus {
    Draft,
    Active,
    Inactive,
}

impl PromoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromoStatus::Draft => "DRAFT",
            PromoStatus::Active => "ACTIVE",
            PromoStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "DRAFT" => Ok(PromoStatus::Draft),
            "ACTIVE" => Ok(PromoStatus::Active),
            "INACTIVE" => Ok(PromoStatus::Inactive),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "status",
                value: raw.to_string(),
            }),
        }
    }
}

// ============================================================================
// REQUIRED MEMBER FIELD
// ============================================================================

/// Member attributes a SIGN_UP promo may require
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequiredMemberField {
    Email,
    RealName,
    BankAccount,
}

impl RequiredMemberField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredMemberField::Email => "EMAIL",
            RequiredMemberField::RealName => "REAL_NAME",
            RequiredMemberField::BankAccount => "BANK_ACCOUNT",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "EMAIL" => Ok(RequiredMemberField::Email),
            "REAL_NAME" => Ok(RequiredMemberField::RealName),
            "BANK_ACCOUNT" => Ok(RequiredMemberField::BankAccount),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "requiredMemberField",
                value: raw.to_string(),
            }),
        }
    }
}

// ============================================================================
// PROMO ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promo {
    pub id: String,
    pub name: String,
    pub template: PromoTemplate,
    pub status: PromoStatus,

    /// DEPOSIT only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_balance: Option<f64>,

    /// SIGN_UP only; order is significant, fields are checked as listed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_member_fields: Vec<RequiredMemberField>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promo {
    /// Create a new promo in DRAFT status. Call [`Promo::validate_template`]
    /// before persisting.
    pub fn new(name: String, template: PromoTemplate) -> Self {
        let now = Utc::now();
        Promo {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            template,
            status: PromoStatus::Draft,
            minimum_balance: None,
            required_member_fields: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PromoStatus::Active
    }

    /// Minimum balance counts as configured only when nonzero. A stored zero
    /// behaves exactly like an absent value throughout eligibility.
    pub fn has_minimum_balance(&self) -> bool {
        self.minimum_balance.is_some_and(|b| b != 0.0)
    }

    /// Enforce the template invariant: exactly one field group populated.
    pub fn validate_template(&self) -> Result<()> {
        match self.template {
            PromoTemplate::Deposit => {
                if self.minimum_balance.is_none() {
                    return Err(DomainError::PromoMisconfigured {
                        message: "DEPOSIT promo requires minimumBalance".to_string(),
                    });
                }
                if !self.required_member_fields.is_empty() {
                    return Err(DomainError::PromoMisconfigured {
                        message: "DEPOSIT promo cannot declare requiredMemberFields"
                            .to_string(),
                    });
                }
            }
            PromoTemplate::SignUp => {
                if self.required_member_fields.is_empty() {
                    return Err(DomainError::PromoMisconfigured {
                        message: "SIGN_UP promo requires a non-empty requiredMemberFields set"
                            .to_string(),
                    });
                }
                if self.minimum_balance.is_some() {
                    return Err(DomainError::PromoMisconfigured {
                        message: "SIGN_UP promo cannot declare minimumBalance".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// TESTS
// ============================================================================
