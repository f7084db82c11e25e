// Member Entity - identity + profile attributes
//
// The username is the unique login handle; profile attributes (real name,
// email, bank account, balance) are optional and a SIGN_UP promo may require
// any of them. Presence follows truthiness: empty strings and a zero balance
// count as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::promo::RequiredMemberField;

// ============================================================================
// MEMBER ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub username: String,

    /// Salted digest, `salt$hex` (see crate::auth)
    pub password_hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,

    #[serde(default)]
    pub balance: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn new(username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Member {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            password_hash,
            real_name: None,
            email: None,
            bank_account: None,
            balance: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Truthy presence check for a promo-required field. A balance of
    /// exactly zero is treated as absent, like an empty string.
    pub fn field_present(&self, field: RequiredMemberField) -> bool {
        match field {
            RequiredMemberField::Email => is_present(&self.email),
            RequiredMemberField::RealName => is_present(&self.real_name),
            RequiredMemberField::BankAccount => is_present(&self.bank_account),
        }
    }

    /// Apply a profile update. Only provided fields change.
    pub fn apply_update(&mut self, update: MemberUpdate) {
        if let Some(real_name) = update.real_name {
            self.real_name = Some(real_name);
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(bank_account) = update.bank_account {
            self.bank_account = Some(bank_account);
        }
        if let Some(balance) = update.balance {
            self.balance = balance;
        }
        self.updated_at = Utc::now();
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Profile update payload; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
}

// ============================================================================
// TESTS
// ============================================================================
