// Vendor Entity - plain CRUD aggregate
// Vendors are partners whose offers back promotions; the REST surface owns
// their lifecycle. Unique on name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

// ============================================================================
// VENDOR TYPE
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorType {
    /// Sells goods or services directly to members
    Merchant,

    /// Co-marketing partner without a storefront
    Partner,
}

impl VendorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorType::Merchant => "MERCHANT",
            VendorType::Partner => "PARTNER",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "MERCHANT" => Ok(VendorType::Merchant),
            "PARTNER" => Ok(VendorType::Partner),
            _ => Err(DomainError::InvalidEnumValue {
                kind: "type",
                value: raw.to_string(),
            }),
        }
    }
}

// ============================================================================
// VENDOR ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub vendor_type: VendorType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    pub fn new(name: String, vendor_type: VendorType) -> Self {
        let now = Utc::now();
        Vendor {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            vendor_type,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
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
    fn test_vendor_creation() {
        let vendor = Vendor::new("Acme".to_string(), VendorType::Merchant);
        assert!(!vendor.id.is_empty());
        assert_eq!(vendor.name, "Acme");
        assert_eq!(vendor.vendor_type, VendorType::Merchant);
    }

    #[test]
    fn test_vendor_type_parse() {
        assert_eq!(VendorType::parse("MERCHANT").unwrap(), VendorType::Merchant);
        assert_eq!(VendorType::parse("PARTNER").unwrap(), VendorType::Partner);

        let err = VendorType::parse("WHOLESALER").unwrap_err();
        assert_eq!(err.code(), "INVALID_ENUM_VALUE");
        assert!(err.to_string().contains("WHOLESALER"));
    }

    #[test]
    fn test_vendor_wire_shape_uses_type_key() {
        let vendor = Vendor::new("Acme".to_string(), VendorType::Partner);
        let doc = serde_json::to_value(&vendor).unwrap();
        assert_eq!(doc["type"], "PARTNER");
        assert!(doc.get("vendorType").is_none());
    }
}
