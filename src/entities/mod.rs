// Entity Models
//
// Each entity has:
// - Stable server-generated identity (UUID string)
// - Creation/update timestamps (the creation time also feeds the cursor)
// - Validation helpers owned by the entity itself

pub mod enrollment;
pub mod member;
pub mod promo;
pub mod vendor;

pub use enrollment::{EnrollmentRequest, EnrollmentStatus};
pub use member::{Member, MemberUpdate};
pub use promo::{Promo, PromoStatus, PromoTemplate, RequiredMemberField};
pub use vendor::{Vendor, VendorType};
