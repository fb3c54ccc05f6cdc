//! Application records, their status lifecycle and query filters.

pub mod filter;
pub mod record;
pub mod status;
pub mod transition;

pub use filter::ApplicationFilter;
pub use record::{ApplicationPatch, ApplicationRecord, PaymentTerms};
pub use status::{ApplicationStatus, ParseStatusError, PaymentStatus};
pub use transition::{transition, transition_at, Actor, Role};
