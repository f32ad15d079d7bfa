pub mod academic;
pub mod eligibility;
pub mod roster;
