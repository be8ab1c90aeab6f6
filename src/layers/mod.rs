pub mod dense;
pub mod lstm;
