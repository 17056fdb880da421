pub mod composer;
pub mod grade_ledger;
pub mod grading;
pub mod health;
pub mod prefetch;
pub mod recorder;
pub mod search_terms;
