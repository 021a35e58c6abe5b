pub mod domain;
pub mod infra;
pub mod observability;
pub mod payments;
pub mod rendering;
