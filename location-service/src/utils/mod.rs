pub mod validation;

pub use validation::{ParsedQuery, ValidatedJson, ValidatedQuery};
