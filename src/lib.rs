pub mod bounds;
pub mod catalog;
pub mod constants;
pub mod moving_objects;
pub mod predicate;
pub mod skycat_errors;
