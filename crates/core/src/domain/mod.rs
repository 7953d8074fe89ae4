pub mod customer;
pub mod quote;
pub mod validation;
