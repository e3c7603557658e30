pub mod datetime;
pub mod logging;
pub mod markup;
pub mod validation;
