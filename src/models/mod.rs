pub mod error;
pub mod harvest;
pub mod price;
pub mod report;
