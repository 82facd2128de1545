pub mod country;
pub mod difficulty;
