pub mod catalog;
pub mod event;
pub mod guess;
pub mod round;
pub mod session;
