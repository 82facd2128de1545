pub mod gamepad;
pub mod input;
pub mod map;
pub mod renderer;
pub mod sound;
