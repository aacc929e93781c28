mod accumulator;
pub mod actions;
mod chat_controller;
mod line_decoder;
mod transcript;

pub use accumulator::*;
pub use chat_controller::*;
pub use line_decoder::*;
pub use transcript::*;
