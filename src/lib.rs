mod body;
mod character_controller;
mod config;
mod diag_plugin;
mod input_plugin;
mod movement;
mod orientation;
mod sensor;

pub use body::*;
pub use character_controller::*;
pub use config::*;
pub use diag_plugin::*;
pub use input_plugin::*;
pub use movement::*;
pub use orientation::*;
pub use sensor::*;
