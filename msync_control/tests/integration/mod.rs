pub mod support;

mod commands;
mod dual_motor;
mod listener;
mod single_motor;
