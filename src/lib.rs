pub mod config;
pub mod tftp;

#[macro_use]
extern crate log;
