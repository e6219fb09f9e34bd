#![allow(clippy::new_without_default)]
#![allow(async_fn_in_trait)]

#[macro_use]
extern crate log;

pub mod config;
pub mod controller;
pub mod directions;
pub mod geo;
pub mod logs;
pub mod map_view;
pub mod route;
pub mod server;
