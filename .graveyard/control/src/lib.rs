#[macro_use]
extern crate serde_with;

pub mod cmd;
pub mod config;
pub mod context;
pub mod middleware;
pub mod models;
pub mod repo;
pub mod services;
pub mod shutdown;
pub mod startup;

mod controllers;
mod error;
mod routes;
