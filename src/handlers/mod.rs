// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod questions;
pub mod quiz;
pub mod users;
