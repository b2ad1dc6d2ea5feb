// src/models/mod.rs

pub mod question;
pub mod quiz;
pub mod skill;
pub mod user;
