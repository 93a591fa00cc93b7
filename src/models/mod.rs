// src/models/mod.rs

pub mod account;
pub mod admin;
pub mod feedback;
pub mod message;
pub mod pagination;
pub mod profile;
pub mod skill;
pub mod swap_request;
