//! Request and response bodies

pub mod auth;
pub mod automation;
pub mod client;
pub mod dashboard;
pub mod lead;
pub mod policy;
pub mod settings;
pub mod whatsapp;

