//! Visitor badge intake: QR payload field extraction, capture session
//! control, and submission to a spreadsheet endpoint.

pub mod capture;
pub mod config;
pub mod extract;
pub mod model;
pub mod session;
pub mod sheets;
