//! Application layer for the Priority Resolver

pub mod service;
