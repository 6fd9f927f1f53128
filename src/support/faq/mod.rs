//! Self-service help entries shown before a customer opens a ticket.

mod dto;
pub mod handlers;
pub mod repo;
