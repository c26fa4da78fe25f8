//! BDD step definitions for the review notifier

pub mod polling_steps;
