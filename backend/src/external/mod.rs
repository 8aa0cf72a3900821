//! External collaborators

pub mod alerts;

pub use alerts::{AlertDispatcher, AlertError, AlertSender, NoopAlerts, SmsGateway};
