pub mod checkout;
pub mod enrollment_helpers;
pub mod purchase_helpers;
pub mod query;
pub mod verify;
pub mod webhook;
