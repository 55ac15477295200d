//! Database request/response models, kept separate from the API representations.

pub mod reservations;
pub mod users;
