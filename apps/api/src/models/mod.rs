pub mod event;
pub mod tier;
pub mod user;
