pub mod account;
pub mod consistency;
pub mod lookup;
pub mod member;
pub mod security_event;
