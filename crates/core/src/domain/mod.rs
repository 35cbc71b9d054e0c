pub mod member;
pub mod message;
