pub mod address;
pub mod courier;
pub mod notify;
pub mod payment;
