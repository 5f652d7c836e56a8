pub mod acknowledgment;
pub mod poller;
