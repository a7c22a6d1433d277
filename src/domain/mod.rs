pub mod avatar;
pub mod email;
pub mod status;
pub mod timesince;
pub mod timestamp;
