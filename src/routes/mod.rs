pub mod checkin;
pub mod follow;
pub mod place;
pub mod user;
