mod handler;
mod model;

pub use handler::{create_check_in, feed, find_by_user, update_check_in};
pub use model::{CheckIn, CreateCheckInRequest, LINE_MINUTE_BUCKETS, UpdateCheckInRequest};
