mod handler;
mod model;

pub use handler::{create_follow, find_followers, find_following};
pub use model::Following;
