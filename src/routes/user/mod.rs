mod handler;
mod model;

pub use handler::{find_by_id, search};
pub use model::User;
