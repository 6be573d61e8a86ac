mod handler;
mod model;

pub use handler::nearby;
pub use model::NearbyPlacesRequest;
