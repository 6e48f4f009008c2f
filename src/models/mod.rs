mod api;
mod joke;

pub use api::{JokeRequest, PaginationQuery};
pub use joke::{Joke, JokeUpdate};
