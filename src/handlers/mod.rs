mod extract;
mod health;
mod jokes;

pub use health::{HEALTH_BODY, hello_world};
pub use jokes::{create_joke, delete_joke, get_joke, list_jokes, update_joke};
