//! Business services sitting between HTTP handlers and storage.

mod jokes;

pub use jokes::{JokeService, JokeServiceImpl};
