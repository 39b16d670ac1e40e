pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, load_network, save_network};
pub use schema::NetworkDocument;
