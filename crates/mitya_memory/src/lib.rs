pub mod sqlite;

pub use sqlite::{SqliteStore, StoreConfig};

#[cfg(test)]
mod tests;
