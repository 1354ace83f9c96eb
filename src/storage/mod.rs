//! Durable session state

mod persistence;
mod state;

pub use persistence::{get_data_dir, FileStateStore, MemoryStateStore, StateStore};
pub use state::PersistedState;
