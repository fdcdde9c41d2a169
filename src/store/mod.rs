//! Persisted store: in-memory domain state with write-through snapshots.

mod clock;
mod persist;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use persist::{JsonFilePersister, MemoryPersister, NullPersister, Persister, STORAGE_NAMESPACE};
pub use state::{Store, StoreState, SNAPSHOT_VERSION};
