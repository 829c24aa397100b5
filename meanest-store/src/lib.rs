pub mod archive;
pub mod counter;
pub mod error;
pub mod remote;

pub use archive::{SessionArchive, resolve_session_number};
pub use counter::LocalSessionCounter;
pub use error::{Result, StoreError};
pub use remote::{RemoteStore, SessionLookup};
