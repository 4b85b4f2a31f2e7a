pub mod applicationdb;
pub mod chatdb;
#[allow(clippy::module_inception)]
pub mod db;
pub mod jobdb;
pub mod memory;
pub mod userdb;

use std::fmt::Debug;

pub use applicationdb::ApplicationExt;
pub use chatdb::ChatExt;
pub use jobdb::JobExt;
pub use userdb::UserExt;

/// Everything the services need from a document store.
pub trait Store: UserExt + JobExt + ApplicationExt + ChatExt + Debug {}

impl<T> Store for T where T: UserExt + JobExt + ApplicationExt + ChatExt + Debug {}
