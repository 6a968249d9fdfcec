mod completion;
pub mod op;
mod poller;
mod registration;
mod timer;
pub mod util;

pub use completion::Key;
pub use poller::{Direction, Poller, PollerOptions};
pub use registration::Registration;
