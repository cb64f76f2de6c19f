//! Progress reporting for pipeline runs

mod bus;
mod handler;
mod logging;

pub use bus::{EventBus, EventBusError, UpdateReceiver, DEFAULT_CAPACITY};
pub use handler::{
    CompositeHandler, NoOpHandler, ProgressEvent, ProgressHandler, ProgressUpdate, RunStatus,
};
pub use logging::LoggingHandler;
