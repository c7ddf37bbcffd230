pub mod background;
pub mod cancel;
pub mod config;
pub mod coverage_scan;
pub mod distribution;
pub mod error;
pub mod fragment_shift;
pub mod io;
pub mod peak_caller;
pub mod progress;
pub mod redundancy;
pub mod source;
#[macro_use]
extern crate log;

pub use cancel::CancellationToken;
pub use config::PeakCallConfig;
pub use error::{PeakCallError, Result};
pub use peak_caller::{spawn, Outcome, PeakCallHandle, PeakCaller};
pub use progress::{Event, LogListener, ProgressListener};
