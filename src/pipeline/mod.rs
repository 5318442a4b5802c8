mod consumer;
pub mod queue;
pub mod sidecar;
pub mod signal;
pub mod throttle;
pub mod writer;

pub use queue::HandoffQueue;
pub use sidecar::{sidecar_path, SidecarWriter, SIDECAR_FILE_NAME};
pub use signal::WorkSignal;
pub use throttle::{frame_duration, ThrottleGate};
pub use writer::VideoFrameWriter;
