pub mod convert;
pub mod frame;

pub use convert::to_rgb;
pub use frame::{Frame, Pose};
