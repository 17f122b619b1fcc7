// src/uplink/mod.rs

pub mod payload;
pub mod session;

pub use payload::{FrameHeader, Reading, UplinkPayload};
pub use session::{JoinCredentials, Region, Session};
