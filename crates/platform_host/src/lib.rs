//! Typed host-side contracts shared by the desktop runtime and its embedding shells.
//!
//! The runtime never touches a rendering backend directly. It drives window surfaces through
//! [`VisualSurface`], allocates and releases them through [`SurfaceFactory`], and reads time
//! through [`Clock`]. The in-memory adapters in this crate back headless hosts and tests.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod surface;
pub mod time;

pub use surface::{
    MemorySurface, MemorySurfaceHost, SurfaceFactory, SurfaceId, SurfaceRect, SurfaceSnapshot,
    TransitionEffect, TransitionToken, VisualSurface,
};
pub use time::{unix_time_ms_now, Clock, ManualClock, SystemClock};
