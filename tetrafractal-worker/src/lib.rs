//! Background subdivision for tetrafractal
//!
//! Subdivision runs on a dedicated thread so the render loop never stalls.
//! A [`RunHandle`] is the caller's end of one run; the
//! [`SubdivisionDispatcher`] tags successive runs with a [`Generation`] and
//! only ever delivers the result of the most recent one.

pub mod config;
pub mod handle;
pub mod dispatcher;

pub use config::*;
pub use handle::*;
pub use dispatcher::*;
