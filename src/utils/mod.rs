mod rwnd;
mod seq;
mod swnd;

pub use rwnd::*;
pub use seq::*;
pub use swnd::*;
