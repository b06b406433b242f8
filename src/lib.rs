//! Selective-Repeat ARQ over a simplex channel that may lose or corrupt packets but never
//! reorders them.
//!
//! ```text
//!  ┌──────────┐  data packets  ┌──────────┐
//!  │  Sender  │───────────────▶│ Receiver │
//!  │   (A)    │◀───────────────│   (B)    │
//!  └────┬─────┘      ACKs      └─────┬────┘
//!       │ layer::Host                │ layer::Host
//!  ┌────▼────────────────────────────▼────┐
//!  │ channel, timer, clock, application   │
//!  └──────────────────────────────────────┘
//! ```
//!
//! - [`protocol`]: packet layout, checksum and wire codec
//! - [`utils`]: modular sequence numbers and the two sliding windows
//! - [`layer`]: the sender and receiver state machines and the [`layer::Host`] they drive
//! - [`emulator`]: a discrete-event network that runs a sender against a receiver

pub mod emulator;
pub mod layer;
pub mod protocol;
pub mod utils;
