//! Control/relay protocol
//!
//! Lets a controller drive the pagination engine through fire-and-forget
//! commands (`start`, `stop`, `getData`, `reset`) and observe every outcome
//! as an event (`progress`, `done`, `error`, `data`, `templateCaptured`,
//! `rejected`).
//!
//! ```text
//! controller --RelayCommand (mpsc)--> Relay task --spawn--> PaginationEngine::run
//!     ^                                   |                        |
//!     +------RelayEvent (broadcast)-------+----------progress------+
//! ```
//!
//! Progress events are published by the run task before it returns, and the
//! terminal `done`/`error` event is published by the relay only after joining
//! that task, so a subscriber always sees progress strictly before the end.
//!
//! Phase rules:
//! - `start` is accepted in Idle or Done and always begins from empty state
//! - `start` in Running, Stopping or Failed is rejected; Failed needs `reset`
//! - `stop` moves Running to Stopping; the run then lands in Idle
//! - `reset` is rejected while a run is active

mod controller;
mod types;

pub use controller::{Relay, RelayHandle};
pub use types::{RelayCommand, RelayEvent};
