//! `ledctrl` is a remote-control client for addressable LED-strip controllers speaking a small
//! HTTP GET command protocol on the local network.
//!
//! # Structure
//!
//! * [endpoint]: normalization of user-entered controller addresses
//! * [transport]: single GET calls with short timeouts, and the last-request monitor
//! * [scanner]: discovery of controllers on the local /24 subnet
//! * [dispatcher]: per-channel cancel-and-replace debouncing of high-frequency parameters
//! * [session]: the optimistic view of the controller's selection and brightness state
//! * [color]: color wheel samples and their hex wire form
//! * [store]: persistence of the last used controller address
//! * [config]: timeouts, debounce intervals and scan settings
//!
//! # License
//!
//! This source code is released under the [MIT-License](https://opensource.org/licenses/MIT)

#[macro_use]
extern crate tracing;
#[macro_use]
extern crate serde_derive;

pub mod color;
pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod scanner;
pub mod session;
pub mod store;
pub mod transport;
