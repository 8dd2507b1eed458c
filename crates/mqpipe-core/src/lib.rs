//! mqpipe Core Types
//!
//! This crate provides the foundational types of the mqpipe dataflow toolkit:
//! the message-queue socket and driver abstractions, the process-wide driver
//! registry, and the FairMQ-compatible configuration model.
//!
//! ## Architecture Overview
//!
//! mqpipe is split across multiple crates with clear separation of concerns:
//!
//! ### mqpipe-core: The Contracts
//!
//! This crate knows nothing about any concrete message-queue library or about
//! the device runtime. It defines:
//! - **Sockets and drivers**: the [`Socket`] and [`Driver`] traits every
//!   transport implementation satisfies
//! - **Driver registry**: the [`registry`] module maps driver names to
//!   registered implementations
//! - **Configuration**: the [`config`] module parses the JSON device
//!   topology used to instantiate device graphs
//! - **Errors**: the [`error`] module unifies configuration and transport
//!   failures
//!
//! ### Driver Crates: The Transport Bindings
//!
//! Separate crates like `mqpipe-zeromq` and `mqpipe-nanomsg` implement the
//! [`Driver`] trait over concrete message-queue libraries.
//!
//! ### mqpipe-runtime: The Device Engine
//!
//! The runtime crate owns devices, channels, mailboxes and the command-driven
//! state machine; it consumes the traits defined here.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod address;
pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod socket;
pub mod socket_type;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::Config;
pub use error::{ConfigError, Error, Result, TransportError};
pub use message::Message;
pub use socket::{Driver, Socket};
pub use socket_type::SocketType;
