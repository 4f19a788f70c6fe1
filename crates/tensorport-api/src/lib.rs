//! Wire-facing inference message types.
//!
//! Frontends own framing and transport; these are only the shapes the
//! serving core shares with them. The structs are hand-maintained
//! prost derives (protobuf-compatible, no service definition here).

pub mod v1;
