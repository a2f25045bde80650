//! Communication layer: communicators, wire records and completion exchanges.

pub mod communicator;
pub mod completion;
pub mod wire;

pub use communicator::{CommTag, Communicator, LocalComm, NoComm, Wait};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use wire::WirePoint;
