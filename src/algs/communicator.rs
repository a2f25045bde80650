//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable**: the overlap exchanges call `.wait()` before
//! they trust that a buffer is ready, and drain every handle they posted even
//! when an earlier one failed.

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A message tag. Each exchange phase uses its own tag so that messages of
/// different phases between the same pair of ranks never mix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    #[inline]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// The tag `k` places after this one.
    #[inline]
    pub const fn offset(self, k: u16) -> Self {
        Self(self.0.wrapping_add(k))
    }
}

/// Point-to-point communication between the ranks of a process group.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// Rank of this process in the group.
    fn rank(&self) -> usize;
    /// Number of ranks in the group.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of a message of `buf.len()` bytes. The received bytes
    /// are returned by [`Wait::wait`].
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Ranks other than this one.
    fn peers(&self) -> Vec<usize> {
        let me = self.rank();
        (0..self.size()).filter(|&r| r != me).collect()
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Single-rank communicator for serial runs: there is nobody to talk to.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- LocalComm: ranks as threads of one process ---

type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Default)]
struct Mailbox {
    slots: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    posted: Condvar,
}

/// In-process communicator: every rank of a group is a handle onto the same
/// mailbox, so ranks can run on separate threads of one test.
///
/// Messages between a pair of ranks with the same tag are delivered in the
/// order they were sent.
#[derive(Clone)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl LocalComm {
    /// A group of `n` ranks sharing one mailbox; element `i` is rank `i`.
    pub fn group(n: usize) -> Vec<LocalComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..n)
            .map(|rank| LocalComm {
                rank,
                size: n,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

/// Pending receive on a [`LocalComm`] mailbox.
pub struct LocalRecv {
    mailbox: Arc<Mailbox>,
    key: Key,
}

impl Wait for LocalRecv {
    fn wait(self) -> Option<Vec<u8>> {
        let mut slots = self.mailbox.slots.lock();
        loop {
            if let Some(msg) = slots.get_mut(&self.key).and_then(VecDeque::pop_front) {
                return Some(msg.to_vec());
            }
            self.mailbox.posted.wait(&mut slots);
        }
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalRecv;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        let key = (self.rank, peer, tag);
        self.mailbox
            .slots
            .lock()
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        self.mailbox.posted.notify_all();
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> LocalRecv {
        LocalRecv {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use crate::mesh_error::MeshSieveError;
    use mpi::environment::Universe;
    use mpi::request::StaticScope;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// Communicator over `MPI_COMM_WORLD`.
    ///
    /// Sends are non-blocking; receives complete inside `irecv`, which is safe
    /// because every exchange posts all of its sends before its receives.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        // finalizes MPI on drop, so it must outlive `world`
        _universe: Universe,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, MeshSieveError> {
            let universe = mpi::initialize().ok_or_else(|| MeshSieveError::CommError {
                neighbor: 0,
                message: "MPI was already initialized".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    /// In-flight send; owns the buffer until the request completes.
    pub struct MpiSend(Option<Box<dyn FnOnce()>>);

    impl Wait for MpiSend {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(finish) = self.0.take() {
                finish();
            }
            None
        }
    }

    pub struct MpiRecv(Option<Vec<u8>>);

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSend;
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSend {
            let raw: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: `raw` stays allocated until the request has completed below.
            let data: &'static [u8] = unsafe { &*raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, tag as i32);
            MpiSend(Some(Box::new(move || {
                req.wait();
                // SAFETY: the request is complete, nothing borrows `raw` any more.
                drop(unsafe { Box::from_raw(raw) });
            })))
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiRecv {
            let (data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag as i32);
            MpiRecv(Some(data))
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
