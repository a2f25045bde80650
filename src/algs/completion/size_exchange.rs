//! Stage 1 of every overlap exchange: tell each neighbor how many records follow.
//!
//! All sends are posted before the first receive is waited on, and every
//! handle is drained before returning, even if an error occurs.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, cast_slice, decode_records, expect_exact_len};
use crate::mesh_error::MeshSieveError;
use std::collections::BTreeMap;
use std::mem::size_of;

/// Send `counts[nbr]` to every listed neighbor and receive theirs.
///
/// The exchange is symmetric: this rank expects a count from exactly the
/// neighbors it sends to. Returns `nbr → incoming count`.
pub fn exchange_sizes<C>(
    comm: &C,
    tag: CommTag,
    counts: &BTreeMap<usize, usize>,
) -> Result<BTreeMap<usize, usize>, MeshSieveError>
where
    C: Communicator,
{
    let mut maybe_err = None;

    // 1) post all sends; a count that does not fit still goes out, as the
    //    overflow marker, so the neighbor fails instead of waiting
    let mut pending_sends = Vec::with_capacity(counts.len());
    for (&nbr, &n) in counts {
        let count = WireCount::new(n, nbr).unwrap_or_else(|e| {
            maybe_err.get_or_insert(e);
            WireCount::overflow()
        });
        pending_sends.push(comm.isend(
            nbr,
            tag.as_u16(),
            cast_slice(std::slice::from_ref(&count)),
        ));
    }

    // 2) post all receives
    let mut pending_recvs = Vec::with_capacity(counts.len());
    for &nbr in counts.keys() {
        let mut buf = [0u8; size_of::<WireCount>()];
        pending_recvs.push((nbr, comm.irecv(nbr, tag.as_u16(), &mut buf)));
    }

    // 3) wait for all recvs, collect counts (but do not early-return)
    let mut sizes_in = BTreeMap::new();
    for (nbr, h) in pending_recvs {
        match h.wait() {
            Some(data) if maybe_err.is_none() => {
                let decoded = expect_exact_len(data.len(), size_of::<WireCount>(), nbr)
                    .and_then(|()| decode_records::<WireCount>(&data, nbr))
                    .and_then(|cnt| cnt[0].get(nbr));
                match decoded {
                    Ok(n) => {
                        sizes_in.insert(nbr, n);
                    }
                    Err(e) => maybe_err = Some(e),
                }
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(MeshSieveError::CommError {
                    neighbor: nbr,
                    message: format!("failed to receive size from rank {nbr}"),
                });
            }
            _ => {} // already have an error; just drain
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(sizes_in),
    }
}

/// Tell every peer whether this rank completed a collective stage, and learn
/// the same from them. Returns the lowest peer that reported a failure.
pub fn exchange_status<C>(comm: &C, tag: CommTag, failed: bool) -> Result<Option<usize>, MeshSieveError>
where
    C: Communicator,
{
    let status = comm
        .peers()
        .into_iter()
        .map(|r| (r, usize::from(failed)))
        .collect();
    let peers = exchange_sizes(comm, tag, &status)?;
    Ok(peers.into_iter().find(|&(_, s)| s != 0).map(|(r, _)| r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{LocalComm, NoComm};

    #[test]
    fn sizes_cross_between_threads() {
        let comms = LocalComm::group(3);
        let tag = CommTag::new(5);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|c| {
                    s.spawn(move || {
                        let counts = c.peers().into_iter().map(|p| (p, 10 * c.rank() + p)).collect();
                        exchange_sizes(c, tag, &counts)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let got = results[1].as_ref().unwrap();
        assert_eq!(got[&0], 1);
        assert_eq!(got[&2], 21);
    }

    #[test]
    fn serial_exchange_is_empty() {
        let got = exchange_sizes(&NoComm, CommTag::new(1), &BTreeMap::new()).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn status_reports_the_lowest_failed_peer() {
        let comms = LocalComm::group(4);
        let tag = CommTag::new(9);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|c| s.spawn(move || exchange_status(c, tag, c.rank() % 2 == 1).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results, vec![Some(1), Some(3), Some(1), Some(1)]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_count_fails_both_sides() {
        let comms = LocalComm::group(2);
        let tag = CommTag::new(3);
        let (mine, theirs) = std::thread::scope(|s| {
            let c1 = &comms[1];
            let h = s.spawn(move || exchange_sizes(c1, tag, &BTreeMap::from([(0, 4)])));
            let mine = exchange_sizes(&comms[0], tag, &BTreeMap::from([(1, 1usize << 33)]));
            (mine, h.join().unwrap())
        });
        assert!(matches!(mine, Err(MeshSieveError::CommError { neighbor: 1, .. })));
        assert!(matches!(theirs, Err(MeshSieveError::CommError { neighbor: 0, .. })));
    }
}
