//! Stage 2 of every overlap exchange: ship the records themselves.

use super::size_exchange::exchange_sizes;
use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, cast_slice, decode_records, expect_exact_len};
use crate::mesh_error::MeshSieveError;
use bytemuck::Pod;
use std::collections::BTreeMap;
use std::mem::size_of;

/// Exchange `outgoing[nbr]` with every listed neighbor: counts on
/// `sizes_tag`, then the records on `data_tag`.
///
/// Neighbors with nothing to say still receive an empty message, so both
/// sides of a pair always post matching operations. Returns the records
/// received from each neighbor, in the order the neighbor sent them.
pub fn exchange_records<T, C>(
    comm: &C,
    sizes_tag: CommTag,
    data_tag: CommTag,
    outgoing: &BTreeMap<usize, Vec<T>>,
) -> Result<BTreeMap<usize, Vec<T>>, MeshSieveError>
where
    T: Pod,
    C: Communicator,
{
    let counts = outgoing.iter().map(|(&nbr, v)| (nbr, v.len())).collect();
    let sizes = exchange_sizes(comm, sizes_tag, &counts);

    // A neighbor that accepted our count posts a receive for the data, even
    // when the size stage failed on this side.
    let mut pending_sends = Vec::with_capacity(outgoing.len());
    for (&nbr, items) in outgoing {
        if WireCount::new(items.len(), nbr).is_ok() {
            pending_sends.push(comm.isend(nbr, data_tag.as_u16(), cast_slice(items)));
        }
    }
    let incoming = match sizes {
        Ok(incoming) => incoming,
        Err(e) => {
            for send in pending_sends {
                let _ = send.wait();
            }
            return Err(e);
        }
    };

    let mut pending_recvs = Vec::with_capacity(incoming.len());
    for (&nbr, &n) in &incoming {
        let mut buf = vec![0u8; n * size_of::<T>()];
        pending_recvs.push((nbr, n, comm.irecv(nbr, data_tag.as_u16(), &mut buf)));
    }

    let mut received = BTreeMap::new();
    let mut maybe_err = None;
    for (nbr, n, h) in pending_recvs {
        match h.wait() {
            Some(data) if maybe_err.is_none() => {
                let decoded = expect_exact_len(data.len(), n * size_of::<T>(), nbr)
                    .and_then(|()| decode_records::<T>(&data, nbr));
                match decoded {
                    Ok(items) => {
                        received.insert(nbr, items);
                    }
                    Err(e) => maybe_err = Some(e),
                }
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(MeshSieveError::CommError {
                    neighbor: nbr,
                    message: format!("failed to receive {n} records from rank {nbr}"),
                });
            }
            _ => {}
        }
    }

    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(received),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::LocalComm;

    #[test]
    fn records_and_empty_messages() {
        let comms = LocalComm::group(2);
        let (a, b) = (CommTag::new(1), CommTag::new(2));
        let out = std::thread::scope(|s| {
            let c1 = &comms[1];
            let h = s.spawn(move || {
                let outgoing = BTreeMap::from([(0usize, Vec::<u64>::new())]);
                exchange_records(c1, a, b, &outgoing)
            });
            let outgoing = BTreeMap::from([(1usize, vec![3u64, 4, 5])]);
            let mine = exchange_records(&comms[0], a, b, &outgoing).unwrap();
            (mine, h.join().unwrap().unwrap())
        });
        assert_eq!(out.0[&1], Vec::<u64>::new());
        assert_eq!(out.1[&0], vec![3, 4, 5]);
    }
}
