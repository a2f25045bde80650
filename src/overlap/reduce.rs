//! Overlap completion, delta construction and reduction for a [`CoSieve`].
//!
//! Point and patch identities are assumed to be global: two ranks holding a
//! point with the same identifier hold the same mesh entity. The protocol
//! has three two-phase exchanges (counts, then records), each on its own pair
//! of tags from [`CoSieveConfig::overlap_tags`](crate::config::CoSieveConfig::overlap_tags):
//!
//! 1. every rank sends its `(point, patch)` memberships to every other rank;
//! 2. ranks sharing points send the indices of those points, which are
//!    paired by position;
//! 3. ranks send the values behind the paired indices, in an order both
//!    sides derive from the sorted links.
//!
//! Stage 1 is an all-to-all broadcast. No rank knows its neighbours in
//! advance, so each one ships its full membership list to every peer and
//! keeps what it recognises. Traffic is `O(points × ranks)`, which suits the
//! small groups the overlap is computed on; a caller that already knows its
//! neighbours should restrict the communicator to them.
//!
//! Stages 1 and 2 end with a status round on every peer, and so does the
//! staging step of [`CoSieve::reduce_with`]. A rank that fails a stage still
//! takes part in its exchanges. The round then makes every rank leave with
//! an error, so no rank goes on to wait for a peer that has already given
//! up. Ranks that only learn of another rank's failure report
//! [`MeshSieveError::OverlapAborted`].

use super::delta::{Delta, OverlapIndex, OverlapPatch};
use super::overlap::{IndexLink, OverlapIndices, OverlapPatches, PatchLink};
use super::policy::{OverlapSite, ReductionPolicy, RequireIdentical};
use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::completion::{exchange_records, exchange_status};
use crate::algs::wire::{WireIndexRecord, WirePatchRecord, WirePoint};
use crate::data::cosieve::CoSieve;
use crate::data::index::{IndexLike, Interval, IntervalLike};
use crate::data::storage::Storage;
use crate::mesh_error::MeshSieveError;
use crate::topology::bounds::PointLike;
use crate::topology::sieve::Sieve;
use bytemuck::Pod;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Wire offset of an index that has not been ordered.
const UNRESOLVED_OFFSET: u64 = u64::MAX;

fn decode_id<T: WirePoint>(w: u64, neighbor: usize, what: &str) -> Result<T, MeshSieveError> {
    T::from_wire(w).ok_or_else(|| MeshSieveError::WireDecode {
        neighbor,
        message: format!("invalid {what} identifier {w}"),
    })
}

fn shape_mismatch(point: impl std::fmt::Debug, rank: usize, detail: String) -> MeshSieveError {
    MeshSieveError::OverlapShapeMismatch {
        point: format!("{point:?}"),
        rank,
        detail,
    }
}

/// Leave a collective stage together: if any rank failed it, every rank
/// returns an error.
fn settle<T, C: Communicator>(
    comm: &C,
    tag: CommTag,
    stage: &'static str,
    local: Result<T, MeshSieveError>,
) -> Result<T, MeshSieveError> {
    let failed_peer = exchange_status(comm, tag, local.is_err());
    let value = local?;
    match failed_peer? {
        Some(rank) => {
            log::warn!("rank {}: rank {rank} failed the {stage} exchange", comm.rank());
            Err(MeshSieveError::OverlapAborted { rank, stage })
        }
        None => Ok(value),
    }
}

/// Local values of one shared slice, reconciled link by link before commit.
struct Staged<V> {
    values: Vec<V>,
    owner: usize,
}

impl<S, Patch, I, V> CoSieve<S, Patch, I, V>
where
    S: Sieve,
    S::Point: WirePoint,
    Patch: PointLike + WirePoint,
    I: IndexLike,
    V: Clone + Default,
{
    /// Patches holding storage for each point: the closure of every patch's
    /// declared sequence.
    fn patch_members(&self) -> Result<BTreeMap<S::Point, Vec<Patch>>, MeshSieveError> {
        let mut out: BTreeMap<S::Point, Vec<Patch>> = BTreeMap::new();
        for patch in self.patches()? {
            for p in self.topology().closure(self.patch(patch)) {
                out.entry(p).or_default().push(patch);
            }
        }
        for v in out.values_mut() {
            v.sort_unstable();
            v.dedup();
        }
        Ok(out)
    }

    /// Find the `(point, local patch, remote patch)` triples shared with each
    /// other rank. Collective: every rank of `comm` must call it.
    ///
    /// # Errors
    /// Fails on every rank if any rank fails; see the module docs.
    pub fn compute_overlap_patches<C: Communicator>(
        &self,
        comm: &C,
    ) -> Result<OverlapPatches<S::Point, Patch>, MeshSieveError> {
        let tags = self.config().overlap_tags();
        let members = self.patch_members();
        let records: Vec<WirePatchRecord> = members
            .iter()
            .flat_map(|m| m.iter())
            .flat_map(|(p, patches)| {
                patches
                    .iter()
                    .map(move |patch| WirePatchRecord::new(p.to_wire(), patch.to_wire()))
            })
            .collect();
        let outgoing: BTreeMap<usize, Vec<WirePatchRecord>> = comm
            .peers()
            .into_iter()
            .map(|r| (r, records.clone()))
            .collect();
        let incoming = exchange_records(comm, tags.patch_sizes, tags.patch_data, &outgoing);
        let links = members.and_then(|members| Self::match_memberships(&members, incoming?));
        let overlap = OverlapPatches::from_links(settle(comm, tags.patch_status, "patch", links)?);
        log::debug!(
            "rank {}: {} shared patch links with ranks {:?}",
            comm.rank(),
            overlap.len(),
            overlap.neighbours().collect::<Vec<_>>()
        );
        Ok(overlap)
    }

    /// Local patches sharing each received membership, per neighbor.
    #[allow(clippy::type_complexity)]
    fn match_memberships(
        members: &BTreeMap<S::Point, Vec<Patch>>,
        incoming: BTreeMap<usize, Vec<WirePatchRecord>>,
    ) -> Result<BTreeMap<usize, Vec<PatchLink<S::Point, Patch>>>, MeshSieveError> {
        let mut links: BTreeMap<usize, Vec<PatchLink<S::Point, Patch>>> = BTreeMap::new();
        for (nbr, recs) in incoming {
            let out = links.entry(nbr).or_default();
            for rec in recs {
                let point: S::Point = decode_id(rec.point(), nbr, "point")?;
                let remote: Patch = decode_id(rec.patch(), nbr, "patch")?;
                if let Some(locals) = members.get(&point) {
                    out.extend(locals.iter().map(|&local| PatchLink {
                        point,
                        local,
                        remote,
                    }));
                }
            }
        }
        Ok(links)
    }

    /// Pair the indices of every shared point with the neighbor's. Collective.
    ///
    /// # Errors
    /// [`MeshSieveError::OverlapShapeMismatch`] if the two sides attach a
    /// different number of indices, or indices of different lengths, to a
    /// shared point. Ranks that see no mismatch themselves then fail with
    /// [`MeshSieveError::OverlapAborted`].
    pub fn compute_overlap_indices<C: Communicator>(
        &self,
        comm: &C,
        overlap: &OverlapPatches<S::Point, Patch>,
    ) -> Result<OverlapIndices<S::Point, Patch, I, S::Color>, MeshSieveError> {
        let tags = self.config().overlap_tags();
        let mut outgoing: BTreeMap<usize, Vec<WireIndexRecord>> = BTreeMap::new();
        for nbr in overlap.neighbours() {
            let shared: BTreeSet<(S::Point, Patch)> = overlap
                .links_to(nbr)
                .iter()
                .map(|l| (l.point, l.local))
                .collect();
            let recs = outgoing.entry(nbr).or_default();
            for (p, patch) in shared {
                for (k, (_, idx)) in self.colored_indices(patch, p).into_iter().enumerate() {
                    recs.push(WireIndexRecord::new(
                        p.to_wire(),
                        patch.to_wire(),
                        k as u32,
                        idx.offset().map_or(UNRESOLVED_OFFSET, |o| o as u64),
                        idx.len() as u64,
                    ));
                }
            }
        }
        let incoming = exchange_records(comm, tags.index_sizes, tags.index_data, &outgoing);
        let links = incoming.and_then(|incoming| self.pair_indices(overlap, incoming));
        let overlap = OverlapIndices::from_links(settle(comm, tags.index_status, "index", links)?);
        log::debug!("rank {}: {} shared index links", comm.rank(), overlap.len());
        Ok(overlap)
    }

    /// Pair local and received index records link by link.
    #[allow(clippy::type_complexity)]
    fn pair_indices(
        &self,
        overlap: &OverlapPatches<S::Point, Patch>,
        incoming: BTreeMap<usize, Vec<WireIndexRecord>>,
    ) -> Result<BTreeMap<usize, Vec<IndexLink<S::Point, Patch, I, S::Color>>>, MeshSieveError> {
        let mut links = BTreeMap::new();
        for (nbr, recs) in incoming {
            let mut theirs: HashMap<(S::Point, Patch), Vec<WireIndexRecord>> = HashMap::new();
            for rec in recs {
                let p: S::Point = decode_id(rec.point(), nbr, "point")?;
                let patch: Patch = decode_id(rec.patch(), nbr, "patch")?;
                theirs.entry((p, patch)).or_default().push(rec);
            }
            let mut out = Vec::new();
            for link in overlap.links_to(nbr) {
                let mine = self.colored_indices(link.local, link.point);
                let mut remote = theirs
                    .get(&(link.point, link.remote))
                    .cloned()
                    .unwrap_or_default();
                remote.sort_by_key(WireIndexRecord::ordinal);
                if mine.len() != remote.len() {
                    return Err(shape_mismatch(
                        link.point,
                        nbr,
                        format!(
                            "{} indices in local patch {:?}, {} in remote patch {:?}",
                            mine.len(),
                            link.local,
                            remote.len(),
                            link.remote
                        ),
                    ));
                }
                for (k, ((color, idx), rec)) in mine.into_iter().zip(&remote).enumerate() {
                    let len = rec.len() as usize;
                    if rec.ordinal() as usize != k || len != idx.len() {
                        return Err(shape_mismatch(
                            link.point,
                            nbr,
                            format!(
                                "index {k} has length {} locally, {len} remotely",
                                idx.len()
                            ),
                        ));
                    }
                    let remote_idx = match rec.offset() {
                        UNRESOLVED_OFFSET => Interval::unresolved(len),
                        off => Interval::new(off as usize, len),
                    };
                    out.push(IndexLink {
                        point: link.point,
                        patches: (link.local, link.remote),
                        indices: (idx, remote_idx),
                        color: color.1,
                        ordinal: k as u32,
                    });
                }
            }
            links.insert(nbr, out);
        }
        Ok(links)
    }

    /// Local values behind `idx` in `patch`.
    fn values_at(&self, patch: Patch, point: S::Point, idx: &I) -> Result<&[V], MeshSieveError> {
        let range = idx.range().ok_or_else(|| MeshSieveError::UnresolvedIndex {
            patch: format!("{patch:?}"),
            point: format!("{point:?}"),
        })?;
        self.patch_storage(patch)?.data.slice(range.start, range.len())
    }
}

impl<S, Patch, I, V> CoSieve<S, Patch, I, V>
where
    S: Sieve,
    S::Point: WirePoint,
    Patch: PointLike + WirePoint,
    I: IndexLike,
    V: Pod + Default,
{
    /// Receive every neighbor's values for the shared indices. Collective.
    ///
    /// The result holds one delta patch per `(local patch, remote patch,
    /// rank)` and, for every nonempty link, the neighbor's values laid out in
    /// a slot of that patch.
    pub fn compute_delta<C: Communicator>(
        &self,
        comm: &C,
        overlap: &OverlapIndices<S::Point, Patch, I, S::Color>,
    ) -> Result<Delta<S, Patch, I, V>, MeshSieveError> {
        let tags = self.config().overlap_tags();

        let mut inner: CoSieve<S, OverlapPatch<Patch>, OverlapIndex<I>, V> =
            CoSieve::with_config(Arc::clone(self.topology()), self.config().clone());
        let mut members: BTreeMap<OverlapPatch<Patch>, BTreeSet<S::Point>> = BTreeMap::new();
        for (rank, link) in overlap.iter().filter(|(_, l)| !l.is_empty()) {
            let dp = OverlapPatch {
                local: link.patches.0,
                remote: link.patches.1,
                rank,
            };
            members.entry(dp).or_default().insert(link.point);
        }
        for (dp, points) in members {
            inner.set_patch(points, dp);
        }
        // Local failures are held until the exchange is done so the
        // neighbors do not stall.
        let mut local_err = None;
        for (rank, link) in overlap.iter().filter(|(_, l)| !l.is_empty()) {
            let dp = OverlapPatch {
                local: link.patches.0,
                remote: link.patches.1,
                rank,
            };
            let oi = OverlapIndex {
                local: link.indices.0,
                remote: link.indices.1,
                rank,
                slot: Interval::unresolved(link.len()),
            };
            if let Err(e) = inner.add_index(dp, link.point, link.color, oi) {
                local_err.get_or_insert(e);
            }
        }
        if let Err(e) = inner.order_patches() {
            local_err.get_or_insert(e);
        }

        // Values go out in the receiver's link order: point, then the
        // receiver's patch (our remote), then ours, then ordinal.
        let mut outgoing: BTreeMap<usize, Vec<V>> = BTreeMap::new();
        for nbr in overlap.neighbours() {
            let mut links: Vec<_> = overlap.links_to(nbr).iter().filter(|l| !l.is_empty()).collect();
            links.sort_by_key(|l| (l.point, l.patches.1, l.patches.0, l.ordinal));
            let mut payload = Vec::new();
            for l in links {
                match self.values_at(l.patches.0, l.point, &l.indices.0) {
                    Ok(vals) => payload.extend_from_slice(vals),
                    Err(e) => {
                        local_err.get_or_insert(e);
                        payload.clear();
                        break;
                    }
                }
            }
            outgoing.insert(nbr, payload);
        }
        let incoming = exchange_records(comm, tags.value_sizes, tags.value_data, &outgoing)?;
        if let Some(e) = local_err {
            return Err(e);
        }

        for (nbr, values) in incoming {
            let mut links: Vec<_> = overlap.links_to(nbr).iter().filter(|l| !l.is_empty()).collect();
            links.sort_by_key(|l| (l.point, l.patches.0, l.patches.1, l.ordinal));
            let expected: usize = links.iter().map(|l| l.len()).sum();
            if values.len() != expected {
                let first = links.first().map(|l| format!("{:?}", l.point));
                return Err(MeshSieveError::OverlapShapeMismatch {
                    point: first.unwrap_or_default(),
                    rank: nbr,
                    detail: format!("expected {expected} values, received {}", values.len()),
                });
            }
            let mut rest = values.as_slice();
            for l in links {
                let (chunk, tail) = rest.split_at(l.len());
                rest = tail;
                let dp = OverlapPatch {
                    local: l.patches.0,
                    remote: l.patches.1,
                    rank: nbr,
                };
                let slot = inner
                    .patch_indices(dp, l.point)
                    .find(|oi| oi.local == l.indices.0)
                    .and_then(|oi| oi.range())
                    .ok_or_else(|| MeshSieveError::UnresolvedIndex {
                        patch: format!("{dp:?}"),
                        point: format!("{:?}", l.point),
                    })?;
                inner.patch_storage_mut(dp)?.data.write_at(slot.start, chunk)?;
            }
        }
        log::debug!(
            "rank {}: delta holds {} patches",
            comm.rank(),
            inner.patches()?.len()
        );
        Ok(Delta { inner })
    }

    /// Merge the neighbors' values into local storage with the default
    /// policy: shared values must be identical. Collective.
    pub fn reduce<C: Communicator>(&mut self, comm: &C) -> Result<(), MeshSieveError>
    where
        V: PartialEq,
    {
        self.reduce_with(comm, &RequireIdentical)
    }

    /// Merge the neighbors' values into local storage with `policy`. Collective.
    ///
    /// Nothing is written unless every shared index reconciles on every rank.
    pub fn reduce_with<C, R>(&mut self, comm: &C, policy: &R) -> Result<(), MeshSieveError>
    where
        C: Communicator,
        R: ReductionPolicy<V>,
    {
        let tags = self.config().overlap_tags();
        let patches = self.compute_overlap_patches(comm)?;
        let indices = self.compute_overlap_indices(comm, &patches)?;
        let staged = self
            .compute_delta(comm, &indices)
            .and_then(|delta| self.stage_reduction(comm.rank(), &indices, &delta, policy));
        let staged = settle(comm, tags.value_status, "value", staged)?;

        log::debug!("rank {}: committing {} reduced slices", comm.rank(), staged.len());
        for ((patch, start), s) in staged {
            self.patch_storage_mut(patch)?.data.write_at(start, &s.values)?;
        }
        Ok(())
    }

    /// Reconcile every shared slice with the neighbors' values, without
    /// touching local storage.
    fn stage_reduction<R: ReductionPolicy<V>>(
        &self,
        me: usize,
        indices: &OverlapIndices<S::Point, Patch, I, S::Color>,
        delta: &Delta<S, Patch, I, V>,
        policy: &R,
    ) -> Result<BTreeMap<(Patch, usize), Staged<V>>, MeshSieveError> {
        let mut staged: BTreeMap<(Patch, usize), Staged<V>> = BTreeMap::new();
        for (rank, link) in indices.iter().filter(|(_, l)| !l.is_empty()) {
            let local = link.patches.0;
            let start = link.indices.0.offset().ok_or_else(|| MeshSieveError::UnresolvedIndex {
                patch: format!("{local:?}"),
                point: format!("{:?}", link.point),
            })?;
            let entry = match staged.entry((local, start)) {
                std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::btree_map::Entry::Vacant(e) => e.insert(Staged {
                    values: self.values_at(local, link.point, &link.indices.0)?.to_vec(),
                    owner: me,
                }),
            };
            let dp = OverlapPatch {
                local,
                remote: link.patches.1,
                rank,
            };
            let slot = delta
                .patch_indices(dp, link.point)
                .find(|oi| oi.local == link.indices.0)
                .and_then(|oi| oi.range())
                .ok_or_else(|| MeshSieveError::UnresolvedIndex {
                    patch: format!("{dp:?}"),
                    point: format!("{:?}", link.point),
                })?;
            let remote = delta
                .inner
                .patch_storage(dp)?
                .data
                .slice(slot.start, slot.len())?;
            let site = OverlapSite {
                point: &link.point,
                rank,
                owner: entry.owner,
            };
            policy.reconcile(&site, &mut entry.values, remote)?;
            entry.owner = entry.owner.min(rank);
        }
        Ok(staged)
    }
}
