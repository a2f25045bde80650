//! Runtime configuration for a [`CoSieve`](crate::data::cosieve::CoSieve).
//!
//! The configuration is plain data with a `Default`, so it can be embedded in
//! an application's own config file through serde.

use crate::algs::communicator::CommTag;

/// Options controlling ordering checks and the overlap protocol.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CoSieveConfig {
    /// Validate that every ordered patch tiles its storage exactly.
    pub verify_layout: bool,
    /// First tag used by the overlap protocol; nine consecutive tags are consumed.
    pub overlap_tag: u16,
}

impl Default for CoSieveConfig {
    fn default() -> Self {
        Self {
            verify_layout: cfg!(any(debug_assertions, feature = "check-invariants")),
            overlap_tag: 0xC05E,
        }
    }
}

impl CoSieveConfig {
    /// Base tag of the overlap protocol.
    #[inline]
    pub fn overlap_tags(&self) -> OverlapTags {
        OverlapTags::from_base(CommTag::new(self.overlap_tag))
    }
}

/// Tags for the three two-phase exchanges of the overlap protocol, plus the
/// status rounds that let every rank leave a failed stage together.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OverlapTags {
    pub patch_sizes: CommTag,
    pub patch_data: CommTag,
    pub index_sizes: CommTag,
    pub index_data: CommTag,
    pub value_sizes: CommTag,
    pub value_data: CommTag,
    pub patch_status: CommTag,
    pub index_status: CommTag,
    pub value_status: CommTag,
}

impl OverlapTags {
    pub fn from_base(base: CommTag) -> Self {
        Self {
            patch_sizes: base,
            patch_data: base.offset(1),
            index_sizes: base.offset(2),
            index_data: base.offset(3),
            value_sizes: base.offset(4),
            value_data: base.offset(5),
            patch_status: base.offset(6),
            index_status: base.offset(7),
            value_status: base.offset(8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: CoSieveConfig = serde_json::from_str(r#"{"overlap_tag": 7}"#).unwrap();
        assert_eq!(cfg.overlap_tag, 7);
        assert_eq!(cfg.verify_layout, CoSieveConfig::default().verify_layout);
        let tags = cfg.overlap_tags();
        assert_eq!(tags.value_data.as_u16(), 12);
        assert_eq!(tags.index_status.as_u16(), 14);
    }
}
