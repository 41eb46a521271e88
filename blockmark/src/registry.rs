use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::descriptor::BlockDescriptor;

pub const PLACEHOLDER_PREFIX: &str = "custom-block-";

/// Key of a placeholder anchor: `custom-block-<index>`.
/// Indices start at 0 on every scan pass and follow source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaceholderId(usize);

impl PlaceholderId {
    pub fn new(index: usize) -> Self {
        PlaceholderId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }

    /// Parse `custom-block-<index>`.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix(PLACEHOLDER_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(PlaceholderId)
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PLACEHOLDER_PREFIX, self.0)
    }
}

impl Serialize for PlaceholderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Placeholder id to descriptor map built fresh by every scan pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BlockRegistry {
    entries: BTreeMap<PlaceholderId, BlockDescriptor>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        BlockRegistry::default()
    }

    pub fn insert(&mut self, id: PlaceholderId, descriptor: BlockDescriptor) -> Option<BlockDescriptor> {
        self.entries.insert(id, descriptor)
    }

    /// Look up a descriptor by the id string found in a placeholder anchor.
    pub fn get(&self, id: &str) -> Option<&BlockDescriptor> {
        self.entries.get(&PlaceholderId::parse(id)?)
    }

    pub fn get_id(&self, id: PlaceholderId) -> Option<&BlockDescriptor> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlaceholderId, &BlockDescriptor)> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlaceholderId> + '_ {
        self.entries.keys().copied()
    }

    /// Index the next block in this pass would receive.
    pub fn next_index(&self) -> usize {
        self.entries
            .keys()
            .next_back()
            .map(|id| id.index() + 1)
            .unwrap_or(0)
    }
}
