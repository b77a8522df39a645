use std::sync::Arc;

use serde::Serialize;

use crate::engine::VarnodeRecord;
use crate::model::space::{AddressSpace, SpaceInterner};

/// A sized reference into an address space.
///
/// For the `const` space the offset is the literal value rather than an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarNode {
    pub space: Arc<AddressSpace>,
    pub offset: u64,
    /// Size in bytes; the engine may use negative sentinels.
    pub size: i32,
}

impl VarNode {
    pub fn new(space: Arc<AddressSpace>, offset: u64, size: i32) -> Self {
        Self { space, offset, size }
    }

    pub(crate) fn from_record(record: &VarnodeRecord, interner: &SpaceInterner) -> Self {
        Self { space: interner.intern(&record.space), offset: record.offset, size: record.size }
    }

    pub fn is_const(&self) -> bool {
        self.space.is_const()
    }

    pub fn is_register(&self) -> bool {
        self.space.is_register()
    }

    /// The (space, offset, size) tuple that identifies a storage location.
    pub fn key(&self) -> StorageKey {
        StorageKey { space: self.space.name.clone(), offset: self.offset, size: self.size }
    }
}

/// Owned identity of a storage location, usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StorageKey {
    pub space: String,
    pub offset: u64,
    pub size: i32,
}

/// A named architecture register.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Register {
    pub name: String,
    pub node: VarNode,
}

impl Register {
    pub fn new(name: impl Into<String>, node: VarNode) -> Self {
        Self { name: name.into(), node }
    }

    pub fn key(&self) -> StorageKey {
        self.node.key()
    }
}
