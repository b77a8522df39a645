use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bitflags::bitflags;
use dashmap::DashMap;

use crate::engine::{SpaceId, SpaceRecord};

/// Name of the space holding immediate values.
pub const CONST_SPACE: &str = "const";
/// Name of the space holding architecture registers.
pub const REGISTER_SPACE: &str = "register";

bitflags! {
    /// Address space attributes reported by the engine.
    ///
    /// The bits are passed through untouched; unknown bits are retained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpaceFlags: u32 {
        const BIG_ENDIAN = 0x1;
        const HERITAGED = 0x2;
        const DOES_DEADCODE = 0x4;
        const PROGRAM_SPECIFIC = 0x8;
        const REVERSE_JUSTIFICATION = 0x10;
        const FORMAL_STACKSPACE = 0x20;
        const OVERLAY = 0x40;
        const OVERLAY_BASE = 0x80;
        const TRUNCATED = 0x100;
        const HAS_PHYSICAL = 0x200;
        const IS_OTHER_SPACE = 0x400;
        const HAS_NEAR_POINTERS = 0x800;
    }
}

/// A named storage domain such as `register`, `const` or `ram`.
///
/// Two spaces with the same name are interchangeable: equality and hashing
/// only look at the name.
#[derive(Debug, Clone)]
pub struct AddressSpace {
    pub name: String,
    pub index: u32,
    pub address_size: u32,
    pub word_size: u32,
    pub flags: SpaceFlags,
    pub highest: u64,
    pub pointer_lower_bound: u64,
    pub pointer_upper_bound: u64,
    /// Engine-native identity of the space, used for round trips.
    pub id: SpaceId,
}

impl AddressSpace {
    pub fn from_record(record: &SpaceRecord) -> Self {
        Self {
            name: record.name.clone(),
            index: record.index,
            address_size: record.address_size,
            word_size: record.word_size,
            flags: SpaceFlags::from_bits_retain(record.flags),
            highest: record.highest,
            pointer_lower_bound: record.pointer_lower_bound,
            pointer_upper_bound: record.pointer_upper_bound,
            id: record.id,
        }
    }

    /// Whether this space carries exactly the metadata in `record`.
    pub fn matches(&self, record: &SpaceRecord) -> bool {
        self.id == record.id
            && self.name == record.name
            && self.index == record.index
            && self.address_size == record.address_size
            && self.word_size == record.word_size
            && self.flags.bits() == record.flags
            && self.highest == record.highest
            && self.pointer_lower_bound == record.pointer_lower_bound
            && self.pointer_upper_bound == record.pointer_upper_bound
    }

    pub fn is_const(&self) -> bool {
        self.name == CONST_SPACE
    }

    pub fn is_register(&self) -> bool {
        self.name == REGISTER_SPACE
    }

    pub fn is_big_endian(&self) -> bool {
        self.flags.contains(SpaceFlags::BIG_ENDIAN)
    }

    /// Whether `value` falls inside the bounds the engine considers pointer-like.
    pub fn looks_like_pointer(&self, value: u64) -> bool {
        value >= self.pointer_lower_bound && value <= self.pointer_upper_bound
    }
}

impl PartialEq for AddressSpace {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AddressSpace {}

impl Hash for AddressSpace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Reference-counted intern table for address spaces, keyed by engine identity.
///
/// Entries are shared by every storage reference that points into the space and
/// are never recycled: an `Arc` handed out stays valid for as long as anyone
/// holds it, regardless of what happens to the table.
#[derive(Debug, Default)]
pub struct SpaceInterner {
    spaces: DashMap<SpaceId, Arc<AddressSpace>>,
}

impl SpaceInterner {
    pub fn new() -> Self {
        Self { spaces: DashMap::new() }
    }

    /// Return the interned space for `record`, creating it on first sight.
    ///
    /// A native identity can be reused by the engine after the space it named
    /// was torn down, so a hit whose metadata differs in any field is replaced.
    pub fn intern(&self, record: &SpaceRecord) -> Arc<AddressSpace> {
        if let Some(existing) = self.spaces.get(&record.id) {
            if existing.matches(record) {
                return Arc::clone(existing.value());
            }
        }

        let space = Arc::new(AddressSpace::from_record(record));
        self.spaces.insert(record.id, Arc::clone(&space));
        space
    }

    pub fn get(&self, id: SpaceId) -> Option<Arc<AddressSpace>> {
        self.spaces.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}
