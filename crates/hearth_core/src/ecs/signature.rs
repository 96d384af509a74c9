use crate::ecs::ComponentId;
use bit_vec::BitVec;
use std::fmt;

/// Bit set with one bit per component type ID.
///
/// Entities carry one describing the components they hold; systems carry
/// one describing the components they require. The backing vector grows on
/// demand, so there is no upper bound on the number of component types.
#[derive(Clone, Default)]
pub struct Signature {
    bits: BitVec,
}

impl Signature {
    pub fn new() -> Self {
        Self { bits: BitVec::new() }
    }

    /// Set the bit for `id`. Returns `false` if it was already set.
    pub fn insert(&mut self, id: ComponentId) -> bool {
        let index = id as usize;
        if index >= self.bits.len() {
            let grow_by = index + 1 - self.bits.len();
            self.bits.grow(grow_by, false);
        }
        let was_set = self.bits[index];
        self.bits.set(index, true);
        !was_set
    }

    /// Clear the bit for `id`. Returns `true` if it was set.
    pub fn remove(&mut self, id: ComponentId) -> bool {
        let index = id as usize;
        match self.bits.get(index) {
            Some(true) => {
                self.bits.set(index, false);
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.bits.get(id as usize).unwrap_or(false)
    }

    /// Number of bits set.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|bit| *bit).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.none()
    }

    /// Whether every bit set in `required` is also set here.
    ///
    /// An empty `required` signature is a subset of everything.
    pub fn is_superset_of(&self, required: &Signature) -> bool {
        required.ids().all(|id| self.contains(id))
    }

    /// IDs of the bits set, ascending.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(|(index, _)| index as ComponentId)
    }
}

// Trailing clear bits are not significant.
impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.ids().eq(other.ids())
    }
}

impl Eq for Signature {}

impl FromIterator<ComponentId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        let mut signature = Signature::new();
        for id in iter {
            signature.insert(id);
        }
        signature
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}
