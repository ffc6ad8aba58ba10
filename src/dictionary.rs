use std::{
    borrow::Borrow,
    collections::HashMap,
    fmt::{Display, Formatter},
    hash::Hash,
};

/// The id a [`Dictionary`] gives to one raw attribute value.
///
/// Ids are dense and assigned in first-seen order starting at 0. [`ValueId::INVALID`] is never
/// assigned and stands for "value outside the configured domain".
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Debug, Hash)]
pub struct ValueId(usize);

impl ValueId {
    pub const INVALID: Self = Self(usize::MAX);

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// The position of the value in its dictionary; `None` for [`ValueId::INVALID`].
    #[inline]
    pub const fn index(self) -> Option<usize> {
        if self.is_valid() {
            Some(self.0)
        } else {
            None
        }
    }

    /// The id as a partition key; `None` for [`ValueId::INVALID`].
    #[inline]
    pub(crate) fn as_key(self) -> Option<i64> {
        self.index().and_then(|index| i64::try_from(index).ok())
    }

    #[inline]
    pub(crate) const fn from_offset(offset: usize) -> Self {
        Self(offset)
    }

    #[cfg(test)]
    pub(crate) const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl Display for ValueId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(formatter, "#{}", self.0)
        } else {
            write!(formatter, "#invalid")
        }
    }
}

/// Append-only bijection between the raw values of one attribute and small integer ids.
#[derive(Clone, Debug)]
pub struct Dictionary<K> {
    by_values: HashMap<K, ValueId>,
    values: Vec<K>,
}

impl<K: Eq + Hash + Clone> Dictionary<K> {
    pub fn new() -> Self {
        Self {
            by_values: HashMap::new(),
            values: Vec::new(),
        }
    }

    /// Read-only lookup; unknown values map to [`ValueId::INVALID`].
    pub fn try_resolve<Q>(&self, value: &Q) -> ValueId
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.by_values
            .get(value)
            .copied()
            .unwrap_or(ValueId::INVALID)
    }

    /// Look the value up, assigning the next id when it is new.
    ///
    /// A new value only gets an id while fewer than `cardinality` values are known, unless
    /// `always_assign` is set.
    pub fn resolve_or_assign<Q>(
        &mut self,
        value: &Q,
        cardinality: Option<usize>,
        always_assign: bool,
    ) -> ValueId
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(id) = self.by_values.get(value) {
            return *id;
        }

        let is_full = cardinality.is_some_and(|cardinality| self.values.len() >= cardinality);
        if is_full && !always_assign {
            return ValueId::INVALID;
        }

        let id = ValueId(self.values.len());
        let owned = value.to_owned();
        self.values.push(owned.clone());
        self.by_values.insert(owned, id);
        id
    }

    /// The raw value behind an id.
    #[cfg(test)]
    pub fn value(&self, id: ValueId) -> Option<&K> {
        self.values.get(id.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<K: Eq + Hash + Clone> Default for Dictionary<K> {
    fn default() -> Self {
        Self::new()
    }
}
