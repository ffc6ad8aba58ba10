use crate::{
    dictionary::{Dictionary, ValueId},
    footprint::Span,
};
use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
    ops::Index,
};
use thiserror::Error;
use tracing::debug;

/// Name of the integer attribute that carries the current time (in seconds) for segment and
/// frequency cap predicates.
pub const CLOCK_ATTRIBUTE: &str = "now";

#[derive(Error, PartialEq, Clone, Debug)]
pub enum DomainError {
    #[error("attribute {0} has already been defined")]
    AlreadyPresent(String),
    #[error("attribute {0} was registered after expressions were inserted")]
    Frozen(String),
    #[error("attribute {0} has an empty bound")]
    InvalidBound(String),
    #[error("ABE refers to non-existing attribute '{0:?}'")]
    NonExistingAttribute(String),
    #[error("{name:?}: mismatching types => expected: {expected:?}, found: {actual}")]
    MismatchingTypes {
        name: String,
        expected: AttributeKind,
        actual: String,
    },
    #[error("{name:?}: value {value} is outside of the attribute's domain")]
    OutOfBound { name: String, value: String },
    #[error("{0:?} is not dictionary encoded")]
    NotEncoded(String),
    #[error("{0:?} needs an integer attribute named '{CLOCK_ATTRIBUTE}'")]
    MissingClock(String),
    #[error("unknown frequency cap type {0:?}")]
    InvalidFrequencyType(String),
}

#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Debug, Hash)]
pub struct AttributeId(usize);

impl AttributeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for AttributeId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "attribute({})", self.0)
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AttributeKind {
    Boolean,
    Integer,
    Float,
    String,
    IntegerEnum,
    IntegerList,
    StringList,
    Segments,
    FrequencyCaps,
}

impl AttributeKind {
    #[inline]
    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::IntegerList | Self::StringList | Self::Segments | Self::FrequencyCaps
        )
    }
}

/// The admissible values of an attribute.
#[derive(Clone, PartialEq, Debug)]
pub enum ValueBound {
    Boolean,
    /// Inclusive range; also bounds every element of an integer list.
    Integer { min: i64, max: i64 },
    Float { min: Decimal, max: Decimal },
    /// Dictionary encoded values; `None` means the dictionary is only capped by memory.
    Enumeration { cardinality: Option<usize> },
    Unbounded,
}

/// The definition of an attribute that is usable by the [`crate::BETree`]
#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    name: String,
    kind: AttributeKind,
    bound: ValueBound,
    allow_undefined: bool,
}

impl AttributeDefinition {
    fn new(name: &str, kind: AttributeKind, bound: ValueBound) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            bound,
            allow_undefined: true,
        }
    }

    /// Create a boolean attribute definition.
    pub fn boolean(name: &str) -> Self {
        Self::new(name, AttributeKind::Boolean, ValueBound::Boolean)
    }

    /// Create an integer attribute definition spanning every `i64`.
    pub fn integer(name: &str) -> Self {
        Self::bounded_integer(name, i64::MIN, i64::MAX)
    }

    /// Create an integer attribute definition restricted to `[min, max]`.
    pub fn bounded_integer(name: &str, min: i64, max: i64) -> Self {
        Self::new(name, AttributeKind::Integer, ValueBound::Integer { min, max })
    }

    /// Create a float attribute definition spanning every [`Decimal`].
    pub fn float(name: &str) -> Self {
        Self::bounded_float(name, Decimal::MIN, Decimal::MAX)
    }

    /// Create a float attribute definition restricted to `[min, max]`.
    pub fn bounded_float(name: &str, min: Decimal, max: Decimal) -> Self {
        Self::new(name, AttributeKind::Float, ValueBound::Float { min, max })
    }

    /// Create a dictionary encoded string attribute definition.
    pub fn string(name: &str) -> Self {
        Self::new(
            name,
            AttributeKind::String,
            ValueBound::Enumeration { cardinality: None },
        )
    }

    /// Create a string attribute definition holding at most `cardinality` distinct values.
    pub fn bounded_string(name: &str, cardinality: usize) -> Self {
        Self::new(
            name,
            AttributeKind::String,
            ValueBound::Enumeration {
                cardinality: Some(cardinality),
            },
        )
    }

    /// Create a dictionary encoded integer attribute definition.
    pub fn integer_enum(name: &str) -> Self {
        Self::new(
            name,
            AttributeKind::IntegerEnum,
            ValueBound::Enumeration { cardinality: None },
        )
    }

    pub fn bounded_integer_enum(name: &str, cardinality: usize) -> Self {
        Self::new(
            name,
            AttributeKind::IntegerEnum,
            ValueBound::Enumeration {
                cardinality: Some(cardinality),
            },
        )
    }

    /// Create a list of integers attribute definition.
    pub fn integer_list(name: &str) -> Self {
        Self::bounded_integer_list(name, i64::MIN, i64::MAX)
    }

    /// Create a list of integers attribute definition whose elements lie in `[min, max]`.
    pub fn bounded_integer_list(name: &str, min: i64, max: i64) -> Self {
        Self::new(
            name,
            AttributeKind::IntegerList,
            ValueBound::Integer { min, max },
        )
    }

    /// Create a list of strings attribute definition.
    pub fn string_list(name: &str) -> Self {
        Self::new(
            name,
            AttributeKind::StringList,
            ValueBound::Enumeration { cardinality: None },
        )
    }

    pub fn bounded_string_list(name: &str, cardinality: usize) -> Self {
        Self::new(
            name,
            AttributeKind::StringList,
            ValueBound::Enumeration {
                cardinality: Some(cardinality),
            },
        )
    }

    /// Create a segments attribute definition: a list of `(segment id, timestamp)` pairs.
    pub fn segments(name: &str) -> Self {
        Self::new(name, AttributeKind::Segments, ValueBound::Unbounded)
    }

    /// Create a frequency caps attribute definition.
    pub fn frequency_caps(name: &str) -> Self {
        Self::new(name, AttributeKind::FrequencyCaps, ValueBound::Unbounded)
    }

    /// Whether an event may leave this attribute undefined. Defaults to `true`.
    pub fn with_allow_undefined(mut self, allow_undefined: bool) -> Self {
        self.allow_undefined = allow_undefined;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn has_empty_bound(&self) -> bool {
        match self.bound {
            ValueBound::Integer { min, max } => min > max,
            ValueBound::Float { min, max } => min > max,
            _ => false,
        }
    }
}

/// A registered attribute; immutable once created.
#[derive(Clone, Debug)]
pub struct AttrDomain {
    name: String,
    id: AttributeId,
    kind: AttributeKind,
    bound: ValueBound,
    allow_undefined: bool,
}

impl AttrDomain {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn id(&self) -> AttributeId {
        self.id
    }

    #[inline]
    pub const fn kind(&self) -> AttributeKind {
        self.kind
    }

    #[inline]
    pub const fn bound(&self) -> &ValueBound {
        &self.bound
    }

    #[inline]
    pub const fn allows_undefined(&self) -> bool {
        self.allow_undefined
    }

    /// Whether the attribute has a finite value space that can key a partition.
    #[inline]
    pub fn is_partitionable(&self) -> bool {
        self.span().is_some()
    }

    /// The number of values the attribute can take when it can key a partition.
    pub fn cardinality(&self) -> Option<u64> {
        match (self.kind, &self.bound) {
            (AttributeKind::Boolean, _) => Some(2),
            (AttributeKind::Integer, ValueBound::Integer { min, max }) => {
                let width = i128::from(*max) - i128::from(*min) + 1;
                Some(u64::try_from(width).unwrap_or(u64::MAX))
            }
            (AttributeKind::Float, _) => Some(u64::MAX),
            (
                AttributeKind::String | AttributeKind::IntegerEnum,
                ValueBound::Enumeration {
                    cardinality: Some(cardinality),
                },
            ) if *cardinality > 0 => Some(*cardinality as u64),
            _ => None,
        }
    }

    /// The whole value space of the attribute, as partition keys.
    pub(crate) fn span(&self) -> Option<Span> {
        match (self.kind, &self.bound) {
            (AttributeKind::Boolean, _) => Span::discrete(0, 1),
            (AttributeKind::Integer, ValueBound::Integer { min, max }) => {
                Span::discrete(*min, *max)
            }
            (AttributeKind::Float, ValueBound::Float { min, max }) => {
                Span::continuous(*min, false, *max, false)
            }
            (
                AttributeKind::String | AttributeKind::IntegerEnum,
                ValueBound::Enumeration {
                    cardinality: Some(cardinality),
                },
            ) => {
                let last = i64::try_from(*cardinality).ok()?.checked_sub(1)?;
                Span::discrete(0, last)
            }
            _ => None,
        }
    }
}

/// A raw value to encode through an attribute's dictionary.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RawValue<'a> {
    Integer(i64),
    String(&'a str),
}

impl Display for RawValue<'_> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::String(value) => write!(formatter, "{value:?}"),
        }
    }
}

#[derive(Clone, Debug)]
enum Encoder {
    Plain,
    Strings(Dictionary<String>),
    Integers(Dictionary<i64>),
}

/// The registered attributes along with the dictionaries of the encoded ones.
#[derive(Clone, Debug)]
pub struct DomainRegistry {
    domains: Vec<AttrDomain>,
    encoders: Vec<Encoder>,
    by_names: HashMap<String, AttributeId>,
    frozen: bool,
}

impl DomainRegistry {
    pub fn new(definitions: &[AttributeDefinition]) -> Result<Self, DomainError> {
        let mut registry = Self {
            domains: Vec::with_capacity(definitions.len()),
            encoders: Vec::with_capacity(definitions.len()),
            by_names: HashMap::with_capacity(definitions.len()),
            frozen: false,
        };
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Append a new attribute and return its id.
    pub fn register(&mut self, definition: &AttributeDefinition) -> Result<AttributeId, DomainError> {
        let name = definition.name.to_owned();
        if self.frozen {
            return Err(DomainError::Frozen(name));
        }
        if self.by_names.contains_key(&name) {
            return Err(DomainError::AlreadyPresent(name));
        }
        if definition.has_empty_bound() {
            return Err(DomainError::InvalidBound(name));
        }

        let id = AttributeId(self.domains.len());
        let encoder = match definition.kind {
            AttributeKind::String | AttributeKind::StringList => {
                Encoder::Strings(Dictionary::new())
            }
            AttributeKind::IntegerEnum => Encoder::Integers(Dictionary::new()),
            _ => Encoder::Plain,
        };
        debug!(%id, name = %name, kind = ?definition.kind, bound = ?definition.bound, "registered attribute");

        self.by_names.insert(name.clone(), id);
        self.encoders.push(encoder);
        self.domains.push(AttrDomain {
            name,
            id,
            kind: definition.kind,
            bound: definition.bound.clone(),
            allow_undefined: definition.allow_undefined,
        });
        Ok(id)
    }

    #[inline]
    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    pub fn by_name(&self, name: &str) -> Option<AttributeId> {
        self.by_names.get(name).copied()
    }

    #[inline]
    pub fn get(&self, id: AttributeId) -> Option<&AttrDomain> {
        self.domains.get(id.0)
    }

    /// Find an attribute by name or fail with [`DomainError::NonExistingAttribute`].
    pub fn lookup(&self, name: &str) -> Result<&AttrDomain, DomainError> {
        self.by_name(name)
            .map(|id| &self.domains[id.0])
            .ok_or_else(|| DomainError::NonExistingAttribute(name.to_owned()))
    }

    /// The integer attribute holding the current time, when registered.
    pub fn clock(&self) -> Option<AttributeId> {
        self.lookup(CLOCK_ATTRIBUTE)
            .ok()
            .filter(|domain| domain.kind == AttributeKind::Integer)
            .map(AttrDomain::id)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AttrDomain> {
        self.domains.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Encode a value for the attribute, growing its dictionary when needed.
    ///
    /// Dictionary encoded attributes only grow past their cardinality when `always_assign` is
    /// set. Ranged integer attributes are encoded as their offset from the lower bound. Values
    /// outside the domain yield [`ValueId::INVALID`].
    pub fn resolve_or_assign(
        &mut self,
        attribute: AttributeId,
        value: RawValue,
        always_assign: bool,
    ) -> Result<ValueId, DomainError> {
        let domain = self.domain(attribute)?;
        let cardinality = match domain.bound {
            ValueBound::Enumeration { cardinality } => cardinality,
            _ => None,
        };
        match (&mut self.encoders[attribute.0], value) {
            (Encoder::Strings(dictionary), RawValue::String(value)) => {
                Ok(dictionary.resolve_or_assign(value, cardinality, always_assign))
            }
            (Encoder::Integers(dictionary), RawValue::Integer(value)) => {
                Ok(dictionary.resolve_or_assign(&value, cardinality, always_assign))
            }
            (Encoder::Plain, value) => self.offset(attribute, value),
            (_, value) => Err(self.mismatch(attribute, value)),
        }
    }

    /// Read-only encoding; never grows a dictionary.
    pub fn try_resolve(
        &self,
        attribute: AttributeId,
        value: RawValue,
    ) -> Result<ValueId, DomainError> {
        self.domain(attribute)?;
        match (&self.encoders[attribute.0], value) {
            (Encoder::Strings(dictionary), RawValue::String(value)) => {
                Ok(dictionary.try_resolve(value))
            }
            (Encoder::Integers(dictionary), RawValue::Integer(value)) => {
                Ok(dictionary.try_resolve(&value))
            }
            (Encoder::Plain, value) => self.offset(attribute, value),
            (_, value) => Err(self.mismatch(attribute, value)),
        }
    }

    /// The number of values known by the attribute's dictionary.
    pub fn dictionary_len(&self, attribute: AttributeId) -> Option<usize> {
        match self.encoders.get(attribute.0)? {
            Encoder::Strings(dictionary) => Some(dictionary.len()),
            Encoder::Integers(dictionary) => Some(dictionary.len()),
            Encoder::Plain => None,
        }
    }

    fn offset(&self, attribute: AttributeId, value: RawValue) -> Result<ValueId, DomainError> {
        let domain = &self.domains[attribute.0];
        match (&domain.bound, value) {
            (ValueBound::Integer { min, max }, RawValue::Integer(value)) => {
                if value < *min || value > *max {
                    return Ok(ValueId::INVALID);
                }
                let offset = u64::try_from(i128::from(value) - i128::from(*min))
                    .ok()
                    .and_then(|offset| usize::try_from(offset).ok());
                Ok(offset.map_or(ValueId::INVALID, ValueId::from_offset))
            }
            (ValueBound::Integer { .. }, value) => Err(self.mismatch(attribute, value)),
            _ => Err(DomainError::NotEncoded(domain.name.clone())),
        }
    }

    fn domain(&self, attribute: AttributeId) -> Result<&AttrDomain, DomainError> {
        self.domains
            .get(attribute.0)
            .ok_or_else(|| DomainError::NonExistingAttribute(attribute.to_string()))
    }

    fn mismatch(&self, attribute: AttributeId, value: RawValue) -> DomainError {
        let domain = &self.domains[attribute.0];
        DomainError::MismatchingTypes {
            name: domain.name.clone(),
            expected: domain.kind,
            actual: format!("raw value {value}"),
        }
    }
}

impl Index<AttributeId> for DomainRegistry {
    type Output = AttrDomain;

    #[inline]
    fn index(&self, index: AttributeId) -> &Self::Output {
        &self.domains[index.0]
    }
}
