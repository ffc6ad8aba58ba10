use crate::{
    dictionary::ValueId,
    domains::{AttributeId, AttributeKind, DomainError, DomainRegistry, RawValue, ValueBound},
};
use itertools::Itertools;
use rust_decimal::Decimal;
use std::{
    fmt::{Display, Formatter},
    ops::Index,
    str::FromStr,
};
use thiserror::Error;

#[derive(Error, PartialEq, Clone, Debug)]
pub enum EventError {
    #[error("event refers to non-existing attribute '{0:?}'")]
    NonExistingAttribute(String),
    #[error("{name:?}: wrong types => expected: {expected:?}, found: {actual:?}")]
    WrongType {
        name: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },
    #[error("{name:?}: value {value} is outside of the attribute's domain")]
    OutOfBound { name: String, value: String },
    #[error("value type mismatch => expected: {expected:?}, found: {actual:?}")]
    ValueTypeMismatch {
        expected: AttributeKind,
        actual: Option<AttributeKind>,
    },
    #[error("event holds {actual} attributes while {expected} are registered")]
    UnknownAttribute { expected: usize, actual: usize },
    #[error("attribute {0:?} must be defined")]
    UndefinedAttribute(String),
    #[error("failed with {0:?}")]
    Domain(DomainError),
}

/// An [`Event`] builder
///
/// During the builder creation, it will set all the attributes to `undefined`. If some attributes
/// are not assigned, they will be left `undefined`.
#[derive(Debug)]
pub struct EventBuilder<'tree> {
    by_ids: Vec<AttributeValue>,
    domains: &'tree DomainRegistry,
}

impl<'tree> EventBuilder<'tree> {
    pub(crate) fn new(domains: &'tree DomainRegistry) -> Self {
        Self {
            domains,
            by_ids: vec![AttributeValue::Undefined; domains.len()],
        }
    }

    /// Build the corresponding [`Event`].
    ///
    /// By default, the non-assigned attributes will be undefined.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use be_tree::{AttributeDefinition, BETree, Config};
    ///
    /// let definitions = [
    ///     AttributeDefinition::boolean("private"),
    ///     AttributeDefinition::integer("exchange_id"),
    ///     AttributeDefinition::string_list("deal_ids"),
    /// ];
    /// let betree = BETree::<u64>::new(Config::default(), &definitions).unwrap();
    ///
    /// let mut builder = betree.make_event();
    /// builder.with_integer("exchange_id", 1).unwrap();
    /// builder.with_boolean("private", false).unwrap();
    ///
    /// // The returned `Event` will have its `deal_ids` attribute `undefined` since it was not set
    /// // by the builder
    /// let event = builder.build().unwrap();
    /// ```
    pub fn build(self) -> Result<Event, EventError> {
        Ok(Event(self.by_ids))
    }

    /// Set the specified boolean attribute.
    pub fn with_boolean(&mut self, name: &str, value: bool) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::Boolean, |_| {
            Ok(AttributeValue::Boolean(value))
        })
    }

    /// Set the specified integer attribute.
    ///
    /// The value must lie within the attribute's bound.
    pub fn with_integer(&mut self, name: &str, value: i64) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::Integer, |context| {
            context.check_integer(value)?;
            Ok(AttributeValue::Integer(value))
        })
    }

    /// Set the specified float attribute to `number * 10^-scale`.
    pub fn with_float(&mut self, name: &str, number: i64, scale: u32) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::Float, |context| {
            let value = Decimal::try_new(number, scale)
                .map_err(|_| context.out_of_bound(format!("{number}e-{scale}")))?;
            if let ValueBound::Float { min, max } = context.bound {
                if value < *min || value > *max {
                    return Err(context.out_of_bound(value));
                }
            }
            Ok(AttributeValue::Float(value))
        })
    }

    /// Set the specified string attribute.
    ///
    /// Values unknown to the attribute's dictionary are kept as [`ValueId::INVALID`].
    pub fn with_string(&mut self, name: &str, value: &str) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::String, |context| {
            Ok(AttributeValue::String(
                context.resolve(RawValue::String(value))?,
            ))
        })
    }

    /// Set the specified dictionary encoded integer attribute.
    pub fn with_integer_enum(&mut self, name: &str, value: i64) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::IntegerEnum, |context| {
            Ok(AttributeValue::IntegerEnum(
                context.resolve(RawValue::Integer(value))?,
            ))
        })
    }

    /// Set the specified list of integers attribute.
    pub fn with_integer_list(&mut self, name: &str, value: &[i64]) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::IntegerList, |context| {
            for element in value {
                context.check_integer(*element)?;
            }
            let values = value.iter().sorted().unique().cloned().collect_vec();
            Ok(AttributeValue::IntegerList(values))
        })
    }

    /// Set the specified string list attribute.
    pub fn with_string_list(&mut self, name: &str, values: &[&str]) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::StringList, |context| {
            let values: Vec<_> = values
                .iter()
                .map(|value| context.resolve(RawValue::String(value)))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .sorted()
                .unique()
                .collect();
            Ok(AttributeValue::StringList(values))
        })
    }

    /// Set the specified segments attribute.
    pub fn with_segments(&mut self, name: &str, segments: &[Segment]) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::Segments, |_| {
            let segments = segments.iter().copied().sorted().collect_vec();
            Ok(AttributeValue::Segments(segments))
        })
    }

    /// Set the specified frequency caps attribute.
    pub fn with_frequency_caps(
        &mut self,
        name: &str,
        caps: &[FrequencyCap],
    ) -> Result<(), EventError> {
        self.add_value(name, AttributeKind::FrequencyCaps, |_| {
            Ok(AttributeValue::FrequencyCaps(caps.to_vec()))
        })
    }

    /// Set the specified list attribute, whatever its element type, to an empty list.
    pub fn with_empty_list(&mut self, name: &str) -> Result<(), EventError> {
        let id = self.attribute(name)?;
        let kind = self.domains[id].kind();
        if !kind.is_list() {
            return Err(EventError::WrongType {
                name: name.to_owned(),
                expected: kind,
                actual: AttributeKind::IntegerList,
            });
        }
        self.by_ids[id.index()] = AttributeValue::IntegerList(Vec::new());
        Ok(())
    }

    /// Set the specified attribute to `undefined`.
    pub fn with_undefined(&mut self, name: &str) -> Result<(), EventError> {
        let id = self.attribute(name)?;
        self.by_ids[id.index()] = AttributeValue::Undefined;
        Ok(())
    }

    fn attribute(&self, name: &str) -> Result<AttributeId, EventError> {
        self.domains
            .by_name(name)
            .ok_or_else(|| EventError::NonExistingAttribute(name.to_string()))
    }

    fn add_value<F>(&mut self, name: &str, actual: AttributeKind, f: F) -> Result<(), EventError>
    where
        F: FnOnce(&ValueContext) -> Result<AttributeValue, EventError>,
    {
        let id = self.attribute(name)?;
        let domains = self.domains;
        let domain = &domains[id];
        let expected = domain.kind();
        if expected != actual {
            return Err(EventError::WrongType {
                name: name.to_owned(),
                expected,
                actual,
            });
        }
        let context = ValueContext {
            id,
            name,
            bound: domain.bound(),
            domains,
        };
        let value = f(&context)?;
        self.by_ids[id.index()] = value;
        Ok(())
    }
}

struct ValueContext<'a> {
    id: AttributeId,
    name: &'a str,
    bound: &'a ValueBound,
    domains: &'a DomainRegistry,
}

impl ValueContext<'_> {
    fn check_integer(&self, value: i64) -> Result<(), EventError> {
        match self.bound {
            ValueBound::Integer { min, max } if value < *min || value > *max => {
                Err(self.out_of_bound(value))
            }
            _ => Ok(()),
        }
    }

    fn resolve(&self, value: RawValue) -> Result<ValueId, EventError> {
        self.domains
            .try_resolve(self.id, value)
            .map_err(EventError::Domain)
    }

    fn out_of_bound(&self, value: impl Display) -> EventError {
        EventError::OutOfBound {
            name: self.name.to_owned(),
            value: value.to_string(),
        }
    }
}

/// An event that can be used by the [`crate::BETree`] structure to match boolean expressions.
///
/// Holds one value per registered attribute, indexed by attribute id.
#[derive(Clone, Debug)]
pub struct Event(Vec<AttributeValue>);

impl Event {
    /// The value bound to the attribute; `None` when it is undefined.
    #[inline]
    pub fn lookup(&self, id: AttributeId) -> Option<&AttributeValue> {
        match self.0.get(id.index()) {
            Some(AttributeValue::Undefined) | None => None,
            Some(value) => Some(value),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<AttributeId> for Event {
    type Output = AttributeValue;

    #[inline]
    fn index(&self, index: AttributeId) -> &Self::Output {
        &self.0[index.index()]
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    Float(Decimal),
    String(ValueId),
    IntegerEnum(ValueId),
    IntegerList(Vec<i64>),
    StringList(Vec<ValueId>),
    Segments(Vec<Segment>),
    FrequencyCaps(Vec<FrequencyCap>),
    Undefined,
}

impl AttributeValue {
    pub fn kind(&self) -> Option<AttributeKind> {
        match self {
            Self::Boolean(_) => Some(AttributeKind::Boolean),
            Self::Integer(_) => Some(AttributeKind::Integer),
            Self::Float(_) => Some(AttributeKind::Float),
            Self::String(_) => Some(AttributeKind::String),
            Self::IntegerEnum(_) => Some(AttributeKind::IntegerEnum),
            Self::IntegerList(_) => Some(AttributeKind::IntegerList),
            Self::StringList(_) => Some(AttributeKind::StringList),
            Self::Segments(_) => Some(AttributeKind::Segments),
            Self::FrequencyCaps(_) => Some(AttributeKind::FrequencyCaps),
            Self::Undefined => None,
        }
    }

    /// Whether the value is an empty list of any element type.
    pub fn is_empty_list(&self) -> bool {
        match self {
            Self::IntegerList(values) => values.is_empty(),
            Self::StringList(values) => values.is_empty(),
            Self::Segments(values) => values.is_empty(),
            Self::FrequencyCaps(values) => values.is_empty(),
            _ => false,
        }
    }

    pub fn as_boolean(&self) -> Result<bool, EventError> {
        match self {
            Self::Boolean(value) => Ok(*value),
            other => Err(other.mismatch(AttributeKind::Boolean)),
        }
    }

    pub fn as_integer(&self) -> Result<i64, EventError> {
        match self {
            Self::Integer(value) => Ok(*value),
            other => Err(other.mismatch(AttributeKind::Integer)),
        }
    }

    pub fn as_float(&self) -> Result<Decimal, EventError> {
        match self {
            Self::Float(value) => Ok(*value),
            other => Err(other.mismatch(AttributeKind::Float)),
        }
    }

    pub fn as_string(&self) -> Result<ValueId, EventError> {
        match self {
            Self::String(value) => Ok(*value),
            other => Err(other.mismatch(AttributeKind::String)),
        }
    }

    pub fn as_integer_enum(&self) -> Result<ValueId, EventError> {
        match self {
            Self::IntegerEnum(value) => Ok(*value),
            other => Err(other.mismatch(AttributeKind::IntegerEnum)),
        }
    }

    pub fn as_integer_list(&self) -> Result<&[i64], EventError> {
        match self {
            Self::IntegerList(values) => Ok(values),
            other if other.is_empty_list() => Ok(&[]),
            other => Err(other.mismatch(AttributeKind::IntegerList)),
        }
    }

    pub fn as_string_list(&self) -> Result<&[ValueId], EventError> {
        match self {
            Self::StringList(values) => Ok(values),
            other if other.is_empty_list() => Ok(&[]),
            other => Err(other.mismatch(AttributeKind::StringList)),
        }
    }

    pub fn as_segments(&self) -> Result<&[Segment], EventError> {
        match self {
            Self::Segments(values) => Ok(values),
            other if other.is_empty_list() => Ok(&[]),
            other => Err(other.mismatch(AttributeKind::Segments)),
        }
    }

    pub fn as_frequency_caps(&self) -> Result<&[FrequencyCap], EventError> {
        match self {
            Self::FrequencyCaps(values) => Ok(values),
            other if other.is_empty_list() => Ok(&[]),
            other => Err(other.mismatch(AttributeKind::FrequencyCaps)),
        }
    }

    fn mismatch(&self, expected: AttributeKind) -> EventError {
        EventError::ValueTypeMismatch {
            expected,
            actual: self.kind(),
        }
    }
}

/// Membership of the event in an audience segment since `timestamp` (in seconds).
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash, Debug)]
pub struct Segment {
    pub id: i64,
    pub timestamp: i64,
}

impl Segment {
    pub const fn new(id: i64, timestamp: i64) -> Self {
        Self { id, timestamp }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum FrequencyType {
    Advertiser,
    AdvertiserIp,
    Campaign,
    CampaignIp,
    Flight,
    FlightIp,
    Product,
    ProductIp,
}

impl FromStr for FrequencyType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "advertiser" => Ok(Self::Advertiser),
            "advertiser:ip" => Ok(Self::AdvertiserIp),
            "campaign" => Ok(Self::Campaign),
            "campaign:ip" => Ok(Self::CampaignIp),
            "flight" => Ok(Self::Flight),
            "flight:ip" => Ok(Self::FlightIp),
            "product" => Ok(Self::Product),
            "product:ip" => Ok(Self::ProductIp),
            other => Err(DomainError::InvalidFrequencyType(other.to_owned())),
        }
    }
}

impl Display for FrequencyType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Advertiser => "advertiser",
            Self::AdvertiserIp => "advertiser:ip",
            Self::Campaign => "campaign",
            Self::CampaignIp => "campaign:ip",
            Self::Flight => "flight",
            Self::FlightIp => "flight:ip",
            Self::Product => "product",
            Self::ProductIp => "product:ip",
        };
        write!(formatter, "{name}")
    }
}

/// How many times `(kind, id, namespace)` was served; `timestamp` starts its window.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FrequencyCap {
    pub kind: FrequencyType,
    pub id: i64,
    pub namespace: String,
    pub value: i64,
    pub timestamp: Option<i64>,
}

impl FrequencyCap {
    pub fn new(
        kind: FrequencyType,
        id: i64,
        namespace: &str,
        value: i64,
        timestamp: Option<i64>,
    ) -> Self {
        Self {
            kind,
            id,
            namespace: namespace.to_owned(),
            value,
            timestamp,
        }
    }
}
