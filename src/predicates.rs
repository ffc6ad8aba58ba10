use crate::{
    dictionary::ValueId,
    domains::{
        AttrDomain, AttributeId, AttributeKind, DomainError, DomainRegistry, RawValue, ValueBound,
    },
    events::{AttributeValue, Event, FrequencyCap, FrequencyType, Segment},
    footprint::Span,
};
use itertools::Itertools;
use rust_decimal::Decimal;
use std::{
    fmt::{Display, Formatter},
    ops::Not,
};

#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Predicate {
    attribute: AttributeId,
    kind: PredicateKind,
}

impl Predicate {
    /// Build a predicate from an already encoded kind, checking it applies to the attribute.
    pub fn new(
        domains: &DomainRegistry,
        name: &str,
        kind: PredicateKind,
    ) -> Result<Self, DomainError> {
        let domain = domains.lookup(name)?;
        validate_predicate(domain, &kind)?;
        Ok(Predicate {
            attribute: domain.id(),
            kind,
        })
    }

    /// `name` used as a boolean.
    pub fn variable(domains: &DomainRegistry, name: &str) -> Result<Self, DomainError> {
        Self::new(domains, name, PredicateKind::Variable)
    }

    pub fn null(
        domains: &DomainRegistry,
        name: &str,
        operator: NullOperator,
    ) -> Result<Self, DomainError> {
        Self::new(domains, name, PredicateKind::Null(operator))
    }

    pub fn comparison(
        domains: &DomainRegistry,
        name: &str,
        operator: ComparisonOperator,
        value: ComparisonValue,
    ) -> Result<Self, DomainError> {
        let domain = domains.lookup(name)?;
        let value = match (domain.kind(), value) {
            (AttributeKind::Integer, ComparisonValue::Integer(value)) => {
                check_integer(domain, value)?;
                ComparisonValue::Integer(value)
            }
            (AttributeKind::Float, ComparisonValue::Integer(value)) => {
                ComparisonValue::Float(check_float(domain, Decimal::from(value))?)
            }
            (AttributeKind::Float, ComparisonValue::Float(value)) => {
                ComparisonValue::Float(check_float(domain, value)?)
            }
            (_, value) => value,
        };
        Self::new(domains, name, PredicateKind::Comparison(operator, value))
    }

    pub fn equality(
        domains: &mut DomainRegistry,
        name: &str,
        operator: EqualityOperator,
        value: RawLiteral,
    ) -> Result<Self, DomainError> {
        let domain = domains.lookup(name)?.clone();
        let id = domain.id();
        let value = match (domain.kind(), value) {
            (AttributeKind::Integer, RawLiteral::Integer(value)) => {
                check_integer(&domain, value)?;
                PrimitiveLiteral::Integer(value)
            }
            (AttributeKind::Float, RawLiteral::Integer(value)) => {
                PrimitiveLiteral::Float(check_float(&domain, Decimal::from(value))?)
            }
            (AttributeKind::Float, RawLiteral::Float(value)) => {
                PrimitiveLiteral::Float(check_float(&domain, value)?)
            }
            (AttributeKind::String, RawLiteral::String(value)) => {
                PrimitiveLiteral::Id(encode(domains, id, RawValue::String(value))?)
            }
            (AttributeKind::IntegerEnum, RawLiteral::Integer(value)) => {
                PrimitiveLiteral::Id(encode(domains, id, RawValue::Integer(value))?)
            }
            (expected, actual) => return Err(mismatch(name, expected, actual)),
        };
        Self::new(domains, name, PredicateKind::Equality(operator, value))
    }

    pub fn set(
        domains: &mut DomainRegistry,
        name: &str,
        operator: SetOperator,
        values: RawList,
    ) -> Result<Self, DomainError> {
        let literal = encode_list(domains, name, values)?;
        Self::new(domains, name, PredicateKind::Set(operator, literal))
    }

    pub fn list(
        domains: &mut DomainRegistry,
        name: &str,
        operator: ListOperator,
        values: RawList,
    ) -> Result<Self, DomainError> {
        let literal = encode_list(domains, name, values)?;
        Self::new(domains, name, PredicateKind::List(operator, literal))
    }

    pub fn segment(
        domains: &DomainRegistry,
        name: &str,
        operator: SegmentOperator,
        id: i64,
        seconds: i64,
    ) -> Result<Self, DomainError> {
        let clock = domains
            .clock()
            .ok_or_else(|| DomainError::MissingClock(name.to_owned()))?;
        let literal = SegmentLiteral { id, seconds, clock };
        Self::new(domains, name, PredicateKind::Segment(operator, literal))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn frequency(
        domains: &DomainRegistry,
        name: &str,
        operator: FrequencyOperator,
        kind: &str,
        id: i64,
        namespace: &str,
        value: i64,
        seconds: i64,
    ) -> Result<Self, DomainError> {
        let clock = domains
            .clock()
            .ok_or_else(|| DomainError::MissingClock(name.to_owned()))?;
        let literal = FrequencyLiteral {
            kind: kind.parse()?,
            id,
            namespace: namespace.to_owned(),
            value,
            seconds,
            clock,
        };
        Self::new(domains, name, PredicateKind::Frequency(operator, literal))
    }

    /// Check that a predicate built elsewhere applies to this registry: the attribute exists
    /// with a compatible kind, literals are inside its domain and dictionary ids are known.
    pub(crate) fn check(&self, domains: &DomainRegistry) -> Result<(), DomainError> {
        let domain = domains
            .get(self.attribute)
            .ok_or_else(|| DomainError::NonExistingAttribute(self.attribute.to_string()))?;
        validate_predicate(domain, &self.kind)?;
        match &self.kind {
            PredicateKind::Comparison(_, ComparisonValue::Integer(value))
            | PredicateKind::Equality(_, PrimitiveLiteral::Integer(value)) => {
                check_integer(domain, *value)
            }
            PredicateKind::Comparison(_, ComparisonValue::Float(value))
            | PredicateKind::Equality(_, PrimitiveLiteral::Float(value)) => {
                check_float(domain, *value).map(|_| ())
            }
            PredicateKind::Equality(_, PrimitiveLiteral::Id(id)) => {
                check_ids(domains, domain, std::slice::from_ref(id))
            }
            PredicateKind::Set(_, ListLiteral::IntegerList(values))
            | PredicateKind::List(_, ListLiteral::IntegerList(values)) => values
                .iter()
                .try_for_each(|value| check_integer(domain, *value)),
            PredicateKind::Set(_, ListLiteral::IdList(ids))
            | PredicateKind::List(_, ListLiteral::IdList(ids)) => check_ids(domains, domain, ids),
            PredicateKind::Segment(_, SegmentLiteral { clock, .. })
            | PredicateKind::Frequency(_, FrequencyLiteral { clock, .. }) => {
                if domains.clock() == Some(*clock) {
                    Ok(())
                } else {
                    Err(DomainError::MissingClock(domain.name().to_owned()))
                }
            }
            PredicateKind::Variable | PredicateKind::NegatedVariable | PredicateKind::Null(_) => {
                Ok(())
            }
        }
    }

    #[inline]
    pub fn attribute(&self) -> AttributeId {
        self.attribute
    }

    #[inline]
    pub fn kind(&self) -> &PredicateKind {
        &self.kind
    }

    #[inline]
    pub fn cost(&self) -> u64 {
        self.kind.cost()
    }

    pub fn evaluate(&self, event: &Event) -> Option<bool> {
        let value = &event[self.attribute];
        match (&self.kind, value) {
            (PredicateKind::Null(operator), value) => Some(operator.evaluate(value)),
            (_, AttributeValue::Undefined) => None,
            (PredicateKind::Variable, AttributeValue::Boolean(value)) => Some(*value),
            (PredicateKind::NegatedVariable, AttributeValue::Boolean(value)) => Some(!*value),
            (PredicateKind::Set(operator, haystack), needle) => {
                Some(operator.evaluate(haystack, needle))
            }
            (PredicateKind::Comparison(operator, a), b) => Some(operator.evaluate(a, b)),
            (PredicateKind::Equality(operator, a), b) => Some(operator.evaluate(a, b)),
            (PredicateKind::List(operator, a), b) => Some(operator.evaluate(a, b)),
            (PredicateKind::Segment(operator, literal), segments) => {
                let now = clock(event, literal.clock)?;
                let segments = segments
                    .as_segments()
                    .unwrap_or_else(|error| unreachable!("{error}; this is a bug"));
                Some(operator.evaluate(literal, segments, now))
            }
            (PredicateKind::Frequency(operator, literal), caps) => {
                let now = clock(event, literal.clock)?;
                let caps = caps
                    .as_frequency_caps()
                    .unwrap_or_else(|error| unreachable!("{error}; this is a bug"));
                Some(operator.evaluate(literal, caps, now))
            }
            (kind, value) => {
                unreachable!("Invalid => got: {kind:?} with {value:?}");
            }
        }
    }

    /// The values of the attribute for which this predicate can be true, restricted to the
    /// attribute's partitionable domain.
    pub(crate) fn span(&self, domain: &AttrDomain) -> Option<Span> {
        let span = match &self.kind {
            PredicateKind::Variable => Span::discrete(1, 1),
            PredicateKind::NegatedVariable => Span::discrete(0, 0),
            PredicateKind::Comparison(operator, ComparisonValue::Integer(value)) => {
                operator.discrete_span(*value)
            }
            PredicateKind::Comparison(operator, ComparisonValue::Float(value)) => {
                operator.continuous_span(*value)
            }
            PredicateKind::Equality(EqualityOperator::Equal, literal) => match literal {
                PrimitiveLiteral::Integer(value) => Span::discrete(*value, *value),
                PrimitiveLiteral::Float(value) => Span::continuous(*value, false, *value, false),
                PrimitiveLiteral::Id(id) => {
                    let key = id.as_key()?;
                    Span::discrete(key, key)
                }
            },
            PredicateKind::Set(SetOperator::In, ListLiteral::IntegerList(values)) => {
                Span::discrete(*values.first()?, *values.last()?)
            }
            PredicateKind::Set(SetOperator::In, ListLiteral::IdList(ids)) => {
                let (first, last) = ids
                    .iter()
                    .filter_map(|id| id.as_key())
                    .minmax()
                    .into_option()?;
                Span::discrete(first, last)
            }
            _ => None,
        }?;
        span.intersect(&domain.span()?)
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self {
            attribute: self.attribute,
            kind: !self.kind,
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "⟨{}, {}⟩", self.attribute, self.kind)
    }
}

fn clock(event: &Event, clock: AttributeId) -> Option<i64> {
    match &event[clock] {
        AttributeValue::Undefined => None,
        value => Some(
            value
                .as_integer()
                .unwrap_or_else(|error| unreachable!("{error}; this is a bug")),
        ),
    }
}

fn check_integer(domain: &AttrDomain, value: i64) -> Result<(), DomainError> {
    match domain.bound() {
        ValueBound::Integer { min, max } if value < *min || value > *max => {
            Err(out_of_bound(domain, value))
        }
        _ => Ok(()),
    }
}

fn check_float(domain: &AttrDomain, value: Decimal) -> Result<Decimal, DomainError> {
    match domain.bound() {
        ValueBound::Float { min, max } if value < *min || value > *max => {
            Err(out_of_bound(domain, value))
        }
        _ => Ok(value),
    }
}

fn check_ids(
    domains: &DomainRegistry,
    domain: &AttrDomain,
    ids: &[ValueId],
) -> Result<(), DomainError> {
    let known = domains.dictionary_len(domain.id()).unwrap_or(0);
    match ids
        .iter()
        .find(|id| id.index().map_or(true, |index| index >= known))
    {
        Some(id) => Err(out_of_bound(domain, id)),
        None => Ok(()),
    }
}

fn out_of_bound(domain: &AttrDomain, value: impl Display) -> DomainError {
    DomainError::OutOfBound {
        name: domain.name().to_owned(),
        value: value.to_string(),
    }
}

fn mismatch(name: &str, expected: AttributeKind, actual: impl Display) -> DomainError {
    DomainError::MismatchingTypes {
        name: name.to_owned(),
        expected,
        actual: actual.to_string(),
    }
}

/// Encode a literal without growing the dictionary past its bound.
fn encode(
    domains: &mut DomainRegistry,
    attribute: AttributeId,
    value: RawValue,
) -> Result<ValueId, DomainError> {
    let id = domains.resolve_or_assign(attribute, value, false)?;
    if id.is_valid() {
        Ok(id)
    } else {
        Err(out_of_bound(&domains[attribute], value))
    }
}

/// Encode the literal list of a set or list predicate, sorted and deduplicated.
fn encode_list(
    domains: &mut DomainRegistry,
    name: &str,
    values: RawList,
) -> Result<ListLiteral, DomainError> {
    let domain = domains.lookup(name)?.clone();
    let id = domain.id();
    match (domain.kind(), values) {
        (AttributeKind::Integer | AttributeKind::IntegerList, RawList::Integers(values)) => {
            for value in &values {
                check_integer(&domain, *value)?;
            }
            Ok(ListLiteral::IntegerList(
                values.into_iter().sorted().unique().collect(),
            ))
        }
        // `[]` carries no type so it is accepted for string lists too.
        (AttributeKind::String | AttributeKind::StringList, RawList::Integers(values))
            if values.is_empty() =>
        {
            Ok(ListLiteral::IdList(Vec::new()))
        }
        (AttributeKind::String | AttributeKind::StringList, RawList::Strings(values)) => {
            encode_ids(domains, id, values.into_iter().map(RawValue::String))
        }
        (AttributeKind::IntegerEnum, RawList::Integers(values)) => {
            encode_ids(domains, id, values.into_iter().map(RawValue::Integer))
        }
        (kind, values) => Err(mismatch(name, kind, values)),
    }
}

fn encode_ids<'a>(
    domains: &mut DomainRegistry,
    attribute: AttributeId,
    values: impl Iterator<Item = RawValue<'a>>,
) -> Result<ListLiteral, DomainError> {
    let ids = values
        .map(|value| encode(domains, attribute, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ListLiteral::IdList(ids.into_iter().sorted().unique().collect()))
}

fn validate_predicate(domain: &AttrDomain, kind: &PredicateKind) -> Result<(), DomainError> {
    match (&kind, domain.kind()) {
        (PredicateKind::Set(_, ListLiteral::IdList(_)), AttributeKind::String) => Ok(()),
        (PredicateKind::Set(_, ListLiteral::IdList(_)), AttributeKind::IntegerEnum) => Ok(()),
        (PredicateKind::Set(_, ListLiteral::IntegerList(_)), AttributeKind::Integer) => Ok(()),

        (PredicateKind::Comparison(_, ComparisonValue::Integer(_)), AttributeKind::Integer) => {
            Ok(())
        }
        (PredicateKind::Comparison(_, ComparisonValue::Float(_)), AttributeKind::Float) => Ok(()),

        (PredicateKind::Equality(_, PrimitiveLiteral::Integer(_)), AttributeKind::Integer) => {
            Ok(())
        }
        (PredicateKind::Equality(_, PrimitiveLiteral::Float(_)), AttributeKind::Float) => Ok(()),
        (PredicateKind::Equality(_, PrimitiveLiteral::Id(_)), AttributeKind::String) => Ok(()),
        (PredicateKind::Equality(_, PrimitiveLiteral::Id(_)), AttributeKind::IntegerEnum) => {
            Ok(())
        }

        (PredicateKind::List(_, ListLiteral::IntegerList(_)), AttributeKind::IntegerList) => Ok(()),
        (PredicateKind::List(_, ListLiteral::IdList(_)), AttributeKind::StringList) => Ok(()),

        (PredicateKind::Variable, AttributeKind::Boolean) => Ok(()),
        (PredicateKind::NegatedVariable, AttributeKind::Boolean) => Ok(()),

        (PredicateKind::Segment(_, _), AttributeKind::Segments) => Ok(()),
        (PredicateKind::Frequency(_, _), AttributeKind::FrequencyCaps) => Ok(()),

        (PredicateKind::Null(NullOperator::IsEmpty | NullOperator::IsNotEmpty), kind)
            if kind.is_list() =>
        {
            Ok(())
        }
        (PredicateKind::Null(NullOperator::IsNull | NullOperator::IsNotNull), kind)
            if !kind.is_list() =>
        {
            Ok(())
        }
        (actual, expected) => Err(mismatch(domain.name(), expected, actual)),
    }
}

/// A literal as written in an expression, before encoding.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RawLiteral<'a> {
    Integer(i64),
    Float(Decimal),
    String(&'a str),
}

impl Display for RawLiteral<'_> {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::String(value) => write!(formatter, "{value:?}"),
        }
    }
}

/// A list literal as written in an expression, before encoding.
#[derive(Clone, PartialEq, Debug)]
pub enum RawList<'a> {
    Integers(Vec<i64>),
    Strings(Vec<&'a str>),
}

impl Display for RawList<'_> {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Integers(values) => write!(formatter, "{values:?}"),
            Self::Strings(values) => write!(formatter, "{values:?}"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum PredicateKind {
    Variable,
    NegatedVariable,
    Set(SetOperator, ListLiteral),
    Comparison(ComparisonOperator, ComparisonValue),
    Equality(EqualityOperator, PrimitiveLiteral),
    List(ListOperator, ListLiteral),
    Null(NullOperator),
    Segment(SegmentOperator, SegmentLiteral),
    Frequency(FrequencyOperator, FrequencyLiteral),
}

impl PredicateKind {
    const CONSTANT_COST: u64 = 0;
    const LOGARITHMIC_COST: u64 = 1;
    const LIST_COST: u64 = 2;

    #[inline]
    pub fn cost(&self) -> u64 {
        match self {
            Self::NegatedVariable
            | Self::Variable
            | Self::Null(_)
            | Self::Comparison(_, _)
            | Self::Equality(_, _) => Self::CONSTANT_COST,
            Self::Set(_, list) => Self::LOGARITHMIC_COST * (list.len() as u64),
            Self::List(_, list) => Self::LIST_COST * (list.len() as u64),
            Self::Segment(_, _) | Self::Frequency(_, _) => Self::LIST_COST,
        }
    }
}

impl Not for PredicateKind {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Set(SetOperator::In, value) => Self::Set(SetOperator::NotIn, value),
            Self::Set(SetOperator::NotIn, value) => Self::Set(SetOperator::In, value),
            Self::Comparison(ComparisonOperator::LessThan, value) => {
                Self::Comparison(ComparisonOperator::GreaterThanEqual, value)
            }
            Self::Comparison(ComparisonOperator::LessThanEqual, value) => {
                Self::Comparison(ComparisonOperator::GreaterThan, value)
            }
            Self::Comparison(ComparisonOperator::GreaterThan, value) => {
                Self::Comparison(ComparisonOperator::LessThanEqual, value)
            }
            Self::Comparison(ComparisonOperator::GreaterThanEqual, value) => {
                Self::Comparison(ComparisonOperator::LessThan, value)
            }
            Self::Null(NullOperator::IsNull) => Self::Null(NullOperator::IsNotNull),
            Self::Null(NullOperator::IsNotNull) => Self::Null(NullOperator::IsNull),
            Self::Null(NullOperator::IsEmpty) => Self::Null(NullOperator::IsNotEmpty),
            Self::Null(NullOperator::IsNotEmpty) => Self::Null(NullOperator::IsEmpty),
            Self::Equality(EqualityOperator::Equal, value) => {
                Self::Equality(EqualityOperator::NotEqual, value)
            }
            Self::Equality(EqualityOperator::NotEqual, value) => {
                Self::Equality(EqualityOperator::Equal, value)
            }
            Self::List(ListOperator::OneOf, value) => Self::List(ListOperator::NoneOf, value),
            Self::List(ListOperator::AllOf, value) => Self::List(ListOperator::NotAllOf, value),
            Self::List(ListOperator::NotAllOf, value) => Self::List(ListOperator::AllOf, value),
            Self::List(ListOperator::NoneOf, value) => Self::List(ListOperator::OneOf, value),
            Self::Variable => Self::NegatedVariable,
            Self::NegatedVariable => Self::Variable,
            Self::Segment(operator, value) => Self::Segment(!operator, value),
            Self::Frequency(operator, value) => Self::Frequency(!operator, value),
        }
    }
}

impl Display for PredicateKind {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Variable => write!(formatter, "id, variable"),
            Self::NegatedVariable => write!(formatter, "not, variable"),
            Self::Set(operator, values) => write!(formatter, "{operator}, {values}"),
            Self::Comparison(operator, values) => write!(formatter, "{operator}, {values}"),
            Self::List(operator, values) => write!(formatter, "{operator}, {values}"),
            Self::Null(operator) => write!(formatter, "{operator}, variable"),
            Self::Equality(operator, values) => write!(formatter, "{operator}, {values}"),
            Self::Segment(operator, value) => write!(formatter, "{operator}, {value}"),
            Self::Frequency(operator, value) => write!(formatter, "{operator}, {value}"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum SetOperator {
    NotIn,
    In,
}

impl SetOperator {
    fn evaluate(&self, haystack: &ListLiteral, needle: &AttributeValue) -> bool {
        match (haystack, needle) {
            (ListLiteral::IdList(haystack), AttributeValue::String(needle))
            | (ListLiteral::IdList(haystack), AttributeValue::IntegerEnum(needle)) => {
                self.apply(haystack, needle)
            }
            (ListLiteral::IntegerList(haystack), AttributeValue::Integer(needle)) => {
                self.apply(haystack, needle)
            }
            (a, b) => {
                unreachable!("Set operation ({self:?}) in haystack {a:?} for {b:?} should never happen. This is a bug.")
            }
        }
    }

    fn apply<T: Ord>(&self, haystack: &[T], needle: &T) -> bool {
        match self {
            Self::In => haystack.binary_search(needle).is_ok(),
            Self::NotIn => haystack.binary_search(needle).is_err(),
        }
    }
}

impl Display for SetOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::In => write!(formatter, "in"),
            Self::NotIn => write!(formatter, "not in"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum ComparisonOperator {
    LessThan,
    LessThanEqual,
    GreaterThanEqual,
    GreaterThan,
}

impl ComparisonOperator {
    /// The operator to use once both sides of the comparison are swapped.
    pub fn flip(self) -> Self {
        match self {
            Self::LessThan => Self::GreaterThan,
            Self::LessThanEqual => Self::GreaterThanEqual,
            Self::GreaterThan => Self::LessThan,
            Self::GreaterThanEqual => Self::LessThanEqual,
        }
    }

    fn evaluate(&self, a: &ComparisonValue, b: &AttributeValue) -> bool {
        match (a, b) {
            (ComparisonValue::Float(b), AttributeValue::Float(a)) => self.apply(a, b),
            (ComparisonValue::Integer(b), AttributeValue::Integer(a)) => self.apply(a, b),
            (a, b) => {
                unreachable!("Comparison ({self:?}) between {a:?} and {b:?} should never happen. This is a bug.")
            }
        }
    }

    fn apply<T: PartialOrd>(&self, a: &T, b: &T) -> bool {
        match self {
            Self::LessThan => *a < *b,
            Self::LessThanEqual => *a <= *b,
            Self::GreaterThan => *a > *b,
            Self::GreaterThanEqual => *a >= *b,
        }
    }

    fn discrete_span(&self, value: i64) -> Option<Span> {
        match self {
            Self::LessThan => Span::discrete(i64::MIN, value.checked_sub(1)?),
            Self::LessThanEqual => Span::discrete(i64::MIN, value),
            Self::GreaterThan => Span::discrete(value.checked_add(1)?, i64::MAX),
            Self::GreaterThanEqual => Span::discrete(value, i64::MAX),
        }
    }

    fn continuous_span(&self, value: Decimal) -> Option<Span> {
        match self {
            Self::LessThan => Span::continuous(Decimal::MIN, false, value, true),
            Self::LessThanEqual => Span::continuous(Decimal::MIN, false, value, false),
            Self::GreaterThan => Span::continuous(value, true, Decimal::MAX, false),
            Self::GreaterThanEqual => Span::continuous(value, false, Decimal::MAX, false),
        }
    }
}

impl Display for ComparisonOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::GreaterThanEqual => write!(formatter, ">="),
            Self::GreaterThan => write!(formatter, ">"),
            Self::LessThan => write!(formatter, "<"),
            Self::LessThanEqual => write!(formatter, "<="),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum ComparisonValue {
    Integer(i64),
    Float(Decimal),
}

impl Display for ComparisonValue {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum EqualityOperator {
    Equal,
    NotEqual,
}

impl EqualityOperator {
    fn evaluate(&self, a: &PrimitiveLiteral, b: &AttributeValue) -> bool {
        match (a, b) {
            (PrimitiveLiteral::Float(a), AttributeValue::Float(b)) => self.apply(a, b),
            (PrimitiveLiteral::Integer(a), AttributeValue::Integer(b)) => self.apply(a, b),
            (PrimitiveLiteral::Id(a), AttributeValue::String(b))
            | (PrimitiveLiteral::Id(a), AttributeValue::IntegerEnum(b)) => self.apply(a, b),
            (a, b) => {
                unreachable!("Equality ({self:?}) between {a:?} and {b:?} should never happen. This is a bug.")
            }
        }
    }

    fn apply<T: PartialEq>(&self, a: &T, b: &T) -> bool {
        match self {
            Self::Equal => *a == *b,
            Self::NotEqual => *a != *b,
        }
    }
}

impl Display for EqualityOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Equal => write!(formatter, "="),
            Self::NotEqual => write!(formatter, "<>"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum ListOperator {
    OneOf,
    NoneOf,
    AllOf,
    // Internal operator only, the negation of `all of`.
    NotAllOf,
}

impl ListOperator {
    fn evaluate(&self, literal: &ListLiteral, value: &AttributeValue) -> bool {
        match literal {
            ListLiteral::IdList(literal) => {
                let values = value
                    .as_string_list()
                    .unwrap_or_else(|error| unreachable!("{error}; this is a bug"));
                self.apply(values, literal)
            }
            ListLiteral::IntegerList(literal) => {
                let values = value
                    .as_integer_list()
                    .unwrap_or_else(|error| unreachable!("{error}; this is a bug"));
                self.apply(values, literal)
            }
        }
    }

    fn apply<T: Ord>(&self, values: &[T], literal: &[T]) -> bool {
        match self {
            Self::OneOf => one_of(values, literal),
            Self::NoneOf => none_of(values, literal),
            Self::AllOf => all_of(literal, values),
            Self::NotAllOf => !all_of(literal, values),
        }
    }
}

impl Display for ListOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::AllOf => write!(formatter, "all of"),
            Self::OneOf => write!(formatter, "one of"),
            Self::NoneOf => write!(formatter, "none of"),
            Self::NotAllOf => write!(formatter, "not all of"),
        }
    }
}

#[inline]
fn none_of<T: Ord>(left: &[T], right: &[T]) -> bool {
    !one_of(left, right)
}

fn one_of<T: Ord>(left: &[T], right: &[T]) -> bool {
    use std::cmp::Ordering;

    if left.is_empty() || right.is_empty() {
        return false;
    }

    let mut i = 0usize;
    let mut j = 0usize;
    while j < left.len() && i < right.len() {
        let x = &left[j];
        let y = &right[i];
        match y.cmp(x) {
            Ordering::Less => {
                i += 1;
            }
            Ordering::Equal => {
                return true;
            }
            Ordering::Greater => {
                j += 1;
            }
        }
    }

    false
}

/// Whether every element of the sorted `subset` is in the sorted `set`.
fn all_of<T: Ord>(subset: &[T], set: &[T]) -> bool {
    use std::cmp::Ordering;

    if subset.len() > set.len() {
        return false;
    }

    let mut i = 0usize;
    let mut j = 0usize;
    while j < subset.len() && i < set.len() {
        let x = &subset[j];
        let y = &set[i];
        match y.cmp(x) {
            Ordering::Less => {
                i += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Greater => {
                break;
            }
        }
    }

    j >= subset.len()
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum NullOperator {
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
}

impl NullOperator {
    fn evaluate(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (Self::IsNull, value) => matches!(value, AttributeValue::Undefined),
            (Self::IsNotNull, value) => !matches!(value, AttributeValue::Undefined),
            // An absent list has no element either.
            (Self::IsEmpty, AttributeValue::Undefined) => true,
            (Self::IsNotEmpty, AttributeValue::Undefined) => false,
            (Self::IsEmpty, value) if value.kind().is_some_and(|kind| kind.is_list()) => {
                value.is_empty_list()
            }
            (Self::IsNotEmpty, value) if value.kind().is_some_and(|kind| kind.is_list()) => {
                !value.is_empty_list()
            }
            (_, value) => {
                unreachable!(
                    "Null check ({self:?}) for {value:?} should never happen. This is a bug."
                )
            }
        }
    }
}

impl Display for NullOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::IsNull => write!(formatter, "is null"),
            Self::IsNotNull => write!(formatter, "is not null"),
            Self::IsEmpty => write!(formatter, "is empty"),
            Self::IsNotEmpty => write!(formatter, "is not empty"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum ListLiteral {
    IntegerList(Vec<i64>),
    /// Dictionary ids of strings or integer enums.
    IdList(Vec<ValueId>),
}

impl ListLiteral {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::IntegerList(values) => values.len(),
            Self::IdList(values) => values.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for ListLiteral {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::IntegerList(values) => write!(formatter, "{values:?}"),
            Self::IdList(values) => write!(formatter, "[{}]", values.iter().join(", ")),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum PrimitiveLiteral {
    Integer(i64),
    Float(Decimal),
    Id(ValueId),
}

impl Display for PrimitiveLiteral {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Integer(values) => write!(formatter, "{values}"),
            Self::Float(values) => write!(formatter, "{values}"),
            Self::Id(values) => write!(formatter, "{values}"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum SegmentOperator {
    Within,
    Before,
    NotWithin,
    NotBefore,
}

impl SegmentOperator {
    fn evaluate(&self, literal: &SegmentLiteral, segments: &[Segment], now: i64) -> bool {
        let threshold = now.saturating_sub(literal.seconds);
        let mut timestamps = segments
            .iter()
            .filter(|segment| segment.id == literal.id)
            .map(|segment| segment.timestamp);
        match self {
            Self::Within => timestamps.any(|timestamp| timestamp > threshold),
            Self::Before => timestamps.any(|timestamp| timestamp < threshold),
            Self::NotWithin => !timestamps.any(|timestamp| timestamp > threshold),
            Self::NotBefore => !timestamps.any(|timestamp| timestamp < threshold),
        }
    }
}

impl Not for SegmentOperator {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Within => Self::NotWithin,
            Self::Before => Self::NotBefore,
            Self::NotWithin => Self::Within,
            Self::NotBefore => Self::Before,
        }
    }
}

impl Display for SegmentOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Within => write!(formatter, "segment_within"),
            Self::Before => write!(formatter, "segment_before"),
            Self::NotWithin => write!(formatter, "not segment_within"),
            Self::NotBefore => write!(formatter, "not segment_before"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct SegmentLiteral {
    pub id: i64,
    pub seconds: i64,
    pub clock: AttributeId,
}

impl Display for SegmentLiteral {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}, {}s", self.id, self.seconds)
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum FrequencyOperator {
    Within,
    NotWithin,
}

impl FrequencyOperator {
    fn evaluate(&self, literal: &FrequencyLiteral, caps: &[FrequencyCap], now: i64) -> bool {
        let within = within_frequency_cap(literal, caps, now);
        match self {
            Self::Within => within,
            Self::NotWithin => !within,
        }
    }
}

fn within_frequency_cap(literal: &FrequencyLiteral, caps: &[FrequencyCap], now: i64) -> bool {
    let cap = caps.iter().find(|cap| {
        cap.kind == literal.kind && cap.id == literal.id && cap.namespace == literal.namespace
    });
    match cap {
        None => true,
        Some(FrequencyCap {
            timestamp: None,
            value,
            ..
        }) => *value < literal.value,
        Some(FrequencyCap {
            timestamp: Some(timestamp),
            value,
            ..
        }) => now.saturating_sub(literal.seconds) >= *timestamp || *value < literal.value,
    }
}

impl Not for FrequencyOperator {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Within => Self::NotWithin,
            Self::NotWithin => Self::Within,
        }
    }
}

impl Display for FrequencyOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Within => write!(formatter, "within_frequency_cap"),
            Self::NotWithin => write!(formatter, "not within_frequency_cap"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct FrequencyLiteral {
    pub kind: FrequencyType,
    pub id: i64,
    pub namespace: String,
    pub value: i64,
    pub seconds: i64,
    pub clock: AttributeId,
}

impl Display for FrequencyLiteral {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "{}, {}, {:?}, {}, {}s",
            self.kind, self.id, self.namespace, self.value, self.seconds
        )
    }
}
