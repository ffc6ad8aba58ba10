use crate::{
    ast::OptimizedNode,
    domains::{AttributeId, DomainRegistry},
};
use rust_decimal::Decimal;
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

/// Inclusive range of discrete partition keys.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Interval {
    pub lo: i64,
    pub hi: i64,
}

/// Range of decimal values where each end may be open.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Range {
    pub lo: Decimal,
    pub lo_open: bool,
    pub hi: Decimal,
    pub hi_open: bool,
}

impl Range {
    fn is_empty(&self) -> bool {
        match self.lo.cmp(&self.hi) {
            Ordering::Greater => true,
            Ordering::Equal => self.lo_open || self.hi_open,
            Ordering::Less => false,
        }
    }
}

/// The values of one attribute that can possibly satisfy an expression.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Span {
    Discrete(Interval),
    Continuous(Range),
}

impl Span {
    /// `None` when the interval is empty.
    pub fn discrete(lo: i64, hi: i64) -> Option<Self> {
        (lo <= hi).then_some(Self::Discrete(Interval { lo, hi }))
    }

    /// `None` when the range is empty.
    pub fn continuous(lo: Decimal, lo_open: bool, hi: Decimal, hi_open: bool) -> Option<Self> {
        let range = Range {
            lo,
            lo_open,
            hi,
            hi_open,
        };
        (!range.is_empty()).then_some(Self::Continuous(range))
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Discrete(a), Self::Discrete(b)) => Self::discrete(a.lo.max(b.lo), a.hi.min(b.hi)),
            (Self::Continuous(a), Self::Continuous(b)) => {
                let (lo, lo_open) = match a.lo.cmp(&b.lo) {
                    Ordering::Less => (b.lo, b.lo_open),
                    Ordering::Greater => (a.lo, a.lo_open),
                    Ordering::Equal => (a.lo, a.lo_open || b.lo_open),
                };
                let (hi, hi_open) = match a.hi.cmp(&b.hi) {
                    Ordering::Less => (a.hi, a.hi_open),
                    Ordering::Greater => (b.hi, b.hi_open),
                    Ordering::Equal => (a.hi, a.hi_open || b.hi_open),
                };
                Self::continuous(lo, lo_open, hi, hi_open)
            }
            _ => None,
        }
    }

    /// The smallest span covering both.
    pub fn hull(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Discrete(a), Self::Discrete(b)) => Self::discrete(a.lo.min(b.lo), a.hi.max(b.hi)),
            (Self::Continuous(a), Self::Continuous(b)) => {
                let (lo, lo_open) = match a.lo.cmp(&b.lo) {
                    Ordering::Less => (a.lo, a.lo_open),
                    Ordering::Greater => (b.lo, b.lo_open),
                    Ordering::Equal => (a.lo, a.lo_open && b.lo_open),
                };
                let (hi, hi_open) = match a.hi.cmp(&b.hi) {
                    Ordering::Less => (b.hi, b.hi_open),
                    Ordering::Greater => (a.hi, a.hi_open),
                    Ordering::Equal => (a.hi, a.hi_open && b.hi_open),
                };
                Self::continuous(lo, lo_open, hi, hi_open)
            }
            _ => None,
        }
    }
}

impl Display for Span {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discrete(Interval { lo, hi }) => write!(formatter, "[{lo}, {hi}]"),
            Self::Continuous(range) => write!(
                formatter,
                "{}{}, {}{}",
                if range.lo_open { '(' } else { '[' },
                range.lo,
                range.hi,
                if range.hi_open { ')' } else { ']' }
            ),
        }
    }
}

/// Per attribute, the values an expression needs to possibly be true.
///
/// An attribute only appears when the expression cannot be true while that attribute is
/// undefined or outside of its span.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Footprint(BTreeMap<AttributeId, Span>);

impl Footprint {
    pub fn of(node: &OptimizedNode, domains: &DomainRegistry) -> Self {
        match node {
            OptimizedNode::And(left, right) => {
                Self::of(left, domains).and(Self::of(right, domains))
            }
            OptimizedNode::Or(left, right) => Self::of(left, domains).or(Self::of(right, domains)),
            OptimizedNode::Value(predicate) => {
                let attribute = predicate.attribute();
                let span = domains
                    .get(attribute)
                    .and_then(|domain| predicate.span(domain));
                let mut footprint = Self::default();
                if let Some(span) = span {
                    footprint.0.insert(attribute, span);
                }
                footprint
            }
        }
    }

    /// Both sides must hold: keep every constraint, narrowing the shared ones.
    pub fn and(mut self, other: Self) -> Self {
        for (attribute, span) in other.0 {
            match self.0.get(&attribute).map(|current| current.intersect(&span)) {
                None => {
                    self.0.insert(attribute, span);
                }
                Some(Some(narrowed)) => {
                    self.0.insert(attribute, narrowed);
                }
                // Never true on this attribute; no branch can be pruned safely from it.
                Some(None) => {
                    self.0.remove(&attribute);
                }
            }
        }
        self
    }

    /// Either side may hold: only constraints shared by both survive, widened to cover both.
    pub fn or(self, other: Self) -> Self {
        let spans = self
            .0
            .into_iter()
            .filter_map(|(attribute, span)| {
                let other = other.0.get(&attribute)?;
                Some((attribute, span.hull(other)?))
            })
            .collect();
        Self(spans)
    }

    #[inline]
    pub fn get(&self, attribute: AttributeId) -> Option<&Span> {
        self.0.get(&attribute)
    }

    #[inline]
    pub fn attributes(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.0.keys().copied()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
