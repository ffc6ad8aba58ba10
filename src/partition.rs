use crate::{
    ast::OptimizedNode,
    betree::Report,
    config::{Config, UndefinedPolicy},
    domains::{AttributeId, DomainRegistry},
    evaluation::EvaluationResult,
    events::{AttributeValue, Event},
    footprint::{Footprint, Interval, Range, Span},
};
use itertools::Itertools;
use rust_decimal::Decimal;
use slab::Slab;
use std::{fmt::Debug, ops::RangeInclusive};
use tracing::{debug, trace};

pub(crate) type NodeId = usize;
pub(crate) type Slot = usize;

#[derive(Clone, Debug)]
struct Expression<T> {
    id: T,
    root: OptimizedNode,
    footprint: Footprint,
    leaves: Vec<NodeId>,
}

#[derive(Clone, Debug)]
enum PartitionNode {
    Leaf(Leaf),
    Partition(Partition),
}

#[derive(Clone, Debug, Default)]
struct Leaf {
    expressions: Vec<Slot>,
    failed_splits: usize,
}

#[derive(Clone, Debug)]
struct Partition {
    attribute: AttributeId,
    cuts: Cuts,
    children: Vec<NodeId>,
    /// Holds the expressions that do not constrain the attribute.
    catch_all: NodeId,
}

/// The lower bounds of the children of a partition.
///
/// Child `i` holds the values in `[points[i], points[i + 1])`; the last child goes up to `max`
/// included. The first point is always the minimum of the domain.
#[derive(Clone, PartialEq, Debug)]
enum Cuts {
    Discrete { points: Vec<i64>, max: i64 },
    Continuous { points: Vec<Decimal>, max: Decimal },
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Key {
    Discrete(i64),
    Continuous(Decimal),
}

impl Cuts {
    /// Cut the domain at every bound of the spans.
    fn new<'a>(domain: &Span, spans: impl Iterator<Item = &'a Span>) -> Option<Self> {
        match domain {
            Span::Discrete(Interval { lo: min, hi: max }) => {
                let mut points = vec![*min];
                for span in spans {
                    let Span::Discrete(Interval { lo, hi }) = span else {
                        return None;
                    };
                    if lo > min {
                        points.push(*lo);
                    }
                    if hi < max {
                        points.push(hi + 1);
                    }
                }
                Some(Self::Discrete {
                    points: points.into_iter().sorted().dedup().collect(),
                    max: *max,
                })
            }
            Span::Continuous(Range {
                lo: min, hi: max, ..
            }) => {
                let mut points = vec![*min];
                for span in spans {
                    let Span::Continuous(Range { lo, hi, .. }) = span else {
                        return None;
                    };
                    if lo > min {
                        points.push(*lo);
                    }
                    if hi < max {
                        points.push(*hi);
                    }
                }
                Some(Self::Continuous {
                    points: points.into_iter().sorted().dedup().collect(),
                    max: *max,
                })
            }
        }
    }

    #[inline]
    fn len(&self) -> usize {
        match self {
            Self::Discrete { points, .. } => points.len(),
            Self::Continuous { points, .. } => points.len(),
        }
    }

    /// The child holding the key; `None` when the key is outside of the domain.
    fn locate(&self, key: Key) -> Option<usize> {
        match (self, key) {
            (Self::Discrete { points, max }, Key::Discrete(value)) => {
                if value > *max {
                    return None;
                }
                points.partition_point(|point| *point <= value).checked_sub(1)
            }
            (Self::Continuous { points, max }, Key::Continuous(value)) => {
                if value > *max {
                    return None;
                }
                points.partition_point(|point| *point <= value).checked_sub(1)
            }
            (_, _) => None,
        }
    }

    /// The children whose values overlap the span.
    fn overlapping(&self, span: &Span) -> Option<RangeInclusive<usize>> {
        let (first, last) = match (self, span) {
            (Self::Discrete { points, .. }, Span::Discrete(Interval { lo, hi })) => (
                points.partition_point(|point| point <= lo),
                points.partition_point(|point| point <= hi),
            ),
            (Self::Continuous { points, .. }, Span::Continuous(range)) => (
                points.partition_point(|point| *point <= range.lo),
                if range.hi_open {
                    points.partition_point(|point| *point < range.hi)
                } else {
                    points.partition_point(|point| *point <= range.hi)
                },
            ),
            (_, _) => return None,
        };
        let first = first.saturating_sub(1);
        let last = last.checked_sub(1)?;
        (first <= last).then_some(first..=last)
    }

    fn label(&self, index: usize) -> String {
        match self {
            Self::Discrete { points, max } => match points.get(index + 1) {
                Some(next) => format!("[{}, {next})", points[index]),
                None => format!("[{}, {max}]", points[index]),
            },
            Self::Continuous { points, max } => match points.get(index + 1) {
                Some(next) => format!("[{}, {next})", points[index]),
                None => format!("[{}, {max}]", points[index]),
            },
        }
    }
}

/// The partition key of an event value; `None` when the value cannot be in any child.
fn key_of(value: &AttributeValue) -> Option<Key> {
    match value {
        AttributeValue::Boolean(value) => Some(Key::Discrete(i64::from(*value))),
        AttributeValue::Integer(value) => Some(Key::Discrete(*value)),
        AttributeValue::Float(value) => Some(Key::Continuous(*value)),
        AttributeValue::String(id) | AttributeValue::IntegerEnum(id) => {
            id.as_key().map(Key::Discrete)
        }
        _ => None,
    }
}

/// Index of expressions grouped by the values of the attributes they constrain.
#[derive(Clone, Debug)]
pub(crate) struct PartitionTree<T> {
    nodes: Slab<PartitionNode>,
    expressions: Slab<Expression<T>>,
    root: NodeId,
}

impl<T: Debug> PartitionTree<T> {
    pub(crate) fn new() -> Self {
        let mut nodes = Slab::new();
        let root = nodes.insert(PartitionNode::Leaf(Leaf::default()));
        Self {
            nodes,
            expressions: Slab::new(),
            root,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.expressions.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub(crate) fn insert(
        &mut self,
        id: T,
        root: OptimizedNode,
        domains: &DomainRegistry,
        config: &Config,
    ) -> Slot {
        let footprint = Footprint::of(&root, domains);
        let slot = self.expressions.insert(Expression {
            id,
            root,
            footprint,
            leaves: vec![],
        });
        trace!(slot, footprint = ?self.expressions[slot].footprint, "inserting expression");

        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            match &mut self.nodes[node_id] {
                PartitionNode::Partition(partition) => {
                    let span = self.expressions[slot].footprint.get(partition.attribute);
                    match span.and_then(|span| partition.cuts.overlapping(span)) {
                        Some(range) => stack.extend(&partition.children[range]),
                        None => stack.push(partition.catch_all),
                    }
                }
                PartitionNode::Leaf(leaf) => {
                    leaf.expressions.push(slot);
                    self.expressions[slot].leaves.push(node_id);
                    self.split(node_id, domains, config);
                }
            }
        }
        slot
    }

    /// Remove the expression from every leaf holding it. The partitions are left as is.
    pub(crate) fn delete(&mut self, slot: Slot) -> Option<T> {
        let expression = self.expressions.try_remove(slot)?;
        for leaf_id in &expression.leaves {
            match &mut self.nodes[*leaf_id] {
                PartitionNode::Leaf(leaf) => leaf.expressions.retain(|other| *other != slot),
                PartitionNode::Partition(_) => {
                    unreachable!("Expression {slot} refers to partition {leaf_id}; this is a bug")
                }
            }
        }
        trace!(slot, leaves = expression.leaves.len(), "deleted expression");
        Some(expression.id)
    }

    /// Split the leaf, then its new children, while they are over capacity.
    fn split(&mut self, leaf_id: NodeId, domains: &DomainRegistry, config: &Config) {
        let mut pending = vec![leaf_id];
        while let Some(node_id) = pending.pop() {
            let PartitionNode::Leaf(leaf) = &self.nodes[node_id] else {
                continue;
            };
            let size = leaf.expressions.len();
            if config.leaf_capacity() == 0
                || size <= config.leaf_capacity()
                || leaf.failed_splits >= config.max_split_attempts()
            {
                continue;
            }

            match self.find_split(&leaf.expressions, domains, config) {
                Some((attribute, cuts)) => {
                    let children = self.partition(node_id, attribute, cuts);
                    debug!(
                        node = node_id,
                        %attribute,
                        size,
                        children = children.len(),
                        "split leaf"
                    );
                    pending.extend(children);
                }
                None => {
                    if let PartitionNode::Leaf(leaf) = &mut self.nodes[node_id] {
                        leaf.failed_splits += 1;
                        trace!(
                            node = node_id,
                            size,
                            attempts = leaf.failed_splits,
                            "no useful split"
                        );
                    }
                }
            }
        }
    }

    /// Pick the partitionable attribute with the smallest domain that spreads the expressions.
    fn find_split(
        &self,
        slots: &[Slot],
        domains: &DomainRegistry,
        config: &Config,
    ) -> Option<(AttributeId, Cuts)> {
        let candidates = slots
            .iter()
            .flat_map(|slot| self.expressions[*slot].footprint.attributes())
            .unique()
            .filter_map(|attribute| {
                let domain = domains.get(attribute)?;
                let cardinality = domain.cardinality()?;
                (domain.is_partitionable() && cardinality >= config.partition_min_size())
                    .then_some((cardinality, attribute))
            })
            .sorted();

        for (_, attribute) in candidates {
            let Some(span) = domains.get(attribute).and_then(|domain| domain.span()) else {
                continue;
            };
            let spans = slots
                .iter()
                .filter_map(|slot| self.expressions[*slot].footprint.get(attribute));
            let Some(cuts) = Cuts::new(&span, spans) else {
                continue;
            };
            if self.is_useful(slots, attribute, &cuts) {
                return Some((attribute, cuts));
            }
        }
        None
    }

    /// Whether every child would end up holding fewer expressions than the leaf.
    fn is_useful(&self, slots: &[Slot], attribute: AttributeId, cuts: &Cuts) -> bool {
        let mut loads = vec![0usize; cuts.len()];
        let mut catch_all = 0usize;
        for slot in slots {
            let span = self.expressions[*slot].footprint.get(attribute);
            match span.and_then(|span| cuts.overlapping(span)) {
                Some(range) => loads[range].iter_mut().for_each(|load| *load += 1),
                None => catch_all += 1,
            }
        }
        let heaviest = loads.into_iter().max().unwrap_or_default();
        heaviest + catch_all < slots.len()
    }

    /// Turn the leaf into a partition and move its expressions to the new children.
    fn partition(&mut self, node_id: NodeId, attribute: AttributeId, cuts: Cuts) -> Vec<NodeId> {
        let leaf = match std::mem::replace(
            &mut self.nodes[node_id],
            PartitionNode::Leaf(Leaf::default()),
        ) {
            PartitionNode::Leaf(leaf) => leaf,
            PartitionNode::Partition(_) => {
                unreachable!("Node {node_id} is already a partition; this is a bug")
            }
        };

        let children = (0..cuts.len())
            .map(|_| self.nodes.insert(PartitionNode::Leaf(Leaf::default())))
            .collect_vec();
        let catch_all = self.nodes.insert(PartitionNode::Leaf(Leaf::default()));

        for slot in leaf.expressions {
            let expression = &mut self.expressions[slot];
            expression.leaves.retain(|leaf_id| *leaf_id != node_id);
            let targets = match expression
                .footprint
                .get(attribute)
                .and_then(|span| cuts.overlapping(span))
            {
                Some(range) => &children[range],
                None => std::slice::from_ref(&catch_all),
            };
            for target in targets {
                expression.leaves.push(*target);
                if let PartitionNode::Leaf(child) = &mut self.nodes[*target] {
                    child.expressions.push(slot);
                }
            }
        }

        self.nodes[node_id] = PartitionNode::Partition(Partition {
            attribute,
            cuts,
            children: children.clone(),
            catch_all,
        });

        let mut created = children;
        created.push(catch_all);
        created
    }

    /// Evaluate every expression reachable for the event.
    ///
    /// `should_stop` is called before each leaf; returning `true` interrupts the search.
    pub(crate) fn search<'a, F>(
        &'a self,
        event: &Event,
        policy: UndefinedPolicy,
        mut should_stop: F,
    ) -> Report<'a, T>
    where
        F: FnMut(&Report<'a, T>) -> bool,
    {
        let mut results = EvaluationResult::new(self.expressions.capacity());
        let mut report = Report::new();
        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            match &self.nodes[node_id] {
                PartitionNode::Partition(partition) => {
                    stack.push(partition.catch_all);
                    match event.lookup(partition.attribute) {
                        None if policy == UndefinedPolicy::VisitAll => {
                            stack.extend(&partition.children);
                        }
                        None => {}
                        Some(value) => {
                            if let Some(index) =
                                key_of(value).and_then(|key| partition.cuts.locate(key))
                            {
                                stack.push(partition.children[index]);
                            }
                        }
                    }
                }
                PartitionNode::Leaf(leaf) => {
                    if should_stop(&report) {
                        report.interrupt();
                        break;
                    }
                    for slot in &leaf.expressions {
                        if !results.mark_evaluated(*slot) {
                            continue;
                        }
                        let expression = &self.expressions[*slot];
                        let matched = expression.root.evaluate(event) == Some(true);
                        report.record(&expression.id, matched);
                    }
                }
            }
        }
        report
    }

    pub(crate) fn to_graphviz(&self) -> String {
        let mut builder = String::new();
        builder.push_str("digraph {\n");
        builder.push_str("rankdir = TB;\n");
        builder.push_str(r#"node [shape = "record"];"#);
        builder.push('\n');
        let mut relations = Vec::new();
        for (id, node) in &self.nodes {
            match node {
                PartitionNode::Leaf(Leaf {
                    expressions,
                    failed_splits,
                }) => {
                    builder.push_str(&format!(
                        r#"node_{id} [label = "{{{id} | leaf | expressions: {expressions:?} | failed splits: {failed_splits}}}", style = "rounded"];"#
                    ));
                    builder.push('\n');
                }
                PartitionNode::Partition(Partition {
                    attribute,
                    cuts,
                    children,
                    catch_all,
                }) => {
                    builder.push_str(&format!(
                        r#"node_{id} [label = "{{{id} | partition | {attribute}}}"];"#
                    ));
                    builder.push('\n');
                    for (index, child) in children.iter().enumerate() {
                        relations.push(format!(
                            r#"node_{id} -> node_{child} [label = "{}"];"#,
                            cuts.label(index)
                        ));
                    }
                    relations.push(format!(
                        r#"node_{id} -> node_{catch_all} [label = "catch-all", style = "dashed"];"#
                    ));
                }
            }
        }
        for relation in relations {
            builder.push_str(&relation);
            builder.push('\n');
        }
        builder.push('}');
        builder
    }

    #[cfg(test)]
    fn leaves_of(&self, slot: Slot) -> &[NodeId] {
        &self.expressions[slot].leaves
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        fn depth_of(nodes: &Slab<PartitionNode>, node_id: NodeId) -> usize {
            match &nodes[node_id] {
                PartitionNode::Leaf(_) => 1,
                PartitionNode::Partition(partition) => {
                    1 + partition
                        .children
                        .iter()
                        .chain(std::iter::once(&partition.catch_all))
                        .map(|child| depth_of(nodes, *child))
                        .max()
                        .unwrap_or_default()
                }
            }
        }
        depth_of(&self.nodes, self.root)
    }
}
