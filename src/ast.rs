use crate::{events::Event, predicates::Predicate};

pub type TreeNode = Box<Node>;

/// A boolean expression as parsed.
#[derive(PartialEq, Clone, Debug)]
pub enum Node {
    And(TreeNode, TreeNode),
    Or(TreeNode, TreeNode),
    Not(TreeNode),
    Value(Predicate),
}

/// A boolean expression with its negations pushed down to the predicates.
#[derive(PartialEq, Clone, Debug)]
pub enum OptimizedNode {
    And(Box<OptimizedNode>, Box<OptimizedNode>),
    Or(Box<OptimizedNode>, Box<OptimizedNode>),
    Value(Predicate),
}

impl OptimizedNode {
    #[inline]
    pub fn cost(&self) -> u64 {
        match self {
            // There is more chance that the evaluation leads to a `false` result which means that
            // `AND` nodes are usually less expansive since they might be skipped entirely because
            // of the short-circuit.
            Self::And(left, right) => left.cost() + right.cost() + 50,
            Self::Or(left, right) => left.cost() + right.cost() + 60,
            Self::Value(node) => node.cost(),
        }
    }

    /// Three-valued evaluation: `None` when the outcome depends on undefined attributes.
    pub fn evaluate(&self, event: &Event) -> Option<bool> {
        match self {
            Self::And(left, right) => match left.evaluate(event) {
                Some(false) => Some(false),
                acc => match (acc, right.evaluate(event)) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    (_, _) => None,
                },
            },
            Self::Or(left, right) => match left.evaluate(event) {
                Some(true) => Some(true),
                acc => match (acc, right.evaluate(event)) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    (_, _) => None,
                },
            },
            Self::Value(predicate) => predicate.evaluate(event),
        }
    }

    /// The predicates of the expression, left to right.
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut predicates = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::And(left, right) | Self::Or(left, right) => {
                    stack.push(right);
                    stack.push(left);
                }
                Self::Value(predicate) => predicates.push(predicate),
            }
        }
        predicates
    }

    fn and(left: OptimizedNode, right: OptimizedNode) -> Self {
        let (left, right) = cheapest_first(left, right);
        Self::And(Box::new(left), Box::new(right))
    }

    fn or(left: OptimizedNode, right: OptimizedNode) -> Self {
        let (left, right) = cheapest_first(left, right);
        Self::Or(Box::new(left), Box::new(right))
    }
}

#[inline]
fn cheapest_first(left: OptimizedNode, right: OptimizedNode) -> (OptimizedNode, OptimizedNode) {
    if right.cost() < left.cost() {
        (right, left)
    } else {
        (left, right)
    }
}

impl Node {
    #[inline]
    pub fn optimize(self) -> OptimizedNode {
        self.zero_suppression_filter(false)
    }

    pub fn zero_suppression_filter(self, negate: bool) -> OptimizedNode {
        match (self, negate) {
            (Self::And(left, right), true) => OptimizedNode::or(
                left.zero_suppression_filter(true),
                right.zero_suppression_filter(true),
            ),
            (Self::Or(left, right), true) => OptimizedNode::and(
                left.zero_suppression_filter(true),
                right.zero_suppression_filter(true),
            ),
            (Self::Not(value), true) => value.zero_suppression_filter(false),
            (Self::Not(value), false) => value.zero_suppression_filter(true),
            (Self::Value(predicate), true) => OptimizedNode::Value(!predicate),
            (Self::And(left, right), false) => OptimizedNode::and(
                left.zero_suppression_filter(false),
                right.zero_suppression_filter(false),
            ),
            (Self::Or(left, right), false) => OptimizedNode::or(
                left.zero_suppression_filter(false),
                right.zero_suppression_filter(false),
            ),
            (Self::Value(predicate), _) => OptimizedNode::Value(predicate),
        }
    }
}
