pub mod ast {
    macro_rules! or {
        ($left:expr, $right:expr) => {
            Node::Or(Box::new($left), Box::new($right))
        };
    }

    macro_rules! and {
        ($left:expr, $right:expr) => {
            Node::And(Box::new($left), Box::new($right))
        };
    }

    macro_rules! not {
        ($value:expr) => {
            Node::Not(Box::new($value))
        };
    }

    macro_rules! value {
        ($value:expr) => {
            Node::Value($value)
        };
    }

    pub(crate) use and;
    pub(crate) use not;
    pub(crate) use or;
    pub(crate) use value;
}

pub mod optimized_node {
    macro_rules! or {
        ($left:expr, $right:expr) => {
            OptimizedNode::Or(Box::new($left), Box::new($right))
        };
    }

    macro_rules! and {
        ($left:expr, $right:expr) => {
            OptimizedNode::And(Box::new($left), Box::new($right))
        };
    }

    macro_rules! value {
        ($value:expr) => {
            OptimizedNode::Value($value)
        };
    }

    pub(crate) use and;
    pub(crate) use or;
    pub(crate) use value;
}

/// Predicates written close to the expression language, with literals already encoded.
///
/// `predicate!(&domains, "exchange_id" < 10)` is what the parser builds for `exchange_id < 10`.
/// Integer literals stay integers, other comparison operands are decimals, other `=` and `<>`
/// operands are dictionary ids.
pub mod predicates {
    macro_rules! predicate {
        ($domains:expr, $name:tt) => {
            predicate!($domains, $name, PredicateKind::Variable)
        };
        ($domains:expr, not $name:tt) => {
            predicate!($domains, $name, PredicateKind::NegatedVariable)
        };
        ($domains:expr, $name:tt is null) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Null(NullOperator::IsNull)
            )
        };
        ($domains:expr, $name:tt is not null) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Null(NullOperator::IsNotNull)
            )
        };
        ($domains:expr, $name:tt is empty) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Null(NullOperator::IsEmpty)
            )
        };
        ($domains:expr, $name:tt is not empty) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Null(NullOperator::IsNotEmpty)
            )
        };
        ($domains:expr, $name:tt < > $value:literal) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Equality(EqualityOperator::NotEqual, PrimitiveLiteral::Integer($value))
            )
        };
        ($domains:expr, $name:tt < > $id:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Equality(EqualityOperator::NotEqual, PrimitiveLiteral::Id($id))
            )
        };
        ($domains:expr, $name:tt = $value:literal) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Equality(EqualityOperator::Equal, PrimitiveLiteral::Integer($value))
            )
        };
        ($domains:expr, $name:tt = $id:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Equality(EqualityOperator::Equal, PrimitiveLiteral::Id($id))
            )
        };
        ($domains:expr, $name:tt < $($value:tt)+) => {
            $crate::test_utils::predicates::comparison!($domains, $name, LessThan, $($value)+)
        };
        ($domains:expr, $name:tt <= $($value:tt)+) => {
            $crate::test_utils::predicates::comparison!($domains, $name, LessThanEqual, $($value)+)
        };
        ($domains:expr, $name:tt > $($value:tt)+) => {
            $crate::test_utils::predicates::comparison!($domains, $name, GreaterThan, $($value)+)
        };
        ($domains:expr, $name:tt >= $($value:tt)+) => {
            $crate::test_utils::predicates::comparison!($domains, $name, GreaterThanEqual, $($value)+)
        };
        ($domains:expr, $name:tt in $list:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Set(SetOperator::In, $list)
            )
        };
        ($domains:expr, $name:tt not in $list:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Set(SetOperator::NotIn, $list)
            )
        };
        ($domains:expr, $name:tt one of $list:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::List(ListOperator::OneOf, $list)
            )
        };
        ($domains:expr, $name:tt none of $list:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::List(ListOperator::NoneOf, $list)
            )
        };
        ($domains:expr, $name:tt all of $list:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::List(ListOperator::AllOf, $list)
            )
        };
        ($domains:expr, $name:expr, $kind:expr) => {
            Predicate::new($domains, $name, $kind).unwrap()
        };
    }

    macro_rules! comparison {
        ($domains:expr, $name:tt, $operator:ident, $value:literal) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Comparison(ComparisonOperator::$operator, ComparisonValue::Integer($value))
            )
        };
        ($domains:expr, $name:tt, $operator:ident, $value:expr) => {
            predicate!(
                $domains,
                $name,
                PredicateKind::Comparison(ComparisonOperator::$operator, ComparisonValue::Float($value))
            )
        };
    }

    /// A list of dictionary ids, sorted the way encoded list literals are.
    macro_rules! ids {
        ($($id:expr),* $(,)?) => {{
            let mut ids: Vec<ValueId> = vec![$($id),*];
            ids.sort();
            ListLiteral::IdList(ids)
        }};
    }

    macro_rules! integers {
        ($($value:expr),* $(,)?) => {
            ListLiteral::IntegerList(vec![$($value),*])
        };
    }

    pub(crate) use comparison;
    pub(crate) use ids;
    pub(crate) use integers;
    pub(crate) use predicate;
}
