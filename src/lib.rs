//! An index that matches events against large sets of boolean expressions by partitioning the
//! expressions on the domains of the attributes they constrain.
//!
//! # Examples
//!
//! Searching for some boolean expressions:
//!
//! ```
//! use be_tree::{AttributeDefinition, BETree, Config};
//! use std::collections::HashMap;
//!
//! // Create the index
//! let mut betree = BETree::new(Config::default(), &[
//!     AttributeDefinition::string_list("deal_ids"),
//!     AttributeDefinition::bounded_integer("exchange_id", 0, 10),
//!     AttributeDefinition::boolean("debug"),
//!     AttributeDefinition::integer_list("segment_ids"),
//! ]).unwrap();
//!
//! let expression_1 = r#"deal_ids one of ["deal-1", "deal-2"]"#;
//! let expression_2 = r#"segment_ids one of [1, 2, 3, 4] and exchange_id < 4"#;
//! // Insert the boolean expressions
//! let expressions_by_ids = vec![
//!     (1u64, expression_1),
//!     (2u64, expression_2)
//! ];
//! let mut mappings: HashMap<u64, &str> = HashMap::new();
//! for (id, expression) in &expressions_by_ids {
//!     betree.insert(id, expression).unwrap();
//!     mappings.insert(*id, expression);
//! }
//!
//! // Create an event
//! let mut builder = betree.make_event();
//! builder.with_string_list("deal_ids", &["deal-2"]).unwrap();
//! builder.with_integer("exchange_id", 3).unwrap();
//! builder.with_integer_list("segment_ids", &[1, 2]).unwrap();
//! builder.with_boolean("debug", false).unwrap();
//! let event = builder.build().unwrap();
//!
//! // Search for matching boolean expressions
//! let report = betree.search(&event).unwrap();
//! assert_eq!(2, report.matched());
//! report.matches().iter().for_each(|id| {
//!     println!(r#"Found ID: {id}, Expression: "{}""#, mappings[id]);
//! });
//! ```
//!
//! # Domain Specific Language (DSL)
//!
//! Expressions are written in a small DSL. The following operators are supported:
//!
//! * Boolean operators: `and` (`&&`), `or` (`||`), `not` (`!`) and `variable` where `variable`
//!   is a boolean attribute. `and` binds tighter than `or`;
//! * Comparison: `<`, `<=`, `>`, `>=`. They work for `integer` and `float`;
//! * Equality: `=` and `<>`. They work for `integer`, `float`, `string` and integer
//!   enumerations;
//! * Null: `is null`, `is not null` (for scalars), `is empty` and `is not empty` (for lists);
//! * Set: `in` and `not in`. They work for `integer`, `string` and integer enumerations;
//! * List: `one of`, `none of` and `all of`. They work for list of `integer` and list of
//!   `string`;
//! * Segments: `segment_within(segments, id, seconds)` and
//!   `segment_before(segments, id, seconds)`;
//! * Frequency caps: `within_frequency_cap(caps, "type", id, "namespace", value, seconds)`.
//!
//! Segment and frequency cap predicates compare timestamps against the integer attribute named
//! `now`, which must be registered before they are used.
//!
//! As an example, the following would all be valid expressions:
//!
//! ```text
//! (exchange_id = 1 and deals one of ["deal-1", "deal-2", "deal-3"]) and (segment_ids one of [1, 2, 3]) and (continent = 'NA' and country in ["US", "CA"])
//! bidfloor >= 1.5 and not within_frequency_cap(caps, "flight", 10, "ns", 3, 60)
//! (log_level = 'debug') and (month in [1, 2, 3] and day in [15, 16]) or (month in [4, 5, 6] and day in [10, 11])
//! ```
//!
//! # Partitioning
//!
//! Every expression is reduced to its _footprint_: for each attribute it constrains, the
//! interval of values under which the expression can still be true. Leaves of the partition
//! tree that hold too many expressions are split on the attribute that best separates their
//! footprints. Each child of a partition covers a slice of the attribute's domain. An
//! expression is copied into every slice its footprint overlaps; expressions that do not
//! constrain the attribute go to the catch-all child.
//!
//! Searching an event only descends into the slice holding the event's value and into the
//! catch-all child, then evaluates the expressions of the visited leaves, each at most once:
//!
//! * The strings and integer enumerations are converted to dictionary IDs to accelerate
//!   comparison and search;
//! * The lists of strings/integers are sorted and deduplicated;
//! * The sub-expressions are sorted by cost so cheap predicates run first;
//! * _Zero suppression filter_: NOT nodes are eliminated by applying De Morgan's laws;
//! * Evaluation uses a three-valued logic: a predicate over an undefined attribute is unknown
//!   and an expression only matches when it is definitely true.
mod ast;
mod betree;
mod config;
mod dictionary;
mod domains;
mod error;
mod evaluation;
mod events;
mod footprint;
mod lexer;
mod parser;
mod partition;
mod predicates;
#[cfg(test)]
mod test_utils;

pub use crate::{
    ast::Node,
    betree::{BETree, Report},
    config::{Config, UndefinedPolicy},
    dictionary::ValueId,
    domains::{
        AttrDomain, AttributeDefinition, AttributeId, AttributeKind, DomainError,
        DomainRegistry, RawValue, ValueBound, CLOCK_ATTRIBUTE,
    },
    error::{BETreeError, BETreeParseError, ParserError},
    events::{
        AttributeValue, Event, EventBuilder, EventError, FrequencyCap, FrequencyType, Segment,
    },
    lexer::LexicalError,
    predicates::{Predicate, PredicateKind},
};
pub use rust_decimal::Decimal;
