use crate::{
    ast::Node,
    domains::DomainRegistry,
    error::ParserError,
    lexer::{Lexer, Token},
};
use lalrpop_util::{lalrpop_mod, ParseError};

lalrpop_mod!(grammar);

use self::grammar::TreeParser;

pub type BETreeParserError<'a> = ParseError<usize, Token<'a>, ParserError>;

/// Parse an expression, encoding its literals through the attributes' dictionaries.
#[inline]
pub fn parse<'a>(
    input: &'a str,
    domains: &mut DomainRegistry,
) -> Result<Node, BETreeParserError<'a>> {
    let lexer = Lexer::new(input);
    TreeParser::new().parse(domains, lexer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dictionary::ValueId,
        domains::{AttributeDefinition, AttributeKind, DomainError, RawValue},
        lexer::LexicalError,
        predicates::{
            ComparisonOperator, ComparisonValue, EqualityOperator, ListLiteral, ListOperator,
            NullOperator, Predicate, PredicateKind, PrimitiveLiteral, SegmentOperator,
            SetOperator,
        },
        test_utils::{
            ast::{and, not, or, value},
            predicates::{ids, integers, predicate},
        },
    };
    use rust_decimal::Decimal;

    #[test]
    fn return_an_error_on_empty_input() {
        let mut domains = define_domains();

        let parsed = parse("", &mut domains);

        assert!(matches!(parsed, Err(ParseError::UnrecognizedEof { .. })));
    }

    #[test]
    fn return_an_error_on_invalid_input() {
        let mut domains = define_domains();

        let parsed = parse(")(invalid-", &mut domains);

        assert!(parsed.is_err());
    }

    #[test]
    fn return_a_lexical_error_on_an_unknown_character() {
        let mut domains = define_domains();

        let parsed = parse("private $ 1", &mut domains);

        assert_eq!(
            Err(ParseError::User {
                error: ParserError::Lexical(LexicalError::InvalidToken)
            }),
            parsed
        );
    }

    #[test]
    fn can_parse_less_than_expression_with_left_identifier() {
        let mut domains = define_domains();

        let parsed = parse("price < 15", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "price" < 15))),
            parsed
        );
    }

    #[test]
    fn can_parse_less_than_expression_with_right_identifier() {
        let mut domains = define_domains();

        let parsed = parse("15 < price", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "price" > 15))),
            parsed
        );
    }

    #[test]
    fn can_parse_less_than_equal_expression_with_left_identifier() {
        let mut domains = define_domains();

        let parsed = parse("price <= 15", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "price" <= 15))),
            parsed
        );
    }

    #[test]
    fn can_parse_less_than_equal_expression_with_right_identifier() {
        let mut domains = define_domains();

        let parsed = parse("15 <= price", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "price" >= 15))),
            parsed
        );
    }

    #[test]
    fn can_parse_greater_than_expression_with_right_identifier() {
        let mut domains = define_domains();

        let parsed = parse("15 > price", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "price" < 15))),
            parsed
        );
    }

    #[test]
    fn can_parse_greater_than_equal_expression_with_left_identifier() {
        let mut domains = define_domains();

        let parsed = parse("price >= 15", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "price" >= 15))),
            parsed
        );
    }

    #[test]
    fn can_parse_a_float_comparison_with_a_trailing_dot() {
        let mut domains = define_domains();

        let parsed = parse("bidfloor > 6.", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "bidfloor" > Decimal::new(6, 0)))),
            parsed
        );
    }

    #[test]
    fn coerce_an_integer_literal_compared_to_a_float_attribute() {
        let mut domains = define_domains();

        let parsed = parse("bidfloor <= 2", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "bidfloor" <= Decimal::new(2, 0)))),
            parsed
        );
    }

    #[test]
    fn return_an_error_on_a_literal_outside_of_a_bounded_attribute() {
        let mut domains = define_domains();

        let parsed = parse("bounded < 11", &mut domains);

        assert!(matches!(
            parsed,
            Err(ParseError::User {
                error: ParserError::Domain(DomainError::OutOfBound { .. })
            })
        ));
    }

    #[test]
    fn can_parse_equal_expression_with_left_identifier() {
        let mut domains = define_domains();

        let parsed = parse("exchange_id = 1", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "exchange_id" = 1))),
            parsed
        );
    }

    #[test]
    fn can_parse_equal_expression_with_right_identifier() {
        let mut domains = define_domains();

        let parsed = parse("1 = exchange_id", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "exchange_id" = 1))),
            parsed
        );
    }

    #[test]
    fn can_parse_not_equal_expression_on_a_string() {
        let mut domains = define_domains();

        let parsed = parse("country <> 'CA'", &mut domains);

        let ca = resolve(&domains, "country", "CA");
        assert_eq!(
            Ok(value!(predicate!(&domains, "country" <> ca))),
            parsed
        );
    }

    #[test]
    fn encode_string_literals_in_order_of_appearance() {
        let mut domains = define_domains();

        let parsed = parse("country = 'US' or 'CA' = country", &mut domains);

        assert_eq!(
            Ok(or!(
                value!(predicate!(&domains, "country" = ValueId::new(0))),
                value!(predicate!(&domains, "country" = ValueId::new(1)))
            )),
            parsed
        );
        assert_eq!(ValueId::new(1), resolve(&domains, "country", "CA"));
    }

    #[test]
    fn return_an_error_on_a_type_mismatch() {
        let mut domains = define_domains();

        let parsed = parse("private = 'yes'", &mut domains);

        assert_eq!(
            Err(ParseError::User {
                error: ParserError::Domain(DomainError::MismatchingTypes {
                    name: "private".to_owned(),
                    expected: AttributeKind::Boolean,
                    actual: "\"yes\"".to_owned(),
                })
            }),
            parsed
        );
    }

    #[test]
    fn return_an_error_on_an_unknown_attribute() {
        let mut domains = define_domains();

        let parsed = parse("unknown", &mut domains);

        assert_eq!(
            Err(ParseError::User {
                error: ParserError::Domain(DomainError::NonExistingAttribute(
                    "unknown".to_owned()
                ))
            }),
            parsed
        );
    }

    #[test]
    fn can_parse_null_expressions() {
        let cases = [
            ("exchange_id is null", "exchange_id", NullOperator::IsNull),
            ("exchange_id is not null", "exchange_id", NullOperator::IsNotNull),
            ("deals is empty", "deals", NullOperator::IsEmpty),
            ("deals is not empty", "deals", NullOperator::IsNotEmpty),
        ];

        for (expression, name, operator) in cases {
            let mut domains = define_domains();

            let parsed = parse(expression, &mut domains);

            let expected = match operator {
                NullOperator::IsNull => predicate!(&domains, name is null),
                NullOperator::IsNotNull => predicate!(&domains, name is not null),
                NullOperator::IsEmpty => predicate!(&domains, name is empty),
                NullOperator::IsNotEmpty => predicate!(&domains, name is not empty),
            };
            assert_eq!(Ok(value!(expected)), parsed, "{expression}");
        }
    }

    #[test]
    fn can_parse_one_of_list_expression_with_an_integer_list() {
        let mut domains = define_domains();

        let parsed = parse("ids one of [3, 1, 2, 1]", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "ids" one of integers![1, 2, 3]))),
            parsed
        );
    }

    #[test]
    fn can_parse_a_list_in_parenthesis() {
        let mut domains = define_domains();

        let parsed = parse("ids none of (1, 2)", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "ids" none of integers![1, 2]))),
            parsed
        );
    }

    #[test]
    fn can_parse_an_empty_list() {
        let mut domains = define_domains();

        let parsed = parse("deals all of []", &mut domains);

        assert_eq!(
            Ok(value!(predicate!(&domains, "deals" all of ids![]))),
            parsed
        );
    }

    #[test]
    fn can_parse_one_of_list_expression_with_a_string_list() {
        let mut domains = define_domains();

        let parsed = parse(
            r##"deals one of ["deal-1", "deal-2", "deal-3"]"##,
            &mut domains,
        );

        assert_eq!(
            Ok(value!(predicate!(
                &domains,
                "deals" one of ids![
                    resolve(&domains, "deals", "deal-1"),
                    resolve(&domains, "deals", "deal-2"),
                    resolve(&domains, "deals", "deal-3"),
                ]
            ))),
            parsed
        );
    }

    #[test]
    fn return_an_error_on_a_string_list_for_an_integer_list_attribute() {
        let mut domains = define_domains();

        let parsed = parse(r#"ids one of ["1"]"#, &mut domains);

        assert!(matches!(
            parsed,
            Err(ParseError::User {
                error: ParserError::Domain(DomainError::MismatchingTypes { .. })
            })
        ));
    }

    #[test]
    fn can_parse_set_expressions() {
        let mut domains = define_domains();

        let parsed = parse(
            "country in ['US', 'CA'] and exchange_id not in (2, 1)",
            &mut domains,
        );

        let us = resolve(&domains, "country", "US");
        let ca = resolve(&domains, "country", "CA");
        assert_eq!(
            Ok(and!(
                value!(predicate!(&domains, "country" in ids![us, ca])),
                value!(predicate!(&domains, "exchange_id" not in integers![1, 2]))
            )),
            parsed
        );
    }

    #[test]
    fn can_parse_an_integer_enumeration_set() {
        let mut domains = define_domains();

        let parsed = parse("size in [300, 250]", &mut domains);

        let size = domains.by_name("size").unwrap();
        let first = domains.try_resolve(size, RawValue::Integer(300)).unwrap();
        let second = domains.try_resolve(size, RawValue::Integer(250)).unwrap();
        assert_eq!(
            Ok(value!(predicate!(&domains, "size" in ids![first, second]))),
            parsed
        );
    }

    #[test]
    fn can_parse_segment_functions() {
        let mut domains = define_domains();

        let parsed = parse(
            "segment_within(segments, 1, 20) or segment_before(segments, 2, 30)",
            &mut domains,
        );

        let now = domains.clock().unwrap();
        assert_eq!(
            Ok(or!(
                value!(predicate!(
                    &domains,
                    "segments",
                    PredicateKind::Segment(
                        SegmentOperator::Within,
                        crate::predicates::SegmentLiteral {
                            id: 1,
                            seconds: 20,
                            clock: now
                        }
                    )
                )),
                value!(predicate!(
                    &domains,
                    "segments",
                    PredicateKind::Segment(
                        SegmentOperator::Before,
                        crate::predicates::SegmentLiteral {
                            id: 2,
                            seconds: 30,
                            clock: now
                        }
                    )
                ))
            )),
            parsed
        );
    }

    #[test]
    fn can_parse_a_frequency_cap_function() {
        let mut domains = define_domains();

        let parsed = parse(
            r#"not within_frequency_cap(caps, "flight", 10, "ns", 3, 60)"#,
            &mut domains,
        );

        assert!(matches!(
            parsed,
            Ok(Node::Not(ref node)) if matches!(
                node.as_ref(),
                Node::Value(predicate) if matches!(predicate.kind(), PredicateKind::Frequency(..))
            )
        ));
    }

    #[test]
    fn return_an_error_on_an_unknown_frequency_type() {
        let mut domains = define_domains();

        let parsed = parse(
            r#"within_frequency_cap(caps, "hotel", 10, "ns", 3, 60)"#,
            &mut domains,
        );

        assert_eq!(
            Err(ParseError::User {
                error: ParserError::Domain(DomainError::InvalidFrequencyType(
                    "hotel".to_owned()
                ))
            }),
            parsed
        );
    }

    #[test]
    fn return_an_error_on_a_segment_function_without_a_clock() {
        let mut domains =
            DomainRegistry::new(&[AttributeDefinition::segments("segments")]).unwrap();

        let parsed = parse("segment_within(segments, 1, 20)", &mut domains);

        assert_eq!(
            Err(ParseError::User {
                error: ParserError::Domain(DomainError::MissingClock("segments".to_owned()))
            }),
            parsed
        );
    }

    #[test]
    fn can_parse_a_variable() {
        let mut domains = define_domains();

        let parsed = parse("private", &mut domains);

        assert_eq!(Ok(value!(predicate!(&domains, "private"))), parsed);
    }

    #[test]
    fn can_parse_a_negated_variable() {
        let mut domains = define_domains();

        let parsed = parse("not private", &mut domains);
        let other = parse("!private", &mut domains);

        assert_eq!(Ok(not!(value!(predicate!(&domains, "private")))), parsed);
        assert_eq!(parsed, other);
    }

    #[test]
    fn bind_and_tighter_than_or() {
        let mut domains = define_domains();

        let parsed = parse("private or exchange_id = 1 and price < 2", &mut domains);

        assert_eq!(
            Ok(or!(
                value!(predicate!(&domains, "private")),
                and!(
                    value!(predicate!(&domains, "exchange_id" = 1)),
                    value!(predicate!(&domains, "price" < 2))
                )
            )),
            parsed
        );
    }

    #[test]
    fn bind_not_tighter_than_and() {
        let mut domains = define_domains();

        let parsed = parse("not private && price < 2", &mut domains);

        assert_eq!(
            Ok(and!(
                not!(value!(predicate!(&domains, "private"))),
                value!(predicate!(&domains, "price" < 2))
            )),
            parsed
        );
    }

    #[test]
    fn can_parse_an_expression_with_multiple_parenthesis_levels() {
        let mut domains = define_domains();

        let parsed = parse(
            r##"((private and (exchange_id = 1) and (deal_ids one of ["deal-1", "deal-2"])) or (not (private) and (exchange_id = 2)))"##,
            &mut domains,
        );

        assert_eq!(
            Ok(or!(
                and!(
                    and!(
                        value!(predicate!(&domains, "private")),
                        value!(predicate!(&domains, "exchange_id" = 1))
                    ),
                    value!(predicate!(
                        &domains,
                        "deal_ids" one of ids![
                            resolve(&domains, "deal_ids", "deal-1"),
                            resolve(&domains, "deal_ids", "deal-2"),
                        ]
                    ))
                ),
                and!(
                    not!(value!(predicate!(&domains, "private"))),
                    value!(predicate!(&domains, "exchange_id" = 2))
                )
            )),
            parsed
        );
    }

    #[test]
    fn return_an_error_on_a_dangling_operator() {
        let mut domains = define_domains();

        let parsed = parse("private and", &mut domains);

        assert!(matches!(parsed, Err(ParseError::UnrecognizedEof { .. })));
    }

    fn resolve(domains: &DomainRegistry, name: &str, value: &str) -> ValueId {
        let id = domains.by_name(name).unwrap();
        domains.try_resolve(id, RawValue::String(value)).unwrap()
    }

    fn define_domains() -> DomainRegistry {
        let definitions = vec![
            AttributeDefinition::string_list("deals"),
            AttributeDefinition::integer("price"),
            AttributeDefinition::integer("exchange_id"),
            AttributeDefinition::bounded_integer("bounded", 0, 10),
            AttributeDefinition::float("bidfloor"),
            AttributeDefinition::boolean("private"),
            AttributeDefinition::string_list("deal_ids"),
            AttributeDefinition::integer_list("ids"),
            AttributeDefinition::string("country"),
            AttributeDefinition::integer_enum("size"),
            AttributeDefinition::integer("now"),
            AttributeDefinition::segments("segments"),
            AttributeDefinition::frequency_caps("caps"),
        ];
        DomainRegistry::new(&definitions).unwrap()
    }
}
