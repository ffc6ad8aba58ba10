use be_tree::{AttributeDefinition, BETree, Config, Segment};
use std::collections::HashMap;

const FIRST_EXPRESSION: &str = r#"exchange_id = 1 and deal_ids one of ['deal-1', 'deal-2'] and segment_ids one of [1, 2, 3] and country in ['FR', 'GB']"#;
const SECOND_EXPRESSION: &str = r#"(exchange_id = 1 and deal_ids one of ['deal-1', 'deal-2']) and segment_ids one of [1, 2, 3] and ((country = 'CA' and city in ['QC']) or (country = 'US' and city in ['AZ']))"#;
const THIRD_EXPRESSION: &str = r#"(exchange_id = 1 and deal_ids one of ['deal-1', 'deal-2']) and segment_ids one of [1, 2, 3] and ((country = 'CA' and city in ['QC']) or (country = 'US'))"#;
const FOURTH_EXPRESSION: &str =
    r#"exchange_id = 1 and deal_ids one of ['deal-1', 'deal-2'] and segment_ids one of [1, 2, 3]"#;
const FIFTH_EXPRESSION: &str = r#"exchange_id > 2 and segment_within(segments, 7, 3600)"#;

fn main() {
    // Create the index
    let attributes = [
        AttributeDefinition::bounded_integer("exchange_id", 0, 10),
        AttributeDefinition::string_list("deal_ids"),
        AttributeDefinition::integer_list("segment_ids"),
        AttributeDefinition::string("country"),
        AttributeDefinition::string("city"),
        AttributeDefinition::integer("now"),
        AttributeDefinition::segments("segments"),
    ];
    let config = Config::default().with_leaf_capacity(2);
    let mut betree = BETree::new(config, &attributes).unwrap();

    // Insert the boolean expressions
    let expressions_by_ids = [
        (1, FIRST_EXPRESSION),
        (2, SECOND_EXPRESSION),
        (3, THIRD_EXPRESSION),
        (4, FOURTH_EXPRESSION),
        (5, FIFTH_EXPRESSION),
    ];
    let mappings: HashMap<u64, &str> = HashMap::from_iter(expressions_by_ids);
    for (id, expression) in &expressions_by_ids {
        betree.insert(id, expression).unwrap();
    }

    // Create the matching event
    let mut builder = betree.make_event();
    builder.with_integer("exchange_id", 1).unwrap();
    builder
        .with_string_list("deal_ids", &["deal-3", "deal-1"])
        .unwrap();
    builder
        .with_integer_list("segment_ids", &[3, 4, 5])
        .unwrap();
    builder.with_string("country", "US").unwrap();
    builder.with_string("city", "AZ").unwrap();
    builder.with_integer("now", 10_000).unwrap();
    builder
        .with_segments("segments", &[Segment::new(7, 9_000)])
        .unwrap();
    let event = builder.build().unwrap();

    // Search the index for matching expressions
    let report = betree.search(&event).unwrap();
    println!(
        "Evaluated {} expression(s), {} matched",
        report.evaluated(),
        report.matched()
    );
    report.matches().iter().for_each(|id| {
        println!(r#"Found ID: {id}, Expression: "{}""#, mappings[id]);
    });

    println!("{}", betree.to_graphviz());
}
