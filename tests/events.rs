use be_tree::{
    AttributeDefinition, AttributeKind, AttributeValue, BETree, Config, Decimal, Event,
    EventError, FrequencyCap, FrequencyType, Segment, ValueId,
};
use serde_json::{json, Value};

fn define_definitions() -> Vec<AttributeDefinition> {
    vec![
        AttributeDefinition::boolean("private"),
        AttributeDefinition::bounded_integer("exchange_id", 0, 100),
        AttributeDefinition::float("bidfloor"),
        AttributeDefinition::string("country"),
        AttributeDefinition::integer_enum("size"),
        AttributeDefinition::integer_list("segment_ids"),
        AttributeDefinition::string_list("deals"),
        AttributeDefinition::integer("now"),
        AttributeDefinition::segments("segments"),
        AttributeDefinition::frequency_caps("caps"),
    ]
}

/// Build an event from a JSON object, the way an event payload would be decoded.
///
/// Segments are `[id, timestamp]` pairs and frequency caps are
/// `[type, id, namespace, timestamp, value]` tuples; `null` leaves an attribute undefined.
fn parse_event(betree: &BETree<u64>, payload: &Value) -> Result<Event, EventError> {
    let mut builder = betree.make_event();
    let Value::Object(attributes) = payload else {
        panic!("events are JSON objects");
    };
    for (name, value) in attributes {
        let kind = betree
            .domains()
            .lookup(name)
            .map_err(|_| EventError::NonExistingAttribute(name.clone()))?
            .kind();
        match (kind, value) {
            (_, Value::Null) => builder.with_undefined(name)?,
            (_, Value::Array(values)) if values.is_empty() => builder.with_empty_list(name)?,
            (AttributeKind::Boolean, Value::Bool(value)) => builder.with_boolean(name, *value)?,
            (AttributeKind::Integer, value) => builder.with_integer(name, as_i64(value))?,
            (AttributeKind::Float, value) => {
                let value = Decimal::try_from(value.as_f64().unwrap()).unwrap();
                builder.with_float(name, value.mantissa() as i64, value.scale())?
            }
            (AttributeKind::String, Value::String(value)) => builder.with_string(name, value)?,
            (AttributeKind::IntegerEnum, value) => builder.with_integer_enum(name, as_i64(value))?,
            (AttributeKind::IntegerList, Value::Array(values)) => {
                let values = values.iter().map(as_i64).collect::<Vec<_>>();
                builder.with_integer_list(name, &values)?
            }
            (AttributeKind::StringList, Value::Array(values)) => {
                let values = values
                    .iter()
                    .map(|value| value.as_str().unwrap())
                    .collect::<Vec<_>>();
                builder.with_string_list(name, &values)?
            }
            (AttributeKind::Segments, Value::Array(values)) => {
                let segments = values
                    .iter()
                    .map(|segment| Segment::new(as_i64(&segment[0]), as_i64(&segment[1])))
                    .collect::<Vec<_>>();
                builder.with_segments(name, &segments)?
            }
            (AttributeKind::FrequencyCaps, Value::Array(values)) => {
                let caps = values
                    .iter()
                    .map(|cap| {
                        FrequencyCap::new(
                            cap[0].as_str().unwrap().parse::<FrequencyType>().unwrap(),
                            as_i64(&cap[1]),
                            cap[2].as_str().unwrap(),
                            as_i64(&cap[4]),
                            cap[3].as_i64(),
                        )
                    })
                    .collect::<Vec<_>>();
                builder.with_frequency_caps(name, &caps)?
            }
            (expected, value) => panic!("{name}: cannot read {value} as {expected:?}"),
        }
    }
    builder.build()
}

fn as_i64(value: &Value) -> i64 {
    value.as_i64().unwrap()
}

fn attribute(betree: &BETree<u64>, event: &Event, name: &str) -> Option<AttributeValue> {
    let id = betree.domains().by_name(name).unwrap();
    event.lookup(id).cloned()
}

#[test]
fn can_read_every_kind_of_value() {
    let betree = BETree::new(Config::default(), &define_definitions()).unwrap();
    let payload = json!({
        "private": true,
        "exchange_id": 23,
        "bidfloor": 1.25,
        "country": "CA",
        "size": 300,
        "segment_ids": [3, 1, 3],
        "deals": ["deal-1"],
        "now": 1_000,
        "segments": [[7, 950], [2, 10]],
        "caps": [["flight", 1, "ns", 900, 3]],
    });

    let event = parse_event(&betree, &payload).unwrap();

    assert_eq!(
        Some(AttributeValue::Boolean(true)),
        attribute(&betree, &event, "private")
    );
    assert_eq!(
        Some(AttributeValue::Integer(23)),
        attribute(&betree, &event, "exchange_id")
    );
    assert_eq!(
        Some(AttributeValue::Float(Decimal::new(125, 2))),
        attribute(&betree, &event, "bidfloor")
    );
    assert_eq!(
        Some(AttributeValue::IntegerList(vec![1, 3])),
        attribute(&betree, &event, "segment_ids")
    );
    assert_eq!(
        Some(AttributeValue::Segments(vec![
            Segment::new(2, 10),
            Segment::new(7, 950)
        ])),
        attribute(&betree, &event, "segments")
    );
    assert_eq!(
        Some(AttributeValue::FrequencyCaps(vec![FrequencyCap::new(
            FrequencyType::Flight,
            1,
            "ns",
            3,
            Some(900)
        )])),
        attribute(&betree, &event, "caps")
    );
}

#[test]
fn keep_unknown_strings_as_invalid_ids() {
    let mut betree = BETree::new(Config::default(), &define_definitions()).unwrap();
    betree.insert(&1, "country = 'CA'").unwrap();

    let event = parse_event(&betree, &json!({"country": "US", "deals": ["deal-1"]})).unwrap();

    assert_eq!(
        Some(AttributeValue::String(ValueId::INVALID)),
        attribute(&betree, &event, "country")
    );
    assert_eq!(
        Some(AttributeValue::StringList(vec![ValueId::INVALID])),
        attribute(&betree, &event, "deals")
    );
}

#[test]
fn leave_null_and_missing_attributes_undefined() {
    let betree = BETree::new(Config::default(), &define_definitions()).unwrap();

    let event = parse_event(&betree, &json!({"private": null, "exchange_id": 2})).unwrap();

    assert_eq!(None, attribute(&betree, &event, "private"));
    assert_eq!(None, attribute(&betree, &event, "country"));
    assert_eq!(
        Some(AttributeValue::Integer(2)),
        attribute(&betree, &event, "exchange_id")
    );
}

#[test]
fn accept_an_empty_list_for_every_list_kind() {
    let betree = BETree::new(Config::default(), &define_definitions()).unwrap();
    let payload = json!({"segment_ids": [], "deals": [], "segments": [], "caps": []});

    let event = parse_event(&betree, &payload).unwrap();

    for name in ["segment_ids", "deals", "segments", "caps"] {
        let value = attribute(&betree, &event, name).unwrap();
        assert!(value.is_empty_list(), "{name}");
    }
}

#[test]
fn return_an_error_on_a_value_outside_of_the_domain() {
    let betree = BETree::new(Config::default(), &define_definitions()).unwrap();

    let result = parse_event(&betree, &json!({"exchange_id": 101}));

    assert!(matches!(result, Err(EventError::OutOfBound { .. })));
}

#[test]
fn return_an_error_on_a_value_of_the_wrong_type() {
    let betree = BETree::<u64>::new(Config::default(), &define_definitions()).unwrap();
    let mut builder = betree.make_event();

    let result = builder.with_string("exchange_id", "1");

    assert_eq!(
        Err(EventError::WrongType {
            name: "exchange_id".to_owned(),
            expected: AttributeKind::Integer,
            actual: AttributeKind::String,
        }),
        result
    );
}

#[test]
fn return_an_error_on_an_unknown_attribute() {
    let betree = BETree::new(Config::default(), &define_definitions()).unwrap();

    let result = parse_event(&betree, &json!({"continent": "NA"}));

    assert_eq!(
        Err(EventError::NonExistingAttribute("continent".to_owned())),
        result.map(|_| ())
    );
}

#[test]
fn match_events_decoded_from_json() {
    let mut betree = BETree::new(Config::default(), &define_definitions()).unwrap();
    betree
        .insert(&1, "exchange_id = 23 and deals one of ['deal-1', 'deal-2']")
        .unwrap();
    betree
        .insert(&2, r#"segment_within(segments, 7, 100) and within_frequency_cap(caps, "flight", 1, "ns", 3, 60)"#)
        .unwrap();
    betree.insert(&3, "bidfloor > 2 or size in [250]").unwrap();
    let payload = json!({
        "exchange_id": 23,
        "bidfloor": 1.25,
        "size": 300,
        "deals": ["deal-2"],
        "now": 1_000,
        "segments": [[7, 950]],
        "caps": [["flight", 1, "ns", 900, 3]],
    });

    let event = parse_event(&betree, &payload).unwrap();
    let report = betree.search(&event).unwrap();

    let mut matches = report.matches().to_vec();
    matches.sort();
    assert_eq!(vec![&1, &2], matches);
}
