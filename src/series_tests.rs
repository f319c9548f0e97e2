use super::*;
use crate::groups::StaticGroupMembership;
use crate::ident::{Database, GroupId};

fn fixture() -> (Database, StaticGroupMembership) {
    let db = Database::new("GRSK-VRTS");
    let groups = StaticGroupMembership::new()
        .with_group(GroupId::new("GRSK-VRTS", 1), vec![SystemId::new("GRSK-VRTS", 1), SystemId::new("GRSK-VRTS", 5)]);
    (db, groups)
}

fn parse(text: &str) -> AppResult<Vec<ParsedSeriesDefinition>> {
    let (db, groups) = fixture();
    let mapper = SystemToGroupMapper::new(&db, &groups);
    SeriesDefinitionParser::new(&mapper).parse(text)
}

fn sys(n: i64) -> SystemId {
    SystemId::new("GRSK-VRTS", n)
}

#[test]
fn parses_single_series_with_override() {
    let defs = parse("MAX~GRSK-VRTS.1~Person.student~shoeSize").unwrap();
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].aggregation_method, Some(AggregationMethod::Max));
    assert_eq!(defs[0].systems, vec![sys(1)]);
    assert_eq!(defs[0].category_name, "Person.student");
    assert_eq!(defs[0].field_name, "shoeSize");
}

#[test]
fn parses_composite_without_override() {
    let defs = parse("GRSK-VRTS.1~GRSK-VRTS.2~Interval.WebRequest.search~avgDuration").unwrap();
    assert_eq!(defs[0].aggregation_method, None);
    assert_eq!(defs[0].systems, vec![sys(1), sys(2)]);
    assert_eq!(defs[0].category_name, "Interval.WebRequest.search");
}

#[test]
fn one_definition_per_clause() {
    let defs = parse(" GRSK-VRTS.1~JVM~currentThreadCount _ SUM~GRSK-VRTS.2~Interval.A~totalHits ").unwrap();
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[1].aggregation_method, Some(AggregationMethod::Sum));
    assert_eq!(defs[1].field_name, "totalHits");
}

#[test]
fn groups_expand_and_deduplicate() {
    let defs = parse("GRSK-VRTS.5~GRSK-VRTS.GROUP.1~GRSK-VRTS.1~JVM~currentThreadCount").unwrap();
    assert_eq!(defs[0].systems, vec![sys(5), sys(1)]);
}

#[test]
fn display_round_trips_through_expansion() {
    let first = parse("NATURAL~GRSK-VRTS.GROUP.1~GRSK-VRTS.5~Interval.A~avgDuration").unwrap().remove(0);
    let text = first.to_string();
    assert_eq!(text, "NATURAL~GRSK-VRTS.1~GRSK-VRTS.5~Interval.A~avgDuration");
    assert_eq!(parse(&text).unwrap().remove(0), first);
}

#[test]
fn blank_input_is_always_the_same_error() {
    for blank in ["", "  ", "__", "  _  _  "] {
        let err = parse(blank).unwrap_err();
        assert_eq!(err, AppError::empty_definition(), "{blank:?}");
        assert_eq!(err.to_string(), "must provide a series definition");
    }
    let (db, groups) = fixture();
    let mapper = SystemToGroupMapper::new(&db, &groups);
    assert_eq!(SeriesDefinitionParser::new(&mapper).parse_opt(None).unwrap_err(), AppError::empty_definition());
}

#[test]
fn too_few_tokens_is_malformed() {
    for bad in ["GRSK-VRTS.1~shoeSize", "MAX~GRSK-VRTS.1~Person", "Person.student~shoeSize", "GRSK-VRTS.1~~"] {
        let err = parse(bad).unwrap_err();
        assert!(matches!(err, AppError::MalformedDefinition(_)), "{bad}: {err:?}");
    }
}

#[test]
fn unknown_override_is_rejected() {
    for bad in ["BIGGEST~GRSK-VRTS.1~Person.student~shoeSize", "max~GRSK-VRTS.1~Person.student~shoeSize"] {
        let err = parse(bad).unwrap_err();
        assert!(matches!(err, AppError::InvalidAggregationMethod(_)), "{bad}");
    }
}

#[test]
fn identifiers_are_validated() {
    assert!(matches!(parse("GRSK.1~Person.student~shoeSize"), Err(AppError::InvalidIdentifier(_))));
    assert!(matches!(parse("ABCD-EFGH.1~Person.student~shoeSize"), Err(AppError::ScopeMismatch(_))));
    assert!(matches!(parse("GRSK-VRTS.GROUP.9~Person.student~shoeSize"), Err(AppError::MalformedDefinition(_))));
}
