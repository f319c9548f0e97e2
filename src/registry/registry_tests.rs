use super::*;
use crate::aggregate::{AggregatorFactory, NumericKind};
use crate::ident::SystemId;

fn def(method: Option<AggregationMethod>, category: &str, field: &str) -> ParsedSeriesDefinition {
    ParsedSeriesDefinition {
        aggregation_method: method,
        systems: vec![SystemId::new("ABCD-EFGH", 1)],
        category_name: category.to_string(),
        field_name: field.to_string(),
    }
}

fn person_template() -> CategoryTemplate {
    CategoryTemplate::new(
        "Person",
        vec![Field::new("shoeSize", "ShoeSize", AggregationMethod::Average)
            .with(AggregationMethod::Average, AggregatorFactory::average("ShoeSize"))
            .with(AggregationMethod::Max, AggregatorFactory::max("ShoeSize", NumericKind::Integer))],
    )
}

fn registry() -> TemplateRegistry {
    let mut reg = TemplateRegistry::with_builtin_templates().unwrap();
    reg.register(person_template()).expect("register Person");
    reg
}

#[test]
fn builtin_templates_register_cleanly() {
    let reg = TemplateRegistry::with_builtin_templates().unwrap();
    assert_eq!(reg.template_names(), vec!["GarbageCollection", "Interval", "JVM"]);
    for t in builtin::builtin_templates() {
        t.validate().expect(&t.name);
    }
}

#[test]
fn resolves_default_method() {
    let db = Database::new("ABCD-EFGH");
    let sf = registry().resolve_field(&def(None, "Person.student", "shoeSize"), &db).unwrap();
    assert_eq!(sf.aggregation_method, AggregationMethod::Average);
    assert_eq!(sf.category.template_name, "Person");
    assert_eq!(sf.category.name, "Person.student");
    assert_eq!(sf.field.name, "shoeSize");
    assert_eq!(sf.factory(), &AggregatorFactory::average("ShoeSize"));
}

#[test]
fn explicit_default_equals_omitted_override() {
    let db = Database::new("ABCD-EFGH");
    let reg = registry();
    let implicit = reg.resolve_field(&def(None, "Person.student", "shoeSize"), &db).unwrap();
    let explicit = reg.resolve_field(&def(Some(AggregationMethod::Average), "Person.student", "shoeSize"), &db).unwrap();
    assert_eq!(implicit, explicit);
    // deterministic
    assert_eq!(implicit, reg.resolve_field(&def(None, "Person.student", "shoeSize"), &db).unwrap());
}

#[test]
fn override_selects_factory() {
    let db = Database::new("ABCD-EFGH");
    let sf = registry().resolve_field(&def(Some(AggregationMethod::Max), "Person.student", "shoeSize"), &db).unwrap();
    assert_eq!(sf.factory(), &AggregatorFactory::max("ShoeSize", NumericKind::Integer));
}

#[test]
fn unsupported_override_names_method_and_field() {
    let db = Database::new("ABCD-EFGH");
    let err = registry().resolve_field(&def(Some(AggregationMethod::Sum), "Person.student", "shoeSize"), &db).unwrap_err();
    assert!(matches!(err, AppError::UnsupportedAggregationMethod(_)));
    assert!(err.message().contains("SUM"));
    assert!(err.message().contains("shoeSize"));
}

#[test]
fn missing_template_and_field() {
    let db = Database::new("ABCD-EFGH");
    let reg = registry();
    let err = reg.resolve_field(&def(None, "Animal.dog", "shoeSize"), &db).unwrap_err();
    assert_eq!(err, AppError::template_not_found("Animal"));
    let err = reg.resolve_field(&def(None, "Person.student", "hatSize"), &db).unwrap_err();
    assert_eq!(err.to_string(), "field \"hatSize\" not found in category template \"Person\"");
}

#[test]
fn category_without_dot_is_its_own_template() {
    let db = Database::new("ABCD-EFGH");
    let sf = registry().resolve_field(&def(None, "JVM", "currentThreadCount"), &db).unwrap();
    assert_eq!(sf.category.template_name, "JVM");
    assert_eq!(sf.category.name, "JVM");
    assert!(matches!(Category::parse("Interval..x"), Err(AppError::MalformedDefinition(_))));
    assert!(matches!(Category::parse(".x"), Err(AppError::MalformedDefinition(_))));
}

#[test]
fn gated_fields_disappear_without_changeset() {
    let reg = registry();
    let old = Database::new("ABCD-EFGH");
    let new = Database::new("ABCD-EFGH").with_changesets([builtin::SQL_DURATION_CHANGESET]);

    let err = reg.resolve_field(&def(None, "Interval.WebRequest", "maxSQLDuration"), &old).unwrap_err();
    assert!(matches!(err, AppError::FieldNotFound(_)));
    assert!(reg.resolve_field(&def(None, "Interval.WebRequest", "maxSQLDuration"), &new).is_ok());

    let names = |db: &Database| -> Vec<String> {
        reg.list_fields("Interval", db, false).unwrap().into_iter().map(|f| f.name).collect()
    };
    assert!(!names(&old).contains(&"maxSQLDuration".to_string()));
    assert!(names(&new).contains(&"maxSQLDuration".to_string()));
    // internal fields only when asked for
    assert!(!names(&new).contains(&"durationSum".to_string()));
    assert!(reg.list_fields("Interval", &new, true).unwrap().iter().any(|f| f.name == "sqlDurationSum"));
}

#[test]
fn registration_rejects_bad_templates() {
    let mut reg = TemplateRegistry::new();
    let no_default = CategoryTemplate::new(
        "Broken",
        vec![Field::new("x", "X", AggregationMethod::Natural).with(AggregationMethod::Max, AggregatorFactory::max("X", NumericKind::Integer))],
    );
    assert!(matches!(reg.register(no_default), Err(AppError::Config(_))));

    let dup = CategoryTemplate::new(
        "Dup",
        vec![
            Field::new("x", "X", AggregationMethod::Sum).with(AggregationMethod::Sum, AggregatorFactory::sum("X", NumericKind::Integer)),
            Field::new("x", "X", AggregationMethod::Sum).with(AggregationMethod::Sum, AggregatorFactory::sum("X", NumericKind::Integer)),
        ],
    );
    assert!(matches!(reg.register(dup), Err(AppError::Config(_))));
    assert!(matches!(reg.register(CategoryTemplate::new("A.B", vec![])), Err(AppError::Config(_))));
}

#[test]
fn loads_templates_from_json() {
    let json = r#"[{
        "name": "Cache",
        "fields": [{
            "name": "hitRatio",
            "column": "HitRatio",
            "default_method": "NATURAL",
            "aggregators": {
                "NATURAL": {"kind": "percent", "numerator": "HitCount", "denominator": "TotalCount"},
                "MAX": {"kind": "max", "column": "HitRatio", "numeric": "float"}
            }
        }]
    }]"#;
    let mut reg = TemplateRegistry::new();
    assert_eq!(reg.load_json(json).unwrap(), 1);
    let field = reg.lookup_template("Cache").unwrap().get_field("hitRatio").cloned().unwrap();
    assert!(field.primary);
    assert_eq!(field.supported_methods(), vec![AggregationMethod::Max, AggregationMethod::Natural]);
    assert!(matches!(reg.load_json("{not json"), Err(AppError::Config(_))));
}

#[test]
fn loads_templates_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.json");
    std::fs::write(&path, serde_json::to_string(&vec![person_template()]).unwrap()).unwrap();
    let mut reg = TemplateRegistry::new();
    assert_eq!(reg.load_json_file(&path).unwrap(), 1);
    assert!(reg.lookup_template("Person").is_ok());
    assert!(matches!(reg.load_json_file(&dir.path().join("missing.json")), Err(AppError::Config(_))));
}

#[test]
fn shared_registry_snapshots_are_stable() {
    let shared = SharedTemplateRegistry::new(TemplateRegistry::with_builtin_templates().unwrap());
    let before = shared.snapshot();
    shared.register(person_template()).unwrap();
    assert!(before.lookup_template("Person").is_err());
    assert!(shared.snapshot().lookup_template("Person").is_ok());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let s = shared.clone();
            std::thread::spawn(move || s.snapshot().template_names().len())
        })
        .collect();
    for r in readers {
        assert_eq!(r.join().unwrap(), 4);
    }
}

#[test]
fn aggregation_method_names_are_case_sensitive() {
    assert_eq!("MAX".parse::<AggregationMethod>().unwrap(), AggregationMethod::Max);
    assert_eq!("NATURAL".parse::<AggregationMethod>().unwrap(), AggregationMethod::Natural);
    let err = "max".parse::<AggregationMethod>().unwrap_err();
    assert_eq!(err.to_string(), "invalid aggregation method \"max\"");
}

#[test]
fn provider_registry_routes_by_template() {
    let shared = SharedTemplateRegistry::new(TemplateRegistry::with_builtin_templates().unwrap());
    let mut providers = DataProviderRegistry::new(shared);
    providers.register_provider(Arc::new(MemoryProvider::new("Interval"))).unwrap();
    assert_eq!(providers.provider_for("Interval").unwrap().template_name(), "Interval");
    assert!(matches!(providers.provider_for("JVM"), Err(AppError::TemplateNotFound(_))));
    assert!(matches!(
        providers.register_provider(Arc::new(MemoryProvider::new("Nope"))),
        Err(AppError::TemplateNotFound(_))
    ));
}
