//! Bean validation integration tests
//!
//! End-to-end behavior of the per-field validator, group parsing and the
//! whole-bean aggregator, driven through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use beanvalidator::validators::engine::{
    ConstraintValidator, ConstraintViolation, MessageInterpolator, ValidationProvider,
    ValidatorFactory,
};
use beanvalidator::validators::{
    parse_validation_groups, BeanMetadata, BundleMessageInterpolator, CandidateValue,
    ClassConstraint, ClassDescriptor, Constraint, ConstraintDescriptor, GroupCache, GroupMarker,
    GroupRegistry, ValidationGroupSet,
};
use beanvalidator::{
    parse_expression, Application, Bean, BeanRef, BeanValidator, Component, ComponentRef,
    EngineError, Error, FacesContext, Lifecycle, Locale, MessageBundle, Settings, UIInput,
    Validator, Value, ViewRoot, WholeBeanValidator, DEFAULT_GROUP,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const STRICT: &str = "com.example.Strict";

fn person_metadata() -> BeanMetadata {
    BeanMetadata::new().with_class(
        "com.example.Person",
        ClassDescriptor::new()
            .property(
                "age",
                [
                    ConstraintDescriptor::new(Constraint::Min(18)),
                    ConstraintDescriptor::new(Constraint::Min(18)).in_groups([GroupMarker::new(STRICT)]),
                ],
            )
            .property(
                "email",
                [ConstraintDescriptor::new(Constraint::Email).in_groups([GroupMarker::new(STRICT)])],
            )
            .property(
                "code",
                [
                    ConstraintDescriptor::new(Constraint::Size { min: 4, max: 8 }),
                    ConstraintDescriptor::new(Constraint::pattern("[0-9]+").unwrap()),
                    ConstraintDescriptor::new(Constraint::pattern("[0-9A-F]+").unwrap())
                        .with_message("must be hexadecimal"),
                    ConstraintDescriptor::new(Constraint::pattern("[0-9a-f]+").unwrap())
                        .with_message("must be hexadecimal"),
                ],
            )
            .class_constraint(
                ConstraintDescriptor::new(ClassConstraint::Ordered {
                    lesser: "age".into(),
                    greater: "code".into(),
                })
                .in_groups([GroupMarker::new("com.example.Unused")]),
            ),
    )
}

fn application(settings: Settings) -> Arc<Application> {
    Application::builder()
        .settings(settings)
        .group(STRICT)
        .metadata(person_metadata())
        .build()
}

fn context(application: Arc<Application>) -> FacesContext {
    FacesContext::new(application)
        .with_view_root(ViewRoot::new("/person.xhtml").with_locale(Locale::english()))
}

fn person() -> BeanRef {
    Bean::from_pairs(
        "com.example.Person",
        [("age", Value::from(30)), ("email", Value::Null), ("code", Value::Null)],
    )
}

fn input(id: &str, label: &str, expression: &str) -> ComponentRef {
    Arc::new(
        UIInput::new(id)
            .with_attribute("label", label)
            .with_value_expression("value", parse_expression(expression).unwrap()),
    )
}

fn failure_messages(result: beanvalidator::Result<()>) -> Vec<String> {
    match result {
        Err(Error::Validator(e)) => e.messages().iter().map(|m| m.detail.clone()).collect(),
        other => panic!("expected a validation failure, got {:?}", other),
    }
}

// ============================================================================
// Group parsing
// ============================================================================

#[test]
fn test_group_normalization() {
    let registry = GroupRegistry::new();
    for source in [None, Some(""), Some(","), Some("  "), Some(", , ,")] {
        let groups = parse_validation_groups(source, &registry).unwrap();
        assert_eq!(groups, ValidationGroupSet::default_only(), "source {:?}", source);
        assert_eq!(groups.markers(), &[GroupMarker::new(DEFAULT_GROUP)]);
    }
}

#[test]
fn test_group_cache_returns_same_instance() {
    let registry = GroupRegistry::with_groups([STRICT]);
    let cache = GroupCache::new();
    let first = cache.get_or_parse(Some(STRICT), &registry).unwrap();
    let second = cache.get_or_parse(Some(STRICT), &registry).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_group_cache_invalidated_by_new_source() {
    let app = application(Settings::new());
    let mut validator = BeanValidator::new().with_validation_groups(STRICT);
    let strict = validator.groups(&app).unwrap();
    assert!(strict.contains(&GroupMarker::new(STRICT)));

    validator.set_validation_groups(Some(DEFAULT_GROUP));
    let default = validator.groups(&app).unwrap();
    assert!(default.is_default_only());

    validator.set_validation_groups(Some(DEFAULT_GROUP));
    assert_eq!(*validator.groups(&app).unwrap(), *default);

    validator.set_validation_groups(None);
    assert!(validator.groups(&app).unwrap().is_default_only());
}

proptest! {
    #[test]
    fn prop_group_parsing_is_deterministic(names in proptest::collection::vec("[a-z]{1,6}(\\.[a-z]{1,6}){0,2}", 0..5)) {
        let registry = GroupRegistry::with_groups(names.iter().map(String::as_str));
        let source = names.join(" , ");
        let first = parse_validation_groups(Some(&source), &registry).unwrap();
        let second = parse_validation_groups(Some(&source), &registry).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(!first.is_empty());
    }

    #[test]
    fn prop_delimiter_only_lists_are_default(source in "[ ,\t]{0,12}") {
        let groups = parse_validation_groups(Some(&source), &GroupRegistry::new()).unwrap();
        prop_assert!(groups.is_default_only());
    }
}

// ============================================================================
// Skips
// ============================================================================

#[derive(Debug, Default)]
struct CountingEngine {
    calls: Arc<AtomicUsize>,
}

impl ConstraintValidator for CountingEngine {
    fn validate_value(
        &self,
        _class: &str,
        _property: &str,
        _value: &Value,
        _groups: &ValidationGroupSet,
    ) -> Result<Vec<ConstraintViolation>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn validate(&self, _bean: &Bean, _groups: &ValidationGroupSet) -> Result<Vec<ConstraintViolation>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[derive(Debug)]
struct CountingFactory {
    calls: Arc<AtomicUsize>,
}

impl ValidatorFactory for CountingFactory {
    fn message_interpolator(&self) -> Arc<dyn MessageInterpolator> {
        Arc::new(BundleMessageInterpolator::new(Arc::new(MessageBundle::builtin())))
    }

    fn validator(&self, _interpolator: Arc<dyn MessageInterpolator>) -> Box<dyn ConstraintValidator> {
        Box::new(CountingEngine {
            calls: Arc::clone(&self.calls),
        })
    }
}

#[derive(Debug, Default)]
struct CountingProvider {
    calls: Arc<AtomicUsize>,
}

impl ValidationProvider for CountingProvider {
    fn build_default_factory(&self) -> Result<Arc<dyn ValidatorFactory>, EngineError> {
        Ok(Arc::new(CountingFactory {
            calls: Arc::clone(&self.calls),
        }))
    }
}

#[test]
fn test_bulk_bases_are_never_validated() {
    let provider = Arc::new(CountingProvider::default());
    let app = Application::builder().provider(provider.clone()).build();
    let mut ctx = context(app);

    let mut map = indexmap::IndexMap::new();
    map.insert("age".to_string(), Value::from(30));
    ctx.set_request_attribute("map", Value::Map(map));
    ctx.set_request_attribute("list", Value::List(vec![Value::from(1)]));
    ctx.set_request_attribute("array", Value::Array(vec![Value::from(1)]));

    for expression in ["#{map.age}", "#{map['age']}", "#{list[0]}", "#{array[0]}"] {
        BeanValidator::new()
            .validate(&mut ctx, &input("f", "F", expression), &Value::from(-1))
            .unwrap();
    }
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

    ctx.set_request_attribute("person", person());
    BeanValidator::new()
        .validate(&mut ctx, &input("f", "F", "#{person.age}"), &Value::from(-1))
        .unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unresolvable_references_are_skipped() {
    let mut ctx = context(application(Settings::new()));
    let validator = BeanValidator::new();

    for expression in ["#{unknown.age}", "#{person}", "literal text"] {
        validator
            .validate(&mut ctx, &input("f", "F", expression), &Value::from(1))
            .unwrap();
    }
    let unbound: ComponentRef = Arc::new(UIInput::new("f"));
    validator.validate(&mut ctx, &unbound, &Value::from(1)).unwrap();
    assert!(ctx.messages().is_empty());
}

// ============================================================================
// Messages
// ============================================================================

#[test]
fn test_single_and_multiple_violations() {
    let mut ctx = context(application(Settings::new()));
    ctx.set_request_attribute("person", person());
    let code = input("form:code", "Code", "#{person.code}");
    let validator = BeanValidator::new();

    let one = failure_messages(validator.validate(&mut ctx, &code, &Value::from("12")));
    assert_eq!(one, vec!["Code: size must be between 4 and 8"]);

    let many = failure_messages(validator.validate(&mut ctx, &code, &Value::from("xyz")));
    assert_eq!(
        many,
        vec![
            "Code: size must be between 4 and 8",
            "Code: must match \"[0-9]+\"",
            "Code: must be hexadecimal",
        ]
    );
}

// ============================================================================
// Whole-bean aggregation
// ============================================================================

#[test]
fn test_whole_bean_gating() {
    let bean = person();
    let cases = [
        (false, Some(STRICT), false),
        (true, None, false),
        (true, Some(DEFAULT_GROUP), false),
        (true, Some(STRICT), true),
    ];
    for (flag, groups, recorded) in cases {
        let mut ctx = context(application(Settings::new().with_enable_whole_bean(flag)));
        ctx.set_request_attribute("person", bean.clone());
        let mut validator = BeanValidator::new();
        validator.set_validation_groups(groups);
        validator
            .validate(&mut ctx, &input("form:age", "Age", "#{person.age}"), &Value::from(21))
            .unwrap();
        assert_eq!(ctx.candidates().is_some(), recorded, "flag {} groups {:?}", flag, groups);
    }
}

#[test]
fn test_aggregation_by_bean_identity() {
    let mut ctx = context(application(Settings::new().with_enable_whole_bean(true)));
    let first = person();
    let second = person();
    ctx.set_request_attribute("first", first.clone());
    ctx.set_request_attribute("second", second.clone());
    let validator = BeanValidator::new().with_validation_groups(STRICT);

    for (id, expression, value) in [
        ("a", "#{first.age}", Value::from(20)),
        ("b", "#{first.email}", Value::from("a@example.com")),
        ("c", "#{second.age}", Value::from(40)),
    ] {
        validator.validate(&mut ctx, &input(id, id, expression), &value).unwrap();
    }

    let candidates = ctx.candidates().unwrap();
    assert_eq!(candidates.len(), 2);
    let entry = candidates.get(&first).unwrap();
    assert_eq!(entry.properties().keys().collect::<Vec<_>>(), vec!["age", "email"]);
    assert_eq!(entry.get("age").unwrap().value, CandidateValue::Value(Value::from(20)));
    assert_eq!(candidates.get(&second).unwrap().len(), 1);
}

#[test]
fn test_failure_sentinel_recorded_before_raise() {
    let mut ctx = context(application(Settings::new().with_enable_whole_bean(true)));
    let bean = person();
    ctx.set_request_attribute("person", bean.clone());

    let result = BeanValidator::new()
        .with_validation_groups(STRICT)
        .validate(&mut ctx, &input("form:age", "Age", "#{person.age}"), &Value::from(3));
    assert!(result.unwrap_err().is_validation_failure());

    let entry = ctx.candidates().unwrap().get(&bean).unwrap();
    assert_eq!(entry.get("age").unwrap().value, CandidateValue::FailedFieldLevelValidation);
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_underage_value_fails_with_label() {
    let mut ctx = context(application(Settings::new()));
    ctx.set_request_attribute("person", person());

    let messages = failure_messages(BeanValidator::new().validate(
        &mut ctx,
        &input("form:age", "Age", "#{person.age}"),
        &Value::from(15),
    ));
    assert_eq!(messages, vec!["Age: must be greater than or equal to 18"]);
}

#[test]
fn test_adult_value_passes() {
    let mut ctx = context(application(Settings::new()));
    ctx.set_request_attribute("person", person());

    BeanValidator::new()
        .validate(&mut ctx, &input("form:age", "Age", "#{person.age}"), &Value::from(21))
        .unwrap();
    assert!(ctx.messages().is_empty());
}

#[test]
fn test_failed_field_blocks_whole_bean_check() {
    let app = application(Settings::new().with_enable_whole_bean(true));
    let bean = person();
    app.put_bean("person", bean.clone());

    let strict = |id: &str, label: &str, expression: &str, value: Value| {
        Arc::new(
            UIInput::new(id)
                .with_attribute("label", label)
                .with_value_expression("value", parse_expression(expression).unwrap())
                .with_submitted_value(value)
                .with_validator(Arc::new(BeanValidator::new().with_validation_groups(STRICT))),
        )
    };
    let inputs = vec![
        strict("form:age", "Age", "#{person.age}", Value::from(21)),
        strict("form:email", "Email", "#{person.email}", Value::from("bad")),
    ];

    let mut ctx = context(app);
    Lifecycle::new()
        .with_whole_bean(WholeBeanValidator::new().with_validation_groups(STRICT))
        .process_validations(&mut ctx, &inputs)
        .unwrap();

    assert!(inputs[0].is_valid());
    assert!(!inputs[1].is_valid());
    assert_eq!(
        ctx.messages_for(Some("form:email"))
            .iter()
            .map(|m| m.detail.as_str())
            .collect::<Vec<_>>(),
        vec!["Email: must be a well-formed email address"]
    );

    let entry = ctx.candidates().unwrap().get(&bean).unwrap();
    assert_eq!(entry.len(), 2);
    assert!(entry.has_failure());
    assert_eq!(ctx.messages().len(), 1);
}

#[test]
fn test_whole_bean_check_runs_when_fields_pass() {
    let metadata = BeanMetadata::new().with_class(
        "com.example.Range",
        ClassDescriptor::new()
            .property("low", [Constraint::Min(0)])
            .property("high", [Constraint::NotNull])
            .class_constraint(
                ConstraintDescriptor::new(ClassConstraint::Ordered {
                    lesser: "low".into(),
                    greater: "high".into(),
                })
                .in_groups([GroupMarker::new(STRICT)]),
            ),
    );
    let app = Application::builder()
        .settings(Settings::new().with_enable_whole_bean(true))
        .group(STRICT)
        .metadata(metadata)
        .build();
    let range = Bean::from_pairs("com.example.Range", [("low", 0), ("high", 100)]);
    app.put_bean("range", range.clone());

    let field = |id: &str, expression: &str, value: i64| {
        Arc::new(
            UIInput::new(id)
                .with_value_expression("value", parse_expression(expression).unwrap())
                .with_submitted_value(value)
                .with_validator(Arc::new(
                    BeanValidator::new().with_validation_groups(&format!("{}, {}", DEFAULT_GROUP, STRICT)),
                )),
        )
    };
    let inputs = vec![field("form:low", "#{range.low}", 50), field("form:high", "#{range.high}", 10)];

    let mut ctx = context(app);
    Lifecycle::new()
        .with_whole_bean(WholeBeanValidator::new().with_validation_groups(STRICT))
        .process_validations(&mut ctx, &inputs)
        .unwrap();

    assert!(ctx.is_validation_failed());
    assert!(!inputs[0].is_valid());
    assert!(inputs[1].is_valid());
    assert_eq!(
        ctx.messages_for(Some("form:low"))[0].detail,
        "form:low: low must not be greater than high"
    );
    assert_eq!(range.get("low"), Some(Value::from(0)));
}
