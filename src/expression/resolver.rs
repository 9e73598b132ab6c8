//! Reference resolution for validation
//!
//! Wraps [`ValueExpression::get_reference`] so that callers only ever see a
//! reference or nothing. A missing reference means "skip validation".

use tracing::debug;

use super::{ElContext, ValueExpression, ValueReference};

/// Resolve the `(base, property)` pair behind an expression
///
/// Never fails: evaluation errors and expressions without a reference both
/// yield `None`.
pub fn resolve_reference(
    expression: &dyn ValueExpression,
    context: &dyn ElContext,
) -> Option<ValueReference> {
    match expression.get_reference(context) {
        Ok(Some(reference)) => Some(reference),
        Ok(None) => {
            debug!(expression = expression.expression_string(), "expression has no base, skipping validation");
            None
        }
        Err(e) => {
            debug!(
                expression = expression.expression_string(),
                error = %e,
                "could not resolve expression, skipping validation"
            );
            None
        }
    }
}

/// Check if a resolved reference can be validated as a bean property
///
/// Properties of maps, lists and arrays are not bean properties.
pub fn is_resolvable(reference: &ValueReference, expression: &dyn ValueExpression) -> bool {
    if reference.base.is_bulk() {
        debug!(
            expression = expression.expression_string(),
            base = reference.base_class(),
            "base is a map, list or array, skipping validation"
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parse_expression;
    use crate::value::{Bean, Value};
    use indexmap::IndexMap;

    struct Single(&'static str, Value);

    impl ElContext for Single {
        fn resolve_variable(&self, name: &str) -> Option<Value> {
            (name == self.0).then(|| self.1.clone())
        }
    }

    #[test]
    fn test_resolve_bean_property() {
        let bean = Bean::from_pairs("com.example.Person", [("age", 15)]);
        let ctx = Single("person", Value::Bean(bean.clone()));
        let expr = parse_expression("#{person.age}").unwrap();

        let reference = resolve_reference(&expr, &ctx).unwrap();
        assert_eq!(reference.base, Value::Bean(bean));
        assert_eq!(reference.property, "age");
        assert!(is_resolvable(&reference, &expr));
    }

    #[test]
    fn test_evaluation_error_is_absent() {
        let bean = Bean::from_pairs("com.example.Person", [("age", 15)]);
        let ctx = Single("person", Value::Bean(bean));
        let expr = parse_expression("#{person.address.street}").unwrap();
        assert_eq!(resolve_reference(&expr, &ctx), None);
    }

    #[test]
    fn test_bulk_bases_are_not_resolvable() {
        let expr = parse_expression("#{holder.entry}").unwrap();
        for base in [
            Value::Map(IndexMap::new()),
            Value::List(vec![Value::from(1)]),
            Value::Array(vec![Value::from(1)]),
        ] {
            let reference = ValueReference::new(base, "entry");
            assert!(!is_resolvable(&reference, &expr));
        }
    }
}
