//! Validators: optional pre-checks run against loaded configuration.

use crate::error::ValidationError;

/// Checks a configuration object for required invariants.
pub trait Validator<T> {
    fn validate(&self, obj: &T) -> Result<(), ValidationError>;
}

type BooleanRule<T> = Box<dyn Fn(&T) -> bool>;
type ComplexRule<T> = Box<dyn Fn(&T) -> Result<(), ValidationError>>;

enum Rule<T> {
    /// Passes when the predicate returns true.
    Boolean { name: String, check: BooleanRule<T> },
    /// Reports its own error.
    Complex { name: String, check: ComplexRule<T> },
}

impl<T> Rule<T> {
    fn evaluate(&self, obj: &T) -> Result<(), ValidationError> {
        match self {
            Rule::Boolean { name, check } => {
                if check(obj) {
                    Ok(())
                } else {
                    Err(ValidationError::for_rule(
                        name.clone(),
                        format!("rule '{name}' failed"),
                    ))
                }
            }
            Rule::Complex { name, check } => check(obj).map_err(|mut err| {
                err.rule.get_or_insert_with(|| name.clone());
                err
            }),
        }
    }
}

/// A validator built from named rules, evaluated in insertion order.
/// The first failing rule is reported.
pub struct RuleBasedValidator<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleBasedValidator<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule that passes when `check` returns true.
    pub fn rule(mut self, name: impl Into<String>, check: impl Fn(&T) -> bool + 'static) -> Self {
        self.rules.push(Rule::Boolean {
            name: name.into(),
            check: Box::new(check),
        });
        self
    }

    /// Add a rule that reports its own error.
    pub fn complex_rule(
        mut self,
        name: impl Into<String>,
        check: impl Fn(&T) -> Result<(), ValidationError> + 'static,
    ) -> Self {
        self.rules.push(Rule::Complex {
            name: name.into(),
            check: Box::new(check),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for RuleBasedValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator<T> for RuleBasedValidator<T> {
    fn validate(&self, obj: &T) -> Result<(), ValidationError> {
        self.rules.iter().try_for_each(|rule| rule.evaluate(obj))
    }
}
