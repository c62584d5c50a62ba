//! Rule resolution.
//!
//! A [`RuleSpecification`] is turned into an ordered [`RuleSet`] by
//! normalizing each item's keys against the directive table, evaluating
//! dynamic values against the request context and flattening lists. Output
//! order is item order, then directive table order within an item, then list
//! order within a directive.
use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;

use crate::core::{
    directive::Directive,
    rule::{DynamicError, RequestContext, ResolvedRule, RuleItem, RuleSet, RuleSpecification, RuleValue},
};

/// Errors raised while resolving a specification
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResolveError {
    /// A dynamic value failed; nothing is returned for the whole specification
    #[error("failed to evaluate {directive} value: {source}")]
    Evaluation {
        directive: Directive,
        #[source]
        source: DynamicError,
    },
}

/// Result type for rule resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Stateless resolver from rule specifications to resolved rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleResolver;

impl RuleResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve every item of `spec` in order. `context` is `None` for
    /// build-time resolution.
    pub async fn resolve(
        &self,
        spec: &RuleSpecification,
        context: Option<&RequestContext>,
    ) -> ResolveResult<RuleSet> {
        self.resolve_items(spec.items(), context).await
    }

    /// Resolve a plain sequence of items, e.g. parsed static file lines.
    pub async fn resolve_items(
        &self,
        items: &[RuleItem],
        context: Option<&RequestContext>,
    ) -> ResolveResult<RuleSet> {
        let mut rules = RuleSet::new();
        for item in items {
            self.resolve_item(item, context, &mut rules).await?;
        }
        Ok(rules)
    }

    async fn resolve_item(
        &self,
        item: &RuleItem,
        context: Option<&RequestContext>,
        rules: &mut RuleSet,
    ) -> ResolveResult<()> {
        // Later keys win when several normalize to the same directive.
        let mut slots: [Option<&RuleValue>; Directive::COUNT] = [None; Directive::COUNT];
        for (key, value) in item.entries() {
            match Directive::from_key(key) {
                Some(directive) => slots[directive.index()] = Some(value),
                None => tracing::trace!(key, "ignoring unrecognized robots key"),
            }
        }

        for directive in Directive::ALL {
            let Some(value) = slots[directive.index()] else {
                continue;
            };
            let mut values = Vec::new();
            evaluate(value, context, &mut values)
                .await
                .map_err(|source| ResolveError::Evaluation { directive, source })?;
            rules.extend(
                values
                    .into_iter()
                    .map(|value| ResolvedRule::new(directive, value)),
            );
        }
        Ok(())
    }
}

/// Evaluate `value` depth-first, appending each resulting literal to `out`.
fn evaluate<'a>(
    value: &'a RuleValue,
    context: Option<&'a RequestContext>,
    out: &'a mut Vec<String>,
) -> BoxFuture<'a, Result<(), DynamicError>> {
    async move {
        match value {
            RuleValue::Literal(literal) => out.push(literal.clone()),
            RuleValue::List(values) => {
                for value in values {
                    evaluate(value, context, out).await?;
                }
            }
            RuleValue::Dynamic(dynamic) => {
                let produced = dynamic.call(context.cloned()).await?;
                evaluate(&produced, context, out).await?;
            }
        }
        Ok(())
    }
    .boxed()
}
