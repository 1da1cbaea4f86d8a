//! Sequential operation dispatch over a [`Drover`], with `start-children` /
//! `stop-children` scope bracketing (spec §4.11).

use crate::drover::Drover;
use crate::error::{CoreError, Result};
use crate::operation::{FilenameLex, InvocationMetadata, Operation, OperationArgPkg};

/// One step of a pipeline: either an ordinary operation invocation, or a scope
/// bracket that groups the steps between a pair into a child invocation.
pub enum Step {
    Invoke {
        name: String,
        args: OperationArgPkg,
    },
    StartChildren,
    StopChildren,
}

/// Checks that `steps`' `start-children`/`stop-children` markers balance,
/// without dispatching anything.
///
/// # Errors
/// Returns [`CoreError::InvalidScope`] on a `stop-children` with no matching
/// `start-children`, or on unclosed `start-children` bracket(s) at the end.
fn check_scope_balance(steps: &[Step]) -> Result<()> {
    let mut depth: i64 = 0;
    for step in steps {
        match step {
            Step::StartChildren => depth += 1,
            Step::StopChildren => {
                depth -= 1;
                if depth < 0 {
                    return Err(CoreError::InvalidScope(
                        "stop-children without a matching start-children".into(),
                    ));
                }
            }
            Step::Invoke { .. } => {}
        }
    }
    if depth != 0 {
        return Err(CoreError::InvalidScope(format!(
            "{depth} unmatched start-children bracket(s)"
        )));
    }
    Ok(())
}

/// Runs `steps` against `drover` in order, looking operations up in `catalogue`
/// by name/alias. `start-children`/`stop-children` must balance across the
/// whole sequence; an unmatched bracket is reported as
/// [`CoreError::InvalidScope`] before any operation is dispatched. Execution
/// then aborts at the first failing operation.
pub fn run<T>(
    drover: &mut Drover<T>,
    catalogue: &[Operation<T>],
    steps: &[Step],
    metadata: &mut InvocationMetadata,
    lex: &FilenameLex,
) -> Result<()> {
    check_scope_balance(steps)?;

    let mut depth: i64 = 0;
    for step in steps {
        match step {
            Step::StartChildren => depth += 1,
            Step::StopChildren => depth -= 1,
            Step::Invoke { name, args } => {
                tracing::debug!(operation = name.as_str(), depth, "dispatching");
                let op = catalogue
                    .iter()
                    .find(|op| op.matches_name(name))
                    .ok_or_else(|| CoreError::NoMatch(format!("no operation named '{name}'")))?;
                op.call(drover, args, metadata, lex)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ArgFlow, ArgSamples, ArgVisibility};

    fn noop_op(name: &str) -> Operation<f64> {
        Operation {
            name: name.to_string(),
            aliases: vec![],
            args: vec![],
            tags: vec![],
            children: vec![],
            invoke: |_drover, _args, meta, _lex| {
                meta.write("ran", name_marker());
                Ok(())
            },
        }
    }

    fn name_marker() -> &'static str {
        "x"
    }

    #[test]
    fn runs_steps_in_order_and_aborts_on_failure() {
        let mut drover: Drover<f64> = Drover::new();
        let failing = Operation {
            name: "Fail".to_string(),
            aliases: vec![],
            args: vec![OperationArgDocHelper::required("must_have")],
            tags: vec![],
            children: vec![],
            invoke: |_d, _a, _m, _l| Ok(()),
        };
        let catalogue = vec![noop_op("A"), failing];
        let steps = vec![
            Step::Invoke { name: "A".into(), args: OperationArgPkg::default() },
            Step::Invoke { name: "Fail".into(), args: OperationArgPkg::default() },
        ];
        let mut meta = InvocationMetadata::default();
        let lex = FilenameLex::default();
        let result = run(&mut drover, &catalogue, &steps, &mut meta, &lex);
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn unmatched_stop_children_is_invalid_scope() {
        let mut drover: Drover<f64> = Drover::new();
        let catalogue: Vec<Operation<f64>> = vec![];
        let steps = vec![Step::StopChildren];
        let mut meta = InvocationMetadata::default();
        let lex = FilenameLex::default();
        let result = run(&mut drover, &catalogue, &steps, &mut meta, &lex);
        assert!(matches!(result, Err(CoreError::InvalidScope(_))));
    }

    #[test]
    fn unclosed_start_children_is_invalid_scope() {
        let mut drover: Drover<f64> = Drover::new();
        let catalogue = vec![noop_op("A")];
        let steps = vec![
            Step::StartChildren,
            Step::Invoke { name: "A".into(), args: OperationArgPkg::default() },
        ];
        let mut meta = InvocationMetadata::default();
        let lex = FilenameLex::default();
        let result = run(&mut drover, &catalogue, &steps, &mut meta, &lex);
        assert!(matches!(result, Err(CoreError::InvalidScope(_))));
    }

    struct OperationArgDocHelper;
    impl OperationArgDocHelper {
        fn required(name: &str) -> crate::operation::OperationArgDoc {
            crate::operation::OperationArgDoc {
                name: name.to_string(),
                description: String::new(),
                default: String::new(),
                required: true,
                samples: ArgSamples::Examples(vec![]),
                visibility: ArgVisibility::Show,
                flow: ArgFlow::Neither,
                mimetype: None,
            }
        }
    }
}
