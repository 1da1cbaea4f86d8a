//! The operation model (spec §4.10): a named, self-describing analytical step
//! with a declarative argument schema and an invocation function.

use crate::drover::Drover;
use crate::error::{CoreError, Result};
use std::collections::HashMap;

/// Whether an argument is shown in generated documentation/catalogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgVisibility {
    Show,
    Hide,
}

/// Whether an argument names an input (consumed) or output (produced) artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgFlow {
    Input,
    Output,
    Neither,
}

/// Either a free-form list of examples or an exhaustive, closed option list.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSamples {
    Examples(Vec<String>),
    ExhaustiveOptions(Vec<String>),
}

/// The declarative schema of one operation argument.
#[derive(Debug, Clone)]
pub struct OperationArgDoc {
    pub name: String,
    pub description: String,
    pub default: String,
    pub required: bool,
    pub samples: ArgSamples,
    pub visibility: ArgVisibility,
    pub flow: ArgFlow,
    pub mimetype: Option<String>,
}

impl OperationArgDoc {
    /// Checks `value` against an exhaustive option list, if this argument has one.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] if `value` is not in the option
    /// list.
    pub fn validate(&self, value: &str) -> Result<()> {
        if let ArgSamples::ExhaustiveOptions(options) = &self.samples {
            if !options.iter().any(|o| o == value) {
                return Err(CoreError::InvalidArgument(format!(
                    "'{value}' is not one of the allowed options for '{}': {options:?}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A resolved set of `key=value` arguments for one operation invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationArgPkg {
    values: HashMap<String, String>,
}

impl OperationArgPkg {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parses the text form `Op:k1=v1:k2=v2` (the leading `Op:` name prefix is
    /// optional and, if present, is stripped and returned separately).
    ///
    /// # Errors
    /// Returns [`CoreError::DuplicateParameter`] on a repeated key, or
    /// [`CoreError::UnknownParameter`] if `schema` is given and a key is not
    /// declared by it.
    pub fn parse(text: &str, schema: Option<&[OperationArgDoc]>) -> Result<(Option<String>, Self)> {
        let mut parts = text.split(':');
        let first = parts.next().unwrap_or("");
        let (name, rest): (Option<String>, Vec<&str>) = if first.contains('=') {
            (None, std::iter::once(first).chain(parts).collect())
        } else {
            (Some(first.to_string()), parts.collect())
        };

        let mut values = HashMap::new();
        for kv in rest {
            if kv.is_empty() {
                continue;
            }
            let Some((k, v)) = kv.split_once('=') else {
                return Err(CoreError::InvalidArgument(format!(
                    "malformed key=value fragment: '{kv}'"
                )));
            };
            if values.contains_key(k) {
                return Err(CoreError::DuplicateParameter(k.to_string()));
            }
            if let Some(schema) = schema {
                if !schema.iter().any(|d| d.name == k) {
                    return Err(CoreError::UnknownParameter(k.to_string()));
                }
            }
            values.insert(k.to_string(), v.to_string());
        }
        Ok((name, Self { values }))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

/// A process-wide string-to-string map propagated through all operations for
/// cross-referencing. Conflicts on write append to the existing value.
#[derive(Debug, Clone, Default)]
pub struct InvocationMetadata {
    values: HashMap<String, String>,
}

impl InvocationMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Writes `value` under `key`; a pre-existing value is appended to, not
    /// overwritten.
    pub fn write(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        let key = key.into();
        self.values
            .entry(key)
            .and_modify(|existing| {
                existing.push_str(value.as_ref());
            })
            .or_insert_with(|| value.as_ref().to_string());
    }
}

/// An opaque handle the lexicon collaborator consumes; the core treats it as an
/// inert string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameLex(pub String);

pub type InvocationFn<T> =
    fn(&mut Drover<T>, &OperationArgPkg, &mut InvocationMetadata, &FilenameLex) -> Result<()>;

/// A named operation: argument schema, tags, child-operation packs, and an
/// invocation function. A plain struct rather than a virtual-dispatch base —
/// the container holds one list per payload kind, never an abstract base.
pub struct Operation<T> {
    pub name: String,
    pub aliases: Vec<String>,
    pub args: Vec<OperationArgDoc>,
    pub tags: Vec<String>,
    pub children: Vec<Operation<T>>,
    pub invoke: InvocationFn<T>,
}

impl<T> Operation<T> {
    pub fn matches_name(&self, candidate: &str) -> bool {
        self.name == candidate || self.aliases.iter().any(|a| a == candidate)
    }

    /// Validates `args` against this operation's schema: every required
    /// argument present, every exhaustive-option argument's value in range.
    pub fn validate_args(&self, args: &OperationArgPkg) -> Result<()> {
        for doc in &self.args {
            match args.get(&doc.name) {
                Some(value) => doc.validate(value)?,
                None if doc.required => {
                    return Err(CoreError::InvalidArgument(format!(
                        "missing required argument '{}'",
                        doc.name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    pub fn call(
        &self,
        drover: &mut Drover<T>,
        args: &OperationArgPkg,
        metadata: &mut InvocationMetadata,
        lex: &FilenameLex,
    ) -> Result<()> {
        self.validate_args(args)?;
        (self.invoke)(drover, args, metadata, lex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_key_values() {
        let (name, pkg) = OperationArgPkg::parse("Frobnicate:k1=v1:k2=v2", None).unwrap();
        assert_eq!(name.as_deref(), Some("Frobnicate"));
        assert_eq!(pkg.get("k1"), Some("v1"));
        assert_eq!(pkg.get("k2"), Some("v2"));
    }

    #[test]
    fn duplicate_key_fails() {
        let result = OperationArgPkg::parse("Op:k=1:k=2", None);
        assert_eq!(result.unwrap_err(), CoreError::DuplicateParameter("k".into()));
    }

    #[test]
    fn unknown_key_fails_against_schema() {
        let schema = [OperationArgDoc {
            name: "k1".into(),
            description: String::new(),
            default: String::new(),
            required: false,
            samples: ArgSamples::Examples(vec![]),
            visibility: ArgVisibility::Show,
            flow: ArgFlow::Neither,
            mimetype: None,
        }];
        let result = OperationArgPkg::parse("Op:k2=v", Some(&schema));
        assert_eq!(result.unwrap_err(), CoreError::UnknownParameter("k2".into()));
    }

    #[test]
    fn exhaustive_option_rejects_out_of_range_value() {
        let doc = OperationArgDoc {
            name: "mode".into(),
            description: String::new(),
            default: "a".into(),
            required: true,
            samples: ArgSamples::ExhaustiveOptions(vec!["a".into(), "b".into()]),
            visibility: ArgVisibility::Show,
            flow: ArgFlow::Neither,
            mimetype: None,
        };
        assert!(doc.validate("a").is_ok());
        assert!(doc.validate("z").is_err());
    }

    #[test]
    fn invocation_metadata_appends_on_conflicting_write() {
        let mut meta = InvocationMetadata::default();
        meta.write("Invocation", "first");
        meta.write("Invocation", "-second");
        assert_eq!(meta.get("Invocation"), Some("first-second"));
    }
}
