//! Call command - invoke a guest export with marshaled arguments.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;

use tether::prelude::*;
use tether_core::ItemKind;

use super::GlobalArgs;
use crate::OutputFormat;

/// Arguments for the call command.
#[derive(Args)]
pub struct CallArgs {
    /// Path to the module (.wasm or .wat)
    #[arg(required = true)]
    pub module: PathBuf,

    /// Exported function to call
    #[arg(required = true)]
    pub function: String,

    /// Signature, e.g. "&str, bool -> bool" (default: the export's own
    /// integer signature)
    #[arg(short, long)]
    pub sig: Option<String>,

    /// Arguments, one per parameter; arrays are comma separated
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CallResult<'a> {
    function: &'a str,
    signature: String,
    direct: bool,
    result: &'a Value,
}

/// Execute the call command.
pub fn execute(args: CallArgs, global: &GlobalArgs) -> Result<()> {
    let runtime = global.runtime()?;
    let module = runtime
        .load_file(&args.module)
        .context("Failed to load module")?;

    let signature = match &args.sig {
        Some(text) => Signature::parse_str(runtime.registry(), text)
            .with_context(|| format!("Invalid signature '{}'", text))?,
        None => integer_signature(&module, &args.function)?,
    };

    if args.args.len() != signature.args.len() {
        return Err(MarshalError::ArityMismatch {
            function: args.function.clone(),
            expected: signature.args.len(),
            actual: args.args.len(),
        }
        .into());
    }
    let values = signature
        .args
        .iter()
        .zip(&args.args)
        .enumerate()
        .map(|(i, (tag, text))| {
            Value::parse_as(*tag, text).with_context(|| format!("Argument {} ('{}')", i + 1, text))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut bridge = runtime
        .instantiate(&module)
        .context("Failed to instantiate module")?;
    let function = bridge.wrap_signature(&args.function, signature)?;

    tracing::info!(
        module = %args.module.display(),
        function = %args.function,
        signature = %function.signature(),
        "Calling export"
    );

    let value = bridge
        .call_wrapped(&function, &values)
        .with_context(|| format!("Call to '{}' failed", args.function))?;

    match global.format {
        OutputFormat::Human => {
            if !global.quiet {
                println!("{} {}", args.function, function.signature());
            }
            println!("{}", value);
        }
        OutputFormat::Json | OutputFormat::JsonCompact => {
            global.print_json(&CallResult {
                function: &args.function,
                signature: function.signature().to_string(),
                direct: function.is_direct(),
                result: &value,
            })?;
        }
    }

    Ok(())
}

/// Derive a signature from the export's core type when it only uses `i32`.
fn integer_signature(module: &ValidatedModule, name: &str) -> Result<Signature> {
    let Some(export) = module.export(name) else {
        bail!(MarshalError::MissingExport(name.to_string()));
    };
    let ItemKind::Function { params, results } = &export.kind else {
        bail!("'{}' is not a function", name);
    };

    let is_i32 = |ty: &String| ty == "i32";
    if !params.iter().all(is_i32) || results.len() > 1 || !results.iter().all(is_i32) {
        bail!(
            "'{}' has type {}; pass --sig to describe how to marshal it",
            name,
            export.kind
        );
    }

    let ret = if results.is_empty() {
        TypeTag::Unit
    } else {
        TypeTag::I32
    };
    Ok(Signature::new(vec![TypeTag::I32; params.len()], ret))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(wat: &str) -> ValidatedModule {
        Tether::with_defaults().unwrap().load_wat(wat).unwrap()
    }

    #[test]
    fn test_integer_signature() {
        let module = module(
            r#"
            (module
                (func (export "add") (param i32 i32) (result i32) (i32.const 42))
                (func (export "tick") (param i32))
                (func (export "wide") (param i64))
                (memory (export "memory") 1))
        "#,
        );

        let add = integer_signature(&module, "add").unwrap();
        assert_eq!(add.to_string(), "(i32, i32) -> i32");
        assert_eq!(integer_signature(&module, "tick").unwrap().ret, TypeTag::Unit);

        assert!(integer_signature(&module, "wide").is_err());
        assert!(integer_signature(&module, "memory").is_err());
        assert!(integer_signature(&module, "missing").is_err());
    }
}
