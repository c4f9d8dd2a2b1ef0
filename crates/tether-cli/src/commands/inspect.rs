//! Inspect command - list what a guest module exports.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use tether_core::{ExportInfo, ImportInfo, ItemKind};

use super::GlobalArgs;
use crate::OutputFormat;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Path to the module (.wasm or .wat)
    #[arg(required = true)]
    pub module: PathBuf,

    /// Show exports
    #[arg(long)]
    pub exports: bool,

    /// Show imports
    #[arg(long)]
    pub imports: bool,

    /// Show memory information
    #[arg(long)]
    pub memory: bool,

    /// Show all information
    #[arg(long, short)]
    pub all: bool,
}

/// Inspection result.
#[derive(Debug, Serialize)]
struct InspectionResult {
    path: String,
    name: Option<String>,
    /// Whether the module provides the memory and allocator exports.
    bridge_ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exports: Option<Vec<ItemDisplay>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    imports: Option<Vec<ItemDisplay>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memories: Option<Vec<MemoryDisplay>>,
}

#[derive(Debug, Serialize)]
struct ItemDisplay {
    name: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

#[derive(Debug, Serialize)]
struct MemoryDisplay {
    name: String,
    min_pages: u64,
    max_pages: Option<u64>,
    memory64: bool,
}

impl ItemDisplay {
    fn new(name: String, kind: &ItemKind) -> Self {
        let (kind_name, signature) = match kind {
            ItemKind::Function { .. } => ("function", Some(kind.to_string())),
            ItemKind::Memory => ("memory", None),
            ItemKind::Global => ("global", None),
            ItemKind::Table => ("table", None),
        };
        Self {
            name,
            kind: kind_name,
            signature,
        }
    }
}

impl From<&ExportInfo> for ItemDisplay {
    fn from(info: &ExportInfo) -> Self {
        Self::new(info.name.clone(), &info.kind)
    }
}

impl From<&ImportInfo> for ItemDisplay {
    fn from(info: &ImportInfo) -> Self {
        Self::new(format!("{}::{}", info.module, info.name), &info.kind)
    }
}

/// Execute the inspect command.
pub fn execute(args: InspectArgs, global: &GlobalArgs) -> Result<()> {
    let runtime = global.runtime()?;
    let names = runtime.bridge_config().export_names();

    let module = runtime
        .load_file(&args.module)
        .context("Failed to load module")?;

    let show_all = args.all || (!args.exports && !args.imports && !args.memory);

    let missing: Vec<String> = [&names.memory, &names.alloc]
        .into_iter()
        .filter(|name| !module.has_export(name))
        .cloned()
        .collect();

    let mut result = InspectionResult {
        path: args.module.display().to_string(),
        name: module.name().map(String::from),
        bridge_ready: missing.is_empty() && module.imports().is_empty(),
        missing,
        exports: None,
        imports: None,
        memories: None,
    };

    if show_all || args.exports {
        result.exports = Some(module.exports().iter().map(ItemDisplay::from).collect());
    }

    if show_all || args.imports {
        result.imports = Some(module.imports().iter().map(ItemDisplay::from).collect());
    }

    if show_all || args.memory {
        result.memories = Some(
            module
                .metadata()
                .memories
                .iter()
                .map(|m| MemoryDisplay {
                    name: m.name.clone(),
                    min_pages: m.min_pages,
                    max_pages: m.max_pages,
                    memory64: m.memory64,
                })
                .collect(),
        );
    }

    match global.format {
        OutputFormat::Human => print_human(&result),
        OutputFormat::Json | OutputFormat::JsonCompact => global.print_json(&result)?,
    }

    Ok(())
}

fn print_human(result: &InspectionResult) {
    println!("Module: {}", result.path);
    if let Some(name) = &result.name {
        println!("Name: {}", name);
    }
    if result.bridge_ready {
        println!("Bridge: ready");
    } else if result.missing.is_empty() {
        println!("Bridge: not ready (module has imports)");
    } else {
        println!("Bridge: not ready (missing {})", result.missing.join(", "));
    }
    println!();

    for (title, items) in [("Exports", &result.exports), ("Imports", &result.imports)] {
        let Some(items) = items else { continue };
        println!("{} ({}):", title, items.len());
        for item in items {
            match &item.signature {
                Some(sig) => println!("  {} [{}]: {}", item.name, item.kind, sig),
                None => println!("  {} [{}]", item.name, item.kind),
            }
        }
        println!();
    }

    if let Some(memories) = &result.memories {
        println!("Memories ({}):", memories.len());
        for memory in memories {
            let max = memory
                .max_pages
                .map(|m| m.to_string())
                .unwrap_or_else(|| "unbounded".to_string());
            let bits = if memory.memory64 { "64-bit" } else { "32-bit" };
            println!("  {} {} - {} pages ({})", memory.name, memory.min_pages, max, bits);
        }
    }
}
