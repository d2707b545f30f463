//! Command-line inspector for the compiled Jai grammar.
//!
//! Loads the grammar the same way a host runtime would and prints its
//! identity: name, ABI version, table sizes and fingerprint.
#![allow(clippy::multiple_crate_versions)]

use facet::Facet;
use std::process::ExitCode;
use tree_sitter_jai::{GrammarHandle, Language};

/// Command-line arguments.
#[derive(Facet)]
struct Args {
    /// Load a compiled grammar artifact from this path instead of the
    /// embedded one.
    #[facet(named, short = 'a', default)]
    artifact: String,

    /// Print the report as a single JSON object.
    #[facet(named, short = 'j')]
    json: bool,

    /// Also list every node kind.
    #[facet(named, short = 'k')]
    kinds: bool,
}

/// Identity of a loaded grammar.
#[derive(Facet)]
struct Report {
    name: String,
    abi_version: u32,
    node_kind_count: usize,
    field_count: usize,
    fingerprint: String,
    #[facet(skip_serializing_if = Vec::is_empty)]
    kinds: Vec<NodeKind>,
}

/// One row of the node-kind listing.
#[derive(Facet)]
struct NodeKind {
    id: u16,
    kind: String,
    named: bool,
    visible: bool,
}

fn main() -> ExitCode {
    let args: Args = match facet_args::from_std_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let handle = if args.artifact.is_empty() {
        tree_sitter_jai::language()
    } else {
        let source = std::fs::read_to_string(&args.artifact)
            .map_err(|e| format!("cannot read {}: {e}", args.artifact))?;
        // Handles live for the whole process, like the embedded one.
        Box::leak(Box::new(GrammarHandle::load(&source)?))
    };

    let language = Language::new(handle)?;
    let report = build_report(&language, args.kinds);

    if args.json {
        println!("{}", facet_json::to_string(&report));
    } else {
        print_report(&report);
    }
    Ok(())
}

fn build_report(language: &Language, with_kinds: bool) -> Report {
    let kinds = if with_kinds {
        (0..=u16::MAX)
            .map_while(|id| {
                let kind = language.node_kind_for_id(id)?;
                Some(NodeKind {
                    id,
                    kind: kind.to_string(),
                    named: language.node_kind_is_named(id),
                    visible: language.node_kind_is_visible(id),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    Report {
        name: language.name().to_string(),
        abi_version: language.abi_version(),
        node_kind_count: language.node_kind_count(),
        field_count: language.field_count(),
        fingerprint: format!("{:016x}", language.fingerprint()),
        kinds,
    }
}

fn print_report(report: &Report) {
    println!("name:        {}", report.name);
    println!("abi version: {}", report.abi_version);
    println!("node kinds:  {}", report.node_kind_count);
    println!("fields:      {}", report.field_count);
    println!("fingerprint: {}", report.fingerprint);

    for kind in &report.kinds {
        let flavour = match (kind.named, kind.visible) {
            (true, true) => "named",
            (false, true) => "anonymous",
            (_, false) => "hidden",
        };
        println!("{:>5}  {:<10} {}", kind.id, flavour, kind.kind);
    }
}
