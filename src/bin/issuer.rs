//! End-to-end credential issuance CLI.
//!
//! Loads a registrar export, builds the commitment trees, generates every
//! supported proof, and writes the proof batch to disk.

use std::env;
use std::path::PathBuf;

use verkle_house::{
    build, generate_all, save_proofs, BuildStrategy, InstitutionKey, LocalAnchorer, RecordSet,
    SystemConfig,
};

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn print_help() {
    println!("Usage: issuer build <export.json> [--out <dir>] [--legacy]");
    println!("  build    load a registrar export, commit it, and emit proofs");
    println!("           --out <dir>   output directory (default credential_proofs)");
    println!("           --legacy      one tree over the whole export instead of per term");
}

fn run_build(args: &[String]) {
    let mut input: Option<PathBuf> = None;
    let mut out = PathBuf::from("credential_proofs");
    let mut strategy = BuildStrategy::PerTerm;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => match iter.next() {
                Some(dir) => out = PathBuf::from(dir),
                None => fatal("--out requires a directory"),
            },
            "--legacy" => strategy = BuildStrategy::Legacy,
            other if input.is_none() => input = Some(PathBuf::from(other)),
            other => fatal(&format!("unexpected argument: {other}")),
        }
    }
    let Some(input) = input else {
        fatal("build requires an export file");
    };

    let records = match RecordSet::load(&input) {
        Ok(records) => records,
        Err(err) => fatal(&format!("failed to load {}: {err}", input.display())),
    };

    let config = SystemConfig::default();
    let anchorer = LocalAnchorer::new(InstitutionKey::generate(), &config.network);
    let system = match build(&records, strategy, &config, &anchorer) {
        Ok(system) => system,
        Err(err) => fatal(&format!("tree construction failed: {err}")),
    };

    let documents = generate_all(&records, &system);
    let summary = match save_proofs(&documents, &out) {
        Ok(summary) => summary,
        Err(err) => fatal(&format!("failed to save proofs: {err}")),
    };

    println!("institution:      {}", records.institution());
    println!("students:         {}", records.student_count());
    println!("trees committed:  {}", system.trees.len());
    for tree in &system.trees {
        println!(
            "  {:<20} {} records, root {}",
            tree.metadata.term_id,
            tree.metadata.record_count,
            &tree.root.commitment_hash[..16.min(tree.root.commitment_hash.len())]
        );
    }
    println!("proofs written:   {} -> {}", summary.total_proofs, out.display());
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("build") => run_build(&args[1..]),
        Some("help") | Some("--help") | Some("-h") | None => print_help(),
        Some(other) => fatal(&format!("unknown command: {other}")),
    }
}
