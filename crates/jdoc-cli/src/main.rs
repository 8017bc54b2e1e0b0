use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

use jdoc_core::{Charset, Document, NodeId, ReadOpts, Scalar};

#[derive(Parser, Debug)]
#[command(
    name = "jdoc-cli",
    about = "Inspect and edit JSON-style documents via dotted paths",
    version
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Parse a file and print it
    Dump(DumpArgs),
    /// Print the subtree at a dotted path
    Get(PathArgs),
    /// List children at a dotted path
    List(ListArgs),
    /// Set a value at a dotted path; prints or writes with --out
    Set(SetArgs),
    /// Remove the node at a dotted path; prints or writes with --out
    Remove(RemoveArgs),
}

#[derive(ClapArgs, Debug)]
struct LoadArgs {
    /// File to load
    file: PathBuf,
    /// Character set of the file
    #[arg(long, default_value = "utf-8")]
    encoding: String,
    /// Accept bare unquoted values
    #[arg(long, default_value_t = false)]
    relaxed: bool,
}

#[derive(ClapArgs, Debug)]
struct DumpArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// Emit compact output instead of pretty
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[derive(ClapArgs, Debug)]
struct PathArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// Dotted path, e.g. a.b.2.c
    #[arg(long)]
    at: String,
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// Dotted path; the root when omitted
    #[arg(long, default_value = "")]
    at: String,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// Dotted path, e.g. a.b.2.c
    #[arg(long)]
    at: String,
    /// New value (e.g. 123, true, "str", {"a":1})
    #[arg(long)]
    value: String,
    /// Optional output path to write; otherwise prints to stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct RemoveArgs {
    #[command(flatten)]
    load: LoadArgs,
    /// Dotted path, e.g. a.b.2.c
    #[arg(long)]
    at: String,
    /// Optional output path to write; otherwise prints to stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Dump(a) => cmd_dump(a),
        Cmd::Get(a) => cmd_get(a),
        Cmd::List(a) => cmd_list(a),
        Cmd::Set(a) => cmd_set(a),
        Cmd::Remove(a) => cmd_remove(a),
    }
}

fn load(args: &LoadArgs) -> Document {
    let Some(charset) = Charset::from_label(&args.encoding) else {
        eprintln!("error: unknown encoding: {}", args.encoding);
        std::process::exit(2);
    };
    let opts = ReadOpts { relaxed: args.relaxed };
    match jdoc_core::parse_file(&args.file, charset, &opts) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("error: {}: {}", args.file.display(), e);
            std::process::exit(2);
        }
    }
}

fn resolve(doc: &Document, at: &str) -> NodeId {
    let found = if at.is_empty() {
        Some(doc.root())
    } else {
        doc.get(doc.root(), at)
    };
    match found {
        Some(id) => id,
        None => {
            eprintln!("not found: {at}");
            std::process::exit(3);
        }
    }
}

fn emit(doc: &Document, out: Option<&Path>) {
    let text = jdoc_core::dump_pretty(doc, doc.root());
    match out {
        Some(p) => {
            if let Err(e) = std::fs::write(p, text + "\n") {
                eprintln!("error: {}: {}", p.display(), e);
                std::process::exit(2);
            }
        }
        None => println!("{text}"),
    }
}

fn cmd_dump(args: DumpArgs) {
    let doc = load(&args.load);
    if args.compact {
        println!("{}", jdoc_core::dump(&doc, doc.root()));
    } else {
        println!("{}", jdoc_core::dump_pretty(&doc, doc.root()));
    }
}

fn cmd_get(args: PathArgs) {
    let doc = load(&args.load);
    let id = resolve(&doc, &args.at);
    println!("{}", jdoc_core::dump_pretty(&doc, id));
}

fn cmd_list(args: ListArgs) {
    let doc = load(&args.load);
    let id = resolve(&doc, &args.at);
    for (name, c) in doc.entries(id) {
        let len = doc
            .is_container(c)
            .then(|| format!("\t(len={})", doc.len(c)))
            .unwrap_or_default();
        println!("{}\t{:?}{}", name, doc.kind(c), len);
    }
}

// Scalar literal, or a whole sub-document for values starting with { or [.
fn parse_value(doc: &mut Document, text: &str) -> Option<NodeId> {
    let t = text.trim();
    if t.starts_with('{') || t.starts_with('[') {
        let sub = jdoc_core::parse_str(t, &ReadOpts::default()).ok()?;
        return Some(doc.adopt(&sub, sub.root()));
    }
    let scalar = if t == "null" {
        Scalar::Null
    } else if t == "true" {
        Scalar::Bool(true)
    } else if t == "false" {
        Scalar::Bool(false)
    } else if let Ok(i) = t.parse::<i64>() {
        Scalar::Int(i)
    } else if let Ok(f) = t.parse::<f64>() {
        Scalar::Float(f)
    } else if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') {
        Scalar::Str(jdoc_core::unescape(&t[1..t.len() - 1]))
    } else {
        Scalar::Str(t.to_string())
    };
    Some(doc.alloc(scalar))
}

fn cmd_set(args: SetArgs) {
    let mut doc = load(&args.load);
    let Some(node) = parse_value(&mut doc, &args.value) else {
        eprintln!("error: unreadable value: {}", args.value);
        std::process::exit(2);
    };
    let root = doc.root();
    if doc.set_node(root, &args.at, node).is_err() {
        eprintln!("error: could not set {}", args.at);
        std::process::exit(2);
    }
    emit(&doc, args.out.as_deref());
}

fn cmd_remove(args: RemoveArgs) {
    let mut doc = load(&args.load);
    let root = doc.root();
    if doc.remove(root, &args.at).is_none() {
        eprintln!("not found: {}", args.at);
        std::process::exit(3);
    }
    emit(&doc, args.out.as_deref());
}
