//! Minimal CLI: declarations + documents → (check | normalize)
use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::{debug, info};

use typehint_json::{decode, to_text, DecodeError, Node, Schema, TypeDescriptor, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON documents against declared record/enum types, or normalize them
#[derive(Parser, Debug)]
#[command(name = "typehint-json", version)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every document and report which ones fit the root type
    Check(CheckOut),
    /// decode then re-encode every document (defaults filled, unknown keys dropped)
    Normalize(NormalizeOut),
}

#[derive(Args, Debug, Clone)]
struct TypeSettings {
    /// JSON declaration document (enums + records)
    #[arg(long, short)]
    types: PathBuf,

    /// annotation of the expected document type, e.g. `Parent` or `List[Parent]`
    #[arg(long)]
    root: String,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    #[command(flatten)]
    type_settings: TypeSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// encode enum members as their bare value instead of {name, value}
    #[arg(long)]
    flatten_enums: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document and where it came from.
struct Document {
    source: String,
    node: Node,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeSettings {
    fn load(&self) -> Result<TypeDescriptor> {
        let src = std::fs::read_to_string(&self.types)
            .with_context(|| format!("failed to read declarations {}", self.types.display()))?;
        let schema = src
            .parse::<Schema>()
            .with_context(|| format!("invalid declarations {}", self.types.display()))?;
        let descriptor = schema.descriptor(&self.root)?;
        if let TypeDescriptor::Unsupported(reason) = &descriptor {
            bail!("root type `{}` is not supported: {reason}", self.root);
        }
        debug!(root = %descriptor, "root type resolved");
        Ok(descriptor)
    }
}

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        for input in &self.input {
            let paths = if input == "-" {
                vec![None]
            } else {
                resolve_file_path_patterns([input])?.into_iter().map(Some).collect()
            };
            for path in paths {
                let (label, text) = match &path {
                    None => {
                        let mut text = String::new();
                        std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
                        ("<stdin>".to_string(), text)
                    }
                    Some(p) => {
                        let text = std::fs::read_to_string(p)
                            .with_context(|| format!("failed to read source file {}", p.display()))?;
                        (p.to_string_lossy().to_string(), text)
                    }
                };
                self.split(&label, &text, &mut docs)?;
            }
        }
        info!(documents = docs.len(), "inputs loaded");
        Ok(docs)
    }

    fn split(&self, label: &str, text: &str, docs: &mut Vec<Document>) -> Result<()> {
        let mut push = |source: String, body: &str| -> Result<()> {
            let node = serde_json::from_str::<Node>(body)
                .with_context(|| format!("failed to parse JSON ({source})"))?;
            let node = match &self.json_pointer {
                None => node,
                Some(ptr) => node
                    .pointer(ptr)
                    .cloned()
                    .ok_or_else(|| anyhow!("JSON pointer {ptr} selects nothing in {source}"))?,
            };
            docs.push(Document { source, node });
            Ok(())
        };
        if !self.ndjson {
            return push(label.to_string(), text);
        }
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            push(format!("{label}:{}", i + 1), line)?;
        }
        Ok(())
    }
}

fn decode_all(docs: &[Document], descriptor: &TypeDescriptor) -> Vec<Result<Value, DecodeError>> {
    docs.par_iter().map(|doc| decode(&doc.node, descriptor)).collect()
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns whether every document decoded.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => {
                let descriptor = target.type_settings.load()?;
                let docs = target.input_settings.load()?;
                let results = decode_all(&docs, &descriptor);
                let mut failed = 0usize;
                for (doc, result) in docs.iter().zip(&results) {
                    match result {
                        Ok(_) => println!("{} {}", "ok".green(), doc.source),
                        Err(error) => {
                            failed += 1;
                            println!("{} {}: {error}", "failed".red(), doc.source);
                        }
                    }
                }
                info!(total = docs.len(), failed, "check finished");
                Ok(failed == 0)
            }
            Command::Normalize(target) => {
                let descriptor = target.type_settings.load()?;
                let docs = target.input_settings.load()?;
                let results = decode_all(&docs, &descriptor);
                let pretty = !target.input_settings.ndjson;
                let mut out = String::new();
                let mut all_ok = true;
                for (doc, result) in docs.iter().zip(results) {
                    match result {
                        Ok(value) => {
                            out.push_str(&to_text(&value, target.flatten_enums, pretty));
                            out.push('\n');
                        }
                        Err(error) => {
                            all_ok = false;
                            eprintln!("{} {}: {error}", "failed".red(), doc.source);
                        }
                    }
                }
                if let Some(path) = target.out.as_ref() {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, &out)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                } else {
                    print!("{out}");
                }
                Ok(all_ok)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            // an explicit glob that matched nothing is an error
            bail!("glob pattern matched no files: {pattern}");
        }
    }

    Ok(out)
}
