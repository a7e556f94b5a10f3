//! Minimal CLI: parse / inspect / encode / decode IR documents
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use jugsaw_ir::{Native, Value, decode_result, load_app, parse, render};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// inspect JugsawIR documents and application descriptors, encode calls, decode results
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// more diagnostics on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// parse IR documents and print their value trees
    Parse(ParseOut),
    /// list the methods of an application descriptor
    Inspect(InspectOut),
    /// encode a call against a method's demo and print the wire text
    Encode(EncodeOut),
    /// decode result documents and print them as plain JSON
    Decode(DecodeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as one IR document per line
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ParseOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// print re-rendered wire text instead of the readable tree
    #[arg(long)]
    canonical: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    /// application descriptor
    #[arg(long, short)]
    input: PathBuf,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct EncodeOut {
    /// application descriptor
    #[arg(long, short)]
    input: PathBuf,

    /// method to call
    #[arg(long)]
    method: String,

    /// positional arguments as a JSON array
    #[arg(long, default_value = "[]")]
    args: String,

    /// keyword arguments as a JSON object
    #[arg(long, default_value = "{}")]
    kwargs: String,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_process(&self, mut apply: impl FnMut(&str, &str) -> Result<()>) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            debug!(path = %source_path_str, "reading input");
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            if self.ndjson {
                for (lineno, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    apply(&format!("{source_path_str}:{}", lineno + 1), line)?;
                }
            } else {
                apply(&source_path_str, &source)?;
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn init_tracing(&self) {
        let filter = match self.verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Parse(target) => {
                let mut lines = Vec::new();
                target.input_settings.load_process(|origin, text| {
                    let value =
                        parse(text).with_context(|| format!("failed to parse IR ({origin})"))?;
                    lines.push(if target.canonical { render(&value)? } else { value.to_string() });
                    Ok(())
                })?;
                write_output(target.out.as_deref(), &lines.join("\n"))
            }
            Command::Inspect(target) => {
                let source = read_source(&target.input)?;
                let app = load_app(&source).with_context(|| {
                    format!("failed to load descriptor ({})", target.input.display())
                })?;
                info!(app = app.name(), methods = app.methods().len(), "loaded application");

                let mut report = format!("{} ({} method(s))\n", app.name(), app.methods().len());
                for method in app.methods().values() {
                    let args = method.args().iter().map(Value::to_string).collect::<Vec<_>>();
                    let kwargs = method
                        .kwargs()
                        .iter()
                        .map(|(k, v)| format!("{k} = {v}"))
                        .collect::<Vec<_>>();
                    report.push_str(&format!(
                        "\n{}({}; {}) = {}\n",
                        method.fname(),
                        args.join(", "),
                        kwargs.join(", "),
                        method.result()
                    ));
                    if let Some(doc) = method.docstring() {
                        report.push_str(&format!("    {}\n", doc.trim()));
                    }
                }
                write_output(target.out.as_deref(), report.trim_end())
            }
            Command::Encode(target) => {
                let source = read_source(&target.input)?;
                let app = load_app(&source).with_context(|| {
                    format!("failed to load descriptor ({})", target.input.display())
                })?;

                let args = match serde_json::from_str::<serde_json::Value>(&target.args)
                    .context("--args is not valid JSON")?
                {
                    serde_json::Value::Array(xs) => {
                        xs.iter().map(Native::from_json).collect::<Vec<_>>()
                    }
                    other => bail!("--args must be a JSON array, got {other}"),
                };
                let kwargs = match serde_json::from_str::<serde_json::Value>(&target.kwargs)
                    .context("--kwargs is not valid JSON")?
                {
                    serde_json::Value::Object(m) => m
                        .iter()
                        .map(|(k, v)| (k.clone(), Native::from_json(v)))
                        .collect::<IndexMap<_, _>>(),
                    other => bail!("--kwargs must be a JSON object, got {other}"),
                };

                let wire = app
                    .encode_call(&target.method, &args, &kwargs)
                    .with_context(|| format!("failed to encode call to `{}`", target.method))?;
                info!(method = %target.method, bytes = wire.len(), "encoded call");
                write_output(target.out.as_deref(), &wire)
            }
            Command::Decode(target) => {
                let mut lines = Vec::new();
                target.input_settings.load_process(|origin, text| {
                    let native = decode_result(text.as_bytes())
                        .with_context(|| format!("failed to decode result ({origin})"))?;
                    lines.push(serde_json::to_string_pretty(&native.to_json()?)?);
                    Ok(())
                })?;
                write_output(target.out.as_deref(), &lines.join("\n"))
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file ({})", path.display()))
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text)?;
            info!(path = %out.display(), "wrote output");
        }
        None => println!("{text}"),
    }
    Ok(())
}

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

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(anyhow!("glob pattern matched no files: {pattern}"));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
