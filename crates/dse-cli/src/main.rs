//! dse - Design-system editor command line

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use dse_css::{Layer, breadcrumb, specificity};
use dse_engine::{Config, Session};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: dse [--config <file.json>] <command> <file.css> [args]
       dse --version

commands:
  tokens                                   list design tokens as JSON
  rules [layer]                            list rules as JSON, optionally one layer
  inspect <class>...                       matched rules in cascade order
  set-token <name> <value> [--out <path>]  edit a token, print or write the result
  set-prop <selector> <property> <value> [--out <path>]
                                           edit a rule property
  summary                                  counts per layer and scope";

/// What the command line asks for
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Run(Args),
    Help,
    Version,
}

/// Parsed command line
#[derive(Debug, PartialEq, Eq)]
struct Args {
    command: String,
    file: PathBuf,
    rest: Vec<String>,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut out = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(args.next().context("--config needs a path")?.into()),
            "--out" => out = Some(args.next().context("--out needs a path")?.into()),
            "-h" | "--help" => return Ok(Invocation::Help),
            "-V" | "--version" => return Ok(Invocation::Version),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = positional.next().with_context(|| format!("missing command\n\n{USAGE}"))?;
    let file = positional
        .next()
        .with_context(|| format!("missing stylesheet path\n\n{USAGE}"))?
        .into();

    Ok(Invocation::Run(Args {
        command,
        file,
        rest: positional.collect(),
        config,
        out,
    }))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match parse_args(std::env::args().skip(1))? {
        Invocation::Run(args) => run(args),
        Invocation::Help => {
            println!("{USAGE}");
            Ok(())
        }
        Invocation::Version => {
            println!("dse {}", dse_engine::VERSION);
            Ok(())
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    let css = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading stylesheet {}", args.file.display()))?;

    let mut session = Session::new(config);
    session.load(&css);

    match (args.command.as_str(), args.rest.as_slice()) {
        ("tokens", []) => print_json(&session.model().tokens),
        ("rules", []) => print_json(&session.model().rules),
        ("rules", [layer]) => {
            let layer = Layer::ALL
                .into_iter()
                .find(|l| l.as_str() == layer.as_str())
                .with_context(|| format!("unknown layer `{layer}`"))?;
            let rules: Vec<_> = session.model().rules_in_layer(layer).collect();
            print_json(&rules)
        }
        ("inspect", classes) if !classes.is_empty() => inspect(&session, classes),
        ("set-token", [name, value]) => {
            session.edit_token(name, value)?;
            write_output(&session, args.out)
        }
        ("set-prop", [selector, property, value]) => {
            session.edit_property(selector, property, value)?;
            write_output(&session, args.out)
        }
        ("summary", []) => {
            summary(&session);
            Ok(())
        }
        _ => bail!("bad arguments for `{}`\n\n{USAGE}", args.command),
    }
}

fn inspect(session: &Session, classes: &[String]) -> Result<()> {
    let Some(selection) = session.select(classes) else {
        bail!("no classes given");
    };
    let rules: Vec<_> = selection
        .matched_rules
        .iter()
        .map(|rule| {
            json!({
                "breadcrumb": breadcrumb(rule),
                "specificity": specificity(&rule.selector),
                "properties": rule.properties,
            })
        })
        .collect();
    print_json(&json!({ "classes": selection.classes, "rules": rules }))
}

fn summary(session: &Session) {
    let model = session.model();
    println!("{} tokens, {} rules, {} properties", model.tokens.len(), model.rules.len(), model.property_count());
    for layer in Layer::ALL {
        println!("  layer {:<11} {} rules", layer.as_str(), model.layers.bucket(layer).len());
    }
    for label in model.scope_labels() {
        if let Some(bucket) = model.scope(label) {
            println!("  scope {:<11} {} tokens, {} rules", label, bucket.tokens.len(), bucket.rules.len());
        }
    }
}

fn write_output(session: &Session, out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, session.text()).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => print!("{}", session.text()),
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
