use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use rulec::compile::{self, CompileErrorKind, CompileOptions, CompilerError, Variant};
use rulec::diagnostics;
use rulec::loader;
use rulec_contracts::RULEC_REPORT_SCHEMA_VERSION;

#[derive(Parser)]
#[command(name = "rulec")]
#[command(about = "Validation rule-spec compiler (rule document -> JS).", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum VariantArg {
    Full,
    Minimal,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Full => Variant::Full,
            VariantArg::Minimal => Variant::Minimal,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Compile a rule document into a generated JavaScript module.
    Compile {
        #[arg(long)]
        spec: PathBuf,
        /// Directory of extension fragments (*.rules), concatenated after the
        /// main document in sorted path order.
        #[arg(long)]
        extensions: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = VariantArg::Full)]
        variant: VariantArg,
        /// Keep only tag specs applicable to this format.
        #[arg(long)]
        html_format: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        report_json: bool,
    },
    /// Dump the parsed rule tree as JSON.
    DumpJson {
        #[arg(long)]
        spec: PathBuf,
        #[arg(long)]
        extensions: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct RulecToolReport {
    schema_version: &'static str,
    command: &'static str,
    ok: bool,
    r#in: String,
    diagnostics_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<diagnostics::Diagnostic>,
    exit_code: u8,
}

fn main() -> std::process::ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::ExitCode::from(2)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn diagnostic_for(err: &CompilerError) -> diagnostics::Diagnostic {
    let (code, stage) = match err.kind {
        CompileErrorKind::Parse => ("RULEC-PARSE-0001", diagnostics::Stage::Parse),
        CompileErrorKind::UnresolvedReference => {
            ("RULEC-RESOLVE-0001", diagnostics::Stage::Resolve)
        }
        CompileErrorKind::DuplicateName => ("RULEC-RESOLVE-0002", diagnostics::Stage::Resolve),
        CompileErrorKind::SchemaMismatch => ("RULEC-EMIT-0001", diagnostics::Stage::Emit),
        CompileErrorKind::Internal => ("RULEC-INTERNAL-0001", diagnostics::Stage::Emit),
    };
    diagnostics::Diagnostic::error(code, stage, &err.message)
}

/// Reads the main document plus any `*.rules` extension fragments and builds
/// the effective input.
fn read_effective_input(spec: &Path, extensions: Option<&Path>) -> Result<String> {
    let main = std::fs::read_to_string(spec)
        .with_context(|| format!("read spec: {}", spec.display()))?;
    let mut fragments: Vec<(String, String)> = Vec::new();
    if let Some(dir) = extensions {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("read extensions dir: {}", dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("read extensions dir: {}", dir.display()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("rules") {
                continue;
            }
            let src = std::fs::read_to_string(&path)
                .with_context(|| format!("read extension fragment: {}", path.display()))?;
            fragments.push((path.display().to_string(), src));
        }
    }
    Ok(loader::effective_input(&main, fragments))
}

fn try_main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Compile {
            spec,
            extensions,
            variant,
            html_format,
            out,
            report_json,
        } => {
            let input = read_effective_input(&spec, extensions.as_deref())?;
            let options = CompileOptions {
                variant: variant.into(),
                html_format,
            };
            let generated = match compile::compile_rules_to_js(&input, &options) {
                Ok(generated) => generated,
                Err(err) => {
                    // Compilation is all-or-nothing: no output file is
                    // written on any error.
                    if report_json {
                        let report = RulecToolReport {
                            schema_version: RULEC_REPORT_SCHEMA_VERSION,
                            command: "compile",
                            ok: false,
                            r#in: spec.display().to_string(),
                            diagnostics_count: 1,
                            diagnostics: vec![diagnostic_for(&err)],
                            exit_code: 1,
                        };
                        print_json(&report)?;
                        return Ok(std::process::ExitCode::from(1));
                    }
                    eprintln!("{err}");
                    return Ok(std::process::ExitCode::from(1));
                }
            };
            match &out {
                Some(path) => std::fs::write(path, &generated)
                    .with_context(|| format!("write output: {}", path.display()))?,
                None => print!("{generated}"),
            }
            if report_json {
                let report = RulecToolReport {
                    schema_version: RULEC_REPORT_SCHEMA_VERSION,
                    command: "compile",
                    ok: true,
                    r#in: spec.display().to_string(),
                    diagnostics_count: 0,
                    diagnostics: Vec::new(),
                    exit_code: 0,
                };
                print_json(&report)?;
            }
            Ok(std::process::ExitCode::SUCCESS)
        }
        Cmd::DumpJson { spec, extensions } => {
            let input = read_effective_input(&spec, extensions.as_deref())?;
            match compile::dump_rules_json(&input) {
                Ok(json) => {
                    println!("{json}");
                    Ok(std::process::ExitCode::SUCCESS)
                }
                Err(err) => {
                    eprintln!("{err}");
                    Ok(std::process::ExitCode::from(1))
                }
            }
        }
    }
}
