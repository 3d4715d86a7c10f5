//! mtvcli - fuzzy pattern queries from the command line
//!
//! Subcommands:
//! - `mtvcli write <notes>` - turn a note list into pattern DSL text
//! - `mtvcli compile <pattern>` - compile pattern DSL to query text
//! - `mtvcli score --query <file> --rows <file>` - score result rows

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use motive::{
    compile_dsl, emit::render_dsl, parse_note_list, score_rows, Aggregation, EmitOptions,
    FactSchema, Projection, Row, ToleranceSpec,
};

mod render;

#[derive(Parser)]
#[command(name = "mtvcli")]
#[command(about = "Compile and score fuzzy pattern queries over music corpora")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a note list out as pattern DSL text
    Write {
        /// Note list, e.g. "[(c#/5, 8, n), (d/5, 8, n)]"
        notes: String,

        /// Pitch tolerance in semitones
        #[arg(long, default_value = "0")]
        pitch: f64,

        /// Duration tolerance in whole-note units
        #[arg(long, default_value = "0")]
        duration: f64,

        /// Gap tolerance in whole-note units
        #[arg(long, default_value = "0")]
        gap: f64,

        /// Minimum acceptable score, in [0, 1]
        #[arg(long, default_value = "0")]
        alpha: f64,

        /// Match the pattern at any transposition
        #[arg(long)]
        transposition: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile pattern DSL to executable query text
    Compile {
        /// Pattern DSL text; omit to read --file
        pattern: Option<String>,

        /// Read the pattern from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Target a frequency-native corpus schema
        #[arg(long)]
        frequency: bool,

        /// Project only event identifiers (not scoreable)
        #[arg(long)]
        identifiers: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score datastore result rows against the pattern that produced them
    Score {
        /// Pattern DSL file the rows were compiled from
        #[arg(short, long)]
        query: PathBuf,

        /// JSON file holding an array of result rows
        #[arg(short, long)]
        rows: PathBuf,

        /// How per-note memberships aggregate into one score
        #[arg(long, value_enum, default_value = "min")]
        aggregation: AggregationArg,

        /// Emit candidates as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Target a frequency-native corpus schema
        #[arg(long)]
        frequency: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AggregationArg {
    Min,
    Mean,
}

impl From<AggregationArg> for Aggregation {
    fn from(arg: AggregationArg) -> Aggregation {
        match arg {
            AggregationArg::Min => Aggregation::Min,
            AggregationArg::Mean => Aggregation::Mean,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Write {
            notes,
            pitch,
            duration,
            gap,
            alpha,
            transposition,
            output,
        } => {
            let template = parse_note_list(&notes)?;
            let spec = ToleranceSpec {
                pitch,
                duration,
                gap,
                alpha,
                allow_transposition: transposition,
            };
            spec.validate()?;
            info!(slots = template.len(), "rendered note list as pattern text");
            deliver(&render_dsl(&template, &spec), output.as_deref())
        }
        Commands::Compile {
            pattern,
            file,
            frequency,
            identifiers,
            output,
        } => {
            let text = read_pattern(pattern, file)?;
            let options = emit_options(frequency, identifiers);
            let compiled = compile_dsl(&text, options)?;
            info!(chars = compiled.text().len(), "compiled pattern to query text");
            deliver(compiled.text(), output.as_deref())
        }
        Commands::Score {
            query,
            rows,
            aggregation,
            json,
            frequency,
        } => {
            let dsl = fs::read_to_string(&query)
                .with_context(|| format!("reading pattern from {}", query.display()))?;
            let compiled = compile_dsl(&dsl, emit_options(frequency, false))?;

            let raw = fs::read_to_string(&rows)
                .with_context(|| format!("reading rows from {}", rows.display()))?;
            let rows: Vec<Row> = serde_json::from_str(&raw)
                .context("rows file must hold a JSON array of objects")?;
            debug!(rows = rows.len(), "loaded result rows");

            let candidates = score_rows(
                &compiled.plan,
                &compiled.tolerances,
                &rows,
                aggregation.into(),
            )?;
            info!(candidates = candidates.len(), "ranked match candidates");
            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else {
                print!("{}", render::render_text(&candidates));
            }
            Ok(())
        }
    }
}

fn emit_options(frequency: bool, identifiers: bool) -> EmitOptions {
    EmitOptions {
        schema: if frequency {
            FactSchema::Frequency
        } else {
            FactSchema::ClassOctave
        },
        projection: if identifiers {
            Projection::Identifiers
        } else {
            Projection::Full
        },
    }
}

fn read_pattern(inline: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (inline, file) {
        (Some(text), None) => Ok(text),
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("reading pattern from {}", path.display())),
        (Some(_), Some(_)) => anyhow::bail!("give a pattern either inline or with --file, not both"),
        (None, None) => anyhow::bail!("no pattern given; pass it inline or with --file"),
    }
}

fn deliver(text: &str, output: Option<&std::path::Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, format!("{text}\n"))
            .with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
