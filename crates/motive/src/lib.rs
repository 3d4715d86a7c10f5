//! Fuzzy pattern query compiler for symbolic music corpora.
//!
//! A pattern (melodic, rhythmic, or both, possibly polyphonic) plus a
//! tolerance specification compiles to Cypher-flavored query text over
//! an event-graph corpus. Result rows come back through a
//! [`QueryExecutor`] and are scored against the pattern with a fuzzy
//! membership function, filtered by the alpha threshold, and ranked.
//!
//! ```
//! use motive::{compile_note_list, EmitOptions, ToleranceSpec};
//!
//! let spec = ToleranceSpec {
//!     pitch: 1.0,
//!     ..Default::default()
//! };
//! let compiled =
//!     compile_note_list("[(c/5, 8, n), (d/5, 8, n)]", &spec, EmitOptions::default()).unwrap();
//! assert!(compiled.text().starts_with("MATCH"));
//! ```

pub mod emit;
pub mod error;
pub mod executor;
pub mod options;
pub mod parse;
pub mod polyphony;
pub mod resolve;
pub mod score;
pub mod template;
pub mod tolerance;
pub mod voice;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use error::{Error, Result};
pub use executor::{search, QueryExecutor};
pub use options::{EmitOptions, FactSchema, Projection};
pub use parse::{parse_dsl, parse_note_list, DslQuery};
pub use polyphony::{Alignment, QueryPlan};
pub use score::{score_rows, Aggregation, MatchCandidate, ObservedNote, Row, VoiceMatch};
pub use template::{DurationSpec, PatternTemplate, PitchSpec, Slot};
pub use tolerance::ToleranceSpec;
pub use voice::CompiledVoice;

/// Query text plus everything the scorer needs to judge its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    text: String,
    pub tolerances: ToleranceSpec,
    pub plan: QueryPlan,
}

impl CompiledQuery {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Compile templates (one per voice) into a single query.
pub fn compile_pattern(
    templates: &[PatternTemplate],
    spec: &ToleranceSpec,
    alignments: &[Alignment],
    options: EmitOptions,
) -> Result<CompiledQuery> {
    let voices = templates
        .iter()
        .map(|t| voice::compile_voice(t, spec, options.schema))
        .collect::<Result<Vec<_>>>()?;
    let plan = polyphony::combine(voices, alignments.to_vec())?;
    let text = emit::emit(&plan, options);
    info!(
        voices = plan.voices.len(),
        alignments = plan.alignments.len(),
        chars = text.len(),
        "compiled pattern query"
    );
    Ok(CompiledQuery {
        text,
        tolerances: *spec,
        plan,
    })
}

/// Compile note-list text as a single monophonic voice.
pub fn compile_note_list(
    input: &str,
    spec: &ToleranceSpec,
    options: EmitOptions,
) -> Result<CompiledQuery> {
    let template = parse::parse_note_list(input)?;
    compile_pattern(&[template], spec, &[], options)
}

/// Compile one pattern DSL query, tolerances included in the text.
pub fn compile_dsl(input: &str, options: EmitOptions) -> Result<CompiledQuery> {
    let query = parse::parse_dsl(input)?;
    compile_pattern(&[query.template], &query.tolerances, &[], options)
}

/// Compile several DSL queries as voices of one polyphonic query. Every
/// voice must declare the same tolerances; differing fuzzy parameters
/// across voices have no single alpha to rank under.
pub fn compile_dsl_many(
    inputs: &[&str],
    alignments: &[Alignment],
    options: EmitOptions,
) -> Result<CompiledQuery> {
    if inputs.is_empty() {
        return Err(Error::Structural("no voices to compile".into()));
    }
    let queries = inputs
        .iter()
        .map(|i| parse::parse_dsl(i))
        .collect::<Result<Vec<_>>>()?;
    let spec = queries[0].tolerances;
    for (idx, q) in queries.iter().enumerate().skip(1) {
        if q.tolerances != spec {
            return Err(Error::Validation(format!(
                "voice {idx} declares different tolerances than voice 0"
            )));
        }
    }
    let templates: Vec<PatternTemplate> = queries.into_iter().map(|q| q.template).collect();
    compile_pattern(&templates, &spec, alignments, options)
}
