//! Emission configuration: target fact schema and projection shape.

use serde::{Deserialize, Serialize};

/// How the corpus stores note content on fact nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSchema {
    /// Spelled pitches: `class`, `octave`, `halfTonesFromA4` fields.
    #[default]
    ClassOctave,
    /// Frequency-native corpora: a `frequency` field in Hz.
    Frequency,
}

/// Which fields the compiled query projects per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Event identifiers plus per-voice source/start/end. Enough to
    /// locate matches, not enough to score them.
    Identifiers,
    /// Full per-slot descriptors, required by the fuzzy scorer.
    #[default]
    Full,
}

/// Options threaded through compilation. No process-wide defaults:
/// every compile call receives its own value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmitOptions {
    pub schema: FactSchema,
    pub projection: Projection,
}
