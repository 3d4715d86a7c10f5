//! Query emission: render a combined plan as Cypher-flavored text.
//!
//! The target schema is an event graph: `(:Event)-[:NEXT]->(:Event)`
//! chains per source, each event attached to one or more `(:Fact)`
//! nodes carrying `class`, `octave`, `type`, `frequency` and
//! `halfTonesFromA4`. Events carry `start`, `end`, `duration`,
//! `source` and `id`.

use crate::options::{EmitOptions, FactSchema, Projection};
use crate::polyphony::QueryPlan;
use crate::resolve::{IntervalBasis, PitchWindow, ToleranceWindow};
use crate::template::{DurationSpec, PatternTemplate, PitchSpec};
use crate::tolerance::ToleranceSpec;

/// Shortest note assumed present in a corpus, in whole-note units.
/// Gap tolerances are converted to bounded `NEXT` hops with it.
const SHORTEST_NOTE: f64 = 0.0625;

/// How many `NEXT` hops a gap tolerance may span.
fn skip_bound(gap: f64) -> usize {
    ((gap / SHORTEST_NOTE).ceil() as usize).max(1) + 1
}

fn event_var(ns: &str, slot: usize) -> String {
    format!("{ns}e{slot}")
}

fn fact_var(ns: &str, slot: usize) -> String {
    format!("{ns}f{slot}")
}

fn chord_fact_var(ns: &str, slot: usize, member: usize) -> String {
    format!("{ns}f{slot}p{member}")
}

/// The fact variable carrying a slot's anchor pitch. Chord slots anchor
/// on their first member's fact.
fn anchor_fact_var(ns: &str, slot: usize, window: &ToleranceWindow) -> String {
    match window.pitch {
        PitchWindow::Chord(_) => chord_fact_var(ns, slot, 0),
        _ => fact_var(ns, slot),
    }
}

/// Render the full query text for a plan.
pub fn emit(plan: &QueryPlan, options: EmitOptions) -> String {
    let mut patterns = Vec::new();
    let mut conjuncts = Vec::new();
    let mut returns = Vec::new();

    for voice in &plan.voices {
        let ns = &voice.namespace;

        // Event chain
        let mut chain = format!("({}:Event)", event_var(ns, 0));
        for i in 1..voice.len() {
            let gap = voice.windows[i - 1].gap;
            if gap > 0.0 {
                chain.push_str(&format!("-[:NEXT*1..{}]->", skip_bound(gap)));
            } else {
                chain.push_str("-[:NEXT]->");
            }
            chain.push_str(&format!("({}:Event)", event_var(ns, i)));
        }
        patterns.push(chain);

        // Fact bindings
        for (i, window) in voice.windows.iter().enumerate() {
            match &window.pitch {
                PitchWindow::Chord(members) => {
                    for j in 0..members.len() {
                        patterns.push(format!(
                            "({})--({}:Fact)",
                            event_var(ns, i),
                            chord_fact_var(ns, i, j)
                        ));
                    }
                }
                _ => {
                    patterns.push(format!(
                        "({})--({}:Fact)",
                        event_var(ns, i),
                        fact_var(ns, i)
                    ));
                }
            }
        }

        // Per-slot constraints
        for (i, window) in voice.windows.iter().enumerate() {
            pitch_conjuncts(ns, i, voice, window, &mut conjuncts);
            duration_conjuncts(ns, i, window, &mut conjuncts);
            if i + 1 < voice.len() && window.gap > 0.0 {
                conjuncts.push(format!(
                    "{}.end >= {}.start - {}",
                    event_var(ns, i),
                    event_var(ns, i + 1),
                    window.gap
                ));
            }
        }

        // Projection
        for (i, window) in voice.windows.iter().enumerate() {
            projection_items(ns, i, window, options, &mut returns);
        }
        returns.push(format!("{}.source AS {ns}_source", event_var(ns, 0)));
        returns.push(format!("{}.start AS {ns}_start", event_var(ns, 0)));
        returns.push(format!(
            "{}.end AS {ns}_end",
            event_var(ns, voice.len() - 1)
        ));
    }

    for alignment in &plan.alignments {
        let a = &plan.voices[alignment.first].namespace;
        let b = &plan.voices[alignment.second].namespace;
        conjuncts.push(format!(
            "abs({}.start - {}.start) <= {}",
            event_var(a, 0),
            event_var(b, 0),
            alignment.max_onset_offset
        ));
    }

    let mut out = String::new();
    out.push_str("MATCH\n");
    out.push_str(&patterns.join(",\n"));
    if !conjuncts.is_empty() {
        out.push_str("\nWHERE ");
        out.push_str(&conjuncts.join("\nAND "));
    }
    out.push_str("\nRETURN ");
    out.push_str(&returns.join(", "));
    out
}

fn pitch_conjuncts(
    ns: &str,
    slot: usize,
    voice: &crate::voice::CompiledVoice,
    window: &ToleranceWindow,
    out: &mut Vec<String>,
) {
    match &window.pitch {
        PitchWindow::Any => {}
        PitchWindow::Rest => {
            out.push(format!("{}.type = 'rest'", fact_var(ns, slot)));
        }
        PitchWindow::Members(members) => {
            out.push(member_conjunct(&fact_var(ns, slot), &members.members));
        }
        PitchWindow::Chord(chord) => {
            for (j, members) in chord.iter().enumerate() {
                out.push(member_conjunct(
                    &chord_fact_var(ns, slot, j),
                    &members.members,
                ));
            }
        }
        PitchWindow::Frequency {
            low_hz, high_hz, ..
        } => {
            let f = fact_var(ns, slot);
            out.push(format!(
                "{f}.frequency >= {} AND {f}.frequency <= {}",
                low_hz.floor() as i64,
                high_hz.ceil() as i64
            ));
        }
        PitchWindow::Interval {
            reference,
            low,
            high,
            basis,
        } => {
            let prev = anchor_fact_var(ns, slot - 1, &voice.windows[slot - 1]);
            let cur = anchor_fact_var(ns, slot, window);
            let delta = match basis {
                IntervalBasis::Semitones => {
                    format!("toFloat({cur}.halfTonesFromA4 - {prev}.halfTonesFromA4)")
                }
                IntervalBasis::Frequency => {
                    format!("12 * log({cur}.frequency / {prev}.frequency) / log(2)")
                }
            };
            if low == high {
                out.push(format!("{delta} = {reference}"));
            } else {
                out.push(format!("{delta} >= {low} AND {delta} <= {high}"));
            }
        }
    }
}

fn member_conjunct(fact: &str, members: &[notation::Pitch]) -> String {
    if members.len() == 1 {
        let p = &members[0];
        format!(
            "{fact}.class = '{}' AND {fact}.octave = {}",
            p.class_accid(),
            p.octave
        )
    } else {
        let list = members
            .iter()
            .map(|p| format!("['{}', {}]", p.class_accid(), p.octave))
            .collect::<Vec<_>>()
            .join(", ");
        format!("[{fact}.class, {fact}.octave] IN [{list}]")
    }
}

fn duration_conjuncts(ns: &str, slot: usize, window: &ToleranceWindow, out: &mut Vec<String>) {
    let Some(reference) = window.duration.reference else {
        return;
    };
    let e = event_var(ns, slot);
    if window.duration.is_exact() {
        out.push(format!("{e}.duration = {reference}"));
    } else {
        out.push(format!(
            "{e}.duration >= {} AND {e}.duration <= {}",
            window.duration.low, window.duration.high
        ));
    }
}

fn projection_items(
    ns: &str,
    slot: usize,
    window: &ToleranceWindow,
    options: EmitOptions,
    out: &mut Vec<String>,
) {
    let e = event_var(ns, slot);
    match options.projection {
        Projection::Identifiers => {
            out.push(format!("{e}.id AS {ns}_id_{slot}"));
        }
        Projection::Full => {
            match &window.pitch {
                PitchWindow::Chord(chord) => {
                    for j in 0..chord.len() {
                        let f = chord_fact_var(ns, slot, j);
                        out.push(format!("{f}.class AS {ns}_pitch_{slot}_{j}"));
                        out.push(format!("{f}.octave AS {ns}_octave_{slot}_{j}"));
                        out.push(format!("{f}.halfTonesFromA4 AS {ns}_semitones_{slot}_{j}"));
                    }
                }
                PitchWindow::Frequency { .. } => {
                    let f = fact_var(ns, slot);
                    out.push(format!("{f}.frequency AS {ns}_frequency_{slot}"));
                }
                _ => {
                    let f = fact_var(ns, slot);
                    if options.schema == FactSchema::Frequency {
                        out.push(format!("{f}.frequency AS {ns}_frequency_{slot}"));
                    } else {
                        out.push(format!("{f}.class AS {ns}_pitch_{slot}"));
                        out.push(format!("{f}.octave AS {ns}_octave_{slot}"));
                        out.push(format!("{f}.halfTonesFromA4 AS {ns}_semitones_{slot}"));
                    }
                }
            }
            out.push(format!("{e}.duration AS {ns}_duration_{slot}"));
            out.push(format!("{e}.start AS {ns}_start_{slot}"));
            out.push(format!("{e}.end AS {ns}_end_{slot}"));
        }
    }
}

/// Render a template and its tolerances back out as pattern DSL text,
/// the inverse of the DSL parser. Used to persist searches for later
/// recompilation.
pub fn render_dsl(template: &PatternTemplate, spec: &ToleranceSpec) -> String {
    let mut out = String::from("MATCH\n");

    if spec.pitch > 0.0 || spec.duration > 0.0 || spec.gap > 0.0 {
        let mut parts = Vec::new();
        if spec.pitch > 0.0 {
            parts.push(format!("pitch={}", spec.pitch));
        }
        if spec.duration > 0.0 {
            parts.push(format!("duration={}", spec.duration));
        }
        if spec.gap > 0.0 {
            parts.push(format!("gap={}", spec.gap));
        }
        out.push_str(&format!("TOLERANT {}\n", parts.join(", ")));
    }
    if spec.alpha > 0.0 {
        out.push_str(&format!("ALPHA {}\n", spec.alpha));
    }
    if spec.allow_transposition {
        out.push_str("ALLOW_TRANSPOSITION\n");
    }

    let mut patterns = Vec::new();
    let mut chain = String::from("(e0:Event)");
    for i in 1..template.len() {
        chain.push_str(&format!("-[:NEXT]->(e{i}:Event)"));
    }
    patterns.push(chain);

    for (i, slot) in template.slots.iter().enumerate() {
        let dur_fields = match &slot.duration {
            DurationSpec::Exact(d) => {
                // Dotted values render as their base denominator plus a
                // dot count when they fit the 2^n*(2^(k+1)-1) shape;
                // otherwise fall back to the raw fraction.
                match d.as_denominator_dots() {
                    Some((denom, dots)) if dots > 0 => format!("dur:{denom}, dots:{dots}"),
                    Some((denom, _)) => format!("dur:{denom}"),
                    None => format!("dur:{}/{}", d.numerator, d.denominator),
                }
            }
            DurationSpec::Any => String::new(),
        };
        let join = |pitch_fields: String| -> String {
            let fields = [pitch_fields, dur_fields.clone()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            if fields.is_empty() {
                format!("(e{i})--(f{i}:Fact)")
            } else {
                format!("(e{i})--(f{i}{{{fields}}})")
            }
        };
        match &slot.pitch {
            PitchSpec::Any => patterns.push(join(String::new())),
            PitchSpec::Rest => patterns.push(join("type:'rest'".into())),
            PitchSpec::One(p) => {
                patterns.push(join(format!(
                    "class:'{}', octave:{}",
                    p.class_accid(),
                    p.octave
                )));
            }
            PitchSpec::Frequency(hz) => patterns.push(join(format!("freq:{hz}"))),
            PitchSpec::Chord(pitches) => {
                for (j, p) in pitches.iter().enumerate() {
                    let fields = [
                        format!("class:'{}', octave:{}", p.class_accid(), p.octave),
                        dur_fields.clone(),
                    ]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                    patterns.push(format!("(e{i})--(f{i}p{j}{{{fields}}})"));
                }
            }
        }
    }

    out.push_str(&patterns.join(",\n"));
    out.push_str("\nRETURN e0.source, e0.start");
    out
}
