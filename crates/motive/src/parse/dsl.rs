//! Graph-pattern DSL: an event chain with fact literals, plus fuzzy
//! headers.
//!
//! ```text
//! MATCH
//! TOLERANT pitch=1.0, duration=0.125
//! ALPHA 0.5
//! ALLOW_TRANSPOSITION
//! (e0:Event)-[:NEXT]->(e1:Event),
//! (e0)--(f0{class:'c#', octave:5, dur:8}),
//! (e1)--(f1:Fact)
//! RETURN e0.source, e0.start
//! ```
//!
//! A fact literal constrains the event it attaches to: `class`/`octave`
//! for pitch, `freq` for a frequency reference, `type:'rest'` for
//! rests, `dur` (denominator or fraction) and `dots` for duration. A
//! bare `:Fact` binding is a wildcard. Two or more `class` facts on one
//! event form a chord.

use std::collections::HashMap;

use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::prelude::*;
use winnow::token::take_while;

use notation::{Duration, Pitch};

use super::syntax_error;
use crate::error::{Error, Result};
use crate::template::{DurationSpec, PatternTemplate, PitchSpec, Slot};
use crate::tolerance::ToleranceSpec;

type PResult<T> = winnow::ModalResult<T>;

/// A parsed single-voice query: the pattern plus its fuzzy parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DslQuery {
    pub template: PatternTemplate,
    pub tolerances: ToleranceSpec,
}

#[derive(Debug)]
struct RawDsl {
    tolerant: Vec<(String, f64)>,
    alpha: Option<f64>,
    transposition: bool,
    chains: Vec<Vec<String>>,
    facts: Vec<RawFact>,
    returns: Vec<(String, String)>,
}

#[derive(Debug)]
struct RawFact {
    event: String,
    var: String,
    /// `None` marks a bare `:Fact` wildcard binding.
    fields: Option<Vec<(String, RawValue)>>,
}

#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Str(String),
    Num(f64),
    Frac(u32, u32),
}

/// Parse pattern DSL text into a template and tolerance spec.
pub fn parse_dsl(input: &str) -> Result<DslQuery> {
    let raw = query
        .parse(input)
        .map_err(|err| syntax_error(input, err.offset()))?;
    assemble(raw)
}

fn assemble(mut raw: RawDsl) -> Result<DslQuery> {
    let mut tolerances = ToleranceSpec::default();
    for (key, value) in &raw.tolerant {
        match key.as_str() {
            "pitch" => tolerances.pitch = *value,
            "duration" => tolerances.duration = *value,
            "gap" => tolerances.gap = *value,
            other => {
                return Err(Error::Validation(format!(
                    "unknown tolerance key `{other}`, expected pitch, duration or gap"
                )))
            }
        }
    }
    if let Some(alpha) = raw.alpha {
        tolerances.alpha = alpha;
    }
    tolerances.allow_transposition = raw.transposition;
    tolerances.validate()?;

    if raw.chains.len() > 1 {
        return Err(Error::Structural(
            "pattern declares more than one event chain; a voice is a single \
             NEXT chain, compile voices separately and combine them"
                .into(),
        ));
    }
    let Some(chain) = raw.chains.pop() else {
        return Err(Error::Structural("pattern has no event chain".into()));
    };
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    for (idx, name) in chain.iter().enumerate() {
        if slot_of.insert(name, idx).is_some() {
            return Err(Error::Validation(format!(
                "event variable `{name}` declared twice"
            )));
        }
    }

    let mut facts_by_slot: Vec<Vec<&RawFact>> = vec![Vec::new(); chain.len()];
    let mut declared_vars: Vec<String> = chain.clone();
    for fact in &raw.facts {
        let Some(&slot) = slot_of.get(fact.event.as_str()) else {
            return Err(Error::Validation(format!(
                "fact attached to undeclared event `{}`",
                fact.event
            )));
        };
        facts_by_slot[slot].push(fact);
        declared_vars.push(fact.var.clone());
    }

    let mut slots = Vec::with_capacity(chain.len());
    for facts in &facts_by_slot {
        slots.push(assemble_slot(facts)?);
    }

    for (var, _prop) in &raw.returns {
        if !declared_vars.iter().any(|v| v == var) {
            return Err(Error::Validation(format!(
                "RETURN references undeclared variable `{var}`"
            )));
        }
    }

    Ok(DslQuery {
        template: PatternTemplate::new(slots),
        tolerances,
    })
}

fn assemble_slot(facts: &[&RawFact]) -> Result<Slot> {
    let mut pitches: Vec<Pitch> = Vec::new();
    let mut frequency: Option<f64> = None;
    let mut rest = false;
    let mut duration: Option<Duration> = None;

    for fact in facts {
        let Some(fields) = &fact.fields else {
            continue; // bare :Fact wildcard
        };
        let mut class: Option<&str> = None;
        let mut octave: Option<i64> = None;
        let mut dur: Option<RawValue> = None;
        let mut dots: u32 = 0;

        for (key, value) in fields {
            match (key.as_str(), value) {
                ("class", RawValue::Str(s)) => class = Some(s),
                ("octave", RawValue::Num(n)) => octave = Some(*n as i64),
                ("type", RawValue::Str(s)) if s == "rest" => rest = true,
                ("freq", RawValue::Num(n)) => frequency = Some(*n),
                ("dur", v @ (RawValue::Num(_) | RawValue::Frac(..))) => dur = Some(v.clone()),
                ("dots", RawValue::Num(n)) => dots = *n as u32,
                (other, _) => {
                    return Err(Error::Validation(format!(
                        "unknown or ill-typed fact field `{other}`"
                    )))
                }
            }
        }

        match (class, octave) {
            (Some(class), Some(octave)) => {
                pitches.push(Pitch::parse(&format!("{class}/{octave}"))?);
            }
            (Some(class), None) => {
                return Err(Error::Validation(format!(
                    "fact gives class `{class}` without an octave"
                )))
            }
            (None, Some(_)) => {
                return Err(Error::Validation(
                    "fact gives an octave without a class".into(),
                ))
            }
            (None, None) => {}
        }

        if let Some(dur) = dur {
            let base = match dur {
                RawValue::Num(n) => Duration::from_denominator(n as u32)?,
                RawValue::Frac(num, den) => Duration::new(num, den)?,
                RawValue::Str(_) => unreachable!(),
            };
            let value = base.dotted(dots);
            if let Some(existing) = duration {
                if existing != value {
                    return Err(Error::Validation(
                        "facts on one event disagree about its duration".into(),
                    ));
                }
            }
            duration = Some(value);
        }
    }

    let pitch = if rest {
        if !pitches.is_empty() || frequency.is_some() {
            return Err(Error::Validation(
                "a rest fact cannot also carry pitch content".into(),
            ));
        }
        PitchSpec::Rest
    } else if let Some(hz) = frequency {
        if !pitches.is_empty() {
            return Err(Error::Validation(
                "an event cannot mix frequency and spelled-pitch facts".into(),
            ));
        }
        PitchSpec::Frequency(hz)
    } else {
        match pitches.len() {
            0 => PitchSpec::Any,
            1 => PitchSpec::One(pitches[0]),
            _ => PitchSpec::Chord(pitches),
        }
    };

    let duration = match duration {
        Some(d) => DurationSpec::Exact(d),
        None => DurationSpec::Any,
    };
    Ok(Slot::new(pitch, duration))
}

fn query(input: &mut &str) -> PResult<RawDsl> {
    let _ = (multispace0, "MATCH", multispace0).parse_next(input)?;
    let tolerant = opt(tolerant_clause).parse_next(input)?.unwrap_or_default();
    let alpha = opt(alpha_clause).parse_next(input)?;
    let transposition = opt(("ALLOW_TRANSPOSITION", multispace0))
        .parse_next(input)?
        .is_some();

    let patterns: Vec<Pattern> =
        separated(1.., pattern, (multispace0, ',', multispace0)).parse_next(input)?;

    let returns = opt(return_clause).parse_next(input)?.unwrap_or_default();
    multispace0.parse_next(input)?;

    let mut chains = Vec::new();
    let mut facts = Vec::new();
    for p in patterns {
        match p {
            Pattern::Chain(events) => chains.push(events),
            Pattern::Fact(f) => facts.push(f),
        }
    }

    Ok(RawDsl {
        tolerant,
        alpha,
        transposition,
        chains,
        facts,
        returns,
    })
}

enum Pattern {
    Chain(Vec<String>),
    Fact(RawFact),
}

fn tolerant_clause(input: &mut &str) -> PResult<Vec<(String, f64)>> {
    let _ = ("TOLERANT", multispace0).parse_next(input)?;
    let pairs =
        separated(1.., tolerance_pair, (multispace0, ',', multispace0)).parse_next(input)?;
    multispace0.parse_next(input)?;
    Ok(pairs)
}

fn tolerance_pair(input: &mut &str) -> PResult<(String, f64)> {
    let key = identifier.parse_next(input)?;
    let _ = (multispace0, '=', multispace0).parse_next(input)?;
    let value = number.parse_next(input)?;
    Ok((key, value))
}

fn alpha_clause(input: &mut &str) -> PResult<f64> {
    delimited(("ALPHA", multispace0), number, multispace0).parse_next(input)
}

fn pattern(input: &mut &str) -> PResult<Pattern> {
    alt((fact_binding.map(Pattern::Fact), chain.map(Pattern::Chain))).parse_next(input)
}

/// `(e0:Event)-[:NEXT]->(e1:Event)-...`
fn chain(input: &mut &str) -> PResult<Vec<String>> {
    let first = event_node.parse_next(input)?;
    let mut events = vec![first];
    while let Some(next) = opt(preceded("-[:NEXT]->", event_node)).parse_next(input)? {
        events.push(next);
    }
    Ok(events)
}

fn event_node(input: &mut &str) -> PResult<String> {
    delimited('(', (identifier, ":Event"), ')')
        .map(|(name, _)| name)
        .parse_next(input)
}

/// `(e0)--(f0{...})` or `(e0)--(f0:Fact)`
fn fact_binding(input: &mut &str) -> PResult<RawFact> {
    let event = delimited('(', identifier, ')').parse_next(input)?;
    let _ = "--".parse_next(input)?;
    let (var, fields) = delimited('(', (identifier, fact_body), ')').parse_next(input)?;
    Ok(RawFact { event, var, fields })
}

fn fact_body(input: &mut &str) -> PResult<Option<Vec<(String, RawValue)>>> {
    alt((
        ":Fact".map(|_| None),
        delimited(
            ('{', multispace0),
            separated(1.., field, (multispace0, ',', multispace0)),
            (multispace0, '}'),
        )
        .map(Some),
    ))
    .parse_next(input)
}

fn field(input: &mut &str) -> PResult<(String, RawValue)> {
    let key = identifier.parse_next(input)?;
    let _ = (multispace0, ':', multispace0).parse_next(input)?;
    let value = value.parse_next(input)?;
    Ok((key, value))
}

fn value(input: &mut &str) -> PResult<RawValue> {
    alt((quoted.map(RawValue::Str), fraction, number.map(RawValue::Num))).parse_next(input)
}

fn quoted(input: &mut &str) -> PResult<String> {
    delimited('\'', take_while(0.., |c: char| c != '\''), '\'')
        .map(str::to_string)
        .parse_next(input)
}

fn fraction(input: &mut &str) -> PResult<RawValue> {
    let (num, _, den) = (unsigned, '/', unsigned).parse_next(input)?;
    Ok(RawValue::Frac(num, den))
}

fn unsigned(input: &mut &str) -> PResult<u32> {
    take_while(1.., |c: char| c.is_ascii_digit())
        .try_map(str::parse)
        .parse_next(input)
}

fn number(input: &mut &str) -> PResult<f64> {
    winnow::ascii::float.parse_next(input)
}

fn identifier(input: &mut &str) -> PResult<String> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_')
        .map(str::to_string)
        .parse_next(input)
}

fn return_clause(input: &mut &str) -> PResult<Vec<(String, String)>> {
    let _ = (multispace0, "RETURN", multispace0).parse_next(input)?;
    separated(1.., return_item, (multispace0, ',', multispace0)).parse_next(input)
}

fn return_item(input: &mut &str) -> PResult<(String, String)> {
    let (var, _, prop) = (identifier, '.', identifier).parse_next(input)?;
    Ok((var, prop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASIC: &str = "MATCH\n\
        (e0:Event)-[:NEXT]->(e1:Event),\n\
        (e0)--(f0{class:'c#', octave:5, dur:8}),\n\
        (e1)--(f1{class:'d', octave:5, dur:8})\n\
        RETURN e0.source, e0.start";

    #[test]
    fn parses_a_crisp_query() {
        let q = parse_dsl(BASIC).unwrap();
        assert_eq!(q.tolerances, ToleranceSpec::default());
        assert_eq!(q.template.len(), 2);
        assert_eq!(
            q.template.slots[0].pitch,
            PitchSpec::One(Pitch::parse("c#/5").unwrap())
        );
        assert_eq!(
            q.template.slots[1].duration,
            DurationSpec::Exact(Duration::from_denominator(8).unwrap())
        );
    }

    #[test]
    fn parses_fuzzy_headers() {
        let text = "MATCH\n\
            TOLERANT pitch=1.0, gap=0.125\n\
            ALPHA 0.5\n\
            ALLOW_TRANSPOSITION\n\
            (e0:Event)-[:NEXT]->(e1:Event),\n\
            (e0)--(f0{class:'c', octave:5}),\n\
            (e1)--(f1{class:'d', octave:5})";
        let q = parse_dsl(text).unwrap();
        assert_eq!(q.tolerances.pitch, 1.0);
        assert_eq!(q.tolerances.duration, 0.0);
        assert_eq!(q.tolerances.gap, 0.125);
        assert_eq!(q.tolerances.alpha, 0.5);
        assert!(q.tolerances.allow_transposition);
        // No duration fields: durations stay wildcards
        assert_eq!(q.template.slots[0].duration, DurationSpec::Any);
    }

    #[test]
    fn wildcard_rest_and_chord_facts() {
        let text = "MATCH\n\
            (e0:Event)-[:NEXT]->(e1:Event)-[:NEXT]->(e2:Event),\n\
            (e0)--(f0:Fact),\n\
            (e1)--(f1{type:'rest', dur:4}),\n\
            (e2)--(f2a{class:'c', octave:5, dur:4}),\n\
            (e2)--(f2b{class:'e', octave:5, dur:4})";
        let q = parse_dsl(text).unwrap();
        assert_eq!(q.template.slots[0].pitch, PitchSpec::Any);
        assert_eq!(q.template.slots[1].pitch, PitchSpec::Rest);
        match &q.template.slots[2].pitch {
            PitchSpec::Chord(pitches) => assert_eq!(pitches.len(), 2),
            other => panic!("expected chord, got {other:?}"),
        }
    }

    #[test]
    fn frequency_and_dotted_duration_facts() {
        let text = "MATCH\n\
            (e0:Event),\n\
            (e0)--(f0{freq:440.0, dur:4, dots:1})";
        let q = parse_dsl(text).unwrap();
        assert_eq!(q.template.slots[0].pitch, PitchSpec::Frequency(440.0));
        assert_eq!(
            q.template.slots[0].duration,
            DurationSpec::Exact(Duration::new(3, 8).unwrap())
        );
    }

    #[test]
    fn class_without_octave_rejected() {
        let text = "MATCH (e0:Event), (e0)--(f0{class:'c'})";
        let err = parse_dsl(text).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");
    }

    #[test]
    fn alpha_out_of_range_rejected() {
        let text = "MATCH ALPHA 1.5 (e0:Event), (e0)--(f0{class:'c', octave:5})";
        assert!(matches!(parse_dsl(text), Err(Error::Validation(_))));
    }

    #[test]
    fn unknown_tolerance_key_rejected() {
        let text = "MATCH TOLERANT tempo=2 (e0:Event), (e0)--(f0{class:'c', octave:5})";
        assert!(matches!(parse_dsl(text), Err(Error::Validation(_))));
    }

    #[test]
    fn fact_on_undeclared_event_rejected() {
        let text = "MATCH (e0:Event), (e9)--(f0{class:'c', octave:5})";
        assert!(matches!(parse_dsl(text), Err(Error::Validation(_))));
    }

    #[test]
    fn return_of_undeclared_variable_rejected() {
        let text = "MATCH (e0:Event), (e0)--(f0:Fact) RETURN e7.start";
        assert!(matches!(parse_dsl(text), Err(Error::Validation(_))));
    }

    #[test]
    fn second_event_chain_rejected() {
        let text = "MATCH (e0:Event), (e1:Event), (e0)--(f0{class:'c', octave:5})";
        let err = parse_dsl(text).unwrap_err();
        assert!(matches!(err, Error::Structural(_)), "{err}");
    }

    #[test]
    fn garbage_reports_parse_position() {
        let err = parse_dsl("MATCH (e0:Evnt)").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err}");
    }
}
