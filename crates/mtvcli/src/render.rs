//! Text rendering of scored candidates.

use owo_colors::OwoColorize;

use motive::{MatchCandidate, ObservedNote};

pub fn render_text(candidates: &[MatchCandidate]) -> String {
    if candidates.is_empty() {
        return "no matches\n".to_string();
    }

    let mut out = String::new();
    for (rank, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!(
            "{}. score {}\n",
            rank + 1,
            format!("{:.3}", candidate.score).green()
        ));
        for voice in &candidate.voices {
            let notes = voice
                .notes
                .iter()
                .map(describe_note)
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!(
                "   {}  [{}, {}]  {notes}\n",
                voice.source.cyan(),
                voice.start,
                voice.end
            ));
        }
    }
    out
}

fn describe_note(note: &ObservedNote) -> String {
    let head = if !note.pitches.is_empty() {
        note.pitches.join("+")
    } else if let Some(hz) = note.frequency {
        format!("{hz}Hz")
    } else {
        "rest".to_string()
    };
    match note.duration {
        Some(d) => format!("{head}:{d}"),
        None => head,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motive::VoiceMatch;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_result_says_so() {
        assert_eq!(render_text(&[]), "no matches\n");
    }

    #[test]
    fn renders_rank_source_and_notes() {
        let candidates = vec![MatchCandidate {
            score: 0.75,
            voices: vec![VoiceMatch {
                source: "bwv772.mei".into(),
                start: 4.0,
                end: 4.25,
                notes: vec![
                    ObservedNote {
                        pitches: vec!["c/5".into()],
                        frequency: None,
                        duration: Some(0.125),
                        start: 4.0,
                        end: 4.125,
                    },
                    ObservedNote {
                        pitches: vec![],
                        frequency: None,
                        duration: Some(0.125),
                        start: 4.125,
                        end: 4.25,
                    },
                ],
            }],
        }];
        let text = render_text(&candidates);
        assert!(text.contains("1. score"));
        assert!(text.contains("0.750"));
        assert!(text.contains("bwv772.mei"));
        assert!(text.contains("c/5:0.125"));
        assert!(text.contains("rest:0.125"));
    }
}
