//! Voice compilation: one template plus tolerances becomes a compiled
//! voice with resolved windows and a namespace for its query variables.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::options::FactSchema;
use crate::resolve::{resolve_windows, DurationWindow, PitchWindow, ToleranceWindow};
use crate::template::PatternTemplate;
use crate::tolerance::ToleranceSpec;

/// A single voice ready for emission. `namespace` prefixes every
/// variable the voice binds; the polyphony combiner relabels it when
/// voices are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledVoice {
    pub namespace: String,
    pub template: PatternTemplate,
    pub windows: Vec<ToleranceWindow>,
}

impl CompiledVoice {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Resolve a template into a compiled voice.
///
/// Rejects patterns that cannot anchor a graph match: empty templates,
/// all-rest templates, and templates where no slot constrains either
/// pitch or duration (nothing for the datastore to index on).
pub fn compile_voice(
    template: &PatternTemplate,
    spec: &ToleranceSpec,
    schema: FactSchema,
) -> Result<CompiledVoice> {
    if template.is_empty() {
        return Err(Error::Structural("pattern has no slots".into()));
    }

    let windows = resolve_windows(template, spec, schema)?;

    if windows.iter().all(|w| w.pitch == PitchWindow::Rest) {
        return Err(Error::Structural(
            "pattern matches only rests; add at least one pitched slot".into(),
        ));
    }
    if !windows.iter().any(anchors_search) {
        return Err(Error::Structural(
            "pattern has no resolvable anchor: every slot is a wildcard".into(),
        ));
    }

    Ok(CompiledVoice {
        namespace: "v0".into(),
        template: template.clone(),
        windows,
    })
}

/// A slot anchors the search if it constrains pitch content or pins a
/// duration. Pure wildcards and transposition-freed slots do not.
fn anchors_search(window: &ToleranceWindow) -> bool {
    let pitched = !matches!(window.pitch, PitchWindow::Any);
    let timed = !matches!(
        window.duration,
        DurationWindow {
            reference: None,
            ..
        }
    );
    pitched || timed
}
