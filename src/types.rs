// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a watch rule fires again while its pipeline is running.
///
/// - `Queue`: remember the trigger and run again once the current run
///   finishes (default behaviour).
/// - `Cancel`: drop any previously queued runs and only keep the latest
///   trigger. The in-flight run is left to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// The file pipelines a project can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Styles,
    Scripts,
    Images,
    Assemble,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 4] = [
        PipelineKind::Styles,
        PipelineKind::Scripts,
        PipelineKind::Images,
        PipelineKind::Assemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Styles => "styles",
            PipelineKind::Scripts => "scripts",
            PipelineKind::Images => "images",
            PipelineKind::Assemble => "assemble",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| {
                format!("unknown pipeline '{s}' (expected styles, scripts, images or assemble)")
            })
    }
}
