//! Domain model: toolkits, lenses, sessions, workspaces and settings.

mod lens;
mod payload;
mod session;
mod toolkit;
mod workspace;

pub use lens::ThinkingLens;
pub use payload::{
    EthicalEntry, FuturesScenarios, NarrativeArc, StakeholderEntry, StructuredPayload,
    SystemsDiagram, PAYLOAD_KEYS,
};
pub use session::{AiOutputs, Refinement, StepRecord, ToolkitSession};
pub use toolkit::{OutputLabels, StepTemplate, ToolkitCategory, ToolkitType};
pub use workspace::{Settings, SettingsPatch, Theme, User, UserPatch, Workspace, WorkspacePatch};
