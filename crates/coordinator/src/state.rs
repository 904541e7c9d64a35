//! Run states

use std::fmt;

use contracts::Backend;

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    ValidateInputs,
    EnsureWorkspace,
    Preprocess,
    SkipPreprocess,
    RunBackends,
    Done,
    // ===== terminal failures =====
    MissingRequiredArgument,
    InputNotFound,
    PreprocessingFailed,
    BackendFailed(Backend),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            RunState::Init
                | RunState::ValidateInputs
                | RunState::EnsureWorkspace
                | RunState::Preprocess
                | RunState::SkipPreprocess
                | RunState::RunBackends
        )
    }

    /// Whether `next` may follow this state
    pub fn allows(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Init, ValidateInputs)
                | (ValidateInputs, EnsureWorkspace)
                | (ValidateInputs, MissingRequiredArgument)
                | (ValidateInputs, InputNotFound)
                | (EnsureWorkspace, Preprocess)
                | (EnsureWorkspace, SkipPreprocess)
                | (Preprocess, RunBackends)
                | (Preprocess, PreprocessingFailed)
                | (SkipPreprocess, RunBackends)
                | (RunBackends, Done)
                | (RunBackends, BackendFailed(_))
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::BackendFailed(backend) => write!(f, "BackendFailed({backend})"),
            other => write!(f, "{other:?}"),
        }
    }
}
