use crate::error::MutatorError;

/// Where an execution is. Indices refer to positions in the configured
/// collection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Validating,
    Connected,
    Processing(usize),
    Saving(usize),
    Closed,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Closed | ExecutionState::Failed)
    }

    pub fn can_advance_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;

        match (self, next) {
            (Idle, Validating) => true,
            (Validating, Connected) => true,
            (Connected, Processing(0)) => true,
            (Processing(i), Saving(j)) => i == j,
            // A collection that failed to transform skips its save.
            (Processing(i), Processing(j)) | (Saving(i), Processing(j)) => j == i + 1,
            (Processing(_) | Saving(_), Closed) => true,
            (Validating | Connected | Processing(_) | Saving(_), Failed) => true,
            _ => false,
        }
    }

    pub fn advance(&mut self, next: ExecutionState) -> Result<(), MutatorError> {
        if !self.can_advance_to(next) {
            return Err(MutatorError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}
