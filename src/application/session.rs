// ============================================================
// Layer 2 — Session State
// ============================================================
//   Idle ──submit──▶ Pending{g} ──result g──▶ Answered{g}
//                       ▲  │                      │
//                       └──┘ submit (g+1)  ◀──────┘ submit
//
// Only a result carrying the CURRENT pending generation moves
// the session on; anything older is stale.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Pending  { generation: u64 },
    Answered { generation: u64 },
}

impl SessionState {
    pub fn begin(&mut self, generation: u64) {
        *self = SessionState::Pending { generation };
    }

    /// Move to Answered if `generation` is the pending one.
    pub fn complete(&mut self, generation: u64) -> bool {
        if self.is_current(generation) {
            *self = SessionState::Answered { generation };
            true
        } else {
            false
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        matches!(self, SessionState::Pending { generation: g } if *g == generation)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Pending { .. })
    }

    /// After an answer is shown, editing the question starts over.
    pub fn should_clear_input(&self) -> bool {
        matches!(self, SessionState::Answered { .. })
    }
}
