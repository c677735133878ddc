/// Voice identifier. Allocated by the control side, never reused.
pub type VoiceId = u64;

/// Commands sent from the engine to the render side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum VoiceCommand {
    Start {
        id: VoiceId,
        frequency: f32,
        /// Auto-release after this long; `None` sustains until `Release`.
        hold_ms: Option<u32>,
    },
    Release { id: VoiceId },
    ReleaseAll,
}
