use bevy_ecs::prelude::Resource;

/// Frame clock of a session.
///
/// `elapsed` is the host timestamp of the last frame relative to the first,
/// so the pulse animation keeps running in wall time. `active` only
/// accumulates while the session is Active and feeds the summary duration.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub active: f32,
    pub frame_count: u64,
    /// Host timestamp of the first frame, in seconds.
    pub started_at: Option<f64>,
    /// Set on resume so the paused interval is not counted as active time.
    pub resync: bool,
}

impl WorldTime {
    pub fn is_first_frame(&self) -> bool {
        self.frame_count == 0
    }

    /// The next frame gets a zero delta.
    pub fn mark_resync(&mut self) {
        self.resync = true;
    }
}
