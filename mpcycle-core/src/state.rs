use serde::{Serialize, Deserialize};

/// Per-window rotation cursor. `None` means the window has not been started
/// (or was stopped) and the next rotation lands on the first stream.
#[derive(Debug, Clone, Default)]
pub struct RotationState {
    cursor: Option<usize>,
    last_rotated: Option<chrono::DateTime<chrono::Utc>>,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn last_rotated(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.last_rotated
    }

    /// Index the next rotation will play, wrapping at `playlist_len`.
    pub fn next_index(&self, playlist_len: usize) -> usize {
        debug_assert!(playlist_len > 0, "next_index on an empty playlist");
        self.cursor.map_or(0, |current| (current + 1) % playlist_len)
    }

    pub fn advance(&mut self, index: usize) {
        self.cursor = Some(index);
        self.last_rotated = Some(chrono::Utc::now());
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub index: usize,
    pub cursor: Option<usize>,
    pub stream: Option<String>,
    pub pid: Option<u32>,
    pub playlist_len: usize,
    pub last_rotated: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rotation_lands_on_zero() {
        let state = RotationState::new();
        assert_eq!(state.cursor(), None);
        assert_eq!(state.next_index(3), 0);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut state = RotationState::new();
        for k in 1..=7 {
            let next = state.next_index(3);
            state.advance(next);
            assert_eq!(state.cursor(), Some((k - 1) % 3));
        }
    }

    #[test]
    fn test_single_entry_repeats() {
        let mut state = RotationState::new();
        state.advance(state.next_index(1));
        assert_eq!(state.next_index(1), 0);
        assert_eq!(state.cursor(), Some(0));
    }

    #[test]
    fn test_reset_forgets_cursor() {
        let mut state = RotationState::new();
        state.advance(1);
        assert!(state.last_rotated().is_some());
        state.reset();
        assert_eq!(state.cursor(), None);
        assert_eq!(state.next_index(2), 0);
    }
}
