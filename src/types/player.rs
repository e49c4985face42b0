//! Media player state.

/// Playback status reported by the remote player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Nothing is playing.
    #[default]
    Stopped,
    /// Playback is running.
    Playing,
    /// Playback is paused.
    Paused,
}

impl PlayerStatus {
    /// Parses a status keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "playing" => Some(Self::Playing),
            "paused" => Some(Self::Paused),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// A single field change observed on the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerUpdate {
    /// Status changed.
    Status(PlayerStatus),
    /// Track title changed.
    Title(String),
    /// Track artist changed.
    Artist(String),
}

/// Snapshot of the remote player.
///
/// Fields update independently. Only an explicit stop clears the track fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    /// Playback status.
    pub status: PlayerStatus,
    /// Current track title.
    pub title: Option<String>,
    /// Current track artist.
    pub artist: Option<String>,
}

impl PlayerState {
    /// Applies one field update.
    pub fn apply(&mut self, update: &PlayerUpdate) {
        match update {
            PlayerUpdate::Status(PlayerStatus::Stopped) => {
                self.status = PlayerStatus::Stopped;
                self.title = None;
                self.artist = None;
            }
            PlayerUpdate::Status(status) => self.status = *status,
            PlayerUpdate::Title(title) => self.title = Some(title.clone()),
            PlayerUpdate::Artist(artist) => self.artist = Some(artist.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_update_independently() {
        let mut state = PlayerState::default();
        state.apply(&PlayerUpdate::Title("Song A".into()));
        state.apply(&PlayerUpdate::Artist("Artist B".into()));
        state.apply(&PlayerUpdate::Status(PlayerStatus::Paused));

        assert_eq!(state.status, PlayerStatus::Paused);
        assert_eq!(state.title.as_deref(), Some("Song A"));
        assert_eq!(state.artist.as_deref(), Some("Artist B"));

        state.apply(&PlayerUpdate::Title("Song C".into()));
        assert_eq!(state.status, PlayerStatus::Paused);
        assert_eq!(state.artist.as_deref(), Some("Artist B"));
    }

    #[test]
    fn test_stop_clears_track() {
        let mut state = PlayerState::default();
        state.apply(&PlayerUpdate::Status(PlayerStatus::Playing));
        state.apply(&PlayerUpdate::Title("Song A".into()));
        state.apply(&PlayerUpdate::Status(PlayerStatus::Stopped));

        assert_eq!(state, PlayerState::default());
    }

    #[test]
    fn test_status_keywords() {
        assert_eq!(PlayerStatus::from_keyword("playing"), Some(PlayerStatus::Playing));
        assert_eq!(PlayerStatus::from_keyword("paused"), Some(PlayerStatus::Paused));
        assert_eq!(PlayerStatus::from_keyword("stopped"), Some(PlayerStatus::Stopped));
        assert_eq!(PlayerStatus::from_keyword("error"), None);
    }
}
