//! In-memory voice session state. Track lookup and audio decode live behind
//! external providers; the bot manages queue state and the gates around it.

use std::collections::VecDeque;

use dashmap::DashMap;

pub const VOLUME_MAX: u8 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub requested_by: u64,
}

#[derive(Debug, Default)]
pub struct VoiceSession {
    pub now_playing: Option<Track>,
    pub queue: VecDeque<Track>,
    pub paused: bool,
    pub volume: u8,
    pub position_secs: u64,
}

/// Per-guild playback state.
#[derive(Default)]
pub struct MusicState {
    sessions: DashMap<u64, VoiceSession>,
}

impl MusicState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a track; it starts "playing" immediately when nothing else is.
    /// Returns (started_now, queue_len).
    pub fn enqueue(&self, guild_id: u64, track: Track) -> (bool, usize) {
        let mut session = self.sessions.entry(guild_id).or_default();
        if session.volume == 0 {
            session.volume = 100;
        }
        if session.now_playing.is_none() {
            session.now_playing = Some(track);
            session.paused = false;
            (true, session.queue.len())
        } else {
            session.queue.push_back(track);
            (false, session.queue.len())
        }
    }

    /// Returns false when nothing is playing or already paused.
    pub fn pause(&self, guild_id: u64) -> bool {
        let mut session = self.sessions.entry(guild_id).or_default();
        if session.now_playing.is_none() || session.paused {
            return false;
        }
        session.paused = true;
        true
    }

    pub fn resume(&self, guild_id: u64) -> bool {
        let mut session = self.sessions.entry(guild_id).or_default();
        if session.now_playing.is_none() || !session.paused {
            return false;
        }
        session.paused = false;
        true
    }

    /// Stop playback and clear the queue.
    pub fn stop(&self, guild_id: u64) -> bool {
        match self.sessions.get_mut(&guild_id) {
            Some(mut session) => {
                let had_track = session.now_playing.is_some();
                session.now_playing = None;
                session.queue.clear();
                session.paused = false;
                session.position_secs = 0;
                had_track
            }
            None => false,
        }
    }

    pub fn set_volume(&self, guild_id: u64, volume: u8) -> u8 {
        let volume = volume.min(VOLUME_MAX);
        self.sessions.entry(guild_id).or_default().volume = volume;
        volume
    }

    /// Seek relative to the current position; backward seeks clamp at zero.
    /// Returns the new position, or None when nothing is playing.
    pub fn seek(&self, guild_id: u64, forward: bool, secs: u64) -> Option<u64> {
        let mut session = self.sessions.get_mut(&guild_id)?;
        session.now_playing.as_ref()?;
        session.position_secs = if forward {
            session.position_secs.saturating_add(secs)
        } else {
            session.position_secs.saturating_sub(secs)
        };
        Some(session.position_secs)
    }

    pub fn snapshot(&self, guild_id: u64) -> Option<(Option<Track>, Vec<Track>, bool, u8)> {
        self.sessions.get(&guild_id).map(|s| {
            (
                s.now_playing.clone(),
                s.queue.iter().cloned().collect(),
                s.paused,
                s.volume,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track {
            title: title.into(),
            requested_by: 1,
        }
    }

    #[test]
    fn first_enqueue_starts_playing() {
        let music = MusicState::new();
        let (started, queued) = music.enqueue(1, track("song a"));
        assert!(started);
        assert_eq!(queued, 0);

        let (started, queued) = music.enqueue(1, track("song b"));
        assert!(!started);
        assert_eq!(queued, 1);
    }

    #[test]
    fn pause_resume_cycle() {
        let music = MusicState::new();
        assert!(!music.pause(1)); // nothing playing yet
        music.enqueue(1, track("song"));
        assert!(music.pause(1));
        assert!(!music.pause(1)); // already paused
        assert!(music.resume(1));
        assert!(!music.resume(1)); // already playing
    }

    #[test]
    fn stop_clears_everything() {
        let music = MusicState::new();
        music.enqueue(1, track("a"));
        music.enqueue(1, track("b"));
        assert!(music.stop(1));
        assert!(music.snapshot(1).unwrap().0.is_none());
        assert!(music.snapshot(1).unwrap().1.is_empty());
        assert!(!music.stop(1));
    }

    #[test]
    fn volume_clamps_to_max() {
        let music = MusicState::new();
        assert_eq!(music.set_volume(1, 250), VOLUME_MAX);
        assert_eq!(music.set_volume(1, 50), 50);
    }

    #[test]
    fn seek_clamps_at_zero() {
        let music = MusicState::new();
        assert_eq!(music.seek(1, true, 10), None); // no session
        music.enqueue(1, track("song"));
        assert_eq!(music.seek(1, true, 30), Some(30));
        assert_eq!(music.seek(1, false, 100), Some(0));
    }

    #[test]
    fn guilds_are_independent() {
        let music = MusicState::new();
        music.enqueue(1, track("a"));
        assert!(music.snapshot(2).is_none());
    }
}
