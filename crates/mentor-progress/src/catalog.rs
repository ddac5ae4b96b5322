//! Static achievement catalog.
//!
//! `required_count` is the completion threshold for counter-style entries;
//! detection-style entries (night owl, streaks) are awarded in one jump by
//! the engine once their condition holds.

#[derive(Debug, Clone)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub emoji: &'static str,
    pub points: u32,
    pub required_count: u32,
    /// Guild role granted on unlock, when the bot may manage roles.
    pub role_name: Option<&'static str>,
    /// Hidden from listings until unlocked.
    pub secret: bool,
}

const CATALOG: &[Achievement] = &[
    // Education
    Achievement {
        id: "first_question",
        name: "Curious Mind",
        description: "Ask your first practice question",
        emoji: "🎯",
        points: 10,
        required_count: 1,
        role_name: Some("Curious Mind"),
        secret: false,
    },
    Achievement {
        id: "knowledge_seeker",
        name: "Knowledge Seeker",
        description: "Use practice questions from 5 different subjects",
        emoji: "📚",
        points: 50,
        required_count: 5,
        role_name: Some("Knowledge Seeker"),
        secret: false,
    },
    Achievement {
        id: "master_student",
        name: "Master Student",
        description: "Complete 100 practice questions",
        emoji: "🎓",
        points: 100,
        required_count: 100,
        role_name: Some("Master Student"),
        secret: false,
    },
    Achievement {
        id: "subject_specialist",
        name: "Subject Specialist",
        description: "Complete 25 practice questions in a single subject",
        emoji: "🔬",
        points: 60,
        required_count: 1,
        role_name: Some("Subject Specialist"),
        secret: false,
    },
    // Music
    Achievement {
        id: "music_lover",
        name: "Music Enthusiast",
        description: "Play your first song",
        emoji: "🎵",
        points: 10,
        required_count: 1,
        role_name: Some("Music Enthusiast"),
        secret: false,
    },
    Achievement {
        id: "playlist_master",
        name: "Playlist Master",
        description: "Create a queue with 10 songs",
        emoji: "🎶",
        points: 30,
        required_count: 1,
        role_name: Some("Playlist Master"),
        secret: false,
    },
    // AI interaction
    Achievement {
        id: "ai_explorer",
        name: "AI Explorer",
        description: "Have your first AI conversation",
        emoji: "🤖",
        points: 20,
        required_count: 1,
        role_name: Some("AI Explorer"),
        secret: false,
    },
    Achievement {
        id: "deep_thinker",
        name: "Deep Thinker",
        description: "Ask 50 questions to AI",
        emoji: "🧠",
        points: 75,
        required_count: 50,
        role_name: Some("Deep Thinker"),
        secret: false,
    },
    // Consistency
    Achievement {
        id: "streak_scholar",
        name: "Streak Scholar",
        description: "Study on 7 consecutive days",
        emoji: "🔥",
        points: 80,
        required_count: 1,
        role_name: Some("Streak Scholar"),
        secret: false,
    },
    Achievement {
        id: "weekend_warrior",
        name: "Weekend Warrior",
        description: "Study on both days of a weekend",
        emoji: "🛡️",
        points: 40,
        required_count: 1,
        role_name: Some("Weekend Warrior"),
        secret: false,
    },
    // Secret
    Achievement {
        id: "night_owl",
        name: "Night Owl",
        description: "Study after midnight",
        emoji: "🦉",
        points: 25,
        required_count: 1,
        role_name: Some("Night Owl"),
        secret: true,
    },
    Achievement {
        id: "speed_learner",
        name: "Speed Learner",
        description: "Complete 5 questions in under 5 minutes",
        emoji: "⚡",
        points: 50,
        required_count: 1,
        role_name: Some("Speed Learner"),
        secret: true,
    },
];

pub fn catalog() -> &'static [Achievement] {
    CATALOG
}

pub fn find(id: &str) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.id == id)
}

/// Deterministic role color: more points shift red up and green down, blue
/// stays constant so the achievement palette reads as one family.
pub fn color_for_points(points: u32) -> (u8, u8, u8) {
    let r = (points.saturating_mul(2)).min(255) as u8;
    let g = 255u32.saturating_sub(points) as u8;
    (r, g, 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<&str> = CATALOG.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn find_known_and_unknown() {
        assert_eq!(find("first_question").unwrap().points, 10);
        assert!(find("no_such_thing").is_none());
    }

    #[test]
    fn secret_entries_exist() {
        assert!(CATALOG.iter().any(|a| a.secret));
    }

    #[test]
    fn color_function_is_clamped() {
        assert_eq!(color_for_points(0), (0, 255, 255));
        assert_eq!(color_for_points(100), (200, 155, 255));
        assert_eq!(color_for_points(300), (255, 0, 255));
    }
}
