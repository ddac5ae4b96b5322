use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use mentor_core::events::InviteSnapshot;

/// Per-code attribution record.
#[derive(Debug, Clone)]
pub struct InviteRecord {
    pub guild_id: u64,
    pub inviter_id: Option<u64>,
    pub joined_user_ids: Vec<u64>,
    pub left_user_ids: Vec<u64>,
    /// `uses` at the time the code was last snapshotted.
    pub uses_baseline: u64,
}

/// Per-inviter aggregate. `valid()` is the leaderboard metric.
#[derive(Debug, Clone, Default)]
pub struct InviterStats {
    pub count: u32,
    pub leaves: u32,
    pub fakes: u32,
    pub history: Vec<DateTime<Utc>>,
}

impl InviterStats {
    /// Valid invites: total minus departures minus flagged fakes.
    pub fn valid(&self) -> i64 {
        self.count as i64 - self.leaves as i64 - self.fakes as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowStats {
    pub today: usize,
    pub last_3_days: usize,
    pub last_week: usize,
}

/// The ledger itself. One per process, owned by the event loop.
#[derive(Debug, Default)]
pub struct InviteLedger {
    records: HashMap<String, InviteRecord>,
    inviters: HashMap<u64, InviterStats>,
    /// Last seen snapshot per guild, diffed against on every join.
    cache: HashMap<u64, Vec<InviteSnapshot>>,
}

impl InviteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot for a guild (startup / Ready).
    pub fn cache_guild(&mut self, guild_id: u64, snapshot: Vec<InviteSnapshot>) {
        for inv in &snapshot {
            self.records
                .entry(inv.code.clone())
                .or_insert_with(|| InviteRecord {
                    guild_id,
                    inviter_id: inv.inviter_id,
                    joined_user_ids: Vec::new(),
                    left_user_ids: Vec::new(),
                    uses_baseline: inv.uses,
                });
        }
        debug!(guild_id, invites = snapshot.len(), "invite snapshot cached");
        self.cache.insert(guild_id, snapshot);
    }

    /// A new invite was created while we were connected.
    pub fn on_invite_create(
        &mut self,
        guild_id: u64,
        code: &str,
        inviter_id: Option<u64>,
        uses: u64,
    ) {
        self.records.insert(
            code.to_string(),
            InviteRecord {
                guild_id,
                inviter_id,
                joined_user_ids: Vec::new(),
                left_user_ids: Vec::new(),
                uses_baseline: uses,
            },
        );
        if let Some(entry) = self.cache.get_mut(&guild_id) {
            entry.push(InviteSnapshot {
                code: code.to_string(),
                inviter_id,
                uses,
            });
        }
    }

    /// Attribute a join by diffing the cached snapshot against `fresh`.
    ///
    /// Returns `(code, inviter_id)` when exactly one invite's `uses` grew.
    /// The fresh snapshot always replaces the cache, so a missed attribution
    /// does not poison future joins.
    pub fn record_join(
        &mut self,
        guild_id: u64,
        user_id: u64,
        fresh: Vec<InviteSnapshot>,
    ) -> Option<(String, u64)> {
        let cached = self.cache.get(&guild_id).cloned().unwrap_or_default();

        let mut credited = None;
        for old in &cached {
            let grew = fresh
                .iter()
                .find(|new| new.code == old.code)
                .is_some_and(|new| new.uses > old.uses);
            if !grew {
                continue;
            }
            let Some(inviter_id) = old.inviter_id else {
                continue;
            };

            let stats = self.inviters.entry(inviter_id).or_default();
            stats.count += 1;
            stats.history.push(Utc::now());

            if let Some(record) = self.records.get_mut(&old.code) {
                record.joined_user_ids.push(user_id);
            }

            info!(user_id, inviter_id, code = %old.code, "join credited to invite");
            credited = Some((old.code.clone(), inviter_id));
            break;
        }

        self.cache.insert(guild_id, fresh);
        credited
    }

    /// A member left: charge a leave to whoever invited them.
    pub fn record_leave(&mut self, user_id: u64) -> Option<u64> {
        for record in self.records.values_mut() {
            if !record.joined_user_ids.contains(&user_id) {
                continue;
            }
            record.left_user_ids.push(user_id);
            let inviter_id = record.inviter_id?;
            let stats = self.inviters.entry(inviter_id).or_default();
            stats.leaves += 1;
            info!(user_id, inviter_id, "departure charged to inviter");
            return Some(inviter_id);
        }
        None
    }

    pub fn stats(&self, user_id: u64) -> InviterStats {
        self.inviters.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn record(&self, code: &str) -> Option<&InviteRecord> {
        self.records.get(code)
    }

    pub fn time_stats(&self, user_id: u64, now: DateTime<Utc>) -> TimeWindowStats {
        let history = self
            .inviters
            .get(&user_id)
            .map(|s| s.history.as_slice())
            .unwrap_or_default();
        let within = |days: i64| {
            history
                .iter()
                .filter(|t| now.signed_duration_since(**t) <= Duration::days(days))
                .count()
        };
        TimeWindowStats {
            today: within(1),
            last_3_days: within(3),
            last_week: within(7),
        }
    }

    /// Top inviters by valid-invite count, descending.
    pub fn leaderboard(&self, limit: usize) -> Vec<(u64, i64)> {
        let mut entries: Vec<(u64, i64)> = self
            .inviters
            .iter()
            .map(|(id, stats)| (*id, stats.valid()))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }

    // --- admin adjustments --------------------------------------------------

    pub fn add_invites(&mut self, user_id: u64, amount: u32) {
        let stats = self.inviters.entry(user_id).or_default();
        stats.count += amount;
    }

    pub fn remove_invites(&mut self, user_id: u64, amount: u32) -> bool {
        match self.inviters.get_mut(&user_id) {
            Some(stats) => {
                stats.count = stats.count.saturating_sub(amount);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self, user_id: u64) -> bool {
        match self.inviters.get_mut(&user_id) {
            Some(stats) => {
                stats.count = 0;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(code: &str, inviter: u64, uses: u64) -> InviteSnapshot {
        InviteSnapshot {
            code: code.into(),
            inviter_id: Some(inviter),
            uses,
        }
    }

    #[test]
    fn join_credits_the_grown_invite() {
        let mut ledger = InviteLedger::new();
        ledger.cache_guild(1, vec![snap("ABCD", 100, 3), snap("WXYZ", 200, 7)]);

        let credited = ledger.record_join(1, 555, vec![snap("ABCD", 100, 4), snap("WXYZ", 200, 7)]);
        assert_eq!(credited, Some(("ABCD".into(), 100)));

        let stats = ledger.stats(100);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.valid(), 1);
        assert_eq!(ledger.record("ABCD").unwrap().joined_user_ids, vec![555]);
        // The uncredited inviter is untouched.
        assert_eq!(ledger.stats(200).count, 0);
    }

    #[test]
    fn join_with_no_growth_is_unattributed() {
        let mut ledger = InviteLedger::new();
        ledger.cache_guild(1, vec![snap("ABCD", 100, 3)]);
        let credited = ledger.record_join(1, 555, vec![snap("ABCD", 100, 3)]);
        assert_eq!(credited, None);
        // Cache still refreshed.
        let credited = ledger.record_join(1, 556, vec![snap("ABCD", 100, 4)]);
        assert_eq!(credited, Some(("ABCD".into(), 100)));
    }

    #[test]
    fn leave_charges_the_inviter_once() {
        let mut ledger = InviteLedger::new();
        ledger.cache_guild(1, vec![snap("ABCD", 100, 0)]);
        ledger.record_join(1, 555, vec![snap("ABCD", 100, 1)]);

        assert_eq!(ledger.record_leave(555), Some(100));
        let stats = ledger.stats(100);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.valid(), 0);
        assert_eq!(ledger.record("ABCD").unwrap().left_user_ids, vec![555]);

        // Unknown users charge nobody.
        assert_eq!(ledger.record_leave(9999), None);
    }

    #[test]
    fn accounting_identity_holds() {
        let mut ledger = InviteLedger::new();
        ledger.cache_guild(1, vec![snap("ABCD", 100, 0)]);
        for (i, uses) in (1..=4).enumerate() {
            ledger.record_join(1, 500 + i as u64, vec![snap("ABCD", 100, uses)]);
        }
        ledger.record_leave(500);
        ledger.record_leave(501);

        let stats = ledger.stats(100);
        assert_eq!(
            stats.valid() + stats.leaves as i64 + stats.fakes as i64,
            stats.count as i64
        );
    }

    #[test]
    fn invite_create_is_tracked_for_later_joins() {
        let mut ledger = InviteLedger::new();
        ledger.cache_guild(1, vec![]);
        ledger.on_invite_create(1, "NEW1", Some(300), 0);

        let credited = ledger.record_join(1, 42, vec![snap("NEW1", 300, 1)]);
        assert_eq!(credited, Some(("NEW1".into(), 300)));
    }

    #[test]
    fn leaderboard_orders_by_valid_invites() {
        let mut ledger = InviteLedger::new();
        ledger.add_invites(1, 5);
        ledger.add_invites(2, 8);
        ledger.add_invites(3, 2);
        // Two departures knock user 2 down.
        ledger.inviters.get_mut(&2).unwrap().leaves = 4;

        let board = ledger.leaderboard(10);
        assert_eq!(board, vec![(1, 5), (2, 4), (3, 2)]);

        let board = ledger.leaderboard(2);
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn admin_adjustments_saturate() {
        let mut ledger = InviteLedger::new();
        assert!(!ledger.remove_invites(7, 3));
        ledger.add_invites(7, 2);
        assert!(ledger.remove_invites(7, 5));
        assert_eq!(ledger.stats(7).count, 0);
        assert!(ledger.reset(7));
    }

    #[test]
    fn time_windows_bucket_history() {
        let mut ledger = InviteLedger::new();
        let now = Utc::now();
        let stats = ledger.inviters.entry(9).or_default();
        stats.count = 3;
        stats.history = vec![
            now - Duration::hours(2),
            now - Duration::days(2),
            now - Duration::days(6),
        ];

        let windows = ledger.time_stats(9, now);
        assert_eq!(windows.today, 1);
        assert_eq!(windows.last_3_days, 2);
        assert_eq!(windows.last_week, 3);
    }
}
