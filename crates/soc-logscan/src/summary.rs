//! Attempt aggregation and summary rendering

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Write};

/// Offending IPs listed in a summary
pub const MAX_OFFENDERS: usize = 10;

/// Targeted users listed per offender and in the user ranking
pub const MAX_TOP_USERS: usize = 5;

const UNKNOWN: &str = "unknown";

/// One recorded authentication session
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionEntry {
    /// Source address
    #[serde(default)]
    pub foreign_ip: Option<String>,
    /// Targeted account
    #[serde(default)]
    pub username: Option<String>,
    /// Passwords tried in the session
    #[serde(default)]
    pub passwords: Option<Vec<serde_json::Value>>,
}

impl SessionEntry {
    /// Failed attempts this session represents
    #[must_use]
    pub fn attempts(&self) -> u64 {
        match &self.passwords {
            Some(p) if !p.is_empty() => p.len() as u64,
            _ => 1,
        }
    }
}

/// Source IP at or above the threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offender {
    /// Source address
    pub ip: String,
    /// Total attempts from this address
    pub attempts: u64,
    /// First targeted accounts, sorted
    pub targeted_users: Vec<String>,
}

/// Aggregated brute-force picture of a session log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BruteForceSummary {
    /// Attempts across all sessions
    pub total_attempts: u64,
    /// Distinct source addresses
    pub unique_ips: usize,
    /// Offenders, most attempts first, ties by IP
    pub offenders: Vec<Offender>,
    /// Most targeted accounts with their attempt counts
    pub top_users: Vec<(String, u64)>,
    /// Threshold used
    pub threshold: u32,
}

impl BruteForceSummary {
    /// Aggregate sessions against an offender threshold
    #[must_use]
    pub fn from_entries(entries: &[SessionEntry], threshold: u32) -> Self {
        let mut ip_attempts: HashMap<&str, u64> = HashMap::new();
        let mut user_attempts: HashMap<&str, u64> = HashMap::new();
        let mut ip_users: HashMap<&str, BTreeSet<&str>> = HashMap::new();

        for entry in entries {
            let ip = entry.foreign_ip.as_deref().unwrap_or(UNKNOWN);
            let user = entry.username.as_deref().unwrap_or(UNKNOWN);
            let attempts = entry.attempts();

            *ip_attempts.entry(ip).or_default() += attempts;
            *user_attempts.entry(user).or_default() += attempts;
            ip_users.entry(ip).or_default().insert(user);
        }

        let mut offenders: Vec<Offender> = ip_attempts
            .iter()
            .filter(|(_, count)| **count >= u64::from(threshold))
            .map(|(&ip, &attempts)| Offender {
                ip: ip.to_string(),
                attempts,
                targeted_users: ip_users
                    .get(ip)
                    .map(|users| {
                        users
                            .iter()
                            .take(MAX_TOP_USERS)
                            .map(|u| (*u).to_string())
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();
        offenders.sort_by(|a, b| b.attempts.cmp(&a.attempts).then_with(|| a.ip.cmp(&b.ip)));
        offenders.truncate(MAX_OFFENDERS);

        let mut top_users: Vec<(String, u64)> = user_attempts
            .into_iter()
            .map(|(user, count)| (user.to_string(), count))
            .collect();
        top_users.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_users.truncate(MAX_TOP_USERS);

        Self {
            total_attempts: ip_attempts.values().sum(),
            unique_ips: ip_attempts.len(),
            offenders,
            top_users,
            threshold,
        }
    }
}

impl fmt::Display for BruteForceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(out, "--- Log Analysis Summary: Brute Force Detection ---")?;
        writeln!(out, "Total Login Attempts Processed: {}", self.total_attempts)?;
        writeln!(out, "Unique Source IPs: {}", self.unique_ips)?;
        writeln!(out)?;
        writeln!(out, "Top Offending IPs (attempts >= {}):", self.threshold)?;
        for offender in &self.offenders {
            writeln!(
                out,
                "- IP: {} | Attempts: {} | Targeted Users: {}",
                offender.ip,
                offender.attempts,
                offender.targeted_users.join(", ")
            )?;
        }
        writeln!(out)?;
        writeln!(out, "Most Targeted User Accounts:")?;
        for (user, count) in &self.top_users {
            writeln!(out, "- User: {user} | Total Attempts: {count}")?;
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entry(ip: &str, user: &str, passwords: usize) -> SessionEntry {
        SessionEntry {
            foreign_ip: Some(ip.to_string()),
            username: Some(user.to_string()),
            passwords: Some(vec![serde_json::Value::from("x"); passwords]),
        }
    }

    #[test]
    fn empty_or_missing_passwords_count_once() {
        assert_eq!(SessionEntry::default().attempts(), 1);
        assert_eq!(entry("a", "b", 0).attempts(), 1);
        assert_eq!(entry("a", "b", 7).attempts(), 7);
    }

    #[test]
    fn offenders_filtered_and_ordered() {
        let entries = vec![
            entry("10.0.0.2", "root", 60),
            entry("10.0.0.1", "admin", 60),
            entry("10.0.0.3", "root", 200),
            entry("10.0.0.4", "guest", 10),
            entry("10.0.0.3", "admin", 1),
        ];
        let summary = BruteForceSummary::from_entries(&entries, 50);

        let ips: Vec<_> = summary.offenders.iter().map(|o| o.ip.as_str()).collect();
        assert_eq!(ips, vec!["10.0.0.3", "10.0.0.1", "10.0.0.2"]);
        assert_eq!(summary.offenders[0].attempts, 201);
        assert_eq!(
            summary.offenders[0].targeted_users,
            vec!["admin".to_string(), "root".to_string()]
        );
        assert_eq!(summary.total_attempts, 331);
        assert_eq!(summary.unique_ips, 4);
        assert_eq!(summary.top_users[0], ("root".to_string(), 260));
    }

    #[test]
    fn missing_fields_aggregate_as_unknown() {
        let summary = BruteForceSummary::from_entries(&[SessionEntry::default()], 1);
        assert_eq!(summary.offenders[0].ip, "unknown");
        assert_eq!(summary.top_users, vec![("unknown".to_string(), 1)]);
    }

    #[test]
    fn rendering_lists_offenders_and_users() {
        let summary = BruteForceSummary::from_entries(&[entry("192.168.1.105", "root", 120)], 50);
        let text = summary.to_string();

        assert!(text.starts_with("--- Log Analysis Summary: Brute Force Detection ---\n"));
        assert!(text.contains("- IP: 192.168.1.105 | Attempts: 120 | Targeted Users: root\n"));
        assert!(text.contains("- User: root | Total Attempts: 120\n"));
    }

    proptest! {
        #[test]
        fn summary_respects_bounds(
            sessions in proptest::collection::vec((0u8..30, 0u8..20, 0usize..40), 0..200),
            threshold in 1u32..100,
        ) {
            let entries: Vec<_> = sessions
                .iter()
                .map(|(ip, user, n)| entry(&format!("10.0.0.{ip}"), &format!("user{user}"), *n))
                .collect();
            let summary = BruteForceSummary::from_entries(&entries, threshold);

            prop_assert!(summary.offenders.len() <= MAX_OFFENDERS);
            prop_assert!(summary.top_users.len() <= MAX_TOP_USERS);
            for pair in summary.offenders.windows(2) {
                prop_assert!(pair[0].attempts >= pair[1].attempts);
            }
            for offender in &summary.offenders {
                prop_assert!(offender.attempts >= u64::from(threshold));
                prop_assert!(offender.targeted_users.len() <= MAX_TOP_USERS);
            }
        }
    }
}
