use std::collections::{HashMap, HashSet};

/// In-memory record of analyzed targets and of the notifications already
/// sent, so each one goes out at most once per process lifetime.
///
/// Owned by the poll loop and only touched from it; every `should_*` call
/// checks and records in one step.
#[derive(Debug, Default, Clone)]
pub struct NotificationLedger {
    analyzed: HashSet<String>,
    already_analyzed_notified: HashMap<String, HashSet<String>>,
    self_analysis_notified: HashSet<String>,
    multi_analysis_notified: HashSet<String>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `target` is seen. The target is marked before the
    /// pipeline runs.
    pub fn should_run_analysis(&mut self, target: &str) -> bool {
        if self.analyzed.contains(target) {
            return false;
        }
        self.analyzed.insert(target.to_string())
    }

    pub fn should_notify_already_analyzed(&mut self, requester: &str, target: &str) -> bool {
        let targets = self
            .already_analyzed_notified
            .entry(requester.to_string())
            .or_default();
        if targets.contains(target) {
            return false;
        }
        targets.insert(target.to_string())
    }

    pub fn should_notify_self_analysis(&mut self, requester: &str) -> bool {
        record_once(&mut self.self_analysis_notified, requester)
    }

    pub fn should_notify_multi_analysis(&mut self, requester: &str) -> bool {
        record_once(&mut self.multi_analysis_notified, requester)
    }

    #[cfg(test)]
    pub fn is_analyzed(&self, target: &str) -> bool {
        self.analyzed.contains(target)
    }

    pub fn analyzed_count(&self) -> usize {
        self.analyzed.len()
    }
}

fn record_once(set: &mut HashSet<String>, requester: &str) -> bool {
    if set.contains(requester) {
        return false;
    }
    set.insert(requester.to_string())
}
