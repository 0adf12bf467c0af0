use std::collections::{BTreeMap, BTreeSet};

/// Which recipients each caller may address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    routes: BTreeMap<String, BTreeSet<String>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for self-addressed or already known routes.
    pub fn allow(&mut self, caller: impl Into<String>, recipient: impl Into<String>) -> bool {
        let (caller, recipient) = (caller.into(), recipient.into());
        if caller == recipient {
            return false;
        }
        self.routes.entry(caller).or_default().insert(recipient)
    }

    pub fn can_message(&self, caller: &str, recipient: &str) -> bool {
        self.routes
            .get(caller)
            .is_some_and(|recipients| recipients.contains(recipient))
    }

    pub fn recipients(&self, caller: &str) -> Vec<String> {
        self.routes
            .get(caller)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn callers(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_are_directed() {
        let mut roster = Roster::new();
        assert!(roster.allow("ceo", "dev"));
        assert!(roster.can_message("ceo", "dev"));
        assert!(!roster.can_message("dev", "ceo"));
    }

    #[test]
    fn self_routes_are_ignored() {
        let mut roster = Roster::new();
        assert!(!roster.allow("ceo", "ceo"));
        assert!(roster.is_empty());
    }

    #[test]
    fn recipients_are_sorted_and_unique() {
        let mut roster = Roster::new();
        roster.allow("ceo", "qa");
        roster.allow("ceo", "dev");
        assert!(!roster.allow("ceo", "dev"));
        assert_eq!(roster.recipients("ceo"), vec!["dev", "qa"]);
        assert!(roster.recipients("nobody").is_empty());
    }
}
