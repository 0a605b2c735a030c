//! Per-user model selections, kept in memory for the process lifetime.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use teloxide::types::UserId;

use crate::models;

/// Rejected model name from a `/model` command.
#[derive(Debug, PartialEq, Eq)]
pub struct InvalidModel(pub String);

impl fmt::Display for InvalidModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown model '{}'", self.0)
    }
}

impl std::error::Error for InvalidModel {}

/// Storage for user model selections.
///
/// Handlers only see this trait, so the in-memory map can be swapped for a
/// persistent store without touching them.
pub trait PreferenceStore: Send + Sync {
    /// Selected model for `user`, or the default when none was stored.
    fn get(&self, user: UserId) -> &'static str;

    /// Store a selection. Fails on unregistered model names and leaves the
    /// previous selection in place.
    fn set(&self, user: UserId, model: &str) -> Result<(), InvalidModel>;
}

/// In-memory store. Selections are lost on restart.
pub struct MemoryPreferences {
    selections: RwLock<HashMap<UserId, &'static str>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self {
            selections: RwLock::new(HashMap::new()),
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, user: UserId) -> &'static str {
        self.selections
            .read()
            .expect("preference lock poisoned")
            .get(&user)
            .copied()
            .unwrap_or(models::DEFAULT_MODEL)
    }

    fn set(&self, user: UserId, model: &str) -> Result<(), InvalidModel> {
        let id = models::canonical(model).ok_or_else(|| InvalidModel(model.to_string()))?;
        self.selections
            .write()
            .expect("preference lock poisoned")
            .insert(user, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: UserId = UserId(923847);
    const BOB: UserId = UserId(182736);

    #[test]
    fn test_set_then_get_roundtrip() {
        let prefs = MemoryPreferences::new();
        for model in models::SUPPORTED_MODELS {
            prefs.set(ALICE, model.id).expect("registered model");
            assert_eq!(prefs.get(ALICE), model.id);
        }
    }

    #[test]
    fn test_unknown_user_gets_default() {
        let prefs = MemoryPreferences::new();
        assert_eq!(prefs.get(BOB), models::DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_set_fails_and_keeps_prior_value() {
        let prefs = MemoryPreferences::new();
        prefs.set(ALICE, "llama2-70b").unwrap();

        let err = prefs.set(ALICE, "gpt-4").unwrap_err();
        assert_eq!(err, InvalidModel("gpt-4".to_string()));
        assert_eq!(prefs.get(ALICE), "llama2-70b");
    }

    #[test]
    fn test_invalid_set_for_fresh_user_keeps_default() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.set(BOB, "not-a-model").is_err());
        assert_eq!(prefs.get(BOB), models::DEFAULT_MODEL);
    }

    #[test]
    fn test_overwrite_replaces_selection() {
        let prefs = MemoryPreferences::new();
        prefs.set(ALICE, "gemini-pro").unwrap();
        prefs.set(ALICE, "j2-light").unwrap();
        assert_eq!(prefs.get(ALICE), "j2-light");
    }

    #[test]
    fn test_selections_are_per_user() {
        let prefs = MemoryPreferences::new();
        prefs.set(ALICE, "mistral-7b-instruct").unwrap();
        assert_eq!(prefs.get(BOB), models::DEFAULT_MODEL);
    }
}
