use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::services::profile::LearnerProfile;
use crate::services::session::LessonSession;

/// `(userId, language, lessonId)`.
type SessionKey = (String, String, String);
/// `(userId, language)`.
type ProfileKey = (String, String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("an active session already exists")]
    SessionExists,
    #[error("document not found")]
    NotFound,
    #[error("stale session version: expected {expected}, got {got}")]
    VersionConflict { expected: u64, got: u64 },
}

/// In-memory document store. Stands in for the external document store the
/// deployment provides; the versioned update contract is what makes the
/// at-most-one-writer assumption enforceable.
#[derive(Debug, Default)]
pub struct DocumentStore {
    sessions: RwLock<HashMap<SessionKey, LessonSession>>,
    profiles: RwLock<HashMap<ProfileKey, LearnerProfile>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Sessions ==========

    pub fn insert_session(&self, session: LessonSession) -> Result<(), StoreError> {
        let key = session_key(&session);
        let mut sessions = self.sessions.write();
        if let Some(existing) = sessions.get(&key) {
            if !existing.is_complete() {
                return Err(StoreError::SessionExists);
            }
        }
        sessions.insert(key, session);
        Ok(())
    }

    pub fn find_session(
        &self,
        user_id: &str,
        language: &str,
        lesson_id: &str,
    ) -> Option<LessonSession> {
        self.sessions
            .read()
            .get(&(
                user_id.to_string(),
                language.to_string(),
                lesson_id.to_string(),
            ))
            .cloned()
    }

    /// Most recently updated session for `(userId, language)`.
    pub fn find_active(&self, user_id: &str, language: &str) -> Option<LessonSession> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.user_id == user_id && s.language == language)
            .max_by_key(|s| s.updated_at)
            .cloned()
    }

    /// Most recently updated session for a user across languages.
    pub fn find_latest(&self, user_id: &str) -> Option<LessonSession> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.updated_at)
            .cloned()
    }

    /// Replaces a session document if the caller's version token matches the
    /// stored one; bumps the token. Two racing submits cannot both win.
    pub fn update_session(&self, mut session: LessonSession) -> Result<LessonSession, StoreError> {
        let key = session_key(&session);
        let mut sessions = self.sessions.write();
        let stored = sessions.get(&key).ok_or(StoreError::NotFound)?;
        if stored.version != session.version {
            return Err(StoreError::VersionConflict {
                expected: stored.version,
                got: session.version,
            });
        }
        session.version += 1;
        sessions.insert(key, session.clone());
        Ok(session)
    }

    pub fn delete_session(&self, user_id: &str, language: &str, lesson_id: &str) -> bool {
        self.sessions
            .write()
            .remove(&(
                user_id.to_string(),
                language.to_string(),
                lesson_id.to_string(),
            ))
            .is_some()
    }

    // ========== Profiles ==========

    pub fn find_profile(&self, user_id: &str, language: &str) -> Option<LearnerProfile> {
        self.profiles
            .read()
            .get(&(user_id.to_string(), language.to_string()))
            .cloned()
    }

    /// Runs a mutation against the profile document, creating it on first
    /// touch.
    pub fn with_profile_mut<R>(
        &self,
        user_id: &str,
        language: &str,
        now_ms: i64,
        f: impl FnOnce(&mut LearnerProfile) -> R,
    ) -> R {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .entry((user_id.to_string(), language.to_string()))
            .or_insert_with(|| LearnerProfile::new(user_id, language, now_ms));
        f(profile)
    }
}

fn session_key(session: &LessonSession) -> SessionKey {
    (
        session.user_id.clone(),
        session.language.clone(),
        session.lesson_id.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::intent::SupportLevel;

    fn session(user: &str, language: &str, lesson: &str, updated_at: i64) -> LessonSession {
        let mut s = LessonSession::start(user, language, lesson, SupportLevel::Medium, None, 0);
        s.updated_at = updated_at;
        s
    }

    #[test]
    fn duplicate_active_session_is_rejected() {
        let store = DocumentStore::new();
        store.insert_session(session("u1", "en", "basic-1", 1)).unwrap();
        assert_eq!(
            store.insert_session(session("u1", "en", "basic-1", 2)),
            Err(StoreError::SessionExists)
        );
    }

    #[test]
    fn completed_session_can_be_replaced() {
        let store = DocumentStore::new();
        let mut done = session("u1", "en", "basic-1", 1);
        done.state = crate::services::session::SessionState::Complete;
        store.insert_session(done).unwrap();
        assert!(store.insert_session(session("u1", "en", "basic-1", 2)).is_ok());
    }

    #[test]
    fn find_active_returns_most_recent() {
        let store = DocumentStore::new();
        store.insert_session(session("u1", "en", "basic-1", 10)).unwrap();
        store.insert_session(session("u1", "en", "basic-2", 20)).unwrap();

        let found = store.find_active("u1", "en").unwrap();
        assert_eq!(found.lesson_id, "basic-2");
    }

    #[test]
    fn versioned_update_rejects_stale_token() {
        let store = DocumentStore::new();
        store.insert_session(session("u1", "en", "basic-1", 1)).unwrap();

        let fresh = store.find_session("u1", "en", "basic-1").unwrap();
        let updated = store.update_session(fresh.clone()).unwrap();
        assert_eq!(updated.version, 1);

        // A second writer still holding the original document loses.
        assert!(matches!(
            store.update_session(fresh),
            Err(StoreError::VersionConflict { .. })
        ));
    }

    #[test]
    fn profile_created_on_first_touch() {
        let store = DocumentStore::new();
        assert!(store.find_profile("u1", "en").is_none());
        let count = store.with_profile_mut("u1", "en", 5, |p| p.review_items.len());
        assert_eq!(count, 0);
        assert!(store.find_profile("u1", "en").is_some());
    }
}
