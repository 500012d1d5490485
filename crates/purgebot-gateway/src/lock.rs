//! Shared-secret guard for destructive queue commands.

use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Locked,
    AlreadyLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Password matched, or nothing was locked.
    Unlocked,
    WrongPassword,
}

/// Process-wide optional password. Never expires.
#[derive(Debug, Default)]
pub struct LockState {
    password: Mutex<Option<String>>,
}

impl LockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the password unless one is already set.
    pub async fn lock(&self, secret: &str) -> LockOutcome {
        let mut password = self.password.lock().await;
        if password.is_some() {
            return LockOutcome::AlreadyLocked;
        }
        *password = Some(secret.to_string());
        LockOutcome::Locked
    }

    pub async fn unlock(&self, secret: &str) -> UnlockOutcome {
        let mut password = self.password.lock().await;
        match password.as_deref() {
            None => UnlockOutcome::Unlocked,
            Some(current) if current == secret => {
                *password = None;
                UnlockOutcome::Unlocked
            }
            Some(_) => UnlockOutcome::WrongPassword,
        }
    }

    pub async fn is_locked(&self) -> bool {
        self.password.lock().await.is_some()
    }

    #[cfg(test)]
    pub(crate) async fn password(&self) -> Option<String> {
        self.password.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_lock_rejected() {
        let state = LockState::new();
        assert_eq!(state.lock("a").await, LockOutcome::Locked);
        assert_eq!(state.lock("b").await, LockOutcome::AlreadyLocked);
        assert_eq!(state.password().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_unlock_when_unset() {
        let state = LockState::new();
        assert_eq!(state.unlock("a").await, UnlockOutcome::Unlocked);
        assert!(!state.is_locked().await);
    }

    #[tokio::test]
    async fn test_unlock_wrong_then_right() {
        let state = LockState::new();
        state.lock("a").await;
        assert_eq!(state.unlock("b").await, UnlockOutcome::WrongPassword);
        assert_eq!(state.password().await.as_deref(), Some("a"));
        assert_eq!(state.unlock("a").await, UnlockOutcome::Unlocked);
        assert!(!state.is_locked().await);
    }
}
