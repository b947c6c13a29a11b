use std::sync::atomic::{AtomicBool, Ordering};

/// Answers whether remote calls may be made on the user's behalf.
pub trait Authenticator: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn sign_out(&self);
}

/// Process-local sign-in flag.
#[derive(Debug, Default)]
pub struct Session {
    signed_in: AtomicBool,
}

impl Session {
    pub fn signed_in() -> Self {
        Self {
            signed_in: AtomicBool::new(true),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self) {
        self.signed_in.store(true, Ordering::SeqCst);
    }
}

impl Authenticator for Session {
    fn is_authenticated(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    fn sign_out(&self) {
        self.signed_in.store(false, Ordering::SeqCst);
    }
}
