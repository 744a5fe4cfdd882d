// ABOUTME: Session store - single source of truth for the authenticated identity
// ABOUTME: Atomic auth snapshots, ordered change application, and subscriptions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Session store
//!
//! [`SessionManager`] owns the current auth state. It is constructed once at
//! process start and handed to consumers by handle; there is no ambient
//! global.
//!
//! State transitions are atomic with respect to observers: the role and
//! display name are recomputed from the incoming identity inside the same
//! critical section that swaps the snapshot, so no observer ever sees a role
//! computed from a stale identity.
//!
//! On construction the store performs one asynchronous fetch of any existing
//! session. Until that resolves, the snapshot reports `loading = true` and
//! consumers must not treat the absent identity as "signed out". Afterwards
//! a single spawned task applies backend change events strictly in receipt
//! order, one at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::factory::Backend;
use crate::backend::{AuthBackend, AuthChangeStream};
use crate::errors::AppResult;
use crate::models::{AuthChange, Identity, Session};
use crate::roles::{RoleProfile, UserRole};

/// Read-only view of the current auth state
///
/// `identity`/`session` are absent when signed out. `role` and
/// `display_name` fall back to `client`/"User" while signed out, matching
/// the shipped app behavior.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    /// The authenticated user, if any
    pub identity: Option<Identity>,
    /// The active session, if any
    pub session: Option<Session>,
    /// Role resolved from the identity
    pub role: UserRole,
    /// Display name resolved from the identity
    pub display_name: String,
    /// True until the initial session restore has resolved
    pub loading: bool,
}

impl AuthSnapshot {
    fn initial() -> Self {
        let profile = RoleProfile::default();
        Self {
            identity: None,
            session: None,
            role: profile.role,
            display_name: profile.display_name,
            loading: true,
        }
    }

    fn from_session(session: Option<Session>, loading: bool) -> Self {
        let profile = RoleProfile::resolve(session.as_ref().map(|s| &s.identity));
        Self {
            identity: session.as_ref().map(|s| s.identity.clone()),
            session,
            role: profile.role,
            display_name: profile.display_name,
            loading,
        }
    }

    /// Whether an identity is present
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    fn same_state(&self, other: &Self) -> bool {
        self.loading == other.loading
            && self.identity.as_ref().map(|i| i.id) == other.identity.as_ref().map(|i| i.id)
            && self.session.as_ref().map(|s| &s.tokens.access_token)
                == other.session.as_ref().map(|s| &s.tokens.access_token)
    }
}

struct ManagerInner {
    backend: Backend,
    state: RwLock<AuthSnapshot>,
    subscribers: DashMap<u64, mpsc::UnboundedSender<AuthSnapshot>>,
    next_subscriber: AtomicU64,
}

impl ManagerInner {
    /// Swap the snapshot and notify subscribers in one critical section, so
    /// every subscriber observes transitions in the same order the store
    /// applied them. Unchanged state (same identity, token, and loading
    /// flag) is not re-delivered.
    fn apply_session(&self, session: Option<Session>, loading: bool) {
        let snapshot = AuthSnapshot::from_session(session, loading);
        let mut state = self.state.write();
        if state.same_state(&snapshot) {
            return;
        }
        debug!(
            authenticated = snapshot.is_authenticated(),
            role = %snapshot.role,
            loading = snapshot.loading,
            "auth state updated"
        );
        *state = snapshot.clone();
        self.subscribers
            .retain(|_, tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Apply the initial restore result, unless a local operation already
    /// resolved the auth state while the fetch was in flight.
    fn complete_restore(&self, session: Option<Session>) {
        let snapshot = AuthSnapshot::from_session(session, false);
        let mut state = self.state.write();
        if !state.loading {
            debug!("session restore superseded by a local operation");
            return;
        }
        debug!(
            authenticated = snapshot.is_authenticated(),
            "initial session restore resolved"
        );
        *state = snapshot.clone();
        self.subscribers
            .retain(|_, tx| tx.send(snapshot.clone()).is_ok());
    }

    fn apply_change(&self, change: AuthChange) {
        debug!(event = change.kind(), "applying auth change event");
        match change {
            AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(session) => {
                self.apply_session(Some(session), false);
            }
            AuthChange::SignedOut => self.apply_session(None, false),
        }
    }
}

/// Session store handle
///
/// Cheap to clone; clones share the same state, backend, and subscribers.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    /// Connect the store to a backend
    ///
    /// Subscribes to the backend's change stream, then spawns the task that
    /// restores any existing session and applies subsequent change events
    /// sequentially. Requires a running tokio runtime.
    #[must_use]
    pub fn connect(backend: Backend) -> Self {
        // Subscribe before anything else runs so no event is missed between
        // construction and the event loop starting.
        let changes = backend.subscribe_changes();
        let inner = Arc::new(ManagerInner {
            backend,
            state: RwLock::new(AuthSnapshot::initial()),
            subscribers: DashMap::new(),
            next_subscriber: AtomicU64::new(0),
        });

        tokio::spawn(run_event_loop(Arc::downgrade(&inner), changes));
        Self { inner }
    }

    /// Create an account and sign in as it
    ///
    /// Attaches `role: "client"` to the profile metadata when no explicit
    /// role is present, so every account resolves deterministically.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (duplicate email, weak password,
    /// malformed email, unreachable service) unchanged; the store's state is
    /// not modified on failure.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: serde_json::Map<String, serde_json::Value>,
    ) -> AppResult<Session> {
        let mut metadata = profile;
        metadata
            .entry("role")
            .or_insert_with(|| serde_json::Value::String(UserRole::Client.as_str().to_owned()));

        let session = self
            .inner
            .backend
            .create_account(email, password, metadata)
            .await?;
        self.inner.apply_session(Some(session.clone()), false);
        info!(user_id = %session.identity.id, role = %crate::roles::resolve_role(&session.identity), "user signed up");
        Ok(session)
    }

    /// Authenticate existing credentials
    ///
    /// # Errors
    ///
    /// Returns the backend's invalid-credentials error unchanged; the
    /// store's state is not modified on failure.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let session = self.inner.backend.authenticate(email, password).await?;
        self.inner.apply_session(Some(session.clone()), false);
        info!(user_id = %session.identity.id, "user signed in");
        Ok(session)
    }

    /// Invalidate the current session
    ///
    /// Idempotent: signing out while already signed out succeeds without
    /// touching the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot invalidate the session; the
    /// local state is kept in that case.
    pub async fn sign_out(&self) -> AppResult<()> {
        let access_token = self
            .inner
            .state
            .read()
            .session
            .as_ref()
            .map(|s| s.tokens.access_token.clone());

        let Some(access_token) = access_token else {
            debug!("sign-out with no active session");
            return Ok(());
        };

        self.inner.backend.invalidate_session(&access_token).await?;
        self.inner.apply_session(None, false);
        info!("user signed out");
        Ok(())
    }

    /// Request an out-of-band password reset flow
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed email or an unreachable backend.
    /// Neither success nor failure reveals whether the email is registered.
    pub async fn reset_password(&self, email: &str) -> AppResult<()> {
        self.inner.backend.request_password_reset(email).await
    }

    /// Current auth state
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.state.read().clone()
    }

    /// The authenticated identity, if any
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.read().identity.clone()
    }

    /// Resolved role for the current identity (`client` while signed out)
    #[must_use]
    pub fn role(&self) -> UserRole {
        self.inner.state.read().role
    }

    /// Resolved display name for the current identity ("User" while signed out)
    #[must_use]
    pub fn display_name(&self) -> String {
        self.inner.state.read().display_name.clone()
    }

    /// Whether the initial session restore is still pending
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.read().loading
    }

    /// Subscribe to auth state changes
    ///
    /// The current snapshot is delivered first, then every subsequent
    /// transition in application order. Dropping the subscription (or
    /// calling [`Subscription::unsubscribe`]) stops delivery.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        // Hold the state lock while registering so the initial snapshot and
        // later notifications cannot interleave out of order.
        {
            let state = self.inner.state.write();
            let _ = tx.send(state.clone());
            self.inner.subscribers.insert(id, tx);
        }

        Subscription {
            id,
            inner: Arc::clone(&self.inner),
            rx,
        }
    }

    /// Wait until the initial session restore has resolved
    ///
    /// Returns the first snapshot with `loading = false`.
    pub async fn wait_ready(&self) -> AuthSnapshot {
        let mut subscription = self.subscribe();
        loop {
            match subscription.recv().await {
                Some(snapshot) if !snapshot.loading => return snapshot,
                Some(_) => {}
                None => return self.snapshot(),
            }
        }
    }

    /// Descriptive string for the active backend
    #[must_use]
    pub fn backend_info(&self) -> &'static str {
        self.inner.backend.backend_info()
    }
}

/// Active auth state subscription
///
/// Receives snapshots in the order the store applied them. Unsubscribes on
/// drop.
pub struct Subscription {
    id: u64,
    inner: Arc<ManagerInner>,
    rx: mpsc::UnboundedReceiver<AuthSnapshot>,
}

impl Subscription {
    /// Receive the next snapshot
    pub async fn recv(&mut self) -> Option<AuthSnapshot> {
        self.rx.recv().await
    }

    /// Explicitly end this subscription
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.subscribers.remove(&self.id);
    }
}

/// Restore any existing session, then apply backend change events one at a
/// time in receipt order. Holding only a weak handle lets the loop end once
/// every `SessionManager` clone and subscription is gone.
async fn run_event_loop(inner: Weak<ManagerInner>, mut changes: AuthChangeStream) {
    if let Some(inner) = inner.upgrade() {
        match inner.backend.current_session().await {
            Ok(session) => inner.complete_restore(session),
            Err(e) => {
                warn!(error = %e, "session restore failed, starting signed out");
                inner.complete_restore(None);
            }
        }
    }

    while let Some(change) = changes.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        inner.apply_change(change);
    }
}
