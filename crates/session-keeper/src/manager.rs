//! Session manager with FSM-based state tracking.
//!
//! `SessionManager` owns every piece of mutable session state: the FSM, the
//! in-flight refresh flag, the single refresh timer, the username cache and
//! the cached profile. The token itself lives only in the cookie behind
//! [`TokenStore`]. Dependencies (API, storage, clock) are injected so tests
//! can substitute fakes.
//!
//! Locks are never held across `.await`.

use crate::clock::Clock;
use crate::scheduler::{RefreshPolicy, RefreshTimer, SchedulePlan};
use crate::session_fsm::{
    SessionMachine, SessionMachineInput, SessionState, SessionStateChangedPayload,
};
use crate::token::{get_subject, is_token_valid, seconds_until_expire};
use crate::token_store::TokenStore;
use crate::{SessionError, SessionResult};
use auth_api_client::{
    ApiResult, AuthApi, ForgotPasswordRequest, LoginRequest, LoginResponse, LogoutRequest, MessageResponse,
    RefreshRequest, RefreshResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    ResetPasswordResponse, SendVerificationRequest, UserDetails, VerifyEmailRequest,
    VerifyEmailResponse,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChangedPayload) + Send + Sync>;

/// Result of scheduling a refresh for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A timer will refresh after this delay.
    Armed(Duration),
    /// The token was too close to expiry; a refresh task was started instead.
    RefreshingNow,
}

/// What a focus check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Bootstrap has not finished.
    NotInitialized,
    /// A login, logout or refresh is already running.
    Busy,
    /// No token was stored; the session was cleared.
    Cleared,
    /// Token valid and above the critical threshold; nothing to do.
    Healthy { remaining_secs: u64 },
    Refreshed,
    /// Lost the race to another refresh.
    Conflict,
    /// Refresh failed; the session was downgraded.
    Failed,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub is_initialized: bool,
    pub is_logged_in: bool,
    pub username: Option<String>,
    pub expires_in_secs: Option<u64>,
    pub refresh_in_secs: Option<u64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the refresh-in-flight flag; releases it on drop.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct Inner {
    api: Arc<dyn AuthApi>,
    tokens: TokenStore,
    clock: Arc<dyn Clock>,
    policy: RefreshPolicy,
    fsm: Mutex<SessionMachine>,
    initialized: AtomicBool,
    refreshing: AtomicBool,
    timer: RefreshTimer,
    username: Mutex<Option<String>>,
    profile: Mutex<Option<UserDetails>>,
    state_callback: Mutex<Option<SessionStateCallback>>,
}

/// Client session manager. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn AuthApi>,
        tokens: TokenStore,
        clock: Arc<dyn Clock>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                tokens,
                clock,
                policy,
                fsm: Mutex::new(SessionMachine::new()),
                initialized: AtomicBool::new(false),
                refreshing: AtomicBool::new(false),
                timer: RefreshTimer::default(),
                username: Mutex::new(None),
                profile: Mutex::new(None),
                state_callback: Mutex::new(None),
            }),
        }
    }

    /// Set a callback to be notified of session state changes.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *lock(&self.inner.state_callback) = Some(callback);
    }

    // ==========================================
    // State
    // ==========================================

    pub fn state(&self) -> SessionState {
        SessionState::from(lock(&self.inner.fsm).state())
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.inner.policy
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// True once the first bootstrap has finished. Never reverts.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    pub fn is_refresh_in_flight(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }

    /// True iff the session is held and the cookie has a live, decodable token.
    pub fn is_logged_in(&self) -> bool {
        if !self.state().holds_session() {
            return false;
        }
        self.read_token()
            .map(|token| is_token_valid(&token, self.now()))
            .unwrap_or(false)
    }

    /// Cached username, if any.
    pub fn username(&self) -> Option<String> {
        lock(&self.inner.username).clone()
    }

    /// Cached profile from the last successful `profile/me`.
    pub fn current_user(&self) -> Option<UserDetails> {
        lock(&self.inner.profile).clone()
    }

    pub fn status(&self) -> SessionStatus {
        let now = self.now();
        let expires_in_secs = self
            .read_token()
            .and_then(|token| seconds_until_expire(&token, 0, now).ok());

        SessionStatus {
            state: self.state(),
            is_initialized: self.is_initialized(),
            is_logged_in: self.is_logged_in(),
            username: self.username(),
            expires_in_secs,
            refresh_in_secs: self.armed_refresh_in().map(|delay| delay.as_secs()),
        }
    }

    fn now(&self) -> i64 {
        self.inner.clock.now()
    }

    fn read_token(&self) -> Option<String> {
        match self.inner.tokens.read() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read access cookie");
                None
            }
        }
    }

    /// Transition the FSM and notify the callback if the state changed.
    fn transition(&self, input: &SessionMachineInput) -> SessionResult<SessionState> {
        self.transition_if(input, || true)
    }

    /// Like [`Self::transition`], but only while `allowed` holds under the
    /// FSM lock.
    fn transition_if(
        &self,
        input: &SessionMachineInput,
        allowed: impl FnOnce() -> bool,
    ) -> SessionResult<SessionState> {
        let (old_state, new_state) = {
            let mut fsm = lock(&self.inner.fsm);
            let old_state = SessionState::from(fsm.state());
            if !allowed() {
                return Err(SessionError::InvalidStateTransition(format!(
                    "{:?} superseded in state {:?}",
                    input, old_state
                )));
            }
            fsm.consume(input).map_err(|_| {
                SessionError::InvalidStateTransition(format!(
                    "Cannot apply {:?} in state {:?}",
                    input, old_state
                ))
            })?;
            (old_state, SessionState::from(fsm.state()))
        };

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
            self.notify_state_change(new_state);
        }

        Ok(new_state)
    }

    /// Apply `input`, falling back to `SessionCleared` if it is not allowed.
    fn settle(&self, input: &SessionMachineInput) {
        if self.transition(input).is_err() {
            if let Err(e) = self.transition(&SessionMachineInput::SessionCleared) {
                warn!(error = %e, "Failed to settle session state");
            }
        }
    }

    fn notify_state_change(&self, state: SessionState) {
        let username = self.username();
        let callback = lock(&self.inner.state_callback);
        if let Some(callback) = callback.as_ref() {
            callback(SessionStateChangedPayload { state, username });
        }
    }

    fn mark_initialized(&self) {
        if !self.inner.initialized.swap(true, Ordering::AcqRel) {
            info!(state = ?self.state(), "Session initialized");
        }
    }

    // ==========================================
    // Username cache
    // ==========================================

    fn set_username(&self, username: &str) {
        *lock(&self.inner.username) = Some(username.to_string());
        if let Err(e) = self.inner.tokens.credentials().set_username_cache(username) {
            warn!(error = %e, "Failed to persist username cache");
        }
    }

    fn restore_username_cache(&self) {
        if self.username().is_some() {
            return;
        }
        match self.inner.tokens.credentials().get_username_cache() {
            Ok(Some(username)) => {
                debug!(username = %username, "Restored username cache");
                *lock(&self.inner.username) = Some(username);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to read username cache"),
        }
    }

    /// Username to refresh with: the token subject, else the cached username.
    fn refresh_username(&self, token: &str) -> Option<String> {
        match get_subject(token) {
            Ok(subject) => Some(subject),
            Err(e) => {
                debug!(error = %e, "Token subject unreadable, using cached username");
                self.username()
            }
        }
    }

    /// Write the cookie for a freshly issued token and cache its subject.
    fn adopt_token(&self, token: &str, fallback_username: Option<&str>) -> SessionResult<u64> {
        let max_age_secs = self.inner.tokens.set_access_cookie(token)?;
        match get_subject(token) {
            Ok(subject) => self.set_username(&subject),
            Err(_) => {
                if let Some(username) = fallback_username.filter(|u| !u.is_empty()) {
                    self.set_username(username);
                }
            }
        }
        Ok(max_age_secs)
    }

    // ==========================================
    // Clearing
    // ==========================================

    fn wipe_local(&self) {
        self.inner.timer.cancel();
        if let Err(e) = self.inner.tokens.delete() {
            warn!(error = %e, "Failed to delete access cookie");
        }
        *lock(&self.inner.username) = None;
        if let Err(e) = self.inner.tokens.credentials().clear_username_cache() {
            warn!(error = %e, "Failed to clear username cache");
        }
        *lock(&self.inner.profile) = None;
    }

    /// Drop the session locally: cookie, username cache, profile, timer.
    pub fn clear(&self) {
        self.wipe_local();
        if let Err(e) = self.transition(&SessionMachineInput::SessionCleared) {
            warn!(error = %e, "Failed to clear session state");
        }
        info!("Session cleared");
    }

    /// React to a 401 seen by any API consumer.
    pub fn handle_unauthorized(&self) {
        warn!("Unauthorized response reported, clearing session");
        self.clear();
    }

    /// Map an API result, ending the session on a 401.
    fn check_unauthorized<T>(&self, result: ApiResult<T>) -> SessionResult<T> {
        result.map_err(|e| {
            if e.is_unauthorized() {
                self.handle_unauthorized();
            }
            e.into()
        })
    }

    // ==========================================
    // Scheduling
    // ==========================================

    /// Cancel any armed timer and plan the next refresh for `token`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_refresh(&self, token: &str) -> SessionResult<ScheduleOutcome> {
        self.schedule(token, true)
    }

    /// `allow_immediate = false` arms the minimum interval instead of
    /// refreshing at once; used right after a refresh so a short-lived token
    /// cannot cause back-to-back refreshes.
    fn schedule(&self, token: &str, allow_immediate: bool) -> SessionResult<ScheduleOutcome> {
        self.inner.timer.cancel();

        let time_available = seconds_until_expire(token, 0, self.now())?;
        let delay = match self.inner.policy.plan(time_available) {
            SchedulePlan::RefreshNow if allow_immediate => {
                info!(time_available, "Token inside refresh buffer, refreshing now");
                // Not held in the slot; a later cancel retires the generation.
                let generation = self.inner.timer.current();
                let manager = self.clone();
                let token = token.to_string();
                tokio::spawn(async move {
                    manager.run_scheduled_refresh(token, generation).await;
                });
                return Ok(ScheduleOutcome::RefreshingNow);
            }
            SchedulePlan::RefreshNow => Duration::from_secs(self.inner.policy.min_interval_secs),
            SchedulePlan::RefreshIn(delay) => delay,
        };

        let weak = Arc::downgrade(&self.inner);
        let token = token.to_string();
        self.inner.timer.arm(delay, move |generation| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.timer.release(generation);
                SessionManager { inner }
                    .run_scheduled_refresh(token, generation)
                    .await;
            })
        });

        debug!(delay_secs = delay.as_secs(), time_available, "Refresh timer armed");
        Ok(ScheduleOutcome::Armed(delay))
    }

    /// Cancel the armed timer, returning whether one was armed.
    pub fn cancel_scheduled_refresh(&self) -> bool {
        self.inner.timer.cancel()
    }

    /// Time until the armed timer fires.
    pub fn armed_refresh_in(&self) -> Option<Duration> {
        self.inner.timer.remaining()
    }

    pub fn has_armed_timer(&self) -> bool {
        self.inner.timer.is_armed()
    }

    async fn run_scheduled_refresh(&self, token: String, generation: u64) {
        if !self.inner.timer.is_current(generation) {
            debug!("Scheduled refresh was cancelled before it ran");
            return;
        }

        let Some(username) = self.refresh_username(&token) else {
            warn!("No username available for scheduled refresh, clearing session");
            self.clear();
            return;
        };

        match self
            .refresh_for(RefreshRequest { username }, Some(generation))
            .await
        {
            Ok(_) => debug!("Scheduled refresh completed"),
            Err(SessionError::RefreshConflict) => {
                debug!("Refresh already in flight, skipping scheduled refresh")
            }
            Err(e @ SessionError::InvalidStateTransition(_)) => {
                debug!(error = %e, "Scheduled refresh skipped")
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Scheduled refresh failed, session cleared"
                );
                self.clear();
            }
        }
    }

    // ==========================================
    // Refresh
    // ==========================================

    /// Exchange the server-side refresh credential for a new access token.
    ///
    /// Fails fast with [`SessionError::RefreshConflict`] while another refresh
    /// is outstanding. On failure the session is cleared and the error
    /// returned; there is no retry. A blank username is rejected with
    /// [`SessionError::Validation`] before anything changes.
    pub async fn refresh(&self, request: RefreshRequest) -> SessionResult<RefreshResponse> {
        self.refresh_for(request, None).await
    }

    /// `generation` ties a scheduled refresh to the timer generation that
    /// spawned it; the refresh only starts while that generation is current.
    async fn refresh_for(
        &self,
        request: RefreshRequest,
        generation: Option<u64>,
    ) -> SessionResult<RefreshResponse> {
        let guard = InFlightGuard::acquire(&self.inner.refreshing).ok_or_else(|| {
            debug!("Refresh requested while another is in flight");
            SessionError::RefreshConflict
        })?;

        if request.username.trim().is_empty() {
            return Err(SessionError::Validation(
                "Username is required to refresh".to_string(),
            ));
        }

        let still_scheduled = || generation.map_or(true, |g| self.inner.timer.is_current(g));
        if self.state() != SessionState::Refreshing {
            self.transition_if(&SessionMachineInput::RefreshStarted, still_scheduled)?;
        } else if !still_scheduled() {
            return Err(SessionError::InvalidStateTransition(
                "Scheduled refresh superseded".to_string(),
            ));
        }

        info!(username = %request.username, "Refreshing access token");
        let result = self.inner.api.refresh(&request).await;

        let state = self.state();
        if state != SessionState::Refreshing {
            info!(state = ?state, "Session changed during refresh, discarding result");
            return Err(SessionError::InvalidStateTransition(format!(
                "Refresh finished in state {:?}",
                state
            )));
        }

        let adopted = result.map_err(SessionError::from).and_then(|response| {
            self.adopt_token(&response.access_token, Some(&response.user.username))?;
            Ok(response)
        });

        let response = match adopted {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "Token refresh failed, clearing session"
                );
                self.wipe_local();
                self.settle(&SessionMachineInput::RefreshFailed);
                return Err(e);
            }
        };

        self.transition(&SessionMachineInput::RefreshSucceeded)?;
        if let Err(e) = self.schedule(&response.access_token, false) {
            warn!(error = %e, "Failed to schedule next refresh");
        }
        drop(guard);

        info!(username = %response.user.username, "Access token refreshed");
        self.refetch_profile_quietly().await;
        Ok(response)
    }

    /// Refresh for the user behind the stored token, or the cached username.
    pub async fn refresh_current(&self) -> SessionResult<RefreshResponse> {
        let username = match self.read_token() {
            Some(token) => self.refresh_username(&token),
            None => self.username(),
        }
        .ok_or(SessionError::NotLoggedIn)?;

        self.refresh(RefreshRequest { username }).await
    }

    /// Username of a usable session, renewing a dead token first.
    ///
    /// Call after [`SessionManager::bootstrap`]. Fails with
    /// [`SessionError::NotLoggedIn`] when no token is stored and with
    /// [`SessionError::SessionExpired`] when the stored token is dead and
    /// the refresh fails too.
    pub async fn ensure_session(&self) -> SessionResult<String> {
        if self.is_logged_in() {
            let username = self
                .username()
                .or_else(|| self.read_token().and_then(|t| get_subject(&t).ok()));
            if let Some(username) = username {
                return Ok(username);
            }
        }

        let Some(token) = self.read_token() else {
            return Err(SessionError::NotLoggedIn);
        };

        match self.refresh_stale(&token).await {
            FocusOutcome::Refreshed => self.username().ok_or(SessionError::NotLoggedIn),
            FocusOutcome::Conflict => Err(SessionError::RefreshConflict),
            _ => Err(SessionError::SessionExpired),
        }
    }

    // ==========================================
    // Bootstrap and focus
    // ==========================================

    /// Reconcile with stored credentials once at startup.
    ///
    /// An expired or undecodable token is refreshed (one call) before the
    /// manager reports itself initialized. Later calls return the status.
    pub async fn bootstrap(&self) -> SessionStatus {
        if self.is_initialized() {
            return self.status();
        }

        self.restore_username_cache();

        if let Err(e) = self.transition(&SessionMachineInput::BeginCheck) {
            warn!(error = %e, "Bootstrap skipped");
            self.mark_initialized();
            return self.status();
        }

        let mut holds_valid_token = false;
        match self.read_token() {
            None => {
                info!("No stored access token");
                self.settle(&SessionMachineInput::NoToken);
            }
            Some(token) if is_token_valid(&token, self.now()) => {
                self.settle(&SessionMachineInput::TokenValid);
                if let Ok(subject) = get_subject(&token) {
                    self.set_username(&subject);
                }
                info!(username = ?self.username(), "Stored access token is valid");
                if let Err(e) = self.schedule(&token, true) {
                    warn!(error = %e, "Failed to schedule refresh");
                }
                holds_valid_token = true;
            }
            Some(token) => {
                self.settle(&SessionMachineInput::TokenStale);
                info!("Stored access token is stale, refreshing");
                self.refresh_stale(&token).await;
            }
        }

        self.mark_initialized();
        if holds_valid_token {
            self.refetch_profile_quietly().await;
        }
        self.status()
    }

    async fn refresh_stale(&self, token: &str) -> FocusOutcome {
        let Some(username) = self.refresh_username(token) else {
            warn!("Stale token has no readable subject and no username is cached");
            self.clear();
            return FocusOutcome::Failed;
        };

        match self.refresh(RefreshRequest { username }).await {
            Ok(_) => FocusOutcome::Refreshed,
            Err(SessionError::RefreshConflict) => FocusOutcome::Conflict,
            Err(e @ SessionError::InvalidStateTransition(_)) => {
                debug!(error = %e, "Refresh result discarded");
                FocusOutcome::Failed
            }
            Err(e) => {
                debug!(error = %e, "Refresh failed, session downgraded");
                self.clear();
                FocusOutcome::Failed
            }
        }
    }

    /// Re-check the stored token after the host regains focus.
    ///
    /// Catches up on refreshes a suspended timer may have missed. Never
    /// returns an error.
    pub async fn on_focus(&self) -> FocusOutcome {
        if !self.is_initialized() {
            return FocusOutcome::NotInitialized;
        }

        let state = self.state();
        if state.is_transient() || self.is_refresh_in_flight() {
            debug!(state = ?state, "Focus check skipped, operation in progress");
            return FocusOutcome::Busy;
        }

        let Some(token) = self.read_token() else {
            if state.holds_session() {
                info!("Access token gone on focus, clearing session");
            }
            self.clear();
            return FocusOutcome::Cleared;
        };

        let remaining_secs = seconds_until_expire(&token, 0, self.now()).unwrap_or(0);
        if remaining_secs >= self.inner.policy.critical_threshold_secs {
            return FocusOutcome::Healthy { remaining_secs };
        }

        info!(remaining_secs, "Access token stale or near expiry on focus, refreshing");
        self.refresh_stale(&token).await
    }

    /// Run [`SessionManager::on_focus`] for every event received on `events`.
    pub fn spawn_focus_listener(&self, mut events: mpsc::Receiver<()>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            while events.recv().await.is_some() {
                let outcome = manager.on_focus().await;
                debug!(outcome = ?outcome, "Focus check finished");
            }
            debug!("Focus listener stopped");
        })
    }

    // ==========================================
    // Auth operations
    // ==========================================

    /// Log in with email and password.
    pub async fn login(&self, request: LoginRequest) -> SessionResult<LoginResponse> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(SessionError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        self.inner.timer.cancel();
        self.transition(&SessionMachineInput::LoginAttempt)?;
        info!(email = %request.email, "Logging in");

        let response = match self.inner.api.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login failed");
                if e.is_unauthorized() {
                    self.wipe_local();
                }
                self.settle(&SessionMachineInput::LoginFailed);
                return Err(e.into());
            }
        };

        let state = self.state();
        if state != SessionState::LoggingIn {
            info!(state = ?state, "Session changed during login, discarding result");
            return Err(SessionError::InvalidStateTransition(format!(
                "Login finished in state {:?}",
                state
            )));
        }

        let max_age_secs =
            match self.adopt_token(&response.access_token, Some(&response.user.username)) {
                Ok(max_age_secs) => max_age_secs,
                Err(e) => {
                    warn!(error = %e, "Login returned an unusable token");
                    self.settle(&SessionMachineInput::LoginFailed);
                    return Err(e);
                }
            };

        self.transition(&SessionMachineInput::LoginSucceeded)?;
        info!(
            username = %response.user.username,
            max_age_secs,
            "Login successful"
        );

        if let Err(e) = self.schedule(&response.access_token, true) {
            warn!(error = %e, "Failed to schedule refresh");
        }
        self.refetch_profile_quietly().await;
        Ok(response)
    }

    /// Log out the current user.
    ///
    /// The local session is cleared whatever the server answers; a server
    /// error is still returned.
    pub async fn logout(&self) -> SessionResult<()> {
        let username = self
            .username()
            .or_else(|| self.read_token().and_then(|t| get_subject(&t).ok()))
            .or_else(|| {
                self.current_user()
                    .and_then(|me| me.username().map(str::to_string))
            });

        match username {
            Some(username) => self.logout_as(username).await,
            None => {
                info!("No known user, clearing local session");
                self.clear();
                Ok(())
            }
        }
    }

    /// Log out `username` on the server, then clear locally.
    pub async fn logout_as(&self, username: String) -> SessionResult<()> {
        self.inner.timer.cancel();
        let entered = self
            .transition(&SessionMachineInput::LogoutRequested)
            .is_ok();
        info!(username = %username, "Logging out");

        let result = self.inner.api.logout(&LogoutRequest { username }).await;

        self.wipe_local();
        if entered {
            self.settle(&SessionMachineInput::LogoutComplete);
        } else {
            self.settle(&SessionMachineInput::SessionCleared);
        }

        match result {
            Ok(()) => {
                info!("Logout successful");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed, session cleared locally");
                Err(e.into())
            }
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> SessionResult<RegisterResponse> {
        let missing = [
            &request.username,
            &request.email,
            &request.password,
            &request.confirm_password,
        ]
        .iter()
        .any(|field| field.trim().is_empty());
        if missing {
            return Err(SessionError::Validation(
                "Username, email and password are required".to_string(),
            ));
        }

        let response = self.check_unauthorized(self.inner.api.register(&request).await)?;
        info!(username = %response.username, "User registered");
        Ok(response)
    }

    pub async fn send_verification(&self, email: &str) -> SessionResult<MessageResponse> {
        let result = self
            .inner
            .api
            .send_verification(&SendVerificationRequest {
                email: email.to_string(),
            })
            .await;
        let response = self.check_unauthorized(result)?;
        info!(email = %email, "Verification email sent");
        Ok(response)
    }

    pub async fn verify_email(
        &self,
        request: VerifyEmailRequest,
    ) -> SessionResult<VerifyEmailResponse> {
        let response = self.check_unauthorized(self.inner.api.verify_email(&request).await)?;
        info!(username = %response.user.username, "Email verified");
        Ok(response)
    }

    pub async fn forgot_password(&self, email: &str) -> SessionResult<MessageResponse> {
        let result = self
            .inner
            .api
            .forgot_password(&ForgotPasswordRequest {
                email: email.to_string(),
            })
            .await;
        let response = self.check_unauthorized(result)?;
        info!(email = %email, "Password reset link requested");
        Ok(response)
    }

    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> SessionResult<ResetPasswordResponse> {
        let response = self.check_unauthorized(self.inner.api.reset_password(&request).await)?;
        info!(username = %response.user.username, "Password reset");
        Ok(response)
    }

    // ==========================================
    // Profile
    // ==========================================

    /// Fetch `profile/me` and cache it.
    ///
    /// A 401 ends the session: a best-effort server logout when the profile
    /// username is known, otherwise a local clear.
    pub async fn refetch_me(&self) -> SessionResult<UserDetails> {
        match self.inner.api.get_me().await {
            Ok(me) => {
                *lock(&self.inner.profile) = Some(me.clone());
                Ok(me)
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Profile request unauthorized, ending session");
                let known = self
                    .current_user()
                    .and_then(|me| me.username().map(str::to_string));
                match known {
                    Some(username) => {
                        if let Err(err) = self.logout_as(username).await {
                            debug!(error = %err, "Logout after 401 failed");
                        }
                    }
                    None => self.clear(),
                }
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn refetch_profile_quietly(&self) {
        if let Err(e) = self.refetch_me().await {
            debug!(error = %e, "Profile refetch failed");
        }
    }
}
