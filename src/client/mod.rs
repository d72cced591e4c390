//! HTTP client for the user and admin surfaces, holding the session the way
//! the web pages do: a token in an injected [`SessionStore`], attached as a
//! bearer header, and dropped as soon as the server answers 401.

pub mod error;
pub mod session;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    activity::repo_types::ActivityEntry,
    admin::dto::{ActivitiesResponse, DashboardStats, DataResponse},
    auth::{
        dto::{AdminRegisterRequest, AuthResponse, MessageResponse, RegisterRequest, VerifyResponse},
        repo_types::User,
    },
    profiles::{
        dto::{ProfileResponse, SaveProfileRequest},
        repo_types::Profile,
    },
};

pub use error::ClientError;
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};

/// Which half of the site the client speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    User,
    Admin,
}

impl Surface {
    pub fn login_page(self) -> &'static str {
        match self {
            Surface::User => "login.html",
            Surface::Admin => "/admin-login.html",
        }
    }

    fn home_page(self) -> &'static str {
        match self {
            Surface::User => "index.html",
            Surface::Admin => "/admin/dashboard",
        }
    }

    fn login_path(self) -> &'static str {
        match self {
            Surface::User => "/api/auth/login",
            Surface::Admin => "/api/v1/admin/login",
        }
    }

    fn is_protected(self, page: &str) -> bool {
        let page = page.rsplit('/').next().unwrap_or(page);
        match self {
            Surface::User => page == "userform.html",
            Surface::Admin => page != "admin-login.html",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    Expired,
    LoggedOut,
}

/// What the navigation shows, derived from the cached identity only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthView {
    pub greeting: Option<String>,
    pub show_login: bool,
    pub show_logout: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    surface: Surface,
    store: Arc<dyn SessionStore>,
    state: Mutex<SessionState>,
    auth_in_flight: AtomicBool,
}

/// Clears the in-flight flag when the login or registration attempt ends.
struct AuthAttempt<'a>(&'a AtomicBool);

impl Drop for AuthAttempt<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        surface: Surface,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let initial = if store.load()?.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            surface,
            store,
            state: Mutex::new(initial),
            auth_in_flight: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        debug!(from = ?*state, to = ?next, "session state");
        *state = next;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ---- auth ----

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let request = self.http.post(self.url("/api/auth/register")).json(req);
        self.authenticate_with(request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let request = self
            .http
            .post(self.url(self.surface.login_path()))
            .json(&json!({ "email": email.trim(), "password": password }));
        self.authenticate_with(request).await
    }

    /// Admin sessions also expire the server cookie; user logout is local only.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if self.surface == Surface::Admin {
            if let Some(session) = self.store.load()? {
                let res = self
                    .http
                    .get(self.url("/api/v1/admin/logout"))
                    .bearer_auth(&session.token)
                    .send()
                    .await;
                if let Err(e) = res {
                    warn!(error = %e, "server logout failed; clearing local session anyway");
                }
            }
        }
        self.store.clear()?;
        self.set_state(SessionState::LoggedOut);
        Ok(())
    }

    pub async fn verify(&self) -> Result<User, ClientError> {
        let res: VerifyResponse = self.authed(self.http.get(self.url("/api/auth/verify"))).await?;
        Ok(res.user)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .post(self.url("/api/auth/forgot-password"))
            .json(&json!({ "email": email }))
            .send()
            .await?;
        let body: MessageResponse = decode(res).await?;
        Ok(body.message)
    }

    // ---- profile ----

    /// `None` until the first save.
    pub async fn get_profile(&self) -> Result<Option<Profile>, ClientError> {
        match self
            .authed::<ProfileResponse>(self.http.get(self.url("/api/profile")))
            .await
        {
            Ok(res) => Ok(Some(res.data)),
            Err(ClientError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save_profile(&self, req: &SaveProfileRequest) -> Result<Profile, ClientError> {
        let res: ProfileResponse = self
            .authed(self.http.post(self.url("/api/profile")).json(req))
            .await?;
        Ok(res.data)
    }

    // ---- admin ----

    /// Works without a session only while no admin exists. The new admin's
    /// session is kept when this client has none.
    pub async fn admin_register(
        &self,
        req: &AdminRegisterRequest,
    ) -> Result<AuthResponse, ClientError> {
        let mut request = self.http.post(self.url("/api/v1/admin/register")).json(req);
        let current = self.store.load()?;
        if let Some(session) = &current {
            request = request.bearer_auth(&session.token);
        }
        let res = request.send().await?;
        if res.status() == StatusCode::UNAUTHORIZED && current.is_some() {
            return Err(self.expire()?);
        }
        let body: AuthResponse = decode(res).await?;
        if current.is_none() {
            self.remember(&body)?;
        }
        Ok(body)
    }

    pub async fn admin_me(&self) -> Result<User, ClientError> {
        let res: DataResponse<User> = self.authed(self.http.get(self.url("/api/v1/admin/me"))).await?;
        Ok(res.data)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        let res: DataResponse<DashboardStats> = self
            .authed(self.http.get(self.url("/api/v1/admin/dashboard-stats")))
            .await?;
        Ok(res.data)
    }

    pub async fn recent_activities(&self) -> Result<Vec<ActivityEntry>, ClientError> {
        let res: ActivitiesResponse = self
            .authed(self.http.get(self.url("/api/v1/admin/recent-activities")))
            .await?;
        Ok(res.data)
    }

    // ---- local views ----

    pub fn view(&self) -> AuthView {
        match self.store.load().ok().flatten() {
            Some(session) => {
                let who = if session.user.name.is_empty() {
                    session.user.email
                } else {
                    session.user.name
                };
                AuthView {
                    greeting: Some(format!("Hello, {who}")),
                    show_login: false,
                    show_logout: true,
                }
            }
            None => AuthView {
                greeting: None,
                show_login: true,
                show_logout: false,
            },
        }
    }

    /// Redirect for `page`, if any: anonymous visitors of protected pages go
    /// to the login page, admins already logged in skip the login page.
    pub fn guard(&self, page: &str) -> Option<&'static str> {
        let logged_in = self.store.load().ok().flatten().is_some();
        if !logged_in && self.surface.is_protected(page) {
            if matches!(self.state(), SessionState::Expired | SessionState::LoggedOut) {
                self.set_state(SessionState::Anonymous);
            }
            return Some(self.surface.login_page());
        }
        if logged_in && self.surface == Surface::Admin && !self.surface.is_protected(page) {
            return Some(self.surface.home_page());
        }
        None
    }

    // ---- plumbing ----

    fn begin_auth(&self) -> Result<AuthAttempt<'_>, ClientError> {
        self.auth_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::AuthInProgress)?;
        self.set_state(SessionState::Authenticating);
        Ok(AuthAttempt(&self.auth_in_flight))
    }

    async fn authenticate_with(&self, request: RequestBuilder) -> Result<AuthResponse, ClientError> {
        let _attempt = self.begin_auth()?;
        let outcome: Result<AuthResponse, ClientError> = async {
            let res = request.send().await?;
            let body: AuthResponse = decode(res).await?;
            self.remember(&body)?;
            Ok(body)
        }
        .await;
        if outcome.is_err() {
            self.set_state(SessionState::Anonymous);
        }
        outcome
    }

    fn remember(&self, body: &AuthResponse) -> Result<(), ClientError> {
        self.store.save(&StoredSession {
            token: body.token.clone(),
            user: body.user.clone(),
        })?;
        self.set_state(SessionState::Authenticated);
        Ok(())
    }

    async fn authed<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let Some(session) = self.store.load()? else {
            return Err(ClientError::NotAuthenticated {
                redirect: self.surface.login_page(),
            });
        };
        let res = request.bearer_auth(&session.token).send().await?;
        if res.status() == StatusCode::UNAUTHORIZED {
            return Err(self.expire()?);
        }
        decode(res).await
    }

    fn expire(&self) -> Result<ClientError, ClientError> {
        warn!("server rejected session token");
        self.store.clear()?;
        self.set_state(SessionState::Expired);
        Ok(ClientError::SessionExpired {
            redirect: self.surface.login_page(),
        })
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }
    let message = res
        .json::<ErrorBody>()
        .await
        .map(|b| b.message)
        .unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
