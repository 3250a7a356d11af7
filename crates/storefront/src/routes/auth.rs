//! Authentication route handlers.
//!
//! Handles sign-in, sign-up, email verification, password recovery and
//! Google/Facebook sign-in against the hosted backend's account API.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::warn;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user, set_flash};
use crate::models::{CurrentUser, Flash};
use crate::routes::Layout;
use crate::services::auth::AuthError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub name: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data. The link parameters travel as hidden fields.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub secret: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// `userId` and `secret` from an emailed link or an OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct LinkQuery {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub secret: String,
}

/// Query parameters for the sign-in page.
#[derive(Debug, Default, Deserialize)]
pub struct SigninQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signin.html")]
pub struct SigninTemplate {
    pub layout: Layout,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub layout: Layout,
}

/// "Check your inbox" page shown after sign-up.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup_success.html")]
pub struct SignupSuccessTemplate {
    pub layout: Layout,
    pub email: String,
    pub verification_sent: bool,
}

/// Email verification result page; also hosts the resend form.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify_email.html")]
pub struct VerifyEmailTemplate {
    pub layout: Layout,
    pub verified: bool,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub layout: Layout,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub layout: Layout,
    pub user_id: String,
    pub secret: String,
}

// =============================================================================
// Helpers
// =============================================================================

async fn sign_in_session(session: &Session, user: &CurrentUser) -> Response {
    if let Err(e) = set_current_user(session, user).await {
        tracing::error!("Failed to set session: {}", e);
        set_flash(session, Flash::error("Could not start your session. Please try again.")).await;
        return Redirect::to("/auth/signin").into_response();
    }
    set_sentry_user(&user.id, Some(&user.email));
    Redirect::to("/").into_response()
}

async fn fail(session: &Session, err: &AuthError, to: &str) -> Response {
    if err.is_user_error() {
        tracing::info!(error = %err, "Auth form rejected");
    } else {
        warn!(error = %err, "Auth request failed");
    }
    set_flash(session, Flash::error(err.to_string())).await;
    Redirect::to(to).into_response()
}

// =============================================================================
// Sign-in Routes
// =============================================================================

/// Display the sign-in page.
pub async fn signin_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<SigninQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    if query.error.as_deref() == Some("oauth") {
        set_flash(&session, Flash::error("Sign-in with the provider was cancelled or failed")).await;
    }
    SigninTemplate {
        layout: Layout::load(&session, None).await,
    }
    .into_response()
}

/// Handle sign-in form submission.
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SigninForm>,
) -> Response {
    let password = SecretString::from(form.password);
    match state.auth().signin(&form.email, &password).await {
        Ok(user) => sign_in_session(&session, &user).await,
        Err(e) => fail(&session, &e, "/auth/signin").await,
    }
}

/// Handle sign-out.
///
/// The local session is cleared even if the backend call fails.
pub async fn signout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if let Some(user) = user {
        state.auth().signout(&user).await;
    }
    if let Err(e) = clear_current_user(&session).await {
        warn!(error = %e, "Failed to clear session user");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(session: Session, OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    SignupTemplate {
        layout: Layout::load(&session, None).await,
    }
    .into_response()
}

/// Handle sign-up form submission.
///
/// The customer is not signed in afterwards: they verify their email first.
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Response {
    if form.password != form.password_confirm {
        return fail(&session, &AuthError::PasswordMismatch, "/auth/signup").await;
    }

    let password = SecretString::from(form.password);
    match state
        .auth()
        .signup(
            &form.email,
            &password,
            form.name.as_deref(),
            state.users_mirror(),
        )
        .await
    {
        Ok(signup) => SignupSuccessTemplate {
            layout: Layout::load(&session, None).await,
            email: signup.account.email,
            verification_sent: signup.verification_sent,
        }
        .into_response(),
        Err(e) => fail(&session, &e, "/auth/signup").await,
    }
}

// =============================================================================
// Verification Routes
// =============================================================================

/// Confirm an email address from the emailed link.
pub async fn verify_email(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LinkQuery>,
) -> impl IntoResponse {
    let (verified, error) = if query.user_id.is_empty() && query.secret.is_empty() {
        // Plain visit: only the resend form is shown.
        (false, None)
    } else {
        match state.auth().verify_email(&query.user_id, &query.secret).await {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(error = %e, "Email verification failed");
                (false, Some(e.to_string()))
            }
        }
    };

    VerifyEmailTemplate {
        layout: Layout::load(&session, user).await,
        verified,
        error,
    }
}

/// Send another verification email.
pub async fn resend_verification(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SigninForm>,
) -> Response {
    let password = SecretString::from(form.password);
    match state
        .auth()
        .resend_verification(&form.email, &password)
        .await
    {
        Ok(()) => {
            set_flash(
                &session,
                Flash::success("Verification email sent. Please check your inbox."),
            )
            .await;
            Redirect::to("/auth/verify-email").into_response()
        }
        Err(e) => fail(&session, &e, "/auth/verify-email").await,
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(session: Session) -> impl IntoResponse {
    ForgotPasswordTemplate {
        layout: Layout::load(&session, None).await,
    }
}

/// Handle forgot password form submission.
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    match state.auth().request_recovery(&form.email).await {
        Ok(()) => {
            set_flash(
                &session,
                Flash::success("Password reset email sent! Check your inbox for a link to reset your password."),
            )
            .await;
            Redirect::to("/auth/forgot-password").into_response()
        }
        Err(e) => fail(&session, &e, "/auth/forgot-password").await,
    }
}

/// Display the reset password page.
///
/// Called when the customer follows the emailed recovery link.
pub async fn reset_password_page(session: Session, Query(query): Query<LinkQuery>) -> Response {
    if query.user_id.is_empty() || query.secret.is_empty() {
        return fail(&session, &AuthError::MissingToken, "/auth/forgot-password").await;
    }
    ResetPasswordTemplate {
        layout: Layout::load(&session, None).await,
        user_id: query.user_id,
        secret: query.secret,
    }
    .into_response()
}

/// Handle reset password form submission.
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    match state
        .auth()
        .complete_recovery(
            &form.user_id,
            &form.secret,
            &SecretString::from(form.password),
            &SecretString::from(form.password_confirm),
        )
        .await
    {
        Ok(()) => {
            set_flash(
                &session,
                Flash::success("Password reset successfully! You can now sign in."),
            )
            .await;
            Redirect::to("/auth/signin").into_response()
        }
        Err(e) => {
            let back = format!(
                "/auth/reset-password?userId={}&secret={}",
                urlencoding::encode(&form.user_id),
                urlencoding::encode(&form.secret)
            );
            fail(&session, &e, &back).await
        }
    }
}

// =============================================================================
// OAuth Routes
// =============================================================================

/// Redirect to the provider's consent screen.
pub async fn oauth_start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
) -> Response {
    match state.auth().oauth_url(&provider) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => fail(&session, &e, "/auth/signin").await,
    }
}

/// Handle the provider redirect carrying `userId` and `secret`.
pub async fn oauth_callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LinkQuery>,
) -> Response {
    match state
        .auth()
        .complete_oauth(&query.user_id, &query.secret)
        .await
    {
        Ok(user) => sign_in_session(&session, &user).await,
        Err(e) => fail(&session, &e, "/auth/signin").await,
    }
}
