use jot_core::auth::{AuthError, AuthSession, SignUpOutcome};
use jot_core::{Action, AuthBackend, AuthService, ConfirmPrompt, Confirmation};

use super::common::{confirm, ProfileContext};
use crate::auth::{clear_stored_session, load_stored_session};
use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

fn auth_failure(action: Action) -> impl Fn(AuthError) -> CliError {
    move |error| CliError::failed(action)(error.into())
}

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let context = ProfileContext::load(global_profile)?;
            let auth = context.auth_service()?;
            let session = login(&auth, &email, &password).await?;
            println!(
                "Signed in profile '{}' as {}",
                context.profile_name,
                session.email().unwrap_or("(no email)")
            );
            Ok(())
        }
        AuthCommands::Signup { email, password } => {
            let context = ProfileContext::load(global_profile)?;
            let auth = context.auth_service()?;
            match signup(&auth, &email, &password).await? {
                SignUpOutcome::SignedIn(session) => println!(
                    "Account created; profile '{}' is signed in as {}",
                    context.profile_name,
                    session.email().unwrap_or("(no email)")
                ),
                SignUpOutcome::ConfirmationRequired => println!(
                    "Account created. Confirm your email, then run `jot auth login --profile {}`.",
                    context.profile_name
                ),
            }
            Ok(())
        }
        AuthCommands::Status => {
            let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = profiles.resolve_profile_name(global_profile);
            let session = match ProfileContext::load(Some(profile_name.as_str())) {
                Ok(context) => context
                    .auth_service()?
                    .get_session()
                    .await
                    .map_err(|error| CliError::Auth(error.to_string()))?,
                Err(CliError::Config(message)) => {
                    tracing::debug!("{}", message);
                    load_stored_session(&profile_name)
                        .map_err(|error| CliError::Auth(error.to_string()))?
                }
                Err(error) => return Err(error),
            };
            println!("{}", status_line(&profile_name, session.as_ref()));
            Ok(())
        }
        AuthCommands::Logout { yes } => {
            let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = profiles.resolve_profile_name(global_profile);
            let context = match ProfileContext::load(Some(profile_name.as_str())) {
                Ok(context) => context,
                Err(CliError::Config(_)) => {
                    clear_stored_session(&profile_name)
                        .map_err(|error| CliError::Auth(error.to_string()))?;
                    println!("Signed out profile '{profile_name}'");
                    return Ok(());
                }
                Err(error) => return Err(error),
            };

            let auth = context.auth_service()?;
            match logout(&auth, |prompt| confirm(prompt, yes)).await? {
                LogoutOutcome::SignedOut => println!("Signed out profile '{profile_name}'"),
                LogoutOutcome::Cancelled => println!("Cancelled."),
                LogoutOutcome::NotSignedIn => {
                    println!("Profile '{profile_name}' is not signed in.");
                }
            }
            Ok(())
        }
    }
}

pub async fn login<B>(
    auth: &AuthService<B>,
    email: &str,
    password: &str,
) -> Result<AuthSession, CliError>
where
    B: ?Sized + AuthBackend,
{
    auth.sign_in_with_password(email, password)
        .await
        .map_err(auth_failure(Action::SignIn))
}

pub async fn signup<B>(
    auth: &AuthService<B>,
    email: &str,
    password: &str,
) -> Result<SignUpOutcome, CliError>
where
    B: ?Sized + AuthBackend,
{
    auth.sign_up(email, password)
        .await
        .map_err(auth_failure(Action::SignUp))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    NotSignedIn,
    Cancelled,
    SignedOut,
}

/// Sign out after the user confirms.
pub async fn logout<B, F>(auth: &AuthService<B>, answer: F) -> Result<LogoutOutcome, CliError>
where
    B: ?Sized + AuthBackend,
    F: FnOnce(&ConfirmPrompt) -> Result<Confirmation, CliError>,
{
    let session = auth
        .get_session()
        .await
        .map_err(auth_failure(Action::SignOut))?;
    if session.is_none() {
        return Ok(LogoutOutcome::NotSignedIn);
    }

    if answer(&ConfirmPrompt::SIGN_OUT)? == Confirmation::Cancel {
        return Ok(LogoutOutcome::Cancelled);
    }
    auth.sign_out().await.map_err(auth_failure(Action::SignOut))?;
    Ok(LogoutOutcome::SignedOut)
}

pub fn status_line(profile_name: &str, session: Option<&AuthSession>) -> String {
    match session {
        Some(session) => format!(
            "Profile '{}' is signed in as {} (user {})",
            profile_name,
            session.email().unwrap_or("(no email)"),
            session.user_id()
        ),
        None => format!("Profile '{profile_name}' is not signed in."),
    }
}
