use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use jot_core::auth::{AuthSession, AuthUser, SignUpOutcome};
use jot_core::notes::DeleteOutcome;
use jot_core::remote::{MemoryBackend, Operation};
use jot_core::{
    Action, AuthService, CachePolicy, ConfirmPrompt, Confirmation, Note, NoteId, NoteRepository,
    SearchState, SessionGate, SessionReflection,
};
use pretty_assertions::assert_eq;

use crate::cli::{CompletionShell, ExportFormat};
use crate::commands::add::add_note;
use crate::commands::auth_cmd::{login, logout, signup, status_line, LogoutOutcome};
use crate::commands::common::{
    format_note_lines, format_relative_time, normalize_search_query, parse_confirmation,
    pass_gate, resolve_note, MIN_ID_PREFIX,
};
use crate::commands::completions::generate_for_shell;
use crate::commands::config::{init_profile, ProfileInit};
use crate::commands::delete::delete_note;
use crate::commands::edit::edit_note;
use crate::commands::export::export_notes;
use crate::commands::search::search_notes;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;
use crate::DEFAULT_LOG_DIRECTIVES;

fn note_with_id(id: &str, title: &str, content: &str, minutes_ago: i64) -> Note {
    let stamp = Utc::now() - Duration::minutes(minutes_ago);
    Note {
        id: id.parse::<NoteId>().unwrap(),
        title: title.to_string(),
        content: content.to_string(),
        created_at: stamp,
        updated_at: stamp,
    }
}

fn sample_notes() -> Vec<Note> {
    vec![
        note_with_id(
            "01900000-aaaa-7000-8000-000000000001",
            "Groceries",
            "eggs, milk",
            1,
        ),
        note_with_id(
            "01900000-aaab-7000-8000-000000000002",
            "Ideas",
            "an egg timer app",
            10,
        ),
        note_with_id(
            "01911111-0000-7000-8000-000000000003",
            "Standup",
            "ship the search view",
            60,
        ),
    ]
}

fn repository(notes: Vec<Note>) -> (Arc<MemoryBackend>, NoteRepository<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::with_notes(notes));
    let repository = NoteRepository::new(Arc::clone(&backend), CachePolicy::Refetch);
    (backend, repository)
}

fn session(email: &str) -> AuthSession {
    AuthSession {
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: Utc::now().timestamp() + 3600,
        user: AuthUser {
            id: "user-1".to_string(),
            email: Some(email.to_string()),
        },
    }
}

fn auth_service(backend: &Arc<MemoryBackend>) -> AuthService<MemoryBackend> {
    AuthService::new(Arc::clone(backend), SessionReflection::new())
}

#[test]
fn resolve_note_accepts_full_id_and_unique_prefix() {
    let notes = sample_notes();

    let full = resolve_note(&notes, " 01911111-0000-7000-8000-000000000003 ").unwrap();
    assert_eq!(full.title, "Standup");

    let prefixed = resolve_note(&notes, "0191").unwrap();
    assert_eq!(prefixed.title, "Standup");

    let upper = resolve_note(&notes, "01900000-AAAB").unwrap();
    assert_eq!(upper.title, "Ideas");
}

#[test]
fn resolve_note_rejects_short_ambiguous_and_unknown_ids() {
    let notes = sample_notes();

    assert!(matches!(
        resolve_note(&notes, "019"),
        Err(CliError::NoteIdTooShort(MIN_ID_PREFIX))
    ));
    assert!(matches!(resolve_note(&notes, "  "), Err(CliError::EmptyNoteId)));
    assert!(matches!(
        resolve_note(&notes, "ffff"),
        Err(CliError::NoteNotFound(query)) if query == "ffff"
    ));
    assert!(matches!(
        resolve_note(&notes, "01900000-0000-7000-8000-00000000ffff"),
        Err(CliError::NoteNotFound(_))
    ));

    let Err(CliError::AmbiguousNoteId(message)) = resolve_note(&notes, "01900000") else {
        panic!("expected an ambiguous prefix");
    };
    assert!(message.contains("01900000-aaaa"));
    assert!(message.contains("01900000-aaab"));
}

#[test]
fn relative_time_buckets() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

    assert_eq!(format_relative_time(now, now), "just now");
    assert_eq!(format_relative_time(now + Duration::minutes(5), now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5m ago");
    assert_eq!(format_relative_time(now - Duration::hours(3), now), "3h ago");
    assert_eq!(format_relative_time(now - Duration::days(2), now), "2d ago");
    assert_eq!(format_relative_time(now - Duration::days(14), now), "2w ago");
    assert_eq!(format_relative_time(now - Duration::days(60), now), "2mo ago");
    assert_eq!(format_relative_time(now - Duration::days(800), now), "2y ago");
}

#[test]
fn note_lines_show_short_id_title_and_age() {
    let notes = sample_notes();
    let lines = format_note_lines(&notes, Utc::now());

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("01900000-aaaa  Groceries"));
    assert!(lines[0].contains("eggs, milk"));
    assert!(lines[0].ends_with("1m ago"));
    assert!(lines[2].ends_with("1h ago"));
}

#[test]
fn search_query_parts_are_joined_and_trimmed() {
    let parts = vec!["  egg".to_string(), "timer ".to_string()];
    assert_eq!(normalize_search_query(&parts).unwrap(), "egg timer");
    assert!(matches!(
        normalize_search_query(&[" ".to_string()]),
        Err(CliError::EmptySearchQuery)
    ));
}

#[test]
fn confirmation_answers() {
    let prompt = ConfirmPrompt::DELETE_NOTE;
    assert_eq!(parse_confirmation("y\n", &prompt), Confirmation::Confirm);
    assert_eq!(parse_confirmation(" YES ", &prompt), Confirmation::Confirm);
    assert_eq!(parse_confirmation("delete", &prompt), Confirmation::Confirm);
    assert_eq!(parse_confirmation("", &prompt), Confirmation::Cancel);
    assert_eq!(parse_confirmation("nope", &prompt), Confirmation::Cancel);
}

#[test]
fn failed_errors_render_as_alerts() {
    let error = CliError::failed(Action::FetchNotes)(jot_core::Error::Remote(
        jot_core::RemoteError::Injected("offline".to_string()),
    ));
    assert_eq!(error.to_string(), "Error: Failed to fetch notes.");

    let busy = CliError::failed(Action::SaveNote)(jot_core::Error::Busy("new note".to_string()));
    assert_eq!(busy.to_string(), "Please wait: A previous request is still running.");
}

#[tokio::test(flavor = "current_thread")]
async fn add_note_saves_and_lands_first() {
    let (backend, repository) = repository(sample_notes());

    let note = add_note(&repository, "Packing".to_string(), "passport".to_string())
        .await
        .unwrap();

    assert_eq!(note.title, "Packing");
    assert_eq!(repository.notes()[0].id, note.id);
    assert_eq!(backend.calls(Operation::Insert), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn add_note_with_blank_title_never_reaches_the_backend() {
    let (backend, repository) = repository(Vec::new());

    let error = add_note(&repository, "   ".to_string(), "body".to_string())
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "Error: Please enter a title for your note");
    assert_eq!(backend.calls(Operation::Insert), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn edit_note_keeps_omitted_fields() {
    let (_backend, repository) = repository(sample_notes());

    let edited = edit_note(&repository, "0191", Some("Retro".to_string()), None)
        .await
        .unwrap();

    assert_eq!(edited.title, "Retro");
    assert_eq!(edited.content, "ship the search view");
    assert_eq!(repository.notes()[0].id, edited.id);
}

#[tokio::test(flavor = "current_thread")]
async fn edit_note_requires_a_change() {
    let (backend, repository) = repository(sample_notes());

    let error = edit_note(&repository, "0191", None, None).await.unwrap_err();

    assert!(matches!(error, CliError::NothingToEdit));
    assert_eq!(backend.calls(Operation::List), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn delete_note_honours_the_prompt() {
    let (backend, repository) = repository(sample_notes());

    let cancelled = delete_note(&repository, "0191", |prompt| {
        assert_eq!(prompt, &ConfirmPrompt::DELETE_NOTE);
        Ok(Confirmation::Cancel)
    })
    .await
    .unwrap();
    assert_eq!(cancelled, DeleteOutcome::Cancelled);
    assert_eq!(backend.calls(Operation::Delete), 0);

    let deleted = delete_note(&repository, "0191", |_| Ok(Confirmation::Confirm))
        .await
        .unwrap();
    let DeleteOutcome::Deleted(id) = deleted else {
        panic!("expected a deletion");
    };
    assert!(repository.get(&id).is_none());
    assert_eq!(repository.notes().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn delete_without_confirmation_is_refused() {
    let (backend, repository) = repository(sample_notes());

    let error = delete_note(&repository, "0191", |prompt| {
        Err(CliError::ConfirmationRequired(prompt.title))
    })
    .await
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Delete Note requires confirmation; pass --yes to run non-interactively"
    );
    assert_eq!(backend.calls(Operation::Delete), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn search_notes_matches_title_or_content() {
    let (backend, _repository) = repository(sample_notes());

    let state = search_notes(Arc::clone(&backend), "EGG").await.unwrap();

    let SearchState::Results { query, notes } = &state else {
        panic!("expected results");
    };
    assert_eq!(query, "EGG");
    let titles = notes.iter().map(|note| note.title.as_str()).collect::<Vec<_>>();
    assert_eq!(titles, vec!["Groceries", "Ideas"]);
    assert_eq!(state.summary().as_deref(), Some("2 results for \"EGG\""));
}

#[tokio::test(flavor = "current_thread")]
async fn search_failure_maps_to_search_alert() {
    let (backend, _repository) = repository(sample_notes());
    backend.fail_next(Operation::Search, "timeout");

    let error = search_notes(Arc::clone(&backend), "egg").await.unwrap_err();

    assert_eq!(error.to_string(), "Error: Failed to search notes.");
}

#[tokio::test(flavor = "current_thread")]
async fn export_renders_markdown_documents() {
    let (_backend, repository) = repository(sample_notes());

    let rendered = export_notes(&repository, ExportFormat::Markdown)
        .await
        .unwrap();

    assert!(rendered.contains("# Groceries"));
    assert!(rendered.contains("# Standup"));
    assert!(rendered.find("# Groceries") < rendered.find("# Standup"));
}

#[tokio::test(flavor = "current_thread")]
async fn gate_without_session_asks_for_sign_in() {
    let backend = Arc::new(MemoryBackend::new());
    let mut gate = SessionGate::new(auth_service(&backend));

    let error = pass_gate(&mut gate, "work").await.unwrap_err();

    assert_eq!(
        error.to_string(),
        "Profile 'work' is not signed in. Run `jot auth login --profile work` first."
    );
}

#[tokio::test(flavor = "current_thread")]
async fn gate_retries_a_failed_lookup_once() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_session(Some(session("me@example.com")));
    backend.fail_next(Operation::GetSession, "network down");
    let mut gate = SessionGate::new(auth_service(&backend));

    pass_gate(&mut gate, "default").await.unwrap();

    assert_eq!(backend.calls(Operation::GetSession), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn gate_reports_repeated_lookup_failures() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_next(Operation::GetSession, "network down");
    backend.fail_next(Operation::GetSession, "still down");
    let mut gate = SessionGate::new(auth_service(&backend));

    let error = pass_gate(&mut gate, "default").await.unwrap_err();

    assert!(matches!(error, CliError::Auth(message) if message.contains("still down")));
}

#[tokio::test(flavor = "current_thread")]
async fn login_then_logout_with_confirmation() {
    let backend = Arc::new(MemoryBackend::new());
    backend.register("me@example.com", "hunter22");
    let auth = auth_service(&backend);

    let session = login(&auth, " me@example.com ", "hunter22").await.unwrap();
    assert_eq!(session.email(), Some("me@example.com"));

    let cancelled = logout(&auth, |_| Ok(Confirmation::Cancel)).await.unwrap();
    assert_eq!(cancelled, LogoutOutcome::Cancelled);
    assert_eq!(backend.calls(Operation::SignOut), 0);

    let signed_out = logout(&auth, |prompt| {
        assert_eq!(prompt, &ConfirmPrompt::SIGN_OUT);
        Ok(Confirmation::Confirm)
    })
    .await
    .unwrap();
    assert_eq!(signed_out, LogoutOutcome::SignedOut);
    assert_eq!(auth.current(), None);

    let again = logout(&auth, |_| Ok(Confirmation::Confirm)).await.unwrap();
    assert_eq!(again, LogoutOutcome::NotSignedIn);
}

#[tokio::test(flavor = "current_thread")]
async fn login_with_wrong_password_shows_backend_message() {
    let backend = Arc::new(MemoryBackend::new());
    backend.register("me@example.com", "hunter22");
    let auth = auth_service(&backend);

    let error = login(&auth, "me@example.com", "wrong-password")
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "Error: Invalid login credentials (400)");
    assert_eq!(auth.current(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn signup_may_require_email_confirmation() {
    let backend = Arc::new(MemoryBackend::new());
    backend.require_email_confirmation(true);
    let auth = auth_service(&backend);

    let outcome = signup(&auth, "new@example.com", "hunter22").await.unwrap();

    assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
    assert_eq!(auth.current(), None);
}

#[test]
fn status_line_names_the_account() {
    assert_eq!(
        status_line("work", Some(&session("me@example.com"))),
        "Profile 'work' is signed in as me@example.com (user user-1)"
    );
    assert_eq!(status_line("work", None), "Profile 'work' is not signed in.");
}

#[test]
fn init_profile_merges_and_reports_missing_fields() {
    let mut config = CliProfilesConfig::default();

    let missing = init_profile(
        &mut config,
        "work",
        ProfileInit {
            supabase_url: Some("https://project.supabase.co/".to_string()),
            cache_policy: Some(CachePolicy::ApplyLocal),
            activate: true,
            ..ProfileInit::default()
        },
    )
    .unwrap();
    assert_eq!(missing, vec!["supabase_anon_key"]);
    assert_eq!(config.active_profile.as_deref(), Some("work"));

    let missing = init_profile(
        &mut config,
        "work",
        ProfileInit {
            supabase_anon_key: Some("anon".to_string()),
            ..ProfileInit::default()
        },
    )
    .unwrap();
    assert!(missing.is_empty());

    let profile = config.profile("work").unwrap();
    let client = profile.client_config().unwrap().unwrap();
    assert_eq!(client.supabase_url, "https://project.supabase.co");
    assert_eq!(client.cache_policy, CachePolicy::ApplyLocal);
}

#[test]
fn init_profile_rejects_non_http_urls() {
    let mut config = CliProfilesConfig {
        version: 1,
        active_profile: Some("default".to_string()),
        profiles: BTreeMap::new(),
    };

    let error = init_profile(
        &mut config,
        "work",
        ProfileInit {
            supabase_url: Some("project.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            ..ProfileInit::default()
        },
    )
    .unwrap_err();

    assert!(matches!(error, CliError::Config(_)));
    assert_eq!(config.active_profile.as_deref(), Some("default"));
}

#[test]
fn completions_generate_for_every_shell() {
    for shell in [CompletionShell::Bash, CompletionShell::Zsh, CompletionShell::Fish] {
        let script = String::from_utf8(generate_for_shell(shell)).unwrap();
        assert!(script.contains("jot"));
    }
}

#[test]
fn default_log_filter_covers_the_core_library() {
    assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES).is_ok());

    let targets = DEFAULT_LOG_DIRECTIVES
        .split(',')
        .filter_map(|directive| directive.split_once('=').map(|(target, _)| target))
        .collect::<Vec<_>>();
    assert_eq!(targets, vec!["jot", "jot_core"]);
}
