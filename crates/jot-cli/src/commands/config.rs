use std::env;

use jot_core::config::{SUPABASE_ANON_KEY_ENV, SUPABASE_URL_ENV};
use jot_core::util::normalize_text_option;
use jot_core::CachePolicy;

use crate::cli::ConfigCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Values passed to `config init`. `None` keeps what the profile has.
#[derive(Debug, Clone, Default)]
pub struct ProfileInit {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub notes_table: Option<String>,
    pub cache_policy: Option<CachePolicy>,
    pub activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            notes_table,
            cache_policy,
            no_activate,
        } => {
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let init = ProfileInit {
                supabase_url: supabase_url
                    .or_else(|| normalize_text_option(env::var(SUPABASE_URL_ENV).ok())),
                supabase_anon_key: supabase_anon_key
                    .or_else(|| normalize_text_option(env::var(SUPABASE_ANON_KEY_ENV).ok())),
                notes_table,
                cache_policy: cache_policy.map(Into::into),
                activate: !no_activate,
            };

            let missing = init_profile(&mut config, &profile_name, init)?;
            let path = config.save().map_err(CliError::Config)?;
            println!("Profile '{}' initialized at {}", profile_name, path.display());

            if missing.is_empty() {
                println!(
                    "Profile '{profile_name}' is ready. Run `jot auth login --email <email> --password <password>`."
                );
            } else {
                println!("Profile '{}' is missing: {}", profile_name, missing.join(", "));
            }
            Ok(())
        }
    }
}

/// Merge `init` into the named profile and report which required fields
/// are still unset.
pub fn init_profile(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    init: ProfileInit,
) -> Result<Vec<&'static str>, CliError> {
    let profile = config.profile_mut_or_default(profile_name);
    if let Some(value) = normalize_text_option(init.supabase_url) {
        profile.supabase_url = Some(value);
    }
    if let Some(value) = normalize_text_option(init.supabase_anon_key) {
        profile.supabase_anon_key = Some(value);
    }
    if let Some(value) = normalize_text_option(init.notes_table) {
        profile.notes_table = Some(value);
    }
    if let Some(policy) = init.cache_policy {
        profile.cache_policy = Some(policy);
    }

    // Rejects malformed URLs before anything is written.
    profile
        .client_config()
        .map_err(|error| CliError::Config(error.to_string()))?;

    let mut missing = Vec::new();
    if profile.supabase_url.is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key.is_none() {
        missing.push("supabase_anon_key");
    }

    if init.activate {
        config.active_profile = Some(profile_name.to_string());
    }
    Ok(missing)
}
