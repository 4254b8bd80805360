// UI layer: one function per CLI command. Each talks to the `Session` and
// prints a short human-readable report; errors bubble up to `main`, which
// prints them and exits non-zero.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::{Credentials, Session, SessionConfig};
use crate::app_conf;
use crate::cli::{Cli, Command};
use crate::download::Destination;
use crate::error::ClientError;
use crate::extract;
use crate::models::Release;

/// Log in and run the selected command.
pub fn run(cli: Cli) -> Result<()> {
    let credentials = credentials(cli.username, cli.password)?;
    let config = SessionConfig::from_env();
    let mut session = Session::login(&config, &credentials)?;

    match cli.command {
        Command::CheckAppForUpdate {
            splunk_version,
            app_dir,
        } => check_app_for_update(&mut session, splunk_version.as_deref(), &app_dir),
        Command::DownloadApp {
            output_path,
            version,
            extract,
            app_name,
        } => download_app(
            &mut session,
            &app_name,
            version.as_deref(),
            output_path.as_deref(),
            extract,
        ),
        Command::GetLatestVersion {
            splunk_version,
            app_name,
        } => get_latest_version(&mut session, &app_name, splunk_version.as_deref()),
        Command::DumpMetadata { id, app } => dump_metadata(&mut session, &app, id),
    }
}

/// Fill in the password with a hidden terminal prompt when it was not given
/// on the command line or in the environment.
fn credentials(username: String, password: Option<String>) -> Result<Credentials> {
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Splunkbase password")
            .interact()
            .context("Failed to read password")?,
    };
    Ok(Credentials { username, password })
}

pub fn check_app_for_update(
    session: &mut Session,
    splunk_version: Option<&str>,
    app_dir: &Path,
) -> Result<()> {
    let app_name = app_dir
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Cannot derive an app name from {}", app_dir.display()))?;

    let release = match session.get_latest_version(app_name, splunk_version) {
        Ok(release) => Some(release),
        Err(ClientError::AppNotFound { .. } | ClientError::NoReleaseFound { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let installed = app_conf::installed_version(app_dir)?;

    println!("{app_name} {installed}");
    let Some(release) = release else {
        println!("Latest: UNAVAILABLE");
        return Ok(());
    };

    if release.title == installed {
        println!("App is up-to-date");
    } else {
        println!("Latest: {}", release.title);
    }
    if let Some(url) = session.app_page_url(app_name)? {
        println!("URL: {url}");
    }
    print_compatibility(&release);
    Ok(())
}

pub fn download_app(
    session: &mut Session,
    app_name: &str,
    version: Option<&str>,
    output_path: Option<&str>,
    extract: bool,
) -> Result<()> {
    let destination = output_path.map(Destination::parse);
    let progress = if destination == Some(Destination::Stdout) || !std::io::stderr().is_terminal()
    {
        ProgressBar::hidden()
    } else {
        download_bar(app_name)
    };

    let downloaded = session.download(app_name, version, destination, &progress)?;

    let Some(path) = downloaded.destination.as_path() else {
        return Ok(());
    };
    eprintln!(
        "Downloaded {app_name} {} to {}",
        downloaded.release.title,
        path.display()
    );
    if let Some(author) = downloaded.release.author() {
        eprintln!("Author: {author}");
    }

    if extract {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        extract::extract_archive(path, &cwd)
            .with_context(|| format!("Failed to extract {}", path.display()))?;
        eprintln!("Extracted into {}", cwd.display());
    }
    Ok(())
}

pub fn get_latest_version(
    session: &mut Session,
    app_name: &str,
    splunk_version: Option<&str>,
) -> Result<()> {
    let release = session.get_latest_version(app_name, splunk_version)?;

    match release.manifest_title() {
        Some(title) => println!("{app_name} - {title}"),
        None => println!("{app_name}"),
    }
    println!("Latest: {}", release.title);
    if let Some(published) = release.published_at() {
        println!("Released: {}", published.format("%Y-%m-%d"));
    }
    print_compatibility(&release);
    Ok(())
}

/// Print the metadata document for an app name, or for a numeric id when
/// `by_id` is set.
pub fn dump_metadata(session: &mut Session, app: &str, by_id: bool) -> Result<()> {
    let not_found = || ClientError::AppNotFound {
        name: app.to_string(),
    };
    let json = if by_id {
        let id: u64 = app
            .parse()
            .with_context(|| format!("'{app}' is not a numeric app id"))?;
        let metadata = session.fetch_metadata(id)?.ok_or_else(not_found)?;
        serde_json::to_string_pretty(&metadata)?
    } else {
        let metadata = session.get_app_info(app)?.ok_or_else(not_found)?;
        serde_json::to_string_pretty(metadata)?
    };
    println!("{json}");
    Ok(())
}

fn print_compatibility(release: &Release) {
    println!("Supported Splunk Versions:");
    println!("{}", release.splunk_compatibility.join(" "));
}

fn download_bar(app_name: &str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{msg} {bar:40.cyan/blue} {bytes}/{total_bytes}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar.set_message(format!("Downloading {app_name}"));
    bar
}
