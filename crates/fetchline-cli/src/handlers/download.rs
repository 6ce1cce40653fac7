//! `fetchline download ...` handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use fetchline_core::{
    DownloadManagerPort, DownloadSession, ResumePolicy, SessionId, SessionState,
};

use crate::bootstrap::CliContext;
use crate::commands::DownloadCommand;
use crate::error::CliError;
use crate::presentation::{
    DownloadEvent, TerminalDownloadCallback, format_progress, print_separator, truncate_string,
};

pub async fn execute(ctx: &CliContext, command: DownloadCommand) -> Result<()> {
    match command {
        DownloadCommand::Add { url, output, kind } => add(ctx, &url, output, &kind).await,
        DownloadCommand::Start {
            target,
            output,
            pause_after,
            restart,
        } => start(ctx, &target, output, pause_after.map(Duration::from_secs), restart).await,
        DownloadCommand::Remove { id, keep_file } => remove(ctx, &id, keep_file).await,
        DownloadCommand::List { kind } => list(ctx, &kind).await,
        DownloadCommand::Count => {
            println!("{}", ctx.downloads().get_download_count().await?);
            Ok(())
        }
        DownloadCommand::Show { id } => show(ctx, &id).await,
        DownloadCommand::Recover => {
            let recovered = ctx.downloads().recover_interrupted().await?;
            println!("Marked {recovered} interrupted download(s) as paused.");
            Ok(())
        }
    }
}

/// Destination for `url` when none is given: the last path segment inside
/// `dir`, or the session id when the URL has none.
pub fn default_output(dir: &Path, url: &str) -> PathBuf {
    let name = url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map_or_else(|| SessionId::from_url(url).to_string(), ToString::to_string);
    dir.join(name)
}

fn looks_like_url(target: &str) -> bool {
    target.contains("://")
}

/// Look up the record for `target` (id or URL).
async fn find(ctx: &CliContext, target: &str) -> Result<Option<DownloadSession>> {
    let id = if looks_like_url(target) {
        SessionId::from_url(target)
    } else {
        SessionId::new(target)
    };
    Ok(ctx.downloads().session(&id).await?)
}

async fn add(ctx: &CliContext, url: &str, output: Option<PathBuf>, kind: &str) -> Result<()> {
    let path = output.unwrap_or_else(|| default_output(&ctx.download_dir, url));
    let session = DownloadSession::new(url, path).with_kind(kind);
    if ctx.downloads().session(&session.id).await?.is_some() {
        println!("Already registered: {}", session.id);
        return Ok(());
    }
    ctx.store.save(&session).await?;
    println!("{}\t{}", session.id, session.local_path.display());
    Ok(())
}

async fn start(
    ctx: &CliContext,
    target: &str,
    output: Option<PathBuf>,
    pause_after: Option<Duration>,
    restart: bool,
) -> Result<()> {
    let session = match find(ctx, target).await? {
        Some(stored) => stored,
        None if looks_like_url(target) => {
            let path = output.unwrap_or_else(|| default_output(&ctx.download_dir, target));
            DownloadSession::new(target, path)
        }
        None => {
            return Err(CliError::Arguments(format!("no download with id '{target}'")).into());
        }
    };
    if session.state == SessionState::Completed {
        println!("Already completed: {}", session.local_path.display());
        return Ok(());
    }

    let restarted;
    let manager = if restart {
        let config = ctx
            .config()
            .download
            .clone()
            .with_resume_policy(ResumePolicy::Restart);
        restarted = ctx.downloads_with(config);
        &restarted
    } else {
        ctx.downloads().as_ref()
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = session.with_callback(Arc::new(TerminalDownloadCallback::new(tx)));
    println!("Downloading {} -> {}", session.remote_url, session.local_path.display());
    manager.start_download(session.clone()).await?;

    let pause_timer = async {
        match pause_after {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(pause_timer);

    let event = tokio::select! {
        event = rx.recv() => event,
        _ = tokio::signal::ctrl_c() => {
            debug!(id = %session.id, "Interrupted; pausing");
            manager.stop_download(&session).await?;
            rx.recv().await
        }
        () = &mut pause_timer => {
            manager.stop_download(&session).await?;
            rx.recv().await
        }
    };
    manager.wait_idle().await;

    match event {
        Some(DownloadEvent::Completed { downloaded }) => {
            println!("Completed: {} ({downloaded} bytes)", session.local_path.display());
            Ok(())
        }
        Some(DownloadEvent::Paused { downloaded }) => {
            println!(
                "Paused at {downloaded} bytes. Resume with: fetchline download start {}",
                session.id
            );
            Ok(())
        }
        Some(DownloadEvent::Failed(error)) => Err(CliError::from(error).into()),
        Some(DownloadEvent::Deleted) | None => Err(CliError::Cancelled.into()),
    }
}

async fn remove(ctx: &CliContext, id: &str, keep_file: bool) -> Result<()> {
    let Some(session) = ctx.downloads().session(&SessionId::new(id)).await? else {
        println!("No download with id '{id}'.");
        return Ok(());
    };
    ctx.downloads().remove_download(&session, !keep_file).await?;
    if keep_file {
        println!("Removed {id}; kept {}", session.local_path.display());
    } else {
        println!("Removed {id} and deleted {}", session.local_path.display());
    }
    Ok(())
}

async fn list(ctx: &CliContext, kind: &str) -> Result<()> {
    let sessions = ctx.downloads().get_download_list(kind).await?;
    if sessions.is_empty() {
        println!("No downloads of kind '{kind}'.");
        println!("Use 'fetchline download add <url>' to register one.");
        return Ok(());
    }

    println!(
        "{:<17} {:<12} {:<28} {:<20} Path",
        "ID", "State", "Progress", "Updated"
    );
    print_separator(110);
    for session in sessions {
        println!(
            "{:<17} {:<12} {:<28} {:<20} {}",
            session.id.as_str(),
            session.state.as_str(),
            format_progress(session.downloaded_bytes, session.total_bytes),
            session.updated_at.format("%Y-%m-%d %H:%M:%S"),
            truncate_string(&session.local_path.display().to_string(), 40),
        );
    }
    Ok(())
}

async fn show(ctx: &CliContext, id: &str) -> Result<()> {
    let Some(session) = ctx.downloads().session(&SessionId::new(id)).await? else {
        return Err(CliError::Arguments(format!("no download with id '{id}'")).into());
    };
    println!("ID:       {}", session.id);
    println!("Kind:     {}", session.kind);
    println!("URL:      {}", session.remote_url);
    println!("Path:     {}", session.local_path.display());
    println!("State:    {}", session.state);
    println!(
        "Progress: {}",
        format_progress(session.downloaded_bytes, session.total_bytes)
    );
    if let Some(error) = &session.error {
        println!("Error:    {error}");
    }
    println!("Created:  {}", session.created_at.to_rfc3339());
    println!("Updated:  {}", session.updated_at.to_rfc3339());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_uses_last_segment() {
        let dir = Path::new("/downloads");
        assert_eq!(
            default_output(dir, "https://files.test/path/file.bin?token=1"),
            dir.join("file.bin")
        );
    }

    #[test]
    fn test_default_output_falls_back_to_id() {
        let dir = Path::new("/downloads");
        let url = "https://files.test/";
        assert_eq!(
            default_output(dir, url),
            dir.join(SessionId::from_url(url).as_str())
        );
        let bare = "https://files.test";
        assert_eq!(default_output(dir, bare), dir.join("files.test"));
    }

    #[test]
    fn test_looks_like_url() {
        assert!(looks_like_url("https://files.test/a"));
        assert!(!looks_like_url("0123456789abcdef"));
    }
}
