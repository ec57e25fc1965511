//! File commands: ls, cat, dates, conflicts, rollback, submit

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use serde_json::json;

use super::version;
use crate::cli::Context;
use crate::repo::Publication;
use crate::ui::output;

pub fn ls(ctx: &Context, name: &str, path: &str) -> Result<()> {
    let version = version(name)?;
    let files = ctx
        .executor
        .list_files_under_path(&version, path)
        .with_context(|| format!("failed to list '{}' in '{}'", path, version))?;

    if ctx.json {
        output::json(&json!({ "version": version, "path": path, "files": files }))?;
    } else if !files.is_empty() {
        output::result(output::format_list(&files, ""));
    }
    Ok(())
}

pub fn cat(ctx: &Context, name: &str, path: &str) -> Result<()> {
    let version = version(name)?;
    let content = ctx
        .executor
        .read_file_content(&version, path)
        .with_context(|| format!("failed to read '{}' in '{}'", path, version))?;

    if ctx.json {
        output::json(&json!({ "version": version, "path": path, "content": content }))?;
        return Ok(());
    }
    match content {
        Some(content) => {
            print!("{}", content);
            Ok(())
        }
        None => bail!("'{}' does not exist in '{}'", path, version),
    }
}

pub fn dates(ctx: &Context, name: &str, path: &str) -> Result<()> {
    let version = version(name)?;
    let dates = ctx
        .executor
        .file_dates(&version, path)
        .with_context(|| format!("failed to read history of '{}' in '{}'", path, version))?;

    if ctx.json {
        output::json(&json!({ "version": version, "path": path, "dates": dates }))?;
        return Ok(());
    }
    match dates {
        Some(dates) => {
            output::result(format!("created: {}", dates.create.to_rfc3339()));
            output::result(format!("updated: {}", dates.update.to_rfc3339()));
        }
        None => output::print(format!("No history for '{}'", path), ctx.verbosity),
    }
    Ok(())
}

pub fn conflicts(ctx: &Context, name: &str, target: &str) -> Result<()> {
    let version = version(name)?;
    let paths = ctx
        .executor
        .merge_conflicts(&version, target)
        .with_context(|| format!("failed to probe merge of '{}' into '{}'", target, version))?;

    if ctx.json {
        output::json(&json!({ "version": version, "target": target, "conflicts": paths }))?;
    } else if paths.is_empty() {
        output::print("No conflicts", ctx.verbosity);
    } else {
        output::result(output::format_list(&paths, ""));
    }
    Ok(())
}

fn report(ctx: &Context, action: &str, path: &str, publication: &Publication) -> Result<()> {
    let commit = match publication {
        Publication::Pushed { commit } => Some(commit),
        Publication::Unchanged => None,
    };
    if ctx.json {
        output::json(&json!({ "path": path, "action": action, "commit": commit }))?;
        return Ok(());
    }
    match commit {
        Some(commit) => output::print(
            format!("{} '{}' as {}", action, path, commit.short(7)),
            ctx.verbosity,
        ),
        None => output::print(format!("'{}' unchanged, nothing pushed", path), ctx.verbosity),
    }
    Ok(())
}

pub fn rollback(ctx: &Context, name: &str, path: &str) -> Result<()> {
    let version = version(name)?;
    let publication = ctx
        .executor
        .rollback_file(&version, path)
        .with_context(|| format!("failed to roll back '{}' in '{}'", path, version))?;
    report(ctx, "Rolled back", path, &publication)
}

pub fn submit(ctx: &Context, name: &str, path: &str, from: &Path) -> Result<()> {
    let version = version(name)?;
    let content = std::fs::read_to_string(from)
        .with_context(|| format!("failed to read {}", from.display()))?;
    let publication = ctx
        .executor
        .commit_and_submit(&version, path, &content)
        .with_context(|| format!("failed to submit '{}' from '{}'", path, version))?;
    report(ctx, "Submitted", path, &publication)
}
