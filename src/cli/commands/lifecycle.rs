//! Working copy lifecycle commands: clone, fetch, reset, delete, exists

use anyhow::{Context as _, Result};
use serde_json::json;

use super::version;
use crate::cli::Context;
use crate::core::types::RefName;
use crate::repo::CloneOutcome;
use crate::ui::output;

pub fn clone(ctx: &Context, name: &str) -> Result<()> {
    let version = version(name)?;
    let outcome = ctx
        .executor
        .ensure_cloned(&version)
        .with_context(|| format!("failed to clone version '{}'", version))?;
    let cloned = outcome == CloneOutcome::Cloned;

    if ctx.json {
        output::json(&json!({ "version": version, "cloned": cloned }))?;
    } else if cloned {
        output::print(format!("Cloned '{}'", version), ctx.verbosity);
    } else {
        output::print(format!("'{}' is already cloned", version), ctx.verbosity);
    }
    Ok(())
}

pub fn fetch(ctx: &Context, name: &str, refname: &str) -> Result<()> {
    let version = version(name)?;
    let refname = RefName::new(refname).with_context(|| format!("invalid ref '{}'", refname))?;
    let oid = ctx
        .executor
        .fetch_ref(&version, &refname)
        .with_context(|| format!("failed to fetch '{}' into '{}'", refname, version))?;

    if ctx.json {
        output::json(&json!({ "version": version, "ref": refname, "commit": oid }))?;
    } else {
        output::print(
            format!("'{}' now at {} ({})", version, oid.short(7), refname),
            ctx.verbosity,
        );
    }
    Ok(())
}

pub fn reset(ctx: &Context, name: &str) -> Result<()> {
    let version = version(name)?;
    let oid = ctx
        .executor
        .reset_head_to_remote(&version)
        .with_context(|| format!("failed to reset '{}'", version))?;

    if ctx.json {
        output::json(&json!({ "version": version, "commit": oid }))?;
    } else {
        output::print(
            format!("'{}' reset to origin/{} at {}", version, version, oid.short(7)),
            ctx.verbosity,
        );
    }
    Ok(())
}

pub fn delete(ctx: &Context, name: &str) -> Result<()> {
    let version = version(name)?;
    ctx.executor
        .delete_repo(&version)
        .with_context(|| format!("failed to delete '{}'", version))?;

    if ctx.json {
        output::json(&json!({ "version": version, "deleted": true }))?;
    } else {
        output::print(format!("Deleted working copy of '{}'", version), ctx.verbosity);
    }
    Ok(())
}

pub fn exists(ctx: &Context, name: &str) -> Result<()> {
    let version = version(name)?;
    let exists = ctx.executor.repo_exists(&version);

    if ctx.json {
        output::json(&json!({ "version": version, "exists": exists }))?;
    } else {
        output::result(if exists { "yes" } else { "no" });
    }
    Ok(())
}
