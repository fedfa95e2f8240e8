//! One plugin invocation, from parsed arguments to a service state.

use crate::check::{check_all, check_listed, CheckReport, FsFilter, ServiceState};
use crate::cli::Cli;
use anyhow::Result;
use rofs_mountlist::{MountList, MountListResult};
use std::fs::{self, File};
use std::io::Write;

pub const PROGRAM_NAME: &str = "check_readonlyfs";

impl From<&Cli> for FsFilter {
    fn from(cli: &Cli) -> Self {
        Self {
            select_types: cli.types.clone(),
            exclude_types: cli.exclude_types.clone(),
            local_only: cli.local,
        }
    }
}

/// Opens each named file system so automounted ones are present in the
/// mount table. Returns the names that could be opened.
pub fn touch_filesystems(names: &[String], err: &mut impl Write) -> Result<Vec<String>> {
    let mut reachable = Vec::with_capacity(names.len());
    for name in names {
        if File::open(name).is_ok() || fs::metadata(name).is_ok() {
            reachable.push(name.clone());
        } else {
            writeln!(err, "{PROGRAM_NAME}: cannot open `{name}'")?;
        }
    }
    Ok(reachable)
}

/// Runs the check with an injected mount-list loader.
pub fn run_with<L>(
    cli: &Cli,
    load: L,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<ServiceState>
where
    L: FnOnce(bool) -> MountListResult<MountList>,
{
    let filter = FsFilter::from(cli);
    if let Some(fs_type) = filter.conflicting_type() {
        writeln!(
            err,
            "{PROGRAM_NAME}: file system type `{fs_type}' both selected and excluded"
        )?;
        return Ok(ServiceState::Unknown);
    }

    let names = if cli.filesystems.is_empty() {
        Vec::new()
    } else {
        touch_filesystems(&cli.filesystems, err)?
    };

    let list = match load(filter.needs_fs_type()) {
        Ok(list) => list,
        Err(e) => {
            log::info!("mount list unavailable ({:?}): {e}", e.kind());
            writeln!(
                err,
                "{PROGRAM_NAME}: cannot read table of mounted file systems"
            )?;
            return Ok(ServiceState::Unknown);
        }
    };

    let report = if cli.filesystems.is_empty() {
        check_all(&list, &filter)
    } else {
        check_listed(&list, &names, &filter)
    };
    emit(cli, &report, out, err)?;
    Ok(report.state)
}

fn emit(
    cli: &Cli,
    report: &CheckReport,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<()> {
    if cli.list {
        for line in &report.listing {
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }
    match report.state {
        ServiceState::Ok => writeln!(out, "{}", report.summary())?,
        _ => writeln!(err, "{}", report.summary())?,
    }
    Ok(())
}
