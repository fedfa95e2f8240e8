//! Drives one mount source into a finished [`MountList`].

use crate::classify::Classifier;
use crate::config::SourceConfig;
use crate::entry::{MountList, MountListBuilder};
use crate::source::{host_source, MountSource};
use rofs_error::{MountListError, MountListResult};

/// Reads the current mount table through the compiled-in source.
///
/// `need_fs_type` is advisory: sources that cannot always name the
/// filesystem type fill it best effort.
pub fn read_file_system_list(need_fs_type: bool) -> MountListResult<MountList> {
    let config = SourceConfig::from_env();
    let source = host_source(&config);
    let classifier =
        Classifier::for_host().with_extra_pseudo_types(config.extra_pseudo_types.iter().cloned());
    read_from_source(&source, &classifier, need_fs_type)
}

/// Reads every record of `source`, classifying each one.
///
/// All or nothing: on any error the handle is released and every entry
/// built so far is dropped before the error is returned.
pub fn read_from_source<S>(
    source: &S,
    classifier: &Classifier,
    need_fs_type: bool,
) -> MountListResult<MountList>
where
    S: MountSource + ?Sized,
{
    if need_fs_type && !source.reliable_fs_type() {
        log::debug!(
            "{} cannot always report filesystem types; filling them best effort",
            source.name()
        );
    }

    let mut entries = source
        .fetch_raw_entries()
        .inspect_err(|err| log::debug!("mount source {} unavailable: {err}", source.name()))?;

    let mut builder = MountListBuilder::new(classifier);
    for raw in &mut entries {
        match raw {
            Ok(raw) => builder.push(raw),
            Err(err) => {
                log_stream_failure(source.name(), builder.len(), &err);
                return Err(err);
            }
        }
    }
    drop(entries);

    let list = builder.finish();
    log::debug!("read {} mounts from {}", list.len(), source.name());
    Ok(list)
}

fn log_stream_failure(name: &str, built: usize, err: &MountListError) {
    log::debug!(
        "mount source {name} failed mid-stream ({:?}); discarding {built} entries: {err}",
        err.kind()
    );
}
