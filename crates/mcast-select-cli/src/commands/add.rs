//! Select devices of an application and add them to a multicast group.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use mcast_select_core::error::SelectionError;
use mcast_select_core::storage::{parse_dev_eui, InventoryStore};
use mcast_select_core::types::{GroupId, SourceId};
use mcast_select_core::{SelectionController, SessionOptions, Submission};

use crate::cli::AddArgs;
use crate::commands::open_inventory;
use crate::error::CliError;
use crate::output::get_formatter;

/// Run the add command
pub async fn run_add(
    args: AddArgs,
    inventory: Option<&Path>,
    concurrency: usize,
    json: bool,
) -> Result<(), CliError> {
    let formatter = get_formatter(json);
    let store = open_inventory(inventory).await?;

    let pb = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Loading devices [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    };

    let result = execute(&args, store, concurrency, &pb).await;
    pb.finish_and_clear();
    let (submission, warnings) = result?;

    if !json {
        for warning in &warnings {
            eprintln!("Warning: {}", warning);
        }
    }

    println!("{}", formatter.format_submission(&submission, args.dry_run));
    Ok(())
}

/// Load the source, apply the requested toggles and plan or send the submission.
///
/// Returns the submission together with warnings for toggles that were ignored.
async fn execute(
    args: &AddArgs,
    store: Arc<InventoryStore>,
    concurrency: usize,
    pb: &ProgressBar,
) -> Result<(Submission, Vec<String>), CliError> {
    let options = SessionOptions {
        lookup_concurrency: concurrency,
        page_size: args.page_size,
        strategy: args.strategy.into(),
    };
    let mut controller =
        SelectionController::new(store.clone(), GroupId::new(args.group.as_str()), options);

    let source = controller
        .choose_eligible_source(store.as_ref(), SourceId(args.source))
        .await?;
    controller
        .load_all_pages(store.as_ref(), None, |loaded, total| {
            pb.set_length(total as u64);
            pb.set_position(loaded as u64);
        })
        .await?;

    let warnings = apply_toggles(&mut controller, args)?;

    let strategy = controller.options().strategy;
    let submission = if args.dry_run {
        controller.plan(strategy)?
    } else {
        controller.submit_to(store.as_ref(), strategy).await?
    };

    info!(
        group = %args.group,
        application = %source.id,
        dry_run = args.dry_run,
        "selection planned"
    );
    Ok((submission, warnings))
}

fn apply_toggles(
    controller: &mut SelectionController<InventoryStore>,
    args: &AddArgs,
) -> Result<Vec<String>, CliError> {
    let mut warnings = Vec::new();

    if args.all {
        controller.on_toggle_select_all(true)?;
    }

    let toggles = args
        .include
        .iter()
        .map(|raw| (raw, true))
        .chain(args.exclude.iter().map(|raw| (raw, false)));

    for (raw, checked) in toggles {
        let id = parse_dev_eui(raw)?;
        if !controller.known_devices()?.contains(&id) {
            return Err(CliError::InvalidArgument(format!(
                "device {} is not in application {}",
                id, args.source
            )));
        }

        match controller.on_toggle_row(&id, checked) {
            Ok(()) => {}
            Err(SelectionError::InvalidToggle { device }) => {
                warnings.push(format!("device {} is already in group {}", device, args.group));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StrategyArg;
    use crate::commands::fixtures::{self, FREE_1, FREE_2, JOINED, OTHER_APP};
    use crate::error::exit_codes;
    use mcast_select_core::types::DeviceId;
    use tempfile::TempDir;

    fn args(source: i64) -> AddArgs {
        AddArgs {
            group: "g1".to_string(),
            source,
            all: false,
            include: Vec::new(),
            exclude: Vec::new(),
            page_size: 2,
            strategy: StrategyArg::Forward,
            dry_run: false,
        }
    }

    async fn store(dir: &TempDir) -> Arc<InventoryStore> {
        let path = fixtures::write_inventory(dir.path()).await;
        Arc::new(InventoryStore::load(path).await.unwrap())
    }

    #[tokio::test]
    async fn test_add_included_devices() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let mut args = args(1);
        args.include = vec![FREE_1.to_uppercase()];

        let (submission, warnings) = execute(&args, store.clone(), 4, &ProgressBar::hidden())
            .await
            .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(
            submission,
            Submission::AddDevices {
                group: GroupId::from("g1"),
                devices: vec![DeviceId::from(FREE_1)],
            }
        );
        assert!(store
            .members(&GroupId::from("g1"))
            .await
            .contains(&DeviceId::from(FREE_1)));

        // Written through to the file.
        let reloaded = InventoryStore::load(store.path()).await.unwrap();
        assert_eq!(reloaded.members(&GroupId::from("g1")).await.len(), 2);
    }

    #[tokio::test]
    async fn test_upper_case_inventory_matches_included_ids() {
        let dir = TempDir::new().unwrap();
        let path = fixtures::write_inventory(dir.path()).await;
        let content = tokio::fs::read_to_string(&path)
            .await
            .unwrap()
            .replace(JOINED, &JOINED.to_uppercase())
            .replace(FREE_1, &FREE_1.to_uppercase());
        tokio::fs::write(&path, content).await.unwrap();
        let store = Arc::new(InventoryStore::load(&path).await.unwrap());

        let mut args = args(1);
        args.include = vec![FREE_1.to_uppercase(), JOINED.to_string()];
        args.dry_run = true;

        let (submission, warnings) = execute(&args, store, 4, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains(JOINED));
        assert_eq!(
            submission,
            Submission::AddDevices {
                group: GroupId::from("g1"),
                devices: vec![DeviceId::from(FREE_1)],
            }
        );
    }

    #[tokio::test]
    async fn test_all_with_exclusion_materialized() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let mut args = args(1);
        args.all = true;
        args.exclude = vec![FREE_2.to_string()];
        args.strategy = StrategyArg::Materialize;
        args.dry_run = true;

        let (submission, _) = execute(&args, store.clone(), 4, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(
            submission,
            Submission::AddDevices {
                group: GroupId::from("g1"),
                devices: vec![DeviceId::from(FREE_1)],
            }
        );
        // Dry run leaves the group untouched.
        assert_eq!(store.members(&GroupId::from("g1")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_all_forwarded_to_service() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let mut args = args(1);
        args.all = true;
        args.exclude = vec![FREE_2.to_string()];

        let (submission, _) = execute(&args, store.clone(), 4, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(
            submission,
            Submission::AddSourceDevices {
                group: GroupId::from("g1"),
                application: SourceId(1),
                exceptions: vec![DeviceId::from(FREE_2)],
            }
        );
        let members = store.members(&GroupId::from("g1")).await;
        assert!(members.contains(&DeviceId::from(FREE_1)));
        assert!(!members.contains(&DeviceId::from(FREE_2)));
    }

    #[tokio::test]
    async fn test_joined_device_toggle_warns() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let mut args = args(1);
        args.include = vec![JOINED.to_string(), FREE_2.to_string()];
        args.dry_run = true;

        let (submission, warnings) = execute(&args, store, 4, &ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains(JOINED));
        assert_eq!(
            submission,
            Submission::AddDevices {
                group: GroupId::from("g1"),
                devices: vec![DeviceId::from(FREE_2)],
            }
        );
    }

    #[tokio::test]
    async fn test_nothing_selected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let err = execute(&args(1), store, 4, &ProgressBar::hidden())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::EMPTY_SELECTION);
    }

    #[tokio::test]
    async fn test_device_outside_source_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let mut args = args(1);
        args.include = vec![OTHER_APP.to_string()];

        let err = execute(&args, store, 4, &ProgressBar::hidden())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_ineligible_source_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let err = execute(&args(2), store, 4, &ProgressBar::hidden())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::INVALID_ARGS);
    }
}
