use crate::cli::{CreateAdminArgs, ExportArgs, ImportArgs};
use estate_hub::auth::router::{create_account, RegisterRequest};
use estate_hub::auth::{AuthUser, Role, User};
use estate_hub::config::AppConfig;
use estate_hub::error::AppError;
use estate_hub::store::DocumentStore;
use estate_hub::transfer::{export_csv, import_csv, EntityKind, ImportReport};
use estate_hub::AppContext;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Opens the snapshot named by `--data`, falling back to APP_DATA_PATH.
pub(crate) fn open_store(
    config: &AppConfig,
    data: Option<PathBuf>,
) -> Result<Option<DocumentStore>, AppError> {
    match data.or_else(|| config.storage.data_path.clone()) {
        Some(path) => Ok(Some(DocumentStore::open(path)?)),
        None => Ok(None),
    }
}

/// Offline commands only make sense against a persisted store.
fn require_store(config: &AppConfig, data: Option<PathBuf>) -> Result<DocumentStore, AppError> {
    open_store(config, data)?.ok_or_else(|| {
        AppError::Command("a data file is required: pass --data or set APP_DATA_PATH".to_string())
    })
}

fn entity(name: &str) -> Result<EntityKind, AppError> {
    EntityKind::parse(name).ok_or_else(|| {
        let known: Vec<_> = EntityKind::ordered().iter().map(|kind| kind.label()).collect();
        AppError::Command(format!(
            "unknown entity '{}' (expected one of {})",
            name,
            known.join(", ")
        ))
    })
}

/// Imports run as the first active administrator so owned rows have a real owner.
fn import_caller(store: &DocumentStore) -> Result<AuthUser, AppError> {
    store
        .find_one(|user: &User| user.role == Role::Admin && user.active)?
        .map(AuthUser::from)
        .ok_or_else(|| {
            AppError::Command("no active admin account; run create-admin first".to_string())
        })
}

pub(crate) fn import_entity(args: ImportArgs, data: Option<PathBuf>) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = require_store(&config, data)?;
    let entity = entity(&args.entity)?;
    let caller = import_caller(&store)?;

    let file = File::open(&args.file)?;
    let report = import_csv(&store, entity, BufReader::new(file), &caller, args.dry_run)?;
    render_report(&args.file, &report);
    Ok(())
}

fn render_report(path: &Path, report: &ImportReport) {
    let mode = if report.dry_run { "dry run" } else { "import" };
    println!("{} of {} from {}", mode, report.entity, path.display());
    println!(
        "- {} rows read | {} valid | {} stored | {} errors",
        report.total_rows,
        report.valid_rows,
        report.imported,
        report.errors.len()
    );
    for error in &report.errors {
        println!("  - line {} [{}]: {}", error.row, error.column, error.message);
    }
}

pub(crate) fn export_entity(args: ExportArgs, data: Option<PathBuf>) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = require_store(&config, data)?;
    let entity = entity(&args.entity)?;

    let rows = match &args.output {
        Some(path) => export_csv(&store, entity, BufWriter::new(File::create(path)?))?,
        None => export_csv(&store, entity, std::io::stdout().lock())?,
    };
    if let Some(path) = &args.output {
        println!("exported {} {} to {}", rows, entity.label(), path.display());
    }
    Ok(())
}

pub(crate) async fn create_admin(args: CreateAdminArgs, data: Option<PathBuf>) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = require_store(&config, data)?;
    let ctx = AppContext::from_config(&config, store);

    let request = RegisterRequest {
        name: args.name,
        email: args.email,
        password: args.password,
        role: Some(Role::Admin),
        phone: None,
    };
    let user = create_account(&ctx, request, true)
        .await
        .map_err(|err| AppError::Command(format!("could not create admin: {}", err)))?;
    println!("created admin {} <{}>", user.id, user.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entity_lists_the_choices() {
        let err = entity("users").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown entity 'users'"));
        assert!(message.contains("properties"));
        assert_eq!(entity("Categories").unwrap(), EntityKind::Categories);
    }

    #[test]
    fn import_needs_an_admin() {
        let store = DocumentStore::in_memory();
        assert!(matches!(import_caller(&store), Err(AppError::Command(_))));
    }
}
