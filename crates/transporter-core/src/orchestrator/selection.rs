//! Interactive endpoint selection

use std::path::Path;

use super::endpoint::{
    DUMP_TO_FILE_OPTION, Endpoint, LOAD_FROM_FILE_OPTION, SourceCatalog, TransferRequest,
    destination_candidates,
};
use super::Presenter;
use crate::{Result, TransferError, ValidationError};

/// Endpoints fixed ahead of time (e.g. from command-line flags).
///
/// Missing sides are chosen interactively.
#[derive(Debug, Clone, Default)]
pub struct EndpointPreset {
    pub source: Option<Endpoint>,
    pub destination: Option<Endpoint>,
}

/// Resolve both endpoints, prompting for whichever side is not preset.
pub async fn select_endpoints(
    catalog: &SourceCatalog,
    preset: EndpointPreset,
    presenter: &dyn Presenter,
    default_dump_path: &Path,
) -> Result<TransferRequest> {
    let source = match preset.source {
        Some(source) => source,
        None => select_source(catalog, presenter, default_dump_path).await?,
    };

    let destination = match preset.destination {
        Some(destination) => destination,
        None => select_destination(catalog, &source, presenter, default_dump_path).await?,
    };

    tracing::debug!(source = %source, destination = %destination, "endpoints selected");
    Ok(TransferRequest::new(source, destination))
}

async fn select_source(
    catalog: &SourceCatalog,
    presenter: &dyn Presenter,
    default_dump_path: &Path,
) -> Result<Endpoint> {
    let mut options = catalog.names();
    options.push(LOAD_FROM_FILE_OPTION.to_string());

    let choice = presenter.select("Select SOURCE:", &options).await?;
    if choice == LOAD_FROM_FILE_OPTION {
        let path = presenter
            .input_path("Enter input dump file path:", default_dump_path, true)
            .await?;
        return Ok(Endpoint::File(path));
    }

    resolve(catalog, &choice, "source")
}

async fn select_destination(
    catalog: &SourceCatalog,
    source: &Endpoint,
    presenter: &dyn Presenter,
    default_dump_path: &Path,
) -> Result<Endpoint> {
    let options = destination_candidates(catalog, source);
    if options.is_empty() {
        return Err(ValidationError::NoDestinationCandidates.into());
    }

    let choice = presenter.select("Select DESTINATION:", &options).await?;
    if choice == DUMP_TO_FILE_OPTION && source.is_database() {
        let path = presenter
            .input_path("Enter output dump file path:", default_dump_path, false)
            .await?;
        return Ok(Endpoint::File(path));
    }

    resolve(catalog, &choice, "destination")
}

fn resolve(catalog: &SourceCatalog, name: &str, side: &str) -> Result<Endpoint> {
    catalog
        .get(name)
        .cloned()
        .map(Endpoint::Database)
        .ok_or_else(|| TransferError::Selection(format!("invalid {} selection {:?}", side, name)))
}
