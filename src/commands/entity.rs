//! `arscan entity` - show a drive, folder or file.

use anyhow::{Context, Result};
use clap::Args;

use arscan::arfs::{EntityKind, EntityResolver, StateReconstructor};
use arscan::report::{self, EntityView, OutputFormat, ReportContext};

use super::{Session, emit};

#[derive(Args, Debug)]
pub struct EntityArgs {
    /// Entity kind: drive, folder or file
    pub kind: EntityKind,

    /// Entity id
    pub id: String,

    /// Include the change history
    #[arg(long)]
    pub history: bool,

    /// Include every data version
    #[arg(long)]
    pub versions: bool,

    /// Output format (text or json)
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Execute the entity command.
pub async fn execute(session: &Session, args: EntityArgs) -> Result<()> {
    if args.format == OutputFormat::Csv {
        anyhow::bail!("CSV output is only available for verify and query");
    }

    let resolver = EntityResolver::new(session.fetcher());
    let Some(mut entity) = resolver
        .resolve(&args.id, args.kind)
        .await
        .with_context(|| format!("Failed to look up {} {}", args.kind, args.id))?
    else {
        anyhow::bail!("No {} with id {} was found", args.kind, args.id);
    };

    StateReconstructor::new(session.fetcher(), session.payloads())
        .reconstruct(&mut entity)
        .await;

    let output = match args.format {
        OutputFormat::Json => {
            report::render_json(&EntityView::new(&entity, args.history, args.versions))
                .context("Failed to encode entity")?
        },
        _ => report::render_entity_text(
            &entity,
            args.history,
            args.versions,
            &mut ReportContext::new(),
        ),
    };
    emit(&output);
    Ok(())
}
