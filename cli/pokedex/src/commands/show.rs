use std::fmt::{self, Display};

use anyhow::{Context, Result};
use bpaf::Bpaf;
use itertools::Itertools;
use pokedex_catalog::{ItemDetail, TransportPort, display_name};
use tracing::{debug, instrument};

/// Show the info card of a single entry
#[derive(Debug, Bpaf, Clone)]
pub struct Show {
    /// Print the entry as JSON
    #[bpaf(long)]
    pub json: bool,

    /// Name of the entry to show
    #[bpaf(positional("name"))]
    pub name: String,
}

impl Show {
    #[instrument(name = "show", skip_all, fields(name = %self.name))]
    pub async fn handle(self, client: impl TransportPort) -> Result<()> {
        let key = self.name.trim().to_lowercase();
        let detail = client
            .fetch_item_detail(&key)
            .await
            .with_context(|| format!("failed to fetch details for '{}'", self.name))?;

        if self.json {
            debug!("printing entry as JSON");
            println!("{}", serde_json::to_string(&detail)?);
        } else {
            print!("{}", InfoCard(&detail));
        }
        Ok(())
    }
}

/// The attributes shown for a single entry.
struct InfoCard<'a>(&'a ItemDetail);

impl Display for InfoCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = self.0;
        let or_unknown = |value: Option<String>| value.unwrap_or_else(|| "unknown".to_string());

        writeln!(f, "{}", detail.display_name)?;
        writeln!(
            f,
            "  Species:  {}",
            or_unknown((!detail.species.is_empty()).then(|| display_name(&detail.species)))
        )?;
        writeln!(f, "  Types:    {}", detail.tags.iter().join(", "))?;
        writeln!(
            f,
            "  Weight:   {}",
            or_unknown(detail.weight_kg().map(|kg| format!("{kg:.1} kg")))
        )?;
        writeln!(
            f,
            "  Height:   {}",
            or_unknown(detail.attribute("height").map(|h| h.to_string()))
        )?;
        writeln!(
            f,
            "  HP:       {}",
            or_unknown(detail.hit_points().map(|hp| hp.to_string()))
        )?;
        writeln!(
            f,
            "  Ability:  {}",
            or_unknown(detail.abilities.first().map(|a| display_name(a)))
        )?;
        writeln!(
            f,
            "  Move:     {}",
            or_unknown(detail.moves.first().map(|m| display_name(m)))
        )?;
        if !detail.image_url.is_empty() {
            writeln!(f, "  Image:    {}", detail.image_url)?;
        }
        Ok(())
    }
}
