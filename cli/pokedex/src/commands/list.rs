use std::fmt::Write;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use itertools::Itertools;
use pokedex_catalog::{ItemDetail, Session, TransportPort};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::utils::message;

/// Fetch a page of the catalog with the details of every entry
#[derive(Debug, Bpaf, Clone)]
pub struct List {
    /// Print the entries as JSON
    #[bpaf(long)]
    pub json: bool,

    /// Only show entries whose name contains this text
    #[bpaf(long, argument("text"))]
    pub search: Option<String>,
}

impl List {
    #[instrument(name = "list", skip_all)]
    pub async fn handle(self, config: Config, client: impl TransportPort) -> Result<()> {
        let session = Session::new(client, config.pipeline_config());
        if let Some(search) = self.search.as_deref() {
            session.set_query(search);
        }

        let mut subscription = session.subscribe();
        let state = session.run().await?;
        for transition in subscription.drain() {
            debug!(?transition, "view state changed");
        }

        let (resolved, total) = session.progress();
        info!(resolved, total, "catalog fetch finished");

        if state.is_error {
            bail!(
                "{}",
                state
                    .error_message
                    .unwrap_or_else(|| "failed to fetch the catalog".to_string())
            );
        }

        let details = session.visible();

        if self.json {
            debug!("printing entries as JSON");
            println!("{}", serde_json::to_string(&details)?);
            return Ok(());
        }

        if details.is_empty() {
            match self.search {
                Some(search) => message::warning(format!("No entries matched '{search}'")),
                None => message::warning("The catalog page is empty"),
            }
            return Ok(());
        }

        print!("{}", render_table(&details));
        Ok(())
    }
}

/// One line per entry: name, hit points and types.
fn render_table(details: &[ItemDetail]) -> String {
    let name_width = details
        .iter()
        .map(|detail| detail.display_name.chars().count())
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    for detail in details {
        let hit_points = detail
            .hit_points()
            .map(|hp| hp.to_string())
            .unwrap_or_else(|| "?".to_string());
        // writing to a String cannot fail
        let _ = writeln!(
            out,
            "{name:<name_width$}  HP {hit_points:>3}  {types}",
            name = detail.display_name,
            types = detail.tags.iter().join(", "),
        );
    }
    out
}
