use anyhow::{Context, Result};
use bpaf::Bpaf;
use pokedex_catalog::{
    CatalogItem,
    TransportError,
    TransportPort,
    collect_depaged,
    depage_catalog,
};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::utils::message;

/// List catalog entries without fetching their details
#[derive(Debug, Bpaf, Clone)]
pub struct Catalog {
    /// Follow the catalog to its last page
    #[bpaf(long)]
    pub all: bool,

    /// Print the entries as JSON
    #[bpaf(long)]
    pub json: bool,
}

impl Catalog {
    #[instrument(name = "catalog", skip_all, fields(all = self.all))]
    pub async fn handle(self, config: Config, client: impl TransportPort) -> Result<()> {
        let (total_count, items) = self
            .fetch(&config, &client)
            .await
            .context("failed to fetch the catalog")?;

        if self.json {
            println!("{}", serde_json::to_string(&items)?);
            return Ok(());
        }

        print!("{}", render_keys(&items));
        message::plain(summary(items.len(), total_count));
        Ok(())
    }

    /// The total count reported by the catalog and the fetched entries.
    async fn fetch<C: TransportPort>(
        &self,
        config: &Config,
        client: &C,
    ) -> Result<(Option<u64>, Vec<CatalogItem>), TransportError> {
        let first = config.page_request();
        if self.all {
            debug!(?first, "depaging catalog");
            return collect_depaged(depage_catalog(client, first)).await;
        }
        let page = client.fetch_catalog_page(first).await?;
        Ok((Some(page.total_count), page.items))
    }
}

fn render_keys(items: &[CatalogItem]) -> String {
    items.iter().map(|item| format!("{}\n", item.key)).collect()
}

fn summary(shown: usize, total_count: Option<u64>) -> String {
    match total_count {
        Some(total) => format!("Showing {shown} of {total} entries"),
        None => format!("Showing {shown} entries"),
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use pokedex_catalog::mock::test_helpers::{item, page};
    use pokedex_catalog::{CatalogPage, MockClient, NETWORK_ERROR_MESSAGE};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn renders_one_key_per_line() {
        assert_eq!(
            render_keys(&[item("bulbasaur"), item("ivysaur")]),
            "bulbasaur\nivysaur\n"
        );
        assert_eq!(summary(2, Some(1302)), "Showing 2 of 1302 entries");
        assert_eq!(summary(0, None), "Showing 0 entries");
    }

    #[tokio::test]
    async fn all_follows_every_page() {
        let client = MockClient::new();
        for keys in [&["a", "b"][..], &["c", "d"], &["e"]] {
            client.push_page_response(Ok(CatalogPage {
                total_count: 5,
                ..page(keys)
            }));
        }
        let config = Config {
            page_limit: NonZeroU32::new(2).unwrap(),
            ..Config::default()
        };

        let (total_count, items) = Catalog {
            all: true,
            json: false,
        }
        .fetch(&config, &client)
        .await
        .unwrap();

        assert_eq!(total_count, Some(5));
        assert_eq!(items.len(), 5);
        assert_eq!(client.page_offsets(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn single_page_by_default() {
        let client = MockClient::new();
        client.push_page_response(Ok(CatalogPage {
            total_count: 5,
            ..page(&["a", "b"])
        }));
        let config = Config {
            page_offset: 40,
            ..Config::default()
        };

        let (total_count, items) = Catalog {
            all: false,
            json: false,
        }
        .fetch(&config, &client)
        .await
        .unwrap();

        assert_eq!(total_count, Some(5));
        assert_eq!(items, vec![item("a"), item("b")]);
        assert_eq!(client.page_offsets(), vec![40]);
    }

    #[tokio::test]
    async fn page_failure_is_reported() {
        let client = MockClient::new();
        client.push_page_response(Err(TransportError::network()));

        let err = Catalog {
            all: false,
            json: false,
        }
        .handle(Config::default(), client)
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "failed to fetch the catalog");
        assert_eq!(err.root_cause().to_string(), NETWORK_ERROR_MESSAGE);
    }
}
