mod catalog;
mod list;
mod show;

use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use tracing::debug;

use crate::config::Config;
use crate::utils::init::init_catalog_client;

static POKEDEX_DESCRIPTION: &'_ str = indoc! {"
    Pokedex browses the Pokémon catalog from the command line.\n\n

    It fetches a page of the catalog together with the details of every entry,
    and prints them as a table, as info cards or as JSON."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(POKEDEX_DESCRIPTION))]
pub struct PokedexCli(#[bpaf(external(pokedex_args))] pub PokedexArgs);

/// Main pokedex args parser
#[derive(Debug, Bpaf)]
pub struct PokedexArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands))]
    command: Commands,
}

impl PokedexArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        debug!(?config, "handling command");
        let client = init_catalog_client(&config)?;

        match self.command {
            Commands::List(args) => args.handle(config, client).await,
            Commands::Show(args) => args.handle(client).await,
            Commands::Catalog(args) => args.handle(config, client).await,
        }
    }
}

#[derive(Debug, Bpaf, Clone)]
enum Commands {
    /// Fetch a page of the catalog with the details of every entry
    #[bpaf(command)]
    List(#[bpaf(external(list::list))] list::List),

    /// Show the info card of a single entry
    #[bpaf(command)]
    Show(#[bpaf(external(show::show))] show::Show),

    /// List catalog entries without fetching their details
    #[bpaf(command)]
    Catalog(#[bpaf(external(catalog::catalog))] catalog::Catalog),
}

#[cfg(test)]
mod tests {
    use bpaf::Args;

    use super::*;

    fn parse(args: &[&str]) -> PokedexArgs {
        let PokedexCli(args) = pokedex_cli().run_inner(Args::from(args)).unwrap();
        args
    }

    #[test]
    fn verbosity_is_counted() {
        assert!(matches!(
            parse(&["-v", "-v", "list"]).verbosity,
            Verbosity::Verbose(2)
        ));
        assert!(matches!(parse(&["-q", "list"]).verbosity, Verbosity::Quiet));
        assert!(matches!(
            parse(&["list"]).verbosity,
            Verbosity::Verbose(0)
        ));
    }

    #[test]
    fn parses_subcommands() {
        assert!(matches!(
            parse(&["list", "--search", "char", "--json"]).command,
            Commands::List(list::List { json: true, search: Some(ref q) }) if q == "char"
        ));
        assert!(matches!(
            parse(&["show", "pikachu"]).command,
            Commands::Show(show::Show { json: false, ref name }) if name == "pikachu"
        ));
        assert!(matches!(
            parse(&["catalog", "--all"]).command,
            Commands::Catalog(catalog::Catalog { all: true, json: false })
        ));
    }
}
