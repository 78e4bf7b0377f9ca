//! Parsing Options.
//! `pnbound <DEFINITION> [-c config.toml] [-f t1 -f t2] [-m p=3] [-d graph.dot] [-g] [-w]`

use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::path::PathBuf;

use crate::config::PnConfig;
use crate::net::Tokens;

fn make_options_parser() -> clap::Command {
    Command::new("pnbound")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Builds the reachability graph of a Petri net and decides boundedness")
        .arg(
            Arg::new("definition")
                .value_name("DEFINITION")
                .help("Net definition, .json or .ron")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML report settings")
                .default_value("pnbound.toml"),
        )
        .arg(
            Arg::new("fire")
                .short('f')
                .long("fire")
                .value_name("TRANSITION")
                .help("Fire a transition before the analysis, may be repeated")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("marking")
                .short('m')
                .long("initial-marking")
                .value_name("PLACE=TOKENS")
                .help("Override the initial token count of a place, may be repeated")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("dot")
                .short('d')
                .long("dot")
                .value_name("FILE")
                .help("Write the reachability graph in DOT"),
        )
        .arg(
            Arg::new("show-graph")
                .short('g')
                .long("show-graph")
                .help("List every recorded edge")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("witness-only")
                .short('w')
                .long("witness-only")
                .help("Only print the witness of an unbounded net")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub definition: PathBuf,
    pub config: PathBuf,
    pub fire: Vec<String>,
    pub initial_marking: Vec<(String, Tokens)>,
    pub dot: Option<PathBuf>,
    pub show_graph: bool,
    pub witness_only: bool,
}

impl Options {
    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let definition = matches
            .get_one::<String>("definition")
            .map(PathBuf::from)
            .ok_or("missing net definition")?;
        let config = matches
            .get_one::<String>("config")
            .map(PathBuf::from)
            .unwrap_or_default();
        let fire = matches
            .get_many::<String>("fire")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let initial_marking = matches
            .get_many::<String>("marking")
            .map(|values| values.map(|value| parse_assignment(value)).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();
        let dot = matches.get_one::<String>("dot").map(PathBuf::from);

        Ok(Options {
            definition,
            config,
            fire,
            initial_marking,
            dot,
            show_graph: matches.get_flag("show-graph"),
            witness_only: matches.get_flag("witness-only"),
        })
    }

    /// Command line flags win over the file; they can only switch things on.
    pub fn apply_to(&self, config: &mut PnConfig) {
        config.show_graph |= self.show_graph;
        config.witness_only |= self.witness_only;
        if self.dot.is_some() {
            config.dot_output = self.dot.clone();
        }
    }
}

fn parse_assignment(value: &str) -> Result<(String, Tokens), Box<dyn Error>> {
    let (place, tokens) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PLACE=TOKENS, got `{}`", value))?;
    let tokens: Tokens = tokens.trim().parse()?;
    Ok((place.trim().to_string(), tokens))
}
