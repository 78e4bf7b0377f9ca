use anyhow::{Context, Result, anyhow};
use log::debug;

use pnbound::config::PnConfig;
use pnbound::net::io::read_definition;
use pnbound::options::Options;
use pnbound::{AnalysisSummary, Session};

fn main() {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    if let Err(err) = run() {
        eprintln!("pnbound: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = Options::parse_from_args(&args).map_err(|err| anyhow!("{}", err))?;
    debug!("options: {:?}", options);

    let mut config = PnConfig::load_from_file(&options.config)?;
    options.apply_to(&mut config);
    debug!("config: {:?}", config);

    let definition = read_definition(&options.definition)
        .with_context(|| format!("Failed to load net definition: {:?}", options.definition))?;
    let mut session = Session::build(&definition)?;

    for (place, tokens) in &options.initial_marking {
        session.set_initial_marking(place, *tokens)?;
    }
    for transition in &options.fire {
        session
            .fire(transition)
            .with_context(|| format!("Failed to fire `{}` at {}", transition, session.marking()))?;
    }

    let summary = session.analyze()?;
    report(&session, &summary, &config);

    if let Some(path) = &config.dot_output {
        let highlight = summary
            .witness
            .as_ref()
            .map(|witness| witness.markings.clone())
            .unwrap_or_default();
        session
            .graph()
            .write_dot(path, &highlight)
            .with_context(|| format!("Failed to write DOT file: {:?}", path))?;
    }
    Ok(())
}

fn report(session: &Session, summary: &AnalysisSummary, config: &PnConfig) {
    if config.witness_only {
        if let Some(witness) = &summary.witness {
            println!("{}", witness);
        }
        return;
    }

    println!("{}", summary);
    if config.show_graph {
        let graph = session.graph();
        for (from, transition, to) in graph.edges().take(config.max_listed_edges) {
            println!("  {} --{}--> {}", from, transition, to);
        }
        if graph.edge_count() > config.max_listed_edges {
            println!("  ... {} more", graph.edge_count() - config.max_listed_edges);
        }
    }
}
