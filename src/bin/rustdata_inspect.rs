use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rustdata::DataConfig;
use rustdata::matcher::{
    MethodElement, MethodMatchContext, RepositoryCompiler, RepositoryDefinition, match_method,
};
use rustdata::model::{ConverterRegistry, PersistentEntity};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rustdata-inspect")]
#[command(about = "Compile repository definitions and explain derived queries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every method of a definition file and print the dispatch table.
    Compile {
        #[arg(long)]
        definition: PathBuf,
    },
    /// Match one signature against the definition's entity.
    Explain {
        #[arg(long)]
        definition: PathBuf,
        /// e.g. "findByTitleStartingWith(prefix: String): Vec<Book>"
        #[arg(long)]
        method: String,
    },
    /// Parse a configuration string and print it normalized.
    Config { url: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compile { definition } => compile(&definition),
        Command::Explain { definition, method } => explain(&definition, &method),
        Command::Config { url } => {
            let config = DataConfig::from_url(&url)?;
            config.validate()?;
            println!("{}", config.to_url());
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<(RepositoryDefinition, DataConfig, PersistentEntity)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read definition {}", path.display()))?;
    let definition: RepositoryDefinition = serde_json::from_str(&raw)
        .with_context(|| format!("invalid definition {}", path.display()))?;

    let mut config = match &definition.config {
        Some(url) => DataConfig::from_url(url)?,
        None => DataConfig::default(),
    };
    for (name, fields) in &definition.introspected {
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        config = config.introspected(name, &fields);
    }
    config.validate()?;

    let strategies = config.strategies(ConverterRegistry::with_defaults())?;
    let entity = definition.entity.clone().into_definition().build(&strategies)?;
    Ok((definition, config, entity))
}

fn compile(path: &Path) -> Result<()> {
    let (definition, config, entity) = load(path)?;
    let compiled = RepositoryCompiler::new(config)
        .compile(&definition.repository, &entity)
        .map_err(|errors| anyhow!("{errors}"))?;
    print!("{compiled}");
    Ok(())
}

fn explain(path: &Path, signature: &str) -> Result<()> {
    let (definition, config, entity) = load(path)?;
    let method = MethodElement::parse(signature)?;
    let ctx = MethodMatchContext::new(&definition.repository.name, &entity, &method, &config);
    let matched = match_method(&ctx)?;

    println!("method:      {}", method.signature());
    println!("matcher:     {}", matched.matcher);
    println!("interceptor: {}", matched.interceptor_match);
    println!("query:       {}", matched.query);
    if !matched.ambiguous_with.is_empty() {
        println!("also:        {:?}", matched.ambiguous_with);
    }
    Ok(())
}
