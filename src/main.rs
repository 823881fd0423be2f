use clap::{Args, Parser as ClapParser, Subcommand};
use recql::{
    CompoundMode, SourceKind,
    cli::{self, CheckOptions, CheckResult, CliError, QueryOptions, QueryOutput, SourceOptions},
};
use std::{
    io::{self, Read},
    path::PathBuf,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(ClapParser)]
#[command(name = "recql")]
#[command(about = "recql - SQL queries over CSV files, JSON files and JSON APIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query and print the result rows as JSON
    Query {
        /// The SQL query (reads from stdin if not provided)
        query: Option<String>,

        #[command(flatten)]
        sources: SourceArgs,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't execute
        #[arg(long)]
        syntax_only: bool,
    },

    /// Report syntax errors in a query without running it
    Check {
        /// The SQL query (reads from stdin if not provided)
        query: Option<String>,
    },

    /// Print the inferred columns of a table
    Describe {
        /// Table name, resolved like a FROM reference
        name: String,

        #[command(flatten)]
        sources: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Directory that file tables resolve under
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Base URL for API tables given as paths
    #[arg(long)]
    api_base: Option<String>,

    /// Source kind for tables that do not name one (file, database, api)
    #[arg(long, default_value = "file")]
    source: SourceKind,

    /// How UNION/INTERSECT/EXCEPT branches get their rows (shared, independent)
    #[arg(long, default_value = "shared")]
    compound_mode: CompoundMode,
}

impl From<SourceArgs> for SourceOptions {
    fn from(args: SourceArgs) -> Self {
        SourceOptions {
            data_dir: args.data_dir,
            api_base: args.api_base,
            default_source: args.source,
            compound_mode: args.compound_mode,
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recql=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Query {
            query,
            sources,
            pretty,
            syntax_only,
        } => run_query(query, sources.into(), pretty, syntax_only),
        Commands::Check { query } => run_check(query),
        Commands::Describe { name, sources } => {
            cli::describe(&SourceOptions::from(sources), &name)
                .map(|fields| print!("{}", cli::format_fields(&fields)))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_query(query: Option<String>) -> Result<String, CliError> {
    match query {
        Some(q) => Ok(q),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Ok(buffer)
        }
        None => Err(CliError::NoQuery),
    }
}

fn run_query(
    query: Option<String>,
    sources: SourceOptions,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let options = QueryOptions {
        query: read_query(query)?,
        sources,
        pretty,
        syntax_only,
    };

    match cli::execute_query(&options)? {
        QueryOutput::SyntaxValid => println!("Syntax is valid"),
        QueryOutput::Rows(json) => println!("{}", json),
    }
    Ok(())
}

fn run_check(query: Option<String>) -> Result<(), CliError> {
    let options = CheckOptions {
        query: read_query(query)?,
    };

    match cli::execute_check(&options) {
        CheckResult::Valid => {
            println!("Syntax is valid");
            Ok(())
        }
        CheckResult::Invalid(errors) => Err(CliError::Query(recql::QueryError::Syntax(errors))),
    }
}
