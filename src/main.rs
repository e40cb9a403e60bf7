// CLI driver: run one discovery against a URL and print the resulting map.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use sitescout::{
    DiscoveryConfig, DiscoveryEngine, DiscoveryError, GraphStore, InMemoryRecipeStore, LoginRecipe,
};

struct CliArgs {
    url: String,
    project_id: String,
    depth: u8,
    pages: usize,
    use_sitemap: bool,
    db_path: PathBuf,
    recipe_file: Option<PathBuf>,
    headed: bool,
}

const USAGE: &str = "\
Usage: sitescout <url> [options]

Options:
  --project <id>       Project identifier (default: cli)
  --depth <n>          Depth cap: 1, 2, 3 or 5 (default: 3)
  --pages <n>          Page cap: 25, 50, 100 or 200 (default: 100)
  --no-sitemap         Skip sitemap ingestion
  --db <path>          SQLite database path (default: ./sitescout.sqlite)
  --recipe <path>      JSON login recipe file
  --headed             Run the browser with a visible window
";

fn parse_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut parsed = CliArgs {
        url: String::new(),
        project_id: "cli".to_string(),
        depth: 3,
        pages: 100,
        use_sitemap: true,
        db_path: PathBuf::from("sitescout.sqlite"),
        recipe_file: None,
        headed: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--project" => {
                parsed.project_id = args.next().context("--project needs a value")?;
            }
            "--depth" => {
                parsed.depth = args
                    .next()
                    .context("--depth needs a value")?
                    .parse()
                    .context("--depth must be a number")?;
            }
            "--pages" => {
                parsed.pages = args
                    .next()
                    .context("--pages needs a value")?
                    .parse()
                    .context("--pages must be a number")?;
            }
            "--no-sitemap" => parsed.use_sitemap = false,
            "--db" => {
                parsed.db_path = PathBuf::from(args.next().context("--db needs a value")?);
            }
            "--recipe" => {
                parsed.recipe_file = Some(PathBuf::from(
                    args.next().context("--recipe needs a value")?,
                ));
            }
            "--headed" => parsed.headed = true,
            "--help" | "-h" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other if parsed.url.is_empty() && !other.starts_with('-') => {
                parsed.url = other.to_string();
            }
            other => anyhow::bail!("unknown argument '{other}'\n\n{USAGE}"),
        }
    }

    if parsed.url.is_empty() {
        anyhow::bail!("missing <url>\n\n{USAGE}");
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<DiscoveryError>() {
                Some(err) if err.is_client_error() => eprintln!("error: {err}"),
                _ => eprintln!("internal error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let mut recipes = HashMap::new();
    let mut recipe_id = None;
    if let Some(path) = &args.recipe_file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read recipe file {}", path.display()))?;
        let recipe: LoginRecipe =
            serde_json::from_str(&raw).context("recipe file is not a valid login recipe")?;
        recipes.insert("cli-recipe".to_string(), recipe);
        recipe_id = Some("cli-recipe".to_string());
    }

    let store = GraphStore::open(&args.db_path).await?;
    let engine = DiscoveryEngine::new(store, Arc::new(InMemoryRecipeStore::new(recipes)));

    let in_container = std::env::var("SITESCOUT_IN_CONTAINER")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let mut builder = DiscoveryConfig::builder()
        .project_id(&args.project_id)
        .root_url(&args.url)
        .depth_cap(args.depth)
        .page_cap(args.pages)
        .use_sitemap(args.use_sitemap)
        .headless(!args.headed)
        .in_container(in_container);
    if let Some(id) = recipe_id {
        builder = builder.login_recipe_id(id);
    }
    let config = builder.build()?;

    let report = engine.start_discovery(config).await?;

    println!(
        "\nDiscovered {} pages ({} edges, {} failures) in {:.1}s",
        report.pages_discovered,
        report.edges_recorded,
        report.failures,
        report.elapsed.as_secs_f64()
    );

    let graph = engine.get_graph(&args.project_id).await?;
    println!("\n{:<7} {:<10} {:<6} {}", "depth", "type", "auth", "url");
    for node in &graph.nodes {
        println!(
            "{:<7} {:<10} {:<6} {}",
            node.depth,
            node.page_type.as_str(),
            if node.requires_auth { "yes" } else { "no" },
            node.url
        );
    }

    Ok(())
}
