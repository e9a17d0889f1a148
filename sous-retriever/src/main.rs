use clap::{Parser, Subcommand};
use sous_retriever::retrieval::retriever::dedup_by_document;
use sous_retriever::{GroqClient, PipelineConfig, RecipePipeline, RetrieverConfig};
use std::path::PathBuf;
use std::process;

/// Ask questions about a recipe collection from the command line.
#[derive(Parser, Debug)]
#[command(name = "sous", author, version, about, long_about = None)]
struct Args {
    /// JSON recipe corpus file
    #[arg(short, long, default_value = "recipes.json")]
    corpus: PathBuf,

    /// Directory holding the persisted index database
    #[arg(short, long, default_value = ".sous")]
    index_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build (or refresh) the index without asking anything
    Index,
    /// Ask a question and get an answer grounded in the corpus
    Ask {
        /// The question to answer
        question: String,
    },
    /// Show the retrieved chunks for a query without calling the chat model
    Search {
        /// The query text
        query: String,
        /// Candidate pool size for the similarity stage
        #[arg(short = 'k', long, default_value_t = 6)]
        fetch_count: usize,
        /// Results kept after reranking
        #[arg(short = 'n', long, default_value_t = 3)]
        top: usize,
    },
    /// Print a recipe document, or list all dishes when none is named
    Show {
        /// Dish name to show, matched case-insensitively
        dish: Option<String>,
    },
    /// Show index statistics
    Stats,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut config = PipelineConfig::new(&args.corpus, &args.index_dir);

    match args.command {
        Commands::Index => {
            let pipeline = RecipePipeline::build_default(config).await?;
            let stats = pipeline.stats().await?;
            if pipeline.rebuilt() {
                println!(
                    "Indexed {} recipes into {} chunks",
                    stats.documents_count, stats.chunks_count
                );
            } else {
                println!(
                    "Index already up to date ({} chunks from {} recipes)",
                    stats.chunks_count, stats.documents_count
                );
            }
            Ok(())
        }
        Commands::Ask { question } => {
            let model = GroqClient::from_env()?;
            let pipeline = RecipePipeline::build_default(config).await?;

            let answer = pipeline.ask(&question, &model).await?;
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!("\nSources: {}", answer.sources.join(", "));
            }
            Ok(())
        }
        Commands::Search {
            query,
            fetch_count,
            top,
        } => {
            config.retriever = RetrieverConfig {
                fetch_count,
                rerank_top_n: top,
            };
            let pipeline = RecipePipeline::build_default(config).await?;

            let results = pipeline.retrieve(&query).await?;
            if results.is_empty() {
                println!("No recipes were retrieved for that query.");
                return Ok(());
            }

            println!("Found {} chunks:", results.len());
            for scored in &results {
                println!(
                    "  Score: {:.3} | {} ({}) | Chunk: {}",
                    scored.score,
                    scored.chunk.metadata.dish_name,
                    scored.chunk.metadata.origin,
                    scored.chunk.chunk_id
                );
            }
            println!(
                "\nDishes: {}",
                dedup_by_document(&results)
                    .iter()
                    .map(|s| s.chunk.metadata.dish_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            Ok(())
        }
        Commands::Show { dish } => {
            let documents = sous_retriever::load_recipes(&args.corpus)?;
            match dish {
                Some(name) => {
                    let needle = name.to_lowercase();
                    let matched: Vec<_> = documents
                        .iter()
                        .filter(|d| d.metadata.dish_name.to_lowercase() == needle)
                        .collect();
                    if matched.is_empty() {
                        println!("No recipe named \"{name}\" in the corpus");
                    }
                    for document in matched {
                        println!("{}", document.content);
                        if let Some(minutes) = document
                            .metadata
                            .total_time
                            .as_deref()
                            .and_then(sous_retriever::corpus::parse_duration_minutes)
                        {
                            println!("\nTotal time: {minutes} minutes");
                        }
                        println!("---");
                    }
                }
                None => {
                    println!("{} recipes:", documents.len());
                    for document in &documents {
                        println!(
                            "  {} ({})",
                            document.metadata.dish_name, document.metadata.origin
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Stats => {
            // Reads the persisted index as-is; no models are loaded.
            let index =
                sous_retriever::retrieval::recipe_index::RecipeIndex::open(&args.index_dir).await?;
            let stats = index.stats().await?;

            println!("Index statistics:");
            println!("  Recipes: {}", stats.documents_count);
            println!("  Chunks: {}", stats.chunks_count);
            if let Some(model_id) = stats.model_id {
                println!("  Embedding model: {model_id}");
            }
            if let Some(built_at) = stats.built_at {
                match chrono::DateTime::from_timestamp(built_at, 0) {
                    Some(when) => println!("  Built at: {when}"),
                    None => println!("  Built at: {built_at}"),
                }
            }
            Ok(())
        }
    }
}
