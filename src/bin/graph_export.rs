use anyhow::Context;
use clap::Parser;
use poll_schema::{RelationGraph, SchemaRegistry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schema-graph-export")]
#[command(about = "Export the list relationship graph to DOT/SVG format")]
struct Cli {
    /// Output file (defaults to lists.dot)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: dot or svg
    #[arg(short, long, default_value = "dot")]
    format: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let registry = SchemaRegistry::builtin().context("loading built-in schema")?;
    let graph = RelationGraph::new(&registry);

    println!(
        "Graph loaded: {} lists, {} edges",
        registry.list_count(),
        graph.edge_count()
    );

    let dot_content = graph.to_dot();

    match cli.format.as_str() {
        "dot" => {
            let output_path = cli.output.unwrap_or_else(|| PathBuf::from("lists.dot"));
            std::fs::write(&output_path, &dot_content)
                .with_context(|| format!("writing {}", output_path.display()))?;
            println!("✅ Exported DOT to: {:?}", output_path);
        }
        "svg" => {
            let output_path = cli.output.unwrap_or_else(|| PathBuf::from("lists.svg"));

            let temp_dot = output_path.with_extension("temp.dot");
            std::fs::write(&temp_dot, &dot_content)?;

            let output = std::process::Command::new("dot")
                .arg("-Tsvg")
                .arg(&temp_dot)
                .arg("-o")
                .arg(&output_path)
                .output()
                .context("running graphviz `dot`")?;

            let _ = std::fs::remove_file(&temp_dot);

            if output.status.success() {
                println!("✅ Exported SVG to: {:?}", output_path);
            } else {
                eprintln!("❌ GraphViz conversion failed:");
                eprintln!("{}", String::from_utf8_lossy(&output.stderr));
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("❌ Invalid format. Use 'dot' or 'svg'");
            std::process::exit(1);
        }
    }

    Ok(())
}
