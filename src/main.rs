use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use log::info;
use postfx_graph::{CompiledStackCache, EffectRegistry, HostParamBuffer, load_chain_from_path};

const USAGE: &str = "usage: postfx-graph [--list-effects] [--search <query>] [--category <name>] \
[--chain-json <chain.json> --output <stack.bin>]";

#[derive(Debug, Default, Clone)]
struct Cli {
    list_effects: bool,
    search: Option<String>,
    category: Option<String>,
    chain_json: Option<PathBuf>,
    output: Option<PathBuf>,
    help: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--list-effects" => {
                cli.list_effects = true;
                i += 1;
            }
            "--help" | "-h" => {
                cli.help = true;
                i += 1;
            }
            "--search" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --search"));
                };
                cli.search = Some(v.clone());
                i += 2;
            }
            "--category" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --category"));
                };
                cli.category = Some(v.clone());
                i += 2;
            }
            "--chain-json" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --chain-json"));
                };
                cli.chain_json = Some(PathBuf::from(v));
                i += 2;
            }
            "--output" | "-o" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output"));
                };
                cli.output = Some(PathBuf::from(v));
                i += 2;
            }
            other => {
                return Err(anyhow!("unknown argument: {other} ({USAGE})"));
            }
        }
    }
    Ok(cli)
}

fn print_effects(registry: &EffectRegistry, query: &str, category: Option<&str>) {
    let matches = registry.search(query, category);
    for cat in registry.categories() {
        let in_cat: Vec<_> = matches.iter().filter(|t| &t.category == cat).collect();
        if in_cat.is_empty() {
            continue;
        }
        println!("{cat}");
        for ty in in_cat {
            let names: Vec<&str> = ty.params.iter().map(|p| p.name.as_str()).collect();
            println!("  {:>3}  {:<22} [{}]", ty.id, ty.name, names.join(", "));
        }
    }
    if matches.is_empty() {
        println!("no effects match '{query}'");
    }
}

fn compile_chain_to_file(
    registry: Arc<EffectRegistry>,
    chain_json: &Path,
    output: &Path,
) -> Result<()> {
    let graph = load_chain_from_path(chain_json, &registry)?;
    let instances = graph
        .to_instances()
        .with_context(|| format!("chain in {} is not a complete chain", chain_json.display()))?;

    let buffer = HostParamBuffer::new();
    let mut cache = CompiledStackCache::new();
    cache.init(registry, Box::new(buffer.clone()));
    cache.update_if_dirty(&instances)?;

    let bytes = buffer.contents();
    std::fs::write(output, &bytes)
        .with_context(|| format!("failed to write compiled stack to {}", output.display()))?;
    info!(
        "[cli] wrote {} effect(s), {} bytes, hash {:016x} to {}",
        cache.instance_count(),
        bytes.len(),
        cache.last_hash().unwrap_or_default(),
        output.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;
    if cli.help {
        println!("{USAGE}");
        return Ok(());
    }

    let registry = Arc::new(EffectRegistry::with_builtins()?);
    info!(
        "[cli] {} effect types in {} categories",
        registry.len(),
        registry.categories().len()
    );

    if let Some(chain_json) = cli.chain_json.as_deref() {
        let output = cli
            .output
            .unwrap_or_else(|| chain_json.with_extension("bin"));
        return compile_chain_to_file(registry, chain_json, &output);
    }

    if cli.list_effects || cli.search.is_some() || cli.category.is_some() {
        print_effects(
            &registry,
            cli.search.as_deref().unwrap_or(""),
            cli.category.as_deref(),
        );
        return Ok(());
    }

    println!("{USAGE}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_cli_reads_compile_flags() {
        let cli = parse_cli(&args(&["--chain-json", "a.json", "-o", "a.bin"])).unwrap();
        assert_eq!(cli.chain_json, Some(PathBuf::from("a.json")));
        assert_eq!(cli.output, Some(PathBuf::from("a.bin")));
        assert!(!cli.list_effects);
    }

    #[test]
    fn parse_cli_reads_search_flags() {
        let cli = parse_cli(&args(&["--search", "blur", "--category", "Lens"])).unwrap();
        assert_eq!(cli.search.as_deref(), Some("blur"));
        assert_eq!(cli.category.as_deref(), Some("Lens"));
    }

    #[test]
    fn parse_cli_rejects_missing_value_and_unknown_flag() {
        assert!(parse_cli(&args(&["--output"])).is_err());
        assert!(parse_cli(&args(&["--headless"])).is_err());
    }
}
