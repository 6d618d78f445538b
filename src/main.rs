// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// KEYWORD CLUSTERER CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Executa o pipeline de descoberta a partir de um arquivo de execução e grava
// os relatórios em JSON.
//
// Uso:
//   keyword-clusterer-cli run.json
//   keyword-clusterer-cli run.json --out relatorios/
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use keyword_clusterer::prelude::*;
use keyword_clusterer::{create_tokio_runtime, load_pipeline_config, load_runtime_config};

const DEFAULT_OUT_DIR: &str = "output";

/// Argumentos da linha de comando
struct CliArgs {
    run_file: PathBuf,
    out_dir: PathBuf,
}

fn parse_args(args: &[String]) -> Option<CliArgs> {
    let mut run_file = None;
    let mut out_dir = PathBuf::from(DEFAULT_OUT_DIR);

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" | "-o" => out_dir = PathBuf::from(iter.next()?),
            _ if run_file.is_none() => run_file = Some(PathBuf::from(arg)),
            _ => return None,
        }
    }

    Some(CliArgs {
        run_file: run_file?,
        out_dir,
    })
}

fn print_usage(program: &str) {
    eprintln!("Keyword Clusterer CLI v{}", keyword_clusterer::VERSION);
    eprintln!();
    eprintln!("Uso: {} <run.json> [--out <dir>]", program);
    eprintln!();
    eprintln!("Opções:");
    eprintln!("  --out, -o <dir>    Diretório dos relatórios (padrão: {})", DEFAULT_OUT_DIR);
}

fn main() -> anyhow::Result<()> {
    // .env antes de qualquer leitura de configuração
    if dotenvy::dotenv().is_ok() {
        eprintln!("✓ Carregado .env do diretório atual");
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("keyword-clusterer-cli");
    let Some(cli) = parse_args(&args) else {
        print_usage(program);
        std::process::exit(1);
    };

    let runtime = create_tokio_runtime(&load_runtime_config())
        .context("falha ao criar runtime Tokio")?;
    runtime.block_on(run(cli))
}

async fn run(cli: CliArgs) -> anyhow::Result<()> {
    let run_file = RunFile::load(&cli.run_file)
        .with_context(|| format!("falha ao ler {}", cli.run_file.display()))?;
    let config = load_pipeline_config();
    let list_name = list_name(&cli.run_file);

    let tokenizer = DictionaryTokenizer::new(run_file.lemmas.clone(), Arc::new(LemmaCache::new()));
    let geo: Arc<dyn GeoNormalizer> = Arc::new(PrefixGeoNormalizer::new(Arc::new(tokenizer)));

    let seeds = build_seeds(&run_file, &config, geo.as_ref())?;
    log::info!(
        "🌱 Sementes: {} URL(s), {} main, {} geo",
        seeds.source_urls.len(),
        seeds.main_names.len(),
        seeds.geo_names.len()
    );

    let provider: Arc<StaticSearchProvider> = Arc::new(run_file.search.clone());
    let anchor_threshold = config.anchor_threshold;
    let topic_threshold = config.topic_threshold;

    let mut pipeline = DiscoveryPipeline::new(
        config,
        seeds,
        provider.clone(),
        provider,
        geo.clone(),
    );
    let result = pipeline.run().await;
    let mut outcome = pipeline.into_outcome();
    outcome.stats.finish();

    let sink = JsonFileSink::new(&cli.out_dir);
    if let Err(e) = result {
        // Estado parcial ainda é útil para diagnóstico
        sink.write_ledger(&format!("{}_ledger", list_name), &outcome.ledger)?;
        sink.write_stats(&format!("{}_stats", list_name), &outcome.stats)?;
        return Err(e).context("pipeline interrompido");
    }

    let assembler = ReportAssembler::new(geo, run_file.labels.clone().unwrap_or_default());
    let mut ledger = std::mem::take(&mut outcome.ledger);

    for (mode, threshold) in [
        (ReportMode::Anchors, anchor_threshold),
        (ReportMode::Topics, topic_threshold),
    ] {
        let report = assembler.assemble(&outcome, mode, threshold, &mut ledger)?;
        sink.write_report(&mode.sheet_name(&list_name), &report)?;
    }

    let summary = ReportAssembler::summary(&outcome, topic_threshold)?;
    sink.write_summary(&format!("{}_clusters", list_name), &summary)?;
    sink.write_ledger(&format!("{}_ledger", list_name), &ledger)?;
    sink.write_stats(&format!("{}_stats", list_name), &outcome.stats)?;

    log::info!("📊 {}", outcome.stats.summary());
    log::info!("⏱️ {}", outcome.stats.timings.summary());
    log::info!(
        "✅ Concluído: {} resultado(s), {} cluster(s), {} item(s) removidos",
        outcome.results.len(),
        summary.clusters.len(),
        ledger.total_removed()
    );

    Ok(())
}

fn build_seeds(
    run_file: &RunFile,
    config: &PipelineConfig,
    geo: &dyn GeoNormalizer,
) -> anyhow::Result<SeedSet> {
    if !run_file.sheet_rows.is_empty() {
        return Ok(SheetImport::from_rows(&run_file.sheet_rows, config.max_urls).seed_set(geo));
    }

    let root = run_file
        .root
        .as_deref()
        .context("containers require a root id")?;
    let tree = ContainerTree::new(run_file.containers.clone());
    let cluster = tree.seed_cluster(root);
    if cluster.is_empty() {
        anyhow::bail!("container {} não encontrado", root);
    }
    Ok(SeedSet::from_containers(cluster, geo))
}

fn list_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("run")
        .to_string()
}
