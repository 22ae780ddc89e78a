use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Instant;
use vecdb_core::{
    AnyIndex, FlatConfig, FlatIndex, HnswConfig, HnswIndex, IndexKind, IvfConfig, IvfIndex, SearchParams, SearchRow,
    VectorIndex,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build an index over random vectors and measure recall against the exact scan", long_about = None)]
struct Args {
    /// flat, ivf or hnsw
    #[arg(long, default_value = "hnsw")]
    kind: IndexKind,

    #[arg(short, long, default_value_t = 64)]
    dim: usize,

    #[arg(short, long, default_value_t = 20_000)]
    num: usize,

    #[arg(short, long, default_value_t = 200)]
    queries: usize,

    #[arg(short, long, default_value_t = 10)]
    k: usize,

    #[arg(long, default_value_t = vecdb_core::config::DEFAULT_NLIST)]
    nlist: usize,

    #[arg(long, default_value_t = 8)]
    nprobe: usize,

    #[arg(short, long, default_value_t = vecdb_core::config::DEFAULT_M)]
    m: usize,

    #[arg(long, default_value_t = vecdb_core::config::DEFAULT_EF_CONSTRUCTION)]
    ef_construction: usize,

    #[arg(long, default_value_t = vecdb_core::config::DEFAULT_EF_SEARCH)]
    ef: usize,

    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

fn random_vectors(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n).map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect()).collect()
}

fn build(args: &Args) -> Result<AnyIndex> {
    let index = match args.kind {
        IndexKind::Flat => FlatIndex::new(FlatConfig::new(args.dim))?.into(),
        IndexKind::Ivf => IvfIndex::new(
            IvfConfig::new(args.dim).with_nlist(args.nlist).with_nprobe(args.nprobe).with_seed(args.seed),
        )?
        .into(),
        IndexKind::Hnsw => HnswIndex::new(
            HnswConfig::new(args.dim)
                .with_m(args.m)
                .with_ef_construction(args.ef_construction)
                .with_ef_search(args.ef)
                .with_seed(args.seed),
        )?
        .into(),
    };
    Ok(index)
}

fn recall(truth: &[SearchRow], found: &[SearchRow]) -> f64 {
    let mut hits = 0usize;
    let mut total = 0usize;
    for (t, f) in truth.iter().zip(found) {
        let found_ids: HashSet<u64> = f.iter().map(|n| n.id).collect();
        hits += t.iter().filter(|n| found_ids.contains(&n.id)).count();
        total += t.len();
    }
    hits as f64 / total.max(1) as f64
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("--- VECDB RECALL BENCHMARK ---");
    println!("Index:      {}", args.kind);
    println!("Vectors:    {} x {}", args.num, args.dim);
    println!("Queries:    {} (k = {})", args.queries, args.k);
    println!("------------------------------\n");

    let mut rng = StdRng::seed_from_u64(args.seed);
    let data = random_vectors(&mut rng, args.num, args.dim);
    let queries = random_vectors(&mut rng, args.queries, args.dim);

    let mut index = build(&args)?;
    let build_start = Instant::now();
    index.train(&data).context("training failed")?;
    index.add(&data).context("insertion failed")?;
    let build_time = build_start.elapsed();
    info!("Built {} index with {} vectors in {:?}", args.kind, index.count(), build_time);

    let params = SearchParams { nprobe: Some(args.nprobe), ef: Some(args.ef) };
    let search_start = Instant::now();
    let found = index.search_with(&queries, args.k, &params).context("search failed")?;
    let search_time = search_start.elapsed();

    let mut exact = FlatIndex::new(FlatConfig::new(args.dim))?;
    exact.add(&data)?;
    let truth_start = Instant::now();
    let truth = exact.search(&queries, args.k)?;
    let truth_time = truth_start.elapsed();

    let qps = args.queries as f64 / search_time.as_secs_f64().max(f64::EPSILON);
    println!("Build:       {:?}", build_time);
    println!("Search:      {:?} ({:.0} QPS)", search_time, qps);
    println!("Exact scan:  {:?}", truth_time);
    println!("Recall@{}:   {:.4}", args.k, recall(&truth, &found));
    Ok(())
}
