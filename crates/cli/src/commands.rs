//! Subcommand implementations.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use arrow::util::pretty::pretty_format_batches;
use assetq_client::{AssetQuery, FofaClient, QueryParams, encode_query};
use assetq_core::{AppConfig, CacheGate, CacheStore, MergeMode, merge_tables_with};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::prompt::RefreshPolicy;

fn store(config: &AppConfig) -> CacheStore {
    CacheStore::new(config.cache_root(), config.cache_file_name.clone())
}

pub async fn query(
    config: &AppConfig, project: &str, params: &QueryParams, size: Option<u32>, page: u32, timeout_ms: Option<u64>,
    policy: RefreshPolicy,
) -> anyhow::Result<()> {
    let client = FofaClient::from_app_config(config)?;
    let gate = CacheGate::new(store(config), policy);
    let assets = AssetQuery::new(client, gate, config.fields.clone());

    let size = size.unwrap_or(config.page_size);
    let timeout = timeout_ms.map(Duration::from_millis).unwrap_or_else(|| config.timeout());
    let handle = assets.fetch(project, params, size, page, timeout).await?;

    println!("{}", handle.path.display());
    tracing::info!(project, rows = handle.rows, "assets ready");
    Ok(())
}

pub fn encode(config: &AppConfig, params: &QueryParams) {
    let encoded = encode_query(&config.fields, params);
    println!("{encoded}");
    println!("{}", encoded.decoded());
}

pub fn show(config: &AppConfig, project: &str, limit: usize) -> anyhow::Result<()> {
    let table = store(config)
        .load(project)?
        .with_context(|| format!("no cached assets for project `{project}`"))?;

    let shown = table.slice(0, limit.min(table.num_rows()));
    println!("{}", pretty_format_batches(&[shown])?);
    println!("{} of {} rows", limit.min(table.num_rows()), table.num_rows());
    Ok(())
}

pub fn merge(big: &Path, small: &Path, out: &Path, key: Option<String>) -> anyhow::Result<()> {
    let mode = key.map_or(MergeMode::Positional, |key| MergeMode::KeyAligned { key });
    let merged = merge_tables_with(read_parquet(big)?, read_parquet(small)?, &mode)?;
    write_parquet(out, &merged)?;
    tracing::info!(rows = merged.num_rows(), columns = merged.num_columns(), out = %out.display(), "merged tables");
    Ok(())
}

fn read_parquet(path: &Path) -> anyhow::Result<RecordBatch> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("failed to read parquet file {}", path.display()))?;
    let schema = builder.schema().clone();
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}
