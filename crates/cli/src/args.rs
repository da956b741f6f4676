//! Command-line arguments.

use std::path::PathBuf;

use assetq_client::{QueryParams, QueryValue};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "assetq", version, about = "Query, cache and merge internet asset search results")]
pub struct Cli {
    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch assets for a project, reusing its cache when allowed.
    Query {
        project: String,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long, help = "Assets per page (defaults to the configured page size)")]
        size: Option<u32>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, help = "Request timeout in milliseconds (defaults to the configured timeout)")]
        timeout_ms: Option<u64>,
        #[arg(long, conflicts_with = "reuse", help = "Always re-query, never prompt")]
        refresh: bool,
        #[arg(long, help = "Always reuse a non-empty cache, never prompt")]
        reuse: bool,
    },
    /// Print the encoded query for a set of parameters.
    Encode {
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Print a project's cached assets.
    Show {
        project: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Merge two parquet tables, the second overriding the first.
    Merge {
        big: PathBuf,
        small: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, help = "Align rows on this column instead of by position")]
        key: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ParamArgs {
    #[arg(
        long = "param",
        value_name = "KEY=VALUE",
        help = "Query parameter; repeat a key to OR its values, true/false become booleans"
    )]
    pub params: Vec<String>,
    #[arg(long, value_name = "JSON", help = "Query parameters as a JSON object, kept in order")]
    pub params_json: Option<String>,
}

impl ParamArgs {
    /// Combine `--params-json` and `--param` pairs, JSON first.
    pub fn to_query_params(&self) -> anyhow::Result<QueryParams> {
        let mut params = match &self.params_json {
            Some(json) => serde_json::from_str::<QueryParams>(json)?,
            None => QueryParams::new(),
        };

        for pair in &self.params {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got `{pair}`"))?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("empty key in `{pair}`");
            }

            let value = match (params.get(key), raw) {
                (Some(QueryValue::Text(prev)), _) => QueryValue::List(vec![prev.clone(), raw.to_string()]),
                (Some(QueryValue::List(prev)), _) => {
                    let mut items = prev.clone();
                    items.push(raw.to_string());
                    QueryValue::List(items)
                }
                (_, "true") => QueryValue::Bool(true),
                (_, "false") => QueryValue::Bool(false),
                _ => QueryValue::Text(raw.to_string()),
            };
            params.insert(key, value);
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[&str]) -> ParamArgs {
        ParamArgs { params: pairs.iter().map(|p| p.to_string()).collect(), params_json: None }
    }

    #[test]
    fn test_parse_cli() {
        let cli = Cli::try_parse_from(["assetq", "query", "p1", "--param", "domain=example.com", "--reuse"]).unwrap();
        match cli.command {
            Commands::Query { project, params, reuse, refresh, .. } => {
                assert_eq!(project, "p1");
                assert!(reuse);
                assert!(!refresh);
                assert_eq!(params.params, vec!["domain=example.com"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_refresh_conflicts_with_reuse() {
        assert!(Cli::try_parse_from(["assetq", "query", "p1", "--refresh", "--reuse"]).is_err());
    }

    #[test]
    fn test_repeated_keys_form_list() {
        let params = args(&["country=US", "country=CN", "is_domain=true"]).to_query_params().unwrap();
        assert_eq!(params.get("country"), Some(&QueryValue::List(vec!["US".into(), "CN".into()])));
        assert_eq!(params.get("is_domain"), Some(&QueryValue::Bool(true)));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let params = args(&["header=Location: /?a=b"]).to_query_params().unwrap();
        assert_eq!(params.get("header"), Some(&QueryValue::Text("Location: /?a=b".into())));
    }

    #[test]
    fn test_malformed_pair() {
        assert!(args(&["domain"]).to_query_params().is_err());
        assert!(args(&["=x"]).to_query_params().is_err());
    }

    #[test]
    fn test_json_then_pairs() {
        let params = ParamArgs { params: vec!["port=443".into()], params_json: Some(r#"{"domain": "a.com"}"#.into()) }
            .to_query_params()
            .unwrap();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["domain", "port"]);
    }
}
